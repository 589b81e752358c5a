/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

mod common;

use odin_ndvi::{
    Result,
    quality::QualityMetrics,
    results::{RESULTS_FILENAME, WeekResult, round_to, write_results, write_results_file},
};
use common::*;

fn to_string (results: &[WeekResult])->Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    write_results( &mut buf, results)?;
    Ok( String::from_utf8_lossy( &buf).to_string())
}

#[test]
fn test_rounding () {
    let w = week( 4, "2024-01-22");
    let r = WeekResult::selected( &w, date("2024-01-25"), &QualityMetrics { coverage_ratio: 0.80466, mean_index: 0.45678 });

    assert_eq!( r.mean_ndvi, Some(0.457));
    assert_eq!( r.coverage_pct, 80.5);
    assert_eq!( round_to( 0.1234, 2), 0.12);
}

#[test]
fn test_rounding_ties () {
    // 0.1235 is stored as 0.12349999.. and rounds down
    assert_eq!( round_to( 0.1235, 3), 0.123);

    // exact ties go to the even digit: 5/16 coverage is exactly 31.25%
    assert_eq!( round_to( 0.3125 * 100.0, 1), 31.2);
    assert_eq!( round_to( 0.4375 * 100.0, 1), 43.8);
    assert_eq!( round_to( 2.5, 0), 2.0);

    let r = WeekResult::selected( &week( 1, "2024-01-01"), date("2024-01-02"), &QualityMetrics { coverage_ratio: 5.0 / 16.0, mean_index: 0.1235 });
    assert_eq!( r.coverage_pct, 31.2);
    assert_eq!( r.mean_ndvi, Some(0.123));
}

#[test]
fn test_csv_rows () -> Result<()> {
    let results = vec![
        WeekResult::selected( &week( 1, "2024-01-01"), date("2024-01-03"), &QualityMetrics { coverage_ratio: 0.8, mean_index: 0.45 }),
        WeekResult::none( &week( 2, "2024-01-08")),
        WeekResult::selected( &week( 3, "2024-01-15"), date("2024-01-20"), &QualityMetrics { coverage_ratio: 1.0, mean_index: 0.3 }),
    ];

    let s = to_string( &results)?;
    println!("{s}");

    let lines: Vec<&str> = s.lines().collect();
    assert_eq!( lines, vec![
        "week,start_date,image_date,mean_ndvi,valid_coverage_pct",
        "1,2024-01-01,2024-01-03,0.450,80.0",
        "2,2024-01-08,,,0",
        "3,2024-01-15,2024-01-20,0.300,100.0",
    ]);
    Ok(())
}

#[test]
fn test_empty_table_has_header () -> Result<()> {
    let s = to_string( &[])?;
    assert_eq!( s.trim_end(), "week,start_date,image_date,mean_ndvi,valid_coverage_pct");
    Ok(())
}

#[test]
fn test_write_file () -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join( RESULTS_FILENAME);

    let results: Vec<WeekResult> = (1..=3).map( |n| {
        let start = date("2024-01-01") + chrono::Days::new( 7 * (n as u64 - 1));
        WeekResult::none( &odin_ndvi::weeks::WeekWindow::new( n, start).unwrap())
    }).collect();
    write_results_file( &path, &results)?;

    let s = std::fs::read_to_string( &path)?;
    assert_eq!( s.lines().count(), 4);
    assert_eq!( s.lines().last(), Some("3,2024-01-15,,,0"));
    Ok(())
}
