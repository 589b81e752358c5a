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

//! per-week result rows and the CSV table they are written to

use std::{io::Write, path::Path};
use chrono::NaiveDate;
use serde::{Serialize,Deserialize};

use crate::{errors::*, quality::QualityMetrics, weeks::WeekWindow};

pub const RESULTS_FILENAME: &str = "ndvi_weekly.csv";

/// the durable output unit - one per week window, whether or not we found a valid image
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct WeekResult {
    pub week: u32,
    pub start_date: NaiveDate,
    pub image_date: Option<NaiveDate>,
    /// rounded to 3 decimals
    pub mean_ndvi: Option<f64>,
    /// percentage rounded to 1 decimal, 0 if there is no image
    pub coverage_pct: f64,
}

impl WeekResult {
    pub fn selected (window: &WeekWindow, image_date: NaiveDate, metrics: &QualityMetrics)->Self {
        WeekResult {
            week: window.number,
            start_date: window.start,
            image_date: Some(image_date),
            mean_ndvi: Some( round_to( metrics.mean_index, 3)),
            coverage_pct: round_to( metrics.coverage_ratio * 100.0, 1),
        }
    }

    /// the entry for weeks without a usable image
    pub fn none (window: &WeekWindow)->Self {
        WeekResult {
            week: window.number,
            start_date: window.start,
            image_date: None,
            mean_ndvi: None,
            coverage_pct: 0.0,
        }
    }

    pub fn has_image (&self)->bool { self.image_date.is_some() }
}

/// round the exact binary value of `v` to `decimals` places, ties to even. Scaling by 10^n first
/// would turn values like 0.1235 (really 0.12349999..) into a 123.5 tie
pub fn round_to (v: f64, decimals: usize)->f64 {
    format!("{v:.decimals$}").parse::<f64>().unwrap_or(v)
}

/// the textual CSV record. We format numbers ourselves so that the table is stable
#[derive(Serialize)]
struct CsvRow {
    week: u32,
    start_date: String,
    image_date: String,
    mean_ndvi: String,
    valid_coverage_pct: String,
}

impl From<&WeekResult> for CsvRow {
    fn from (r: &WeekResult)->Self {
        CsvRow {
            week: r.week,
            start_date: r.start_date.to_string(),
            image_date: r.image_date.map( |d| d.to_string()).unwrap_or_default(),
            mean_ndvi: r.mean_ndvi.map( |v| format!("{v:.3}")).unwrap_or_default(),
            valid_coverage_pct: if r.has_image() { format!("{:.1}", r.coverage_pct) } else { "0".to_string() }
        }
    }
}

pub fn write_results<W: Write> (writer: W, results: &[WeekResult])->Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for r in results {
        csv_writer.serialize( CsvRow::from(r))?;
    }
    if results.is_empty() { // still write the header
        csv_writer.write_record( &["week","start_date","image_date","mean_ndvi","valid_coverage_pct"])?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_results_file (path: impl AsRef<Path>, results: &[WeekResult])->Result<()> {
    let file = std::fs::File::create( path.as_ref())?;
    write_results( file, results)
}
