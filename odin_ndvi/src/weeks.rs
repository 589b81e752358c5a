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

//! partition of a calendar year into 7-day windows
//!
//! ```diagram
//!   Jan 1                                    Jan 1 (Y+1)
//!   │                                        │
//!   ├── w1 ──┼── w2 ──┼─  ...  ─┼── w52 ──┼── w53 ──┤
//!                                            └ w53 ends past Dec 31
//! ```
//! The last window is not clipped at the year boundary.

use std::fmt;
use chrono::{Datelike, Days, NaiveDate};
use serde::{Serialize,Deserialize};

pub const DAYS_PER_WEEK: u64 = 7;

/// a 7-day date range, both `start` and `end` inclusive
#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize)]
pub struct WeekWindow {
    /// 1-based week number within the partitioned year
    pub number: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekWindow {
    pub fn new (number: u32, start: NaiveDate)->Option<Self> {
        let end = start.checked_add_days( Days::new( DAYS_PER_WEEK - 1))?;
        Some( WeekWindow { number, start, end } )
    }

    pub fn contains (&self, date: &NaiveDate)->bool {
        *date >= self.start && *date <= self.end
    }

    /// first day after this window, which is the start of the next one
    pub fn next_start (&self)->Option<NaiveDate> {
        self.end.succ_opt()
    }
}

impl fmt::Display for WeekWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "week {}: {} → {}", self.number, self.start, self.end)
    }
}

/// the week windows of one calendar year. This is just the year, iteration is lazy and can be
/// restarted any number of times
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub struct WeekPartition {
    year: i32
}

impl WeekPartition {
    pub fn new (year: i32)->Self { WeekPartition { year } }

    pub fn year (&self)->i32 { self.year }

    pub fn iter (&self)->WeekIter {
        let next = NaiveDate::from_ymd_opt( self.year, 1, 1);
        let limit = self.year.checked_add(1).and_then( |y| NaiveDate::from_ymd_opt( y, 1, 1));
        match (next, limit) {
            (Some(start), Some(limit)) => WeekIter { next: Some(start), limit, number: 1 },
            _ => WeekIter { next: None, limit: NaiveDate::MIN, number: 1 } // out of chrono range
        }
    }

    /// number of windows, which is ceil(days_in_year / 7)
    pub fn len (&self)->usize {
        self.iter().count()
    }
}

impl IntoIterator for &WeekPartition {
    type Item = WeekWindow;
    type IntoIter = WeekIter;

    fn into_iter(self) -> Self::IntoIter { self.iter() }
}

pub struct WeekIter {
    next: Option<NaiveDate>,
    limit: NaiveDate, // exclusive
    number: u32
}

impl Iterator for WeekIter {
    type Item = WeekWindow;

    fn next(&mut self) -> Option<WeekWindow> {
        let start = self.next.filter( |d| *d < self.limit)?;
        let window = WeekWindow::new( self.number, start);

        self.next = window.as_ref().and_then( |w| w.next_start());
        self.number += 1;
        window
    }
}

/// convenience function to get all windows of a year
pub fn weeks_of_year (year: i32)->Vec<WeekWindow> {
    WeekPartition::new(year).iter().collect()
}

pub fn is_leap_year (year: i32)->bool {
    NaiveDate::from_ymd_opt( year, 2, 29).is_some()
}

pub fn days_in_year (year: i32)->u32 {
    NaiveDate::from_ymd_opt( year, 12, 31).map( |d| d.ordinal()).unwrap_or(0)
}
