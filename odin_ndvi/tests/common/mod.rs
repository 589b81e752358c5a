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

//! in-memory providers and emitters for tests

#![allow(unused)]

use std::{
    collections::{HashMap, HashSet, VecDeque}, path::PathBuf,
    sync::{Mutex, atomic::{AtomicUsize, Ordering}}
};
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use odin_ndvi::{
    OdinNdviError, Result, provider_error,
    emitter::{ArtifactEmitter, WeekArtifact},
    geo::{BoundingBox, RasterSize},
    provider::{Candidate, CatalogClient, PixelSource, RasterProduct},
    raster::Raster,
    weeks::WeekWindow,
};

pub fn date (s: &str)->NaiveDate {
    NaiveDate::parse_from_str( s, "%Y-%m-%d").unwrap()
}

pub fn cand (s: &str)->Candidate {
    Candidate::new( format!("S2A_{s}"), date(s))
}

pub fn test_bbox ()->BoundingBox {
    BoundingBox::from_center( -1.0977, 38.8690, 0.045).unwrap()
}

pub fn week (number: u32, start: &str)->WeekWindow {
    WeekWindow::new( number, date(start)).unwrap()
}

/* #region catalog ***************************************************************************************/

/// what the catalog does for one search call
pub enum Scripted {
    Found(Vec<Candidate>),
    Unavailable,
    Fail,
}

/// catalog that first plays a script of responses and then answers from a per-week table
/// (empty for weeks without entry)
#[derive(Default)]
pub struct FakeCatalog {
    script: Mutex<VecDeque<Scripted>>,
    by_week: HashMap<u32,Vec<Candidate>>,
    calls: AtomicUsize,
    /// cancel this token when the given week is searched
    cancel_at: Option<(u32,CancellationToken)>,
}

impl FakeCatalog {
    pub fn new ()->Self { FakeCatalog::default() }

    pub fn scripted (responses: Vec<Scripted>)->Self {
        FakeCatalog { script: Mutex::new( responses.into()), ..FakeCatalog::default() }
    }

    pub fn with_week (mut self, week: u32, candidates: Vec<Candidate>)->Self {
        self.by_week.insert( week, candidates);
        self
    }

    pub fn cancel_at (mut self, week: u32, cancel: CancellationToken)->Self {
        self.cancel_at = Some((week,cancel));
        self
    }

    pub fn calls (&self)->usize { self.calls.load( Ordering::SeqCst) }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn search (&self, _bbox: &BoundingBox, window: &WeekWindow)->Result<Vec<Candidate>> {
        self.calls.fetch_add( 1, Ordering::SeqCst);

        if let Some((week,cancel)) = &self.cancel_at {
            if *week == window.number { cancel.cancel() }
        }

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Found(cs)) => Ok(cs),
            Some(Scripted::Unavailable) => Err( OdinNdviError::ServiceUnavailable("503 busy".to_string())),
            Some(Scripted::Fail) => Err( provider_error( 401, "unauthorized")),
            None => Ok( self.by_week.get( &window.number).cloned().unwrap_or_default())
        }
    }
}

/* #endregion catalog */

/* #region pixels ****************************************************************************************/

/// NDVI raster of `size` with the first `coverage` fraction of pixels set to `mean`, the rest NaN
pub fn scene_raster (size: RasterSize, coverage: f64, mean: f32)->Raster {
    let n = size.len();
    let n_valid = (coverage * n as f64).round() as usize;
    let data: Vec<f32> = (0..n).map( |i| if i < n_valid { mean } else { f32::NAN }).collect();
    Raster::new( size.width, size.height, 1, data).unwrap()
}

pub fn true_color_raster (size: RasterSize)->Raster {
    let data: Vec<f32> = (0..size.len()*3).map( |i| (i % 7) as f32 / 7.0).collect();
    Raster::new( size.width, size.height, 3, data).unwrap()
}

/// pixel source that serves scenes described by (coverage, mean) per acquisition date
#[derive(Default)]
pub struct FakePixels {
    scenes: HashMap<NaiveDate,(f64,f32)>,
    failing: HashSet<NaiveDate>,
    ndvi_fetches: AtomicUsize,
    true_color_fetches: AtomicUsize,
}

impl FakePixels {
    pub fn new ()->Self { FakePixels::default() }

    pub fn scene (mut self, d: &str, coverage: f64, mean: f32)->Self {
        self.scenes.insert( date(d), (coverage,mean));
        self
    }

    pub fn failing (mut self, d: &str)->Self {
        self.failing.insert( date(d));
        self
    }

    pub fn ndvi_fetches (&self)->usize { self.ndvi_fetches.load( Ordering::SeqCst) }

    pub fn true_color_fetches (&self)->usize { self.true_color_fetches.load( Ordering::SeqCst) }
}

#[async_trait]
impl PixelSource for FakePixels {
    async fn fetch_raster (&self, product: RasterProduct, _bbox: &BoundingBox, date: NaiveDate, size: RasterSize)->Result<Raster> {
        match product {
            RasterProduct::Ndvi => self.ndvi_fetches.fetch_add( 1, Ordering::SeqCst),
            RasterProduct::TrueColor => self.true_color_fetches.fetch_add( 1, Ordering::SeqCst),
        };

        if self.failing.contains( &date) {
            return Err( provider_error( 500, format!("no data for {date}")))
        }

        let (coverage, mean) = self.scenes.get( &date).copied()
            .ok_or_else( || provider_error( 404, format!("unknown scene {date}")))?;

        match product {
            RasterProduct::Ndvi => Ok( scene_raster( size, coverage, mean)),
            RasterProduct::TrueColor => Ok( true_color_raster( size)),
        }
    }
}

/* #endregion pixels */

/// emitter that only records what it was asked to store
#[derive(Default)]
pub struct RecordingEmitter {
    emitted: Mutex<Vec<(u32,NaiveDate)>>,
}

impl RecordingEmitter {
    pub fn new ()->Self { RecordingEmitter::default() }

    pub fn emitted (&self)->Vec<(u32,NaiveDate)> { self.emitted.lock().unwrap().clone() }
}

impl ArtifactEmitter for RecordingEmitter {
    fn emit (&self, artifact: &WeekArtifact<'_>)->Result<PathBuf> {
        self.emitted.lock().unwrap().push( (artifact.week, artifact.date));
        Ok( PathBuf::from( format!("week{}_{}.png", artifact.week, artifact.date)))
    }
}
