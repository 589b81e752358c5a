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

//! data quality gates for candidate images

use std::{fmt, path::PathBuf};
use serde::{Serialize,Deserialize};
use tracing::info;

use crate::{
    errors::*,
    emitter::{ArtifactEmitter, WeekArtifact},
    geo::{BoundingBox, RasterSize},
    provider::{Candidate, PixelSource, RasterProduct},
    raster::Raster,
    results::WeekResult,
    weeks::WeekWindow
};

/// the two independent acceptance thresholds
#[derive(Deserialize,Serialize,Debug,Clone,Copy,PartialEq)]
#[serde(default)]
pub struct QualityThresholds {
    /// min fraction of valid pixels [0..1]
    pub min_coverage: f64,
    /// min mean NDVI of valid pixels
    pub min_mean_index: f64,
}

impl Default for QualityThresholds {
    fn default()->Self {
        QualityThresholds { min_coverage: 0.30, min_mean_index: 0.10 }
    }
}

impl QualityThresholds {
    /// coverage is checked first so that rasters without valid pixels are always coverage rejections
    pub fn check (&self, metrics: &QualityMetrics)->Option<Rejection> {
        if !(metrics.coverage_ratio >= self.min_coverage) {
            Some( Rejection::LowCoverage( metrics.coverage_ratio))
        } else if !(metrics.mean_index >= self.min_mean_index) {
            Some( Rejection::LowIndex( metrics.mean_index))
        } else {
            None
        }
    }
}

#[derive(Debug,Clone,Copy,PartialEq)]
pub struct QualityMetrics {
    pub coverage_ratio: f64,
    /// NaN if there are no valid pixels
    pub mean_index: f64,
}

impl QualityMetrics {
    /// compute metrics from the first band of `raster`. Non-finite values count as invalid and
    /// are excluded from the mean
    pub fn from_raster (raster: &Raster)->Self {
        let n_pixels = raster.pixel_count();
        let bands = raster.bands.max(1) as usize;

        let mut n_valid: usize = 0;
        let mut sum: f64 = 0.0;
        for v in raster.data.iter().step_by(bands) {
            if v.is_finite() {
                n_valid += 1;
                sum += *v as f64;
            }
        }

        let coverage_ratio = if n_pixels > 0 { n_valid as f64 / n_pixels as f64 } else { 0.0 };
        let mean_index = if n_valid > 0 { sum / n_valid as f64 } else { f64::NAN };

        QualityMetrics { coverage_ratio, mean_index }
    }
}

#[derive(Debug,Clone,Copy,PartialEq)]
pub enum Rejection {
    LowCoverage(f64),
    LowIndex(f64),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::LowCoverage(c) => write!(f, "valid coverage {:.0}%", c * 100.0),
            Rejection::LowIndex(v) => write!(f, "NDVI too low ({v:.3})"),
        }
    }
}

#[derive(Debug)]
pub enum Verdict {
    Accepted { result: WeekResult, metrics: QualityMetrics, artifact: PathBuf },
    Rejected { metrics: QualityMetrics, reason: Rejection },
    /// pixel data for this candidate could not be retrieved. What this means for the week is up to the caller
    FetchFailed(OdinNdviError),
}

/// fetches the NDVI raster of a candidate, checks it against the thresholds and for accepted
/// candidates renders the comparison artifact
pub struct QualityEvaluator<P,E> {
    pixels: P,
    emitter: E,
    bbox: BoundingBox,
    size: RasterSize,
    thresholds: QualityThresholds,
}

impl<P,E> QualityEvaluator<P,E> where P: PixelSource, E: ArtifactEmitter {
    pub fn new (pixels: P, emitter: E, bbox: BoundingBox, size: RasterSize, thresholds: QualityThresholds)->Self {
        QualityEvaluator { pixels, emitter, bbox, size, thresholds }
    }

    /// returns an error only if the artifact could not be written
    pub async fn evaluate (&self, candidate: &Candidate, window: &WeekWindow)->Result<Verdict> {
        let ndvi = match self.fetch( RasterProduct::Ndvi, candidate).await {
            Ok(raster) => raster,
            Err(e) => return Ok( Verdict::FetchFailed(e))
        };

        let metrics = QualityMetrics::from_raster( &ndvi);
        if let Some(reason) = self.thresholds.check( &metrics) {
            info!("image {} rejected: {reason}", candidate.date);
            return Ok( Verdict::Rejected { metrics, reason })
        }

        let true_color = match self.fetch( RasterProduct::TrueColor, candidate).await {
            Ok(raster) => raster,
            Err(e) => return Ok( Verdict::FetchFailed(e))
        };

        let artifact = self.emitter.emit( &WeekArtifact {
            week: window.number,
            date: candidate.date,
            mean_ndvi: metrics.mean_index,
            true_color: &true_color,
            ndvi: &ndvi
        })?;

        let result = WeekResult::selected( window, candidate.date, &metrics);
        info!("image {} accepted: NDVI {:.3}, valid coverage {:.1}%", candidate.date, metrics.mean_index, metrics.coverage_ratio * 100.0);

        Ok( Verdict::Accepted { result, metrics, artifact })
    }

    async fn fetch (&self, product: RasterProduct, candidate: &Candidate)->Result<Raster> {
        let raster = self.pixels.fetch_raster( product, &self.bbox, candidate.date, self.size).await?;
        if raster.pixel_count() != self.size.len() {
            return Err( invalid_raster( format!("{product} raster for {} is {}x{}, requested {}x{}",
                candidate.date, raster.width, raster.height, self.size.width, self.size.height)))
        }
        Ok(raster)
    }
}
