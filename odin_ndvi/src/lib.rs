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

#![doc = include_str!("../doc/odin_ndvi.md")]

use std::path::{Path,PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::info;

mod errors;
pub use errors::*;

pub mod config;
pub mod geo;
pub mod weeks;
pub mod location;
pub mod raster;
pub mod provider;
pub mod retry;
pub mod quality;
pub mod results;
pub mod emitter;
pub mod selection;
pub mod sentinel_hub;

use config::NdviConfig;
use emitter::ArtifactEmitter;
use geo::BoundingBox;
use provider::{CatalogClient, PixelSource};
use quality::QualityEvaluator;
use retry::RetryingSearch;
use selection::{SelectionRun, WeeklySelector};
use weeks::WeekPartition;

pub use config::load_config;

/// assemble the weekly selector for a given area from its collaborators and the configured limits
pub fn build_selector<C,P,E> (config: &NdviConfig, bbox: BoundingBox, catalog: C, pixels: P, emitter: E)->Result<WeeklySelector<C,P,E>>
    where C: CatalogClient, P: PixelSource, E: ArtifactEmitter
{
    let size = bbox.raster_size( config.resolution)?;
    let search = RetryingSearch::new( catalog, config.search_retry);
    let evaluator = QualityEvaluator::new( pixels, emitter, bbox, size, config.thresholds);

    Ok( WeeklySelector::new( search, evaluator, bbox, config.max_candidates, config.fetch_error_policy) )
}

/// run all weeks of the configured year
pub async fn run_year<C,P,E> (config: &NdviConfig, selector: &WeeklySelector<C,P,E>, cancel: &CancellationToken)->SelectionRun
    where C: CatalogClient, P: PixelSource, E: ArtifactEmitter
{
    let weeks = WeekPartition::new( config.year);
    info!("processing {} weeks of {}", weeks.len(), config.year);
    selector.run( &weeks, cancel).await
}

/// create (if needed) the run directory for `place` under `output_root`
pub fn ensure_run_dir (output_root: impl AsRef<Path>, place: &str)->Result<PathBuf> {
    let dir = emitter::run_dir( output_root, place);
    std::fs::create_dir_all( &dir)?;
    Ok(dir)
}
