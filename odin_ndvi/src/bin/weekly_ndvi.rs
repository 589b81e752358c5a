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

use std::{io::{self, Write}, path::PathBuf, sync::Arc};
use anyhow::Result;
use clap::Parser;
use lazy_static::lazy_static;
use tokio_util::sync::CancellationToken;
use tracing::{info,warn};
use tracing_subscriber::EnvFilter;

use odin_ndvi::{
    build_selector, ensure_run_dir, load_config, run_year,
    config::{FetchErrorPolicy, NdviConfig},
    emitter::PngComparisonEmitter,
    location::LocationTable,
    results::{RESULTS_FILENAME, write_results_file},
    selection::{RunStatus, WeekOutcome},
    sentinel_hub::SentinelHubClient,
};

#[derive(Parser)]
#[command(about = "weekly Sentinel-2 NDVI time series for a named place")]
struct CliOpts {
    /// filename of NdviConfig (RON) file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// year to process (overrides config)
    #[arg(short, long)]
    year: Option<i32>,

    /// CSV or spreadsheet file with place names and coordinates (overrides config)
    #[arg(short, long)]
    locations: Option<PathBuf>,

    /// parent directory for output (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// what to do if image data for a candidate cannot be retrieved (overrides config)
    #[arg(long, value_parser = parse_policy)]
    on_fetch_error: Option<FetchErrorPolicy>,

    /// name of the place (prompted for if not given)
    place: Option<String>,
}

lazy_static! { static ref ARGS: CliOpts = CliOpts::parse(); }

fn parse_policy (s: &str)->std::result::Result<FetchErrorPolicy,String> {
    match s {
        "abort" => Ok( FetchErrorPolicy::AbortRun),
        "reject" => Ok( FetchErrorPolicy::RejectCandidate),
        "skip-week" => Ok( FetchErrorPolicy::SkipWeek),
        _ => Err( format!("unknown policy '{s}' (abort|reject|skip-week)"))
    }
}

fn get_config ()->Result<NdviConfig> {
    let mut config: NdviConfig = match &ARGS.config {
        Some(path) => load_config( path)?,
        None => NdviConfig::default()
    };

    if let Some(year) = ARGS.year { config.year = year }
    if let Some(path) = &ARGS.locations { config.locations.path = path.clone() }
    if let Some(dir) = &ARGS.output { config.output_root = dir.clone() }
    if let Some(policy) = ARGS.on_fetch_error { config.fetch_error_policy = policy }

    config.check()?;
    Ok(config)
}

fn prompt_place ()->Result<String> {
    print!("🔍 name of place: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line( &mut line)?;
    Ok( line.trim().to_string())
}

#[tokio::main(flavor = "current_thread")]
async fn main ()->Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter( EnvFilter::try_from_default_env().unwrap_or_else( |_| EnvFilter::new("info")))  // use RUST_LOG to override
        .init();

    //--- everything that can fail on user input comes before we touch the file system
    let mut config = get_config()?;
    config.sentinel_hub.resolve_credentials()?;

    let table = LocationTable::open( &config.locations)?;
    let name = match &ARGS.place {
        Some(name) => name.clone(),
        None => prompt_place()?
    };
    let place = table.resolve( &name)?.clone();
    let bbox = place.bbox( config.bbox_buffer)?;
    info!("{} at {:.4},{:.4}, area {bbox}", place.name, place.lat, place.lon);

    let dir = ensure_run_dir( &config.output_root, &place.name)?;
    let emitter = PngComparisonEmitter::new( &dir, &place.name, config.resolution, config.marker_radius);
    let emitter = match &config.font {
        Some(font) => emitter.with_font( font)?,
        None => emitter.with_default_font()
    };

    let client = Arc::new( SentinelHubClient::new( config.sentinel_hub.clone())?);
    let selector = build_selector( &config, bbox, client.clone(), client, emitter)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn( async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, saving results so far..");
                cancel.cancel();
            }
        });
    }

    let run = run_year( &config, &selector, &cancel).await;

    let csv_path = dir.join( RESULTS_FILENAME);
    write_results_file( &csv_path, &run.results)?;
    info!("{} weeks: {} accepted, {} without valid image, {} without search results, {} fetch failures",
        run.results.len(), run.count(WeekOutcome::Accepted), run.count(WeekOutcome::Exhausted),
        run.count(WeekOutcome::SearchFailed), run.count(WeekOutcome::FetchFailed));
    println!("weekly NDVI saved to {}", csv_path.display());

    match run.status {
        RunStatus::Completed => Ok(()),
        RunStatus::Cancelled => { warn!("run was cancelled, results are incomplete"); Ok(()) }
        RunStatus::Aborted(e) => Err(e.into())
    }
}
