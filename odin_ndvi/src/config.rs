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

use std::{fmt, path::{Path,PathBuf}, time::Duration};
use serde::{Serialize,Deserialize};

use crate::{errors::*, quality::QualityThresholds, retry::RetryPolicy};

pub const CLIENT_ID_ENV: &str = "SH_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "SH_CLIENT_SECRET";

/// Sentinel Hub account and endpoint configuration
#[derive(Deserialize,Serialize,Clone)]
#[serde(default)]
pub struct SentinelHubConfig {
    /// base URL for catalog and process API (e.g. https://services.sentinel-hub.com)
    pub base_url: String,

    /// OAuth2 token endpoint
    pub token_url: String,

    /// empty means "take from SH_CLIENT_ID env var"
    pub client_id: String,
    /// empty means "take from SH_CLIENT_SECRET env var". Never serialized or printed
    #[serde(skip_serializing)]
    pub(crate) client_secret: String,

    /// catalog / process collection name
    pub collection: String,

    /// catalog filter upper bound for eo:cloud_cover in percent
    pub max_cloud_cover: f64,

    /// page size of catalog requests
    pub page_size: usize,
    /// max number of catalog entries we collect per window
    pub max_results: usize,

    /// set NDVI pixels of cloud, cloud shadow and cirrus scene classes to no-data
    pub mask_clouds: bool,

    pub request_timeout: Duration,
}

impl Default for SentinelHubConfig {
    fn default()->Self {
        SentinelHubConfig {
            base_url: "https://services.sentinel-hub.com".to_string(),
            token_url: "https://services.sentinel-hub.com/auth/realms/main/protocol/openid-connect/token".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            collection: "sentinel-2-l2a".to_string(),
            max_cloud_cover: 30.0,
            page_size: 50,
            max_results: 50,
            mask_clouds: false,
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl fmt::Debug for SentinelHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secret = if self.client_secret.is_empty() { "" } else { "***" };
        f.debug_struct("SentinelHubConfig")
            .field("base_url", &self.base_url)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &secret)
            .field("collection", &self.collection)
            .field("max_cloud_cover", &self.max_cloud_cover)
            .field("page_size", &self.page_size)
            .field("max_results", &self.max_results)
            .field("mask_clouds", &self.mask_clouds)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl SentinelHubConfig {
    /// fill in missing credentials from the environment
    pub fn resolve_credentials (&mut self)->Result<()> {
        if self.client_id.is_empty() {
            self.client_id = std::env::var(CLIENT_ID_ENV).unwrap_or_default();
        }
        if self.client_secret.is_empty() {
            self.client_secret = std::env::var(CLIENT_SECRET_ENV).unwrap_or_default();
        }

        if self.client_id.is_empty() || self.client_secret.is_empty() {
            Err( invalid_argument( format!("no Sentinel Hub credentials (set {CLIENT_ID_ENV} and {CLIENT_SECRET_ENV})")))
        } else {
            Ok(())
        }
    }

    pub fn set_credentials (&mut self, client_id: impl ToString, client_secret: impl ToString) {
        self.client_id = client_id.to_string();
        self.client_secret = client_secret.to_string();
    }

    pub fn client_secret (&self)->&str { self.client_secret.as_str() }
}

/// where and how to look up place names. Files with a spreadsheet extension (xls, xlsx, ods..) are read
/// from their first worksheet, everything else as CSV with the given delimiter
#[derive(Deserialize,Serialize,Debug,Clone)]
#[serde(default)]
pub struct LocationTableConfig {
    pub path: PathBuf,
    pub delimiter: char,
    pub name_column: String,
    pub lat_column: String,
    pub lon_column: String,
}

impl Default for LocationTableConfig {
    fn default()->Self {
        LocationTableConfig {
            path: PathBuf::from("municipios_coord.xls"),
            delimiter: ',',
            name_column: "Población".to_string(),
            lat_column: "Latitud".to_string(),
            lon_column: "Longitud".to_string(),
        }
    }
}

/// what to do if pixel data for an evaluated candidate cannot be retrieved
#[derive(Deserialize,Serialize,Debug,Clone,Copy,PartialEq,Eq,Default)]
pub enum FetchErrorPolicy {
    /// propagate the error and stop processing further weeks
    #[default]
    AbortRun,
    /// treat like a quality rejection and go on with the next candidate
    RejectCandidate,
    /// give up on the current week and record it as having no valid image
    SkipWeek,
}

#[derive(Deserialize,Serialize,Debug,Clone)]
#[serde(default)]
pub struct NdviConfig {
    pub year: i32,

    /// half size of the area of interest in degrees (0.045° ~ 5km)
    pub bbox_buffer: f64,
    /// meters per pixel
    pub resolution: f64,

    /// max number of catalog candidates evaluated per week
    pub max_candidates: usize,
    pub thresholds: QualityThresholds,
    pub search_retry: RetryPolicy,
    pub fetch_error_policy: FetchErrorPolicy,

    /// parent directory of the per-place run directories
    pub output_root: PathBuf,
    /// TTF font to annotate artifact images. If not set we look for DejaVuSansMono.ttf
    pub font: Option<PathBuf>,
    /// radius of the marker circle in the true color panel
    pub marker_radius: f64,

    pub locations: LocationTableConfig,
    pub sentinel_hub: SentinelHubConfig,
}

impl Default for NdviConfig {
    fn default()->Self {
        NdviConfig {
            year: 2024,
            bbox_buffer: 0.045,
            resolution: 10.0,
            max_candidates: 10,
            thresholds: QualityThresholds::default(),
            search_retry: RetryPolicy::default(),
            fetch_error_policy: FetchErrorPolicy::AbortRun,
            output_root: PathBuf::from("."),
            font: None,
            marker_radius: 5000.0,
            locations: LocationTableConfig::default(),
            sentinel_hub: SentinelHubConfig::default(),
        }
    }
}

impl NdviConfig {
    pub fn check (&self)->Result<()> {
        if self.max_candidates == 0 { return Err( invalid_argument("max_candidates has to be > 0")) }
        if !(self.bbox_buffer > 0.0) { return Err( invalid_argument("bbox_buffer has to be > 0")) }
        if !(self.resolution > 0.0) { return Err( invalid_argument("resolution has to be > 0")) }
        if self.search_retry.max_attempts == 0 { return Err( invalid_argument("search_retry.max_attempts has to be > 0")) }
        if !self.locations.delimiter.is_ascii() { return Err( invalid_argument("location table delimiter has to be ASCII")) }
        Ok(())
    }
}

pub fn load_config<C> (path: impl AsRef<Path>)->Result<C> where C: for<'a> Deserialize<'a> {
    let data = std::fs::read( path.as_ref())?;
    Ok( ron::de::from_bytes( data.as_slice())? )
}
