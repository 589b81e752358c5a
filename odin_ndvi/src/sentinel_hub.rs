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

//! Sentinel Hub client for the STAC catalog and the process API (Sentinel-2 L2A)

use std::time::{Duration, Instant};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use reqwest::{Client, Response, StatusCode, header::ACCEPT};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug,info};

use crate::{
    errors::*,
    config::SentinelHubConfig,
    geo::{BoundingBox, RasterSize},
    provider::{Candidate, CatalogClient, PixelSource, RasterProduct},
    raster::{Raster, decode_tiff},
    weeks::WeekWindow
};

const CRS84: &str = "http://www.opengis.net/def/crs/OGC/1.3/CRS84";

/// refresh tokens this long before they expire
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

/* #region evalscripts ************************************************************************************/

/// scene classification values we treat as invalid: cloud shadow, cloud medium/high probability, thin cirrus
const CLOUD_SCL_CLASSES: &str = "[3, 8, 9, 10]";

pub fn ndvi_evalscript (mask_clouds: bool)->String {
    let (inputs, mask) = if mask_clouds {
        ( r#"["B04", "B08", "SCL", "dataMask"]"#, format!("  if (s.dataMask == 0 || {CLOUD_SCL_CLASSES}.includes(s.SCL)) {{ return [NaN]; }}") )
    } else {
        ( r#"["B04", "B08", "dataMask"]"#, "  if (s.dataMask == 0) { return [NaN]; }".to_string() )
    };

    format!(r#"//VERSION=3
function setup() {{
  return {{ input: {inputs}, output: {{ bands: 1, sampleType: "FLOAT32" }} }};
}}
function evaluatePixel(s) {{
{mask}
  return [(s.B08 - s.B04) / (s.B08 + s.B04)];
}}
"#)
}

pub const TRUE_COLOR_EVALSCRIPT: &str = r#"//VERSION=3
function setup() {
  return { input: ["B04", "B03", "B02"], output: { bands: 3 } };
}
function evaluatePixel(s) {
  return [s.B04, s.B03, s.B02];
}
"#;

/* #endregion evalscripts */

/* #region catalog response ******************************************************************************/

#[derive(Deserialize,Debug)]
struct CatalogResponse {
    #[serde(default)]
    features: Vec<CatalogFeature>,
    #[serde(default)]
    context: Option<CatalogContext>,
}

#[derive(Deserialize,Debug)]
struct CatalogFeature {
    id: String,
    properties: FeatureProperties,
}

#[derive(Deserialize,Debug)]
struct FeatureProperties {
    datetime: String,
}

#[derive(Deserialize,Debug)]
struct CatalogContext {
    next: Option<u64>,
}

/// one page of catalog search results
#[derive(Debug,PartialEq)]
pub struct CatalogPage {
    pub candidates: Vec<Candidate>,
    /// pagination token for the next page, if any
    pub next: Option<u64>,
}

/// parse a STAC FeatureCollection. Feature order is preserved, the acquisition day is the date part
/// of `properties.datetime`
pub fn parse_catalog_page (bytes: &[u8])->Result<CatalogPage> {
    let response: CatalogResponse = serde_json::from_slice(bytes)?;

    let mut candidates = Vec::with_capacity( response.features.len());
    for f in response.features {
        let date = f.properties.datetime.get(..10)
            .and_then( |s| NaiveDate::parse_from_str( s, "%Y-%m-%d").ok())
            .ok_or_else( || op_failed( format!("invalid datetime '{}' for {}", f.properties.datetime, f.id)))?;
        candidates.push( Candidate { id: f.id, date });
    }

    Ok( CatalogPage { candidates, next: response.context.and_then( |c| c.next) } )
}

/* #endregion catalog response */

#[derive(Deserialize,Debug)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct AccessToken {
    token: String,
    expires: Instant,
}

/// map non-success responses to our error taxonomy. 503 is the (only) transient condition
async fn check_response (response: Response)->Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let msg = response.text().await.unwrap_or_default();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            Err( OdinNdviError::ServiceUnavailable( format!("{} {}", status.as_u16(), msg)))
        } else {
            Err( provider_error( status.as_u16(), msg))
        }
    }
}

pub struct SentinelHubClient {
    client: Client,
    config: SentinelHubConfig,
    token: Mutex<Option<AccessToken>>,
}

impl SentinelHubClient {
    pub fn new (config: SentinelHubConfig)->Result<Self> {
        let client = Client::builder().timeout( config.request_timeout).build()?;
        Ok( SentinelHubClient { client, config, token: Mutex::new(None) } )
    }

    pub fn config (&self)->&SentinelHubConfig { &self.config }

    /// get a cached OAuth2 token or request a new one (client credentials flow)
    async fn access_token (&self)->Result<String> {
        let mut token = self.token.lock().await;

        if let Some(t) = token.as_ref() {
            if Instant::now() + TOKEN_MARGIN < t.expires {
                return Ok( t.token.clone())
            }
        }

        debug!("requesting access token from {}", self.config.token_url);
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret()),
        ];
        let response = self.client.post( &self.config.token_url).form( &params).send().await?;
        let response = check_response( response).await?;
        let tr: TokenResponse = serde_json::from_slice( &response.bytes().await?)?;

        let access_token = tr.access_token.clone();
        *token = Some( AccessToken { token: tr.access_token, expires: Instant::now() + Duration::from_secs( tr.expires_in) });
        Ok(access_token)
    }

    pub fn catalog_request (&self, bbox: &BoundingBox, window: &WeekWindow, next: Option<u64>)->Value {
        let mut body = json!({
            "collections": [ self.config.collection ],
            "bbox": bbox.to_wsen_array(),
            "datetime": format!("{}T00:00:00Z/{}T23:59:59Z", window.start, window.end),
            "filter": format!("eo:cloud_cover < {}", self.config.max_cloud_cover),
            "filter-lang": "cql2-text",
            "fields": { "include": ["id", "properties.datetime"], "exclude": [] },
            "limit": self.config.page_size,
        });
        if let Some(next) = next {
            body["next"] = json!(next);
        }
        body
    }

    pub fn process_request (&self, product: RasterProduct, bbox: &BoundingBox, date: NaiveDate, size: RasterSize)->Value {
        let evalscript = match product {
            RasterProduct::Ndvi => ndvi_evalscript( self.config.mask_clouds),
            RasterProduct::TrueColor => TRUE_COLOR_EVALSCRIPT.to_string(),
        };

        json!({
            "input": {
                "bounds": {
                    "bbox": bbox.to_wsen_array(),
                    "properties": { "crs": CRS84 }
                },
                "data": [{
                    "type": self.config.collection,
                    "dataFilter": {
                        "timeRange": {
                            "from": format!("{date}T00:00:00Z"),
                            "to": format!("{date}T23:59:59Z")
                        }
                    }
                }]
            },
            "output": {
                "width": size.width,
                "height": size.height,
                "responses": [{ "identifier": "default", "format": { "type": "image/tiff" } }]
            },
            "evalscript": evalscript
        })
    }

    pub async fn search_page (&self, bbox: &BoundingBox, window: &WeekWindow, next: Option<u64>)->Result<CatalogPage> {
        let token = self.access_token().await?;
        let url = format!("{}/api/v1/catalog/1.0.0/search", self.config.base_url);

        let response = self.client.post( url)
            .bearer_auth( token)
            .json( &self.catalog_request( bbox, window, next))
            .send().await?;
        let response = check_response( response).await?;
        parse_catalog_page( &response.bytes().await?)
    }

    async fn process (&self, product: RasterProduct, bbox: &BoundingBox, date: NaiveDate, size: RasterSize)->Result<Bytes> {
        let token = self.access_token().await?;
        let url = format!("{}/api/v1/process", self.config.base_url);

        let response = self.client.post( url)
            .bearer_auth( token)
            .header( ACCEPT, "image/tiff")
            .json( &self.process_request( product, bbox, date, size))
            .send().await?;
        let response = check_response( response).await?;
        Ok( response.bytes().await? )
    }
}

#[async_trait]
impl CatalogClient for SentinelHubClient {
    async fn search (&self, bbox: &BoundingBox, window: &WeekWindow)->Result<Vec<Candidate>> {
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut next: Option<u64> = None;

        loop {
            let page = self.search_page( bbox, window, next).await?;
            candidates.extend( page.candidates);

            match page.next {
                Some(n) if candidates.len() < self.config.max_results => next = Some(n),
                _ => break
            }
        }

        candidates.truncate( self.config.max_results);
        info!("catalog returned {} images for week {}", candidates.len(), window.number);
        Ok(candidates)
    }
}

#[async_trait]
impl PixelSource for SentinelHubClient {
    async fn fetch_raster (&self, product: RasterProduct, bbox: &BoundingBox, date: NaiveDate, size: RasterSize)->Result<Raster> {
        debug!("requesting {product} {}x{} raster for {date}", size.width, size.height);
        let bytes = self.process( product, bbox, date, size).await?;
        decode_tiff( &bytes)
    }
}
