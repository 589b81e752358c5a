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

use thiserror::Error;
use reqwest;

pub type Result<T> = std::result::Result<T, OdinNdviError>;

#[derive(Error,Debug)]
pub enum OdinNdviError {
    #[error("IO error {0}")]
    IOError( #[from] std::io::Error),

    #[error("http error {0}")]
    HttpError( #[from] reqwest::Error),

    #[error("JSON error {0}")]
    JsonError( #[from] serde_json::Error),

    #[error("config error {0}")]
    ConfigError( #[from] ron::error::SpannedError),

    #[error("CSV error {0}")]
    CsvError( #[from] csv::Error),

    #[error("spreadsheet error {0}")]
    SpreadsheetError( #[from] calamine::Error),

    #[error("TIFF error {0}")]
    TiffError( #[from] tiff::TiffError),

    #[error("image error {0}")]
    ImageError( #[from] image::ImageError),

    #[error("place not found: {0}")]
    PlaceNotFound(String),

    /// the provider reported it is temporarily unavailable (HTTP 503). This is the only error we retry on
    #[error("service unavailable {0}")]
    ServiceUnavailable(String),

    #[error("provider error {status}: {msg}")]
    ProviderError { status: u16, msg: String },

    #[error("invalid raster {0}")]
    InvalidRaster(String),

    #[error("invalid argument {0}")]
    InvalidArgument(String),

    /// a generic error
    #[error("operation failed {0}")]
    OpFailed(String)
}

impl OdinNdviError {
    /// is this a transient provider condition that can resolve itself after a short wait
    pub fn is_transient (&self)->bool {
        matches!( self, OdinNdviError::ServiceUnavailable(_))
    }
}

pub fn op_failed (msg: impl ToString)->OdinNdviError {
    OdinNdviError::OpFailed(msg.to_string())
}

pub fn invalid_raster (msg: impl ToString)->OdinNdviError {
    OdinNdviError::InvalidRaster(msg.to_string())
}

pub fn invalid_argument (msg: impl ToString)->OdinNdviError {
    OdinNdviError::InvalidArgument(msg.to_string())
}

pub fn provider_error (status: u16, msg: impl ToString)->OdinNdviError {
    OdinNdviError::ProviderError { status, msg: msg.to_string() }
}
