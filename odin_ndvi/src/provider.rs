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

//! the seams to the remote imagery provider: catalog search and pixel data retrieval

use std::{fmt, sync::Arc};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Serialize,Deserialize};

use crate::{errors::*, geo::{BoundingBox, RasterSize}, raster::Raster, weeks::WeekWindow};

/// a catalog entry for a given week. Only lives during the evaluation of its window
#[derive(Debug,Clone,PartialEq,Eq,Serialize,Deserialize)]
pub struct Candidate {
    pub id: String,
    /// acquisition day (UTC)
    pub date: NaiveDate,
}

impl Candidate {
    pub fn new (id: impl ToString, date: NaiveDate)->Self {
        Candidate { id: id.to_string(), date }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.date, self.id)
    }
}

/// the pixel data products we request for a candidate date
#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash)]
pub enum RasterProduct {
    /// single band NDVI, NaN for invalid pixels
    Ndvi,
    /// three band red/green/blue reflectance
    TrueColor,
}

impl fmt::Display for RasterProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterProduct::Ndvi => write!(f, "NDVI"),
            RasterProduct::TrueColor => write!(f, "true color"),
        }
    }
}

/// catalog search. Implementations return candidates ordered by provider preference (best first) and
/// report temporary unavailability as `OdinNdviError::ServiceUnavailable`
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn search (&self, bbox: &BoundingBox, window: &WeekWindow)->Result<Vec<Candidate>>;
}

/// retrieval of rendered rasters for a single acquisition day
#[async_trait]
pub trait PixelSource: Send + Sync {
    async fn fetch_raster (&self, product: RasterProduct, bbox: &BoundingBox, date: NaiveDate, size: RasterSize)->Result<Raster>;
}

#[async_trait]
impl<T> CatalogClient for Arc<T> where T: CatalogClient + ?Sized {
    async fn search (&self, bbox: &BoundingBox, window: &WeekWindow)->Result<Vec<Candidate>> {
        self.as_ref().search( bbox, window).await
    }
}

#[async_trait]
impl<T> PixelSource for Arc<T> where T: PixelSource + ?Sized {
    async fn fetch_raster (&self, product: RasterProduct, bbox: &BoundingBox, date: NaiveDate, size: RasterSize)->Result<Raster> {
        self.as_ref().fetch_raster( product, bbox, date, size).await
    }
}
