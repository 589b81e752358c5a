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

//! geographic primitives for the area of interest

use std::fmt;
use serde::{Serialize,Deserialize};

use crate::errors::*;

/// meters per degree latitude (WGS84 mean)
pub const METERS_PER_DEG_LAT: f64 = 110_574.0;

/// meters per degree longitude at the equator
pub const METERS_PER_DEG_LON: f64 = 111_320.0;

/// a WGS84 lon/lat bounding box. Always satisfies west < east and south < north
#[derive(Debug,Copy,Clone,Serialize,Deserialize,PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64
}

impl BoundingBox {
    /// square box of +/- `buffer` degrees around the given center
    pub fn from_center (lon: f64, lat: f64, buffer: f64)->Result<Self> {
        if !(buffer > 0.0) || !buffer.is_finite() {
            return Err( invalid_argument( format!("bbox buffer has to be a positive number of degrees: {buffer}")))
        }
        if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
            return Err( invalid_argument( format!("not a valid WGS84 position: {lon},{lat}")))
        }

        Ok( BoundingBox { west: lon - buffer, south: lat - buffer, east: lon + buffer, north: lat + buffer } )
    }

    pub fn from_wsen (west: f64, south: f64, east: f64, north: f64)->Result<Self> {
        if west < east && south < north {
            Ok( BoundingBox { west, south, east, north } )
        } else {
            Err( invalid_argument( format!("degenerated bbox [{west},{south},{east},{north}]")))
        }
    }

    pub fn to_wsen_array (&self)->[f64;4] {
        [self.west, self.south, self.east, self.north]
    }

    pub fn center (&self)->(f64,f64) {
        ( (self.west + self.east) / 2.0, (self.south + self.north) / 2.0 )
    }

    /// approximate (width,height) in meters, using an equirectangular projection at the center latitude
    pub fn extent_meters (&self)->(f64,f64) {
        let (_,lat) = self.center();
        let width = (self.east - self.west) * METERS_PER_DEG_LON * lat.to_radians().cos();
        let height = (self.north - self.south) * METERS_PER_DEG_LAT;
        (width, height)
    }

    /// raster dimensions for a given ground resolution in meters per pixel
    pub fn raster_size (&self, resolution: f64)->Result<RasterSize> {
        if !(resolution > 0.0) {
            return Err( invalid_argument( format!("invalid resolution {resolution}")))
        }
        let (w,h) = self.extent_meters();
        let width = (w / resolution).round().max(1.0) as u32;
        let height = (h / resolution).round().max(1.0) as u32;
        Ok( RasterSize { width, height } )
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.4},{:.4},{:.4},{:.4}]", self.west, self.south, self.east, self.north)
    }
}

/// output raster dimensions in pixels
#[derive(Debug,Copy,Clone,Serialize,Deserialize,PartialEq,Eq)]
pub struct RasterSize {
    pub width: u32,
    pub height: u32
}

impl RasterSize {
    pub fn new (width: u32, height: u32)->Self { RasterSize { width, height } }

    pub fn len (&self)->usize { self.width as usize * self.height as usize }
}
