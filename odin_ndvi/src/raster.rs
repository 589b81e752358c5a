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

//! in-memory rasters as returned by the imagery provider

use std::io::Cursor;
use tiff::decoder::{Decoder, DecodingResult};

use crate::errors::*;

/// a row-major, band-interleaved f32 raster. Missing (no-data or masked) pixels are NaN
#[derive(Debug,Clone,PartialEq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub bands: u32,
    pub data: Vec<f32>
}

impl Raster {
    pub fn new (width: u32, height: u32, bands: u32, data: Vec<f32>)->Result<Self> {
        let expected = width as usize * height as usize * bands as usize;
        if bands == 0 || data.len() != expected {
            Err( invalid_raster( format!("{}x{}x{} raster with {} values", width, height, bands, data.len())))
        } else {
            Ok( Raster { width, height, bands, data } )
        }
    }

    /// single band raster with all pixels set to `v`
    pub fn filled (width: u32, height: u32, v: f32)->Self {
        Raster { width, height, bands: 1, data: vec![v; width as usize * height as usize] }
    }

    pub fn pixel_count (&self)->usize { self.width as usize * self.height as usize }

    pub fn is_empty (&self)->bool { self.data.is_empty() }

    /// band values of pixel (x,y)
    pub fn pixel (&self, x: u32, y: u32)->&[f32] {
        let b = self.bands as usize;
        let i = (y as usize * self.width as usize + x as usize) * b;
        &self.data[i..i+b]
    }

    /// single band value of pixel (x,y)
    pub fn value (&self, x: u32, y: u32)->f32 {
        self.pixel(x,y)[0]
    }

    pub fn valid_values (&self)->impl Iterator<Item=f32> + '_ {
        self.data.iter().copied().filter( |v| !v.is_nan())
    }
}

/// decode a (single image) TIFF as returned by the provider into a f32 raster.
/// Integer samples are converted without scaling
pub fn decode_tiff (bytes: &[u8])->Result<Raster> {
    let mut decoder = Decoder::new( Cursor::new(bytes))?;
    let (width,height) = decoder.dimensions()?;
    let n_pixels = width as usize * height as usize;

    let data: Vec<f32> = match decoder.read_image()? {
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map( |x| x as f32).collect(),
        DecodingResult::U8(v) => v.into_iter().map( f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map( f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map( f32::from).collect(),
        _ => return Err( invalid_raster("unsupported TIFF sample format"))
    };

    if n_pixels == 0 || data.len() % n_pixels != 0 {
        return Err( invalid_raster( format!("{} samples for {}x{} image", data.len(), width, height)))
    }
    let bands = (data.len() / n_pixels) as u32;

    Raster::new( width, height, bands, data)
}

/// linear interpolated percentile (0..100) of non-NaN values, the same interpolation numpy uses by default
pub fn percentile (values: &[f32], p: f64)->Option<f32> {
    let mut sorted: Vec<f32> = values.iter().copied().filter( |v| !v.is_nan()).collect();
    if sorted.is_empty() { return None }
    sorted.sort_by( |a,b| a.total_cmp(b));
    Some( sorted_percentile( &sorted, p))
}

fn sorted_percentile (sorted: &[f32], p: f64)->f32 {
    let p = p.clamp( 0.0, 100.0);
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = (rank - lo as f64) as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// linear contrast stretch of all bands into [0,1] between the `lower` and `upper` percentile.
/// NaN values stay NaN
pub fn percentile_stretch (raster: &Raster, lower: f64, upper: f64)->Raster {
    let mut sorted: Vec<f32> = raster.valid_values().collect();
    sorted.sort_by( |a,b| a.total_cmp(b));

    let data = if sorted.is_empty() {
        raster.data.clone()
    } else {
        let lo = sorted_percentile( &sorted, lower);
        let hi = sorted_percentile( &sorted, upper);
        let range = if hi > lo { hi - lo } else { 1.0 };
        raster.data.iter().map( |v| ((v - lo) / range).clamp( 0.0, 1.0)).collect()
    };

    Raster { width: raster.width, height: raster.height, bands: raster.bands, data }
}
