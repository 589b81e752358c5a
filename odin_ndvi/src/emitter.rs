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

//! rendering of per-week comparison images (true color | NDVI)

use std::path::{Path,PathBuf};
use chrono::NaiveDate;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_text_mut};
use ab_glyph::{FontVec, PxScale};
use tracing::{debug,info,warn};

use crate::{errors::*, raster::{Raster, percentile_stretch}};

/// what we need to render the artifact of an accepted week
pub struct WeekArtifact<'a> {
    pub week: u32,
    pub date: NaiveDate,
    pub mean_ndvi: f64,
    pub true_color: &'a Raster,
    pub ndvi: &'a Raster,
}

/// the sink for accepted week images. Called exactly once per accepted week
pub trait ArtifactEmitter: Send + Sync {
    /// returns the path of the stored artifact
    fn emit (&self, artifact: &WeekArtifact<'_>)->Result<PathBuf>;
}

impl<T> ArtifactEmitter for &T where T: ArtifactEmitter + ?Sized {
    fn emit (&self, artifact: &WeekArtifact<'_>)->Result<PathBuf> { (*self).emit(artifact) }
}

/// replace characters we don't want in file or directory names
pub fn place_file_stem (place: &str)->String {
    place.trim().chars().map( |c| if c.is_whitespace() || c == '/' || c == '\\' { '_' } else { c }).collect()
}

/// the run-scoped output directory for a place
pub fn run_dir (output_root: impl AsRef<Path>, place: &str)->PathBuf {
    output_root.as_ref().join( format!("ndvi_{}", place_file_stem(place)))
}

pub fn artifact_filename (place: &str, week: u32, date: &NaiveDate)->String {
    format!("{}_week{}_{}.png", place_file_stem(place), week, date)
}

/* #region color scale ***********************************************************************************/

/// sequential yellow-green scale (matplotlib 'YlGn' anchors)
const YLGN: [[u8;3];9] = [
    [0xff,0xff,0xe5], [0xf7,0xfc,0xb9], [0xd9,0xf0,0xa3], [0xad,0xdd,0x8e], [0x78,0xc6,0x79],
    [0x41,0xab,0x5d], [0x23,0x84,0x43], [0x00,0x68,0x37], [0x00,0x45,0x29]
];

const NO_DATA_COLOR: Rgb<u8> = Rgb([255,255,255]);
const MARKER_COLOR: Rgb<u8> = Rgb([255,0,0]);
const TEXT_COLOR: Rgb<u8> = Rgb([0,0,0]);

/// map `v` on a fixed [0,1] scale (values outside are clamped). NaN maps to the no-data color
pub fn ndvi_color (v: f32)->Rgb<u8> {
    if v.is_nan() { return NO_DATA_COLOR }

    let x = v.clamp( 0.0, 1.0) * (YLGN.len() - 1) as f32;
    let i = (x.floor() as usize).min( YLGN.len() - 2);
    let t = x - i as f32;

    let c0 = YLGN[i];
    let c1 = YLGN[i+1];
    let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    Rgb([ lerp(c0[0],c1[0]), lerp(c0[1],c1[1]), lerp(c0[2],c1[2]) ])
}

/* #endregion color scale */

/* #region panels ****************************************************************************************/

/// contrast stretched true color image (2nd..98th percentile)
pub fn true_color_image (raster: &Raster)->RgbImage {
    let stretched = percentile_stretch( raster, 2.0, 98.0);
    let to_u8 = |v: f32| if v.is_nan() { 0 } else { (v * 255.0).round() as u8 };

    RgbImage::from_fn( raster.width, raster.height, |x,y| {
        let p = stretched.pixel(x,y);
        if p.len() >= 3 {
            Rgb([ to_u8(p[0]), to_u8(p[1]), to_u8(p[2]) ])
        } else {
            let g = to_u8(p[0]);
            Rgb([g,g,g])
        }
    })
}

pub fn ndvi_image (raster: &Raster)->RgbImage {
    RgbImage::from_fn( raster.width, raster.height, |x,y| ndvi_color( raster.value(x,y)))
}

/// vertical color bar with 1.0 at the top
fn color_bar (width: u32, height: u32)->RgbImage {
    let h = height.max(2);
    RgbImage::from_fn( width, h, |_,y| ndvi_color( 1.0 - y as f32 / (h - 1) as f32))
}

/* #endregion panels */

/* #region font resources ********************************************************************************/

pub const DEFAULT_FONT_NAME: &str = "DejaVuSansMono.ttf";

/// where we look for `DEFAULT_FONT_NAME`: `$ODIN_ROOT/data/odin_ndvi`, the crate resources and the
/// usual system font directories
pub fn default_font_dirs ()->Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(root) = std::env::var_os("ODIN_ROOT") {
        dirs.push( PathBuf::from(root).join("data").join("odin_ndvi"));
    }
    dirs.push( PathBuf::from( concat!( env!("CARGO_MANIFEST_DIR"), "/resources/fonts")));
    for d in ["/usr/share/fonts/truetype/dejavu", "/usr/share/fonts/dejavu", "/usr/share/fonts/TTF",
              "/usr/local/share/fonts", "/Library/Fonts", "C:\\Windows\\Fonts"] {
        dirs.push( PathBuf::from(d));
    }
    dirs
}

pub fn find_font (dirs: &[PathBuf], font_name: &str)->Option<PathBuf> {
    dirs.iter().map( |d| d.join( font_name)).find( |p| p.is_file())
}

pub fn load_font (path: impl AsRef<Path>)->Result<FontVec> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err( op_failed( format!("font not found: {}", path.display())))
    }
    let data = std::fs::read( path)?;
    FontVec::try_from_vec( data).map_err( |e| op_failed( format!("invalid font {}: {e}", path.display())))
}

/* #endregion font resources */

const MARGIN: u32 = 10;
const BAR_WIDTH: u32 = 20;
const TITLE_HEIGHT: u32 = 28;
const LABEL_WIDTH: u32 = 36;

/// writes side-by-side PNG images into the run directory
pub struct PngComparisonEmitter {
    dir: PathBuf,
    place: String,
    /// ground resolution in meters per pixel, used to size the marker circle
    resolution: f64,
    marker_radius: f64,
    font: Option<FontVec>,
}

impl PngComparisonEmitter {
    pub fn new (dir: impl AsRef<Path>, place: impl ToString, resolution: f64, marker_radius: f64)->Self {
        PngComparisonEmitter {
            dir: dir.as_ref().to_path_buf(),
            place: place.to_string(),
            resolution,
            marker_radius,
            font: None
        }
    }

    /// use the TTF/OTF font at `path` for titles and color bar labels
    pub fn with_font (mut self, path: impl AsRef<Path>)->Result<Self> {
        self.font = Some( load_font( path)?);
        Ok(self)
    }

    /// use the first `DEFAULT_FONT_NAME` found in `default_font_dirs()`. Without it the artifacts
    /// have no titles and labels
    pub fn with_default_font (mut self)->Self {
        let Some(path) = find_font( &default_font_dirs(), DEFAULT_FONT_NAME) else {
            warn!("{DEFAULT_FONT_NAME} not found, artifacts will not be labeled");
            return self
        };

        match load_font( &path) {
            Ok(font) => {
                debug!("using font {}", path.display());
                self.font = Some(font);
            }
            Err(e) => warn!("{e}, artifacts will not be labeled")
        }
        self
    }

    pub fn has_font (&self)->bool { self.font.is_some() }

    pub fn dir (&self)->&Path { self.dir.as_path() }

    pub fn render (&self, artifact: &WeekArtifact<'_>)->RgbImage {
        let (w,h) = (artifact.ndvi.width, artifact.ndvi.height);
        let top = MARGIN + if self.font.is_some() { TITLE_HEIGHT } else { 0 };
        let label_w = if self.font.is_some() { LABEL_WIDTH } else { 0 };

        let canvas_w = MARGIN + w + 2*MARGIN + w + MARGIN + BAR_WIDTH + label_w + MARGIN;
        let canvas_h = top + h + MARGIN;
        let mut canvas = RgbImage::from_pixel( canvas_w, canvas_h, Rgb([255,255,255]));

        //--- left: true color with area marker
        let mut tc = true_color_image( artifact.true_color);
        let radius = (self.marker_radius / self.resolution).round() as i32;
        let center = ((tc.width() / 2) as i32, (tc.height() / 2) as i32);
        for r in radius-1 ..= radius { // 2px line
            if r > 0 { draw_hollow_circle_mut( &mut tc, center, r, MARKER_COLOR) }
        }
        image::imageops::overlay( &mut canvas, &tc, MARGIN as i64, top as i64);

        //--- right: NDVI heat map and color bar
        let ndvi_x = MARGIN + w + 2*MARGIN;
        image::imageops::overlay( &mut canvas, &ndvi_image( artifact.ndvi), ndvi_x as i64, top as i64);

        let bar_x = ndvi_x + w + MARGIN;
        image::imageops::overlay( &mut canvas, &color_bar( BAR_WIDTH, h), bar_x as i64, top as i64);

        if let Some(font) = &self.font {
            let scale = PxScale::from(18.0);
            let title = format!("{} - {}", self.place, artifact.date);
            draw_text_mut( &mut canvas, TEXT_COLOR, MARGIN as i32, MARGIN as i32, scale, font, &title);

            let title = format!("NDVI ({:.3})", artifact.mean_ndvi);
            draw_text_mut( &mut canvas, TEXT_COLOR, ndvi_x as i32, MARGIN as i32, scale, font, &title);

            let label_scale = PxScale::from(13.0);
            let label_x = (bar_x + BAR_WIDTH + 4) as i32;
            draw_text_mut( &mut canvas, TEXT_COLOR, label_x, top as i32, label_scale, font, "1.0");
            draw_text_mut( &mut canvas, TEXT_COLOR, label_x, (top + h) as i32 - 13, label_scale, font, "0.0");
        }

        canvas
    }
}

impl ArtifactEmitter for PngComparisonEmitter {
    fn emit (&self, artifact: &WeekArtifact<'_>)->Result<PathBuf> {
        if artifact.ndvi.width != artifact.true_color.width || artifact.ndvi.height != artifact.true_color.height {
            return Err( invalid_raster("NDVI and true color rasters differ in size"))
        }

        let img = self.render( artifact);
        let path = self.dir.join( artifact_filename( &self.place, artifact.week, &artifact.date));
        debug!("rendering {}x{} artifact for week {}", img.width(), img.height(), artifact.week);
        img.save( &path)?;

        info!("saved {}", path.display());
        Ok(path)
    }
}
