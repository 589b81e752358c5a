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

//! place name lookup

use std::{io::Read, path::Path};
use calamine::{Data, Reader, open_workbook_auto};
use csv::{ReaderBuilder, Trim};

use crate::{errors::*, config::LocationTableConfig, geo::BoundingBox};

/// file extensions we read as spreadsheets instead of CSV
pub const SPREADSHEET_EXTENSIONS: [&str;5] = ["xls", "xlsx", "xlsm", "xlsb", "ods"];

/// a resolved place. The name is spelled as in the location table
#[derive(Debug,Clone,PartialEq)]
pub struct Place {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Place {
    pub fn bbox (&self, buffer: f64)->Result<BoundingBox> {
        BoundingBox::from_center( self.lon, self.lat, buffer)
    }
}

pub struct LocationTable {
    places: Vec<Place>
}

pub fn is_spreadsheet (path: &Path)->bool {
    path.extension()
        .and_then( |e| e.to_str())
        .is_some_and( |e| SPREADSHEET_EXTENSIONS.iter().any( |x| x.eq_ignore_ascii_case(e)))
}

/// the column positions of name, latitude and longitude
struct Columns {
    name: usize,
    lat: usize,
    lon: usize
}

impl Columns {
    fn find<S: AsRef<str>> (headers: &[S], config: &LocationTableConfig)->Result<Self> {
        let index = |name: &str| headers.iter().position( |h| h.as_ref().trim() == name)
            .ok_or_else( || op_failed( format!("location table has no column '{name}'")));

        Ok( Columns { name: index( &config.name_column)?, lat: index( &config.lat_column)?, lon: index( &config.lon_column)? } )
    }
}

fn parse_coord (s: &str)->Option<f64> {
    // also accept decimal commas
    s.trim().replace(',', ".").parse::<f64>().ok()
}

fn cell_coord (cell: &Data)->Option<f64> {
    match cell {
        Data::Float(v) => Some(*v),
        Data::Int(v) => Some(*v as f64),
        Data::String(s) => parse_coord(s),
        _ => None
    }
}

/// rows without name or with missing/unparsable coordinates are skipped
fn push_place (places: &mut Vec<Place>, name: Option<String>, lat: Option<f64>, lon: Option<f64>) {
    if let (Some(name), Some(lat), Some(lon)) = (name, lat, lon) {
        if !name.is_empty() {
            places.push( Place { name, lat, lon });
        }
    }
}

impl LocationTable {
    /// read a CSV table
    pub fn read (reader: impl Read, config: &LocationTableConfig)->Result<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter( config.delimiter as u8)
            .trim( Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map( String::from).collect();
        let cols = Columns::find( &headers, config)?;

        let mut places = Vec::new();
        for rec in csv_reader.records() {
            let rec = rec?;
            push_place( &mut places,
                rec.get( cols.name).map( String::from),
                rec.get( cols.lat).and_then( parse_coord),
                rec.get( cols.lon).and_then( parse_coord));
        }

        Ok( LocationTable { places } )
    }

    /// read the first worksheet of a xls/xlsx/ods file. The first row holds the column names
    pub fn read_spreadsheet (path: impl AsRef<Path>, config: &LocationTableConfig)->Result<Self> {
        let path = path.as_ref();
        let mut workbook = open_workbook_auto( path)?;
        let range = workbook.worksheet_range_at(0)
            .ok_or_else( || op_failed( format!("no worksheet in {}", path.display())))??;

        let mut rows = range.rows();
        let headers: Vec<String> = rows.next()
            .map( |row| row.iter().map( |c| c.to_string()).collect())
            .unwrap_or_default();
        let cols = Columns::find( &headers, config)?;

        let mut places = Vec::new();
        for row in rows {
            push_place( &mut places,
                row.get( cols.name).map( |c| c.to_string().trim().to_string()),
                row.get( cols.lat).and_then( cell_coord),
                row.get( cols.lon).and_then( cell_coord));
        }

        Ok( LocationTable { places } )
    }

    pub fn open (config: &LocationTableConfig)->Result<Self> {
        Self::open_path( &config.path, config)
    }

    /// spreadsheet or CSV, depending on the file extension
    pub fn open_path (path: impl AsRef<Path>, config: &LocationTableConfig)->Result<Self> {
        let path = path.as_ref();
        if is_spreadsheet( path) {
            Self::read_spreadsheet( path, config)
        } else {
            Self::read( std::fs::File::open( path)?, config)
        }
    }

    pub fn len (&self)->usize { self.places.len() }

    pub fn is_empty (&self)->bool { self.places.is_empty() }

    /// case-insensitive exact match of the trimmed name. The first matching row wins
    pub fn resolve (&self, name: &str)->Result<&Place> {
        let key = name.trim().to_lowercase();
        if key.is_empty() {
            return Err( OdinNdviError::PlaceNotFound( name.to_string()))
        }

        self.places.iter()
            .find( |p| p.name.to_lowercase() == key)
            .ok_or_else( || OdinNdviError::PlaceNotFound( name.trim().to_string()))
    }
}
