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

use std::{io::Write, path::Path};
use odin_ndvi::{
    Result, OdinNdviError,
    config::LocationTableConfig,
    geo::BoundingBox,
    location::{LocationTable, is_spreadsheet},
};

const TABLE: &str = "\
Población,Latitud,Longitud
Almansa,38.8690,-1.0977
 La Roda ,39.2077,-2.1578
Almansa,40.0,-3.0
Nowhere,,
";

#[test]
fn test_resolve () -> Result<()> {
    let table = LocationTable::read( TABLE.as_bytes(), &LocationTableConfig::default())?;
    assert_eq!( table.len(), 3); // row without coordinates is skipped

    let p = table.resolve("  ALMANSA ")?;
    assert_eq!( p.name, "Almansa");
    assert_eq!( (p.lat, p.lon), (38.8690, -1.0977)); // first row wins

    let p = table.resolve("la roda")?;
    assert_eq!( p.name, "La Roda");

    assert!( matches!( table.resolve("Madrid"), Err(OdinNdviError::PlaceNotFound(_))));
    assert!( matches!( table.resolve("Nowhere"), Err(OdinNdviError::PlaceNotFound(_))));
    assert!( matches!( table.resolve("   "), Err(OdinNdviError::PlaceNotFound(_))));
    Ok(())
}

#[test]
fn test_custom_columns () -> Result<()> {
    let data = "name;lat;lon\nVillarrobledo;39,2681;-2,6011\n";
    let config = LocationTableConfig {
        delimiter: ';',
        name_column: "name".to_string(),
        lat_column: "lat".to_string(),
        lon_column: "lon".to_string(),
        ..LocationTableConfig::default()
    };

    let table = LocationTable::read( data.as_bytes(), &config)?;
    let p = table.resolve("villarrobledo")?;
    assert_eq!( (p.lat, p.lon), (39.2681, -2.6011));
    Ok(())
}

#[test]
fn test_missing_column () {
    let data = "Nombre,Latitud,Longitud\nAlmansa,38.8690,-1.0977\n";
    assert!( LocationTable::read( data.as_bytes(), &LocationTableConfig::default()).is_err());
}

#[test]
fn test_resource_table () -> Result<()> {
    let table = LocationTable::open_path( "resources/places.csv", &LocationTableConfig::default())?;
    let p = table.resolve("hellín")?;
    println!("{p:?}");

    let bbox = p.bbox( 0.045)?;
    assert!( (bbox.west - (p.lon - 0.045)).abs() < 1e-12);
    assert!( (bbox.north - (p.lat + 0.045)).abs() < 1e-12);
    Ok(())
}

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="municipios" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

fn str_cell (r: &str, s: &str)->String { format!(r#"<c r="{r}" t="inlineStr"><is><t>{s}</t></is></c>"#) }
fn num_cell (r: &str, v: f64)->String { format!(r#"<c r="{r}"><v>{v}</v></c>"#) }

/// a minimal single sheet xlsx: header row, two numeric rows, one with text coordinates and one without coordinates
fn write_xlsx (path: &Path) {
    let rows = [
        [str_cell("A1","Población"), str_cell("B1","Provincia"), str_cell("C1","Latitud"), str_cell("D1","Longitud")].concat(),
        [str_cell("A2","Almansa"), str_cell("B2","Albacete"), num_cell("C2",38.869), num_cell("D2",-1.0977)].concat(),
        [str_cell("A3","Hellín"), str_cell("B3","Albacete"), num_cell("C3",38.5106), num_cell("D3",-1.7012)].concat(),
        [str_cell("A4","La Roda"), str_cell("B4","Albacete"), str_cell("C4","39,2077"), str_cell("D4","-2,1578")].concat(),
        [str_cell("A5","Sin Coordenadas"), str_cell("B5","Albacete")].concat(),
    ];
    let sheet_data: String = rows.iter().enumerate()
        .map( |(i,cells)| format!(r#"<row r="{}">{cells}</row>"#, i+1))
        .collect();
    let sheet = format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_data}</sheetData></worksheet>"#);

    let file = std::fs::File::create( path).unwrap();
    let mut zw = zip::ZipWriter::new( file);
    let opts = zip::write::SimpleFileOptions::default().compression_method( zip::CompressionMethod::Stored);
    for (name, content) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("xl/workbook.xml", WORKBOOK),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
        ("xl/worksheets/sheet1.xml", sheet.as_str()),
    ] {
        zw.start_file( name, opts).unwrap();
        zw.write_all( content.as_bytes()).unwrap();
    }
    zw.finish().unwrap();
}

#[test]
fn test_spreadsheet_table () -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("municipios_coord.xlsx");
    write_xlsx( &path);
    assert!( is_spreadsheet( &path));

    // same entry point as for CSV files, dispatched on the extension
    let table = LocationTable::open_path( &path, &LocationTableConfig::default())?;
    assert_eq!( table.len(), 3);

    let p = table.resolve("hellín")?;
    println!("{p:?}");
    assert_eq!( p.name, "Hellín");
    assert_eq!( (p.lat, p.lon), (38.5106, -1.7012));

    let p = table.resolve("LA RODA")?;
    assert_eq!( (p.lat, p.lon), (39.2077, -2.1578));

    assert!( matches!( table.resolve("Sin Coordenadas"), Err(OdinNdviError::PlaceNotFound(_))));
    Ok(())
}

#[test]
fn test_spreadsheet_errors () -> Result<()> {
    assert!( is_spreadsheet( Path::new("municipios_coord.XLS")));
    assert!( !is_spreadsheet( Path::new("resources/places.csv")));

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.xls");
    std::fs::write( &path, "Población,Latitud,Longitud\n")?;
    assert!( LocationTable::open_path( &path, &LocationTableConfig::default()).is_err());

    let path = dir.path().join("municipios_coord.xlsx");
    write_xlsx( &path);
    let config = LocationTableConfig { name_column: "Municipio".to_string(), ..LocationTableConfig::default() };
    assert!( LocationTable::open_path( &path, &config).is_err());
    Ok(())
}

#[test]
fn test_bbox () -> Result<()> {
    let bbox = BoundingBox::from_center( 0.0, 0.0, 0.045)?;
    assert_eq!( bbox.to_wsen_array(), [-0.045, -0.045, 0.045, 0.045]);
    assert_eq!( bbox.center(), (0.0, 0.0));

    // 0.09 deg at the equator is ~10km in both directions
    let size = bbox.raster_size( 10.0)?;
    assert_eq!( (size.width, size.height), (1002, 995));

    // narrower at higher latitudes
    let size = BoundingBox::from_center( -1.0977, 60.0, 0.045)?.raster_size( 10.0)?;
    assert_eq!( size.width, 501);

    assert!( BoundingBox::from_center( 0.0, 0.0, 0.0).is_err());
    assert!( BoundingBox::from_center( 0.0, 95.0, 0.045).is_err());
    assert!( BoundingBox::from_wsen( 1.0, 0.0, 0.0, 1.0).is_err());
    assert!( bbox.raster_size( 0.0).is_err());
    Ok(())
}
