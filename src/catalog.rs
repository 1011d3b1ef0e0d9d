//! Image catalog loading.
//!
//! The catalog is a delimited text file with a header row; `id` and
//! `image_url` are required, any other columns are ignored. A malformed
//! file rejects the whole load — no partial image list is ever installed.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{info, warn};
use thiserror::Error;

use crate::model::ImageRecord;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog: {0}")]
    Csv(#[from] csv::Error),
    #[error("catalog is missing required column \"{0}\"")]
    MissingColumn(&'static str),
    #[error("catalog has no image rows")]
    Empty,
}

pub fn load_catalog(path: &Path) -> Result<Vec<ImageRecord>, CatalogError> {
    let file = File::open(path)?;
    let records = parse_catalog(file)?;
    info!("loaded catalog {} with {} images", path.display(), records.len());
    Ok(records)
}

pub fn parse_catalog<R: Read>(reader: R) -> Result<Vec<ImageRecord>, CatalogError> {
    let mut csv_reader = csv::Reader::from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let id_col = column_index(&headers, "id")?;
    let url_col = column_index(&headers, "image_url")?;

    let mut records = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        let id = row.get(id_col).unwrap_or("").trim();
        let image_url = row.get(url_col).unwrap_or("").trim();
        if id.is_empty() {
            warn!("skipping catalog row with empty id");
            continue;
        }
        records.push(ImageRecord {
            id: id.to_owned(),
            image_url: image_url.to_owned(),
        });
    }

    if records.is_empty() {
        return Err(CatalogError::Empty);
    }
    Ok(records)
}

fn column_index(headers: &csv::StringRecord, name: &'static str) -> Result<usize, CatalogError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or(CatalogError::MissingColumn(name))
}
