//! Serialization: flatten the annotation store to CSV for export, and to a
//! JSON payload for the persistence endpoint.

use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::model::Rectangle;
use crate::store::AnnotationStore;

pub const EXPORT_HEADER: [&str; 7] = [
    "image_id",
    "x",
    "y",
    "width",
    "height",
    "transcription",
    "confidence_level",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv write failed: {0}")]
    Io(#[from] io::Error),
}

/// Flatten the whole store to CSV: one row per rectangle, images in key
/// order, rectangles in insertion order, coordinates rounded to integer
/// pixels. The writer applies standard quoting, including quote-doubling
/// for embedded quotes.
pub fn export_csv(store: &AnnotationStore) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADER)?;

    for (image_id, rects) in store.iter() {
        for rect in rects {
            writer.write_record([
                image_id,
                &round_px(rect.x),
                &round_px(rect.y),
                &round_px(rect.width),
                &round_px(rect.height),
                &rect.transcription,
                rect.confidence.as_str(),
            ])?;
        }
    }

    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| ExportError::Io(io::Error::other(e.to_string())))
}

/// Deterministic download name for the active image.
pub fn export_file_name(image_id: &str) -> String {
    format!("annotations_{image_id}.csv")
}

fn round_px(v: f32) -> String {
    (v.round() as i64).to_string()
}

/// Body of the persistence POST for one image. This shape is the contract
/// with the annotations endpoint: rectangle ids and transcriptions are
/// stripped, only geometry and grading travel.
#[derive(Debug, Serialize)]
pub struct SavePayload<'a> {
    #[serde(rename = "imageId")]
    pub image_id: &'a str,
    pub annotations: Vec<SavedRect>,
}

#[derive(Debug, Serialize)]
pub struct SavedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: &'static str,
}

pub fn persistence_payload<'a>(image_id: &'a str, rects: &[Rectangle]) -> SavePayload<'a> {
    SavePayload {
        image_id,
        annotations: rects
            .iter()
            .map(|r| SavedRect {
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
                confidence: r.confidence.as_str(),
            })
            .collect(),
    }
}
