//! Data model: catalog records, rectangles and their confidence grading.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rectangles at or below this size in either axis are discarded rather
/// than stored, and resize moves that would shrink past it are ignored.
pub const MIN_RECT_SIZE: f32 = 5.0;

/// Drawn side of a selection handle, in image pixels.
pub const HANDLE_SIZE: f32 = 8.0;

/// Side of the square hit region centered on each corner.
pub const HANDLE_HIT_SIZE: f32 = 10.0;

/// Rectangle stroke width, in image pixels.
pub const STROKE_WIDTH: f32 = 2.0;

/// One row of the image catalog. The ordered catalog defines navigation
/// order and is immutable for the session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    pub image_url: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Confidence::High => "High Confidence",
            Confidence::Medium => "Medium Confidence",
            Confidence::Low => "Low Confidence",
        }
    }

    /// Stroke color: green / amber / red.
    pub fn color(self) -> egui::Color32 {
        match self {
            Confidence::High => egui::Color32::from_rgb(0x22, 0xc5, 0x5e),
            Confidence::Medium => egui::Color32::from_rgb(0xea, 0xb3, 0x08),
            Confidence::Low => egui::Color32::from_rgb(0xef, 0x44, 0x44),
        }
    }
}

/// An annotated region in image pixel space. `x,y` is always the top-left
/// corner; `width` and `height` are always positive while stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: Confidence,
    #[serde(default)]
    pub transcription: String,
    /// Reserved; no rotation interaction exists.
    #[serde(default)]
    pub rotation: f32,
}

impl Rectangle {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            x,
            y,
            width,
            height,
            confidence: Confidence::High,
            transcription: String::new(),
            rotation: 0.0,
        }
    }
}
