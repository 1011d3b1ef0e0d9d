//! The annotation store: per-image rectangle collections, keyed by image id.
//!
//! Reads are forgiving — an image id that was never written behaves as an
//! empty collection. Writes are explicit. The store is a plain data
//! structure; redraws are the caller's concern.

use std::collections::BTreeMap;

use crate::model::Rectangle;

#[derive(Debug, Default)]
pub struct AnnotationStore {
    by_image: BTreeMap<String, Vec<Rectangle>>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rectangles for an image, in insertion order. Empty if unset.
    pub fn rectangles(&self, image_id: &str) -> &[Rectangle] {
        self.by_image.get(image_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total replacement of an image's rectangles; keeps the store's copy
    /// authoritative after create/update/delete.
    pub fn set_rectangles(&mut self, image_id: &str, rects: Vec<Rectangle>) {
        self.by_image.insert(image_id.to_owned(), rects);
    }

    /// Apply a field-level change to exactly one rectangle, identified by
    /// id. No-op if the id is not present.
    pub fn upsert_by_id(
        &mut self,
        image_id: &str,
        rect_id: &str,
        mutate: impl FnOnce(&mut Rectangle),
    ) {
        if let Some(rects) = self.by_image.get_mut(image_id) {
            if let Some(rect) = rects.iter_mut().find(|r| r.id == rect_id) {
                mutate(rect);
            }
        }
    }

    /// Delete by id. No-op if absent.
    pub fn remove(&mut self, image_id: &str, rect_id: &str) {
        if let Some(rects) = self.by_image.get_mut(image_id) {
            rects.retain(|r| r.id != rect_id);
        }
    }

    pub fn find(&self, image_id: &str, rect_id: &str) -> Option<&Rectangle> {
        self.rectangles(image_id).iter().find(|r| r.id == rect_id)
    }

    /// Total rectangles across all images.
    pub fn count_all(&self) -> usize {
        self.by_image.values().map(Vec::len).sum()
    }

    /// All entries in deterministic key order, for export.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Rectangle])> {
        self.by_image.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn clear(&mut self) {
        self.by_image.clear();
    }
}
