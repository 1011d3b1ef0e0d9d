//! The interaction state machine: translates pointer gestures into store
//! mutations.
//!
//! One tagged enum holds the active gesture so that illegal combinations
//! (drawing while resizing) are unrepresentable. The selection is tracked
//! separately: a rectangle can sit selected, handles visible, while the
//! machine is idle. All of this is UI-framework free; the app layer feeds
//! pointer positions in image space and renders from the resulting state.

use log::debug;

use crate::geometry::{self, Corner, Point};
use crate::model::{Confidence, ImageRecord, Rectangle, HANDLE_HIT_SIZE, MIN_RECT_SIZE};
use crate::store::AnnotationStore;

#[derive(Clone, Debug, Default, PartialEq)]
pub enum InteractionState {
    #[default]
    Idle,
    Drawing {
        anchor: Point,
    },
    Resizing {
        target_id: String,
        corner: Corner,
        original: Rectangle,
    },
}

pub struct EditorState {
    pub store: AnnotationStore,
    pub images: Vec<ImageRecord>,
    pub current: usize,
    pub interaction: InteractionState,
    pub selected_id: Option<String>,
    /// Where the confidence/transcription editor popup is anchored, in
    /// image space. `None` means closed.
    pub editor_anchor: Option<Point>,
}

impl EditorState {
    pub fn new() -> Self {
        Self {
            store: AnnotationStore::new(),
            images: Vec::new(),
            current: 0,
            interaction: InteractionState::Idle,
            selected_id: None,
            editor_anchor: None,
        }
    }

    /// Install a freshly loaded catalog. Replaces the image list wholesale
    /// and starts a new annotation session.
    pub fn load_images(&mut self, images: Vec<ImageRecord>) {
        self.images = images;
        self.current = 0;
        self.store.clear();
        self.reset_gesture();
    }

    pub fn current_image(&self) -> Option<&ImageRecord> {
        self.images.get(self.current)
    }

    pub fn current_image_id(&self) -> Option<&str> {
        self.current_image().map(|r| r.id.as_str())
    }

    /// Rectangles of the active image, in insertion order.
    pub fn current_rectangles(&self) -> &[Rectangle] {
        match self.current_image_id() {
            Some(id) => self.store.rectangles(id),
            None => &[],
        }
    }

    pub fn selected_rectangle(&self) -> Option<&Rectangle> {
        let id = self.selected_id.as_deref()?;
        self.store.find(self.current_image_id()?, id)
    }

    // ── Pointer gestures ────────────────────────────────────────────────

    pub fn pointer_down(&mut self, p: Point) {
        let Some(image_id) = self.current_image_id().map(str::to_owned) else {
            return;
        };
        // Any press on the canvas closes the edit popup.
        self.editor_anchor = None;

        // A press on a handle of the already-selected rectangle starts a
        // resize from a snapshot of its bounds.
        if let Some(selected) = self.selected_id.clone() {
            if let Some(rect) = self.store.find(&image_id, &selected) {
                if let Some(corner) = geometry::hit_test_handles(p, rect, HANDLE_HIT_SIZE) {
                    debug!("start resize {selected} at {corner:?}");
                    self.interaction = InteractionState::Resizing {
                        target_id: selected,
                        corner,
                        original: rect.clone(),
                    };
                    return;
                }
            }
        }

        // Body hit: first rectangle in insertion order wins for overlaps.
        if let Some(rect) = self
            .store
            .rectangles(&image_id)
            .iter()
            .find(|r| geometry::point_in_rect(p, r))
        {
            self.selected_id = Some(rect.id.clone());
            self.editor_anchor = Some(p);
            return;
        }

        // Empty canvas: deselect and start drawing.
        self.selected_id = None;
        self.interaction = InteractionState::Drawing { anchor: p };
    }

    pub fn pointer_moved(&mut self, p: Point) {
        match &self.interaction {
            InteractionState::Idle => {}
            // The live preview is derived at render time from the anchor
            // and the current pointer; nothing to commit here.
            InteractionState::Drawing { .. } => {}
            InteractionState::Resizing {
                target_id,
                corner,
                original,
            } => {
                let fixed = corner.opposite().of(original);
                let (x, y, width, height) = geometry::normalize_drag(fixed, p);
                // Below the floor the rectangle keeps its last valid size.
                if width > MIN_RECT_SIZE && height > MIN_RECT_SIZE {
                    let target = target_id.clone();
                    if let Some(image_id) = self.current_image_id().map(str::to_owned) {
                        self.store.upsert_by_id(&image_id, &target, |r| {
                            r.x = x;
                            r.y = y;
                            r.width = width;
                            r.height = height;
                        });
                        self.selected_id = Some(target);
                    }
                }
            }
        }
    }

    pub fn pointer_up(&mut self, p: Point) {
        match std::mem::take(&mut self.interaction) {
            InteractionState::Idle => {}
            InteractionState::Drawing { anchor } => {
                let (x, y, width, height) = geometry::normalize_drag(anchor, p);
                if width > MIN_RECT_SIZE && height > MIN_RECT_SIZE {
                    if let Some(image_id) = self.current_image_id().map(str::to_owned) {
                        let rect = Rectangle::new(x, y, width, height);
                        let id = rect.id.clone();
                        let mut rects = self.store.rectangles(&image_id).to_vec();
                        rects.push(rect);
                        self.store.set_rectangles(&image_id, rects);
                        debug!("committed rectangle {id} on {image_id}");
                        self.selected_id = Some(id);
                        self.editor_anchor = Some(p);
                    }
                }
                // Too small: discarded, nothing stored.
            }
            // Resize updates were applied live; the last valid bounds are
            // already committed.
            InteractionState::Resizing { .. } => {}
        }
    }

    /// Pointer left the canvas. An in-flight draw is abandoned; an
    /// in-flight resize is committed at its last valid bounds.
    pub fn pointer_left(&mut self) {
        self.interaction = InteractionState::Idle;
    }

    // ── Field edits and deletion ────────────────────────────────────────

    pub fn set_confidence(&mut self, rect_id: &str, confidence: Confidence) {
        if let Some(image_id) = self.current_image_id().map(str::to_owned) {
            self.store
                .upsert_by_id(&image_id, rect_id, |r| r.confidence = confidence);
        }
    }

    pub fn set_transcription(&mut self, rect_id: &str, transcription: &str) {
        if let Some(image_id) = self.current_image_id().map(str::to_owned) {
            self.store
                .upsert_by_id(&image_id, rect_id, |r| r.transcription = transcription.to_owned());
        }
    }

    /// Delete a rectangle and close its edit popup.
    pub fn delete_rectangle(&mut self, rect_id: &str) {
        if let Some(image_id) = self.current_image_id().map(str::to_owned) {
            self.store.remove(&image_id, rect_id);
        }
        if self.selected_id.as_deref() == Some(rect_id) {
            self.selected_id = None;
        }
        self.editor_anchor = None;
    }

    pub fn close_editor(&mut self) {
        self.editor_anchor = None;
    }

    // ── Navigation ──────────────────────────────────────────────────────

    pub fn has_next_image(&self) -> bool {
        self.current + 1 < self.images.len()
    }

    pub fn next_image(&mut self) {
        if self.has_next_image() {
            self.current += 1;
            self.reset_gesture();
        }
    }

    pub fn prev_image(&mut self) {
        if self.current > 0 {
            self.current -= 1;
            self.reset_gesture();
        }
    }

    fn reset_gesture(&mut self) {
        self.interaction = InteractionState::Idle;
        self.selected_id = None;
        self.editor_anchor = None;
    }
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor_with_images(ids: &[&str]) -> EditorState {
        let mut editor = EditorState::new();
        editor.load_images(
            ids.iter()
                .map(|id| ImageRecord {
                    id: (*id).to_owned(),
                    image_url: format!("{id}.png"),
                })
                .collect(),
        );
        editor
    }

    fn draw(editor: &mut EditorState, from: (f32, f32), to: (f32, f32)) {
        editor.pointer_down(Point::new(from.0, from.1));
        editor.pointer_moved(Point::new(to.0, to.1));
        editor.pointer_up(Point::new(to.0, to.1));
    }

    #[test]
    fn drawing_commits_a_rectangle() {
        let mut editor = editor_with_images(&["img1"]);
        draw(&mut editor, (10.0, 10.0), (110.0, 60.0));

        let rects = editor.current_rectangles();
        assert_eq!(rects.len(), 1);
        let r = &rects[0];
        assert_eq!((r.x, r.y, r.width, r.height), (10.0, 10.0, 100.0, 50.0));
        assert_eq!(r.confidence, Confidence::High);
        assert_eq!(r.transcription, "");
        assert_eq!(editor.selected_id.as_deref(), Some(r.id.as_str()));
        assert!(editor.editor_anchor.is_some());
    }

    #[test]
    fn drawing_from_any_corner_normalizes() {
        let mut editor = editor_with_images(&["img1"]);
        draw(&mut editor, (110.0, 60.0), (10.0, 10.0));
        let r = &editor.current_rectangles()[0];
        assert_eq!((r.x, r.y, r.width, r.height), (10.0, 10.0, 100.0, 50.0));
    }

    #[test]
    fn tiny_gestures_are_discarded() {
        let mut editor = editor_with_images(&["img1"]);
        draw(&mut editor, (10.0, 10.0), (15.0, 100.0)); // dx == 5
        draw(&mut editor, (10.0, 10.0), (100.0, 15.0)); // dy == 5
        draw(&mut editor, (10.0, 10.0), (13.0, 13.0)); // both under
        assert!(editor.current_rectangles().is_empty());
        assert!(editor.selected_id.is_none());

        draw(&mut editor, (10.0, 10.0), (20.0, 20.0)); // 10x10
        assert_eq!(editor.current_rectangles().len(), 1);
    }

    #[test]
    fn body_press_selects_without_gesture() {
        let mut editor = editor_with_images(&["img1"]);
        draw(&mut editor, (10.0, 10.0), (110.0, 60.0));
        let id = editor.current_rectangles()[0].id.clone();
        editor.selected_id = None;
        editor.close_editor();

        editor.pointer_down(Point::new(50.0, 30.0));
        assert_eq!(editor.selected_id.as_deref(), Some(id.as_str()));
        assert_eq!(editor.interaction, InteractionState::Idle);
        assert!(editor.editor_anchor.is_some());
        editor.pointer_up(Point::new(50.0, 30.0));
        assert_eq!(editor.current_rectangles().len(), 1);
    }

    #[test]
    fn overlapping_selection_prefers_first_inserted() {
        let mut editor = editor_with_images(&["img1"]);
        draw(&mut editor, (10.0, 10.0), (110.0, 110.0));
        draw(&mut editor, (50.0, 50.0), (150.0, 150.0));
        let first = editor.current_rectangles()[0].id.clone();

        // P is inside both bodies and on no handle of the selected rect.
        editor.pointer_down(Point::new(80.0, 80.0));
        assert_eq!(editor.selected_id.as_deref(), Some(first.as_str()));
    }

    #[test]
    fn empty_press_deselects_and_starts_drawing() {
        let mut editor = editor_with_images(&["img1"]);
        draw(&mut editor, (10.0, 10.0), (110.0, 60.0));
        assert!(editor.selected_id.is_some());

        editor.pointer_down(Point::new(500.0, 500.0));
        assert!(editor.selected_id.is_none());
        assert!(editor.editor_anchor.is_none());
        assert!(matches!(
            editor.interaction,
            InteractionState::Drawing { .. }
        ));
    }

    #[test]
    fn handle_press_on_selected_starts_resize() {
        let mut editor = editor_with_images(&["img1"]);
        draw(&mut editor, (10.0, 10.0), (110.0, 60.0));

        // se corner is at (110, 60)
        editor.pointer_down(Point::new(110.0, 60.0));
        assert!(matches!(
            editor.interaction,
            InteractionState::Resizing {
                corner: Corner::SouthEast,
                ..
            }
        ));
    }

    #[test]
    fn resize_from_se_tracks_pointer() {
        let mut editor = editor_with_images(&["img1"]);
        draw(&mut editor, (10.0, 10.0), (110.0, 60.0));

        editor.pointer_down(Point::new(110.0, 60.0));
        editor.pointer_moved(Point::new(210.0, 160.0));
        editor.pointer_up(Point::new(210.0, 160.0));

        let r = &editor.current_rectangles()[0];
        assert_eq!((r.x, r.y, r.width, r.height), (10.0, 10.0, 200.0, 150.0));
        assert_eq!(editor.interaction, InteractionState::Idle);
    }

    #[test]
    fn resize_from_nw_moves_origin_and_size() {
        let mut editor = editor_with_images(&["img1"]);
        draw(&mut editor, (100.0, 100.0), (200.0, 200.0));

        editor.pointer_down(Point::new(100.0, 100.0));
        editor.pointer_moved(Point::new(50.0, 60.0));
        editor.pointer_up(Point::new(50.0, 60.0));

        let r = &editor.current_rectangles()[0];
        assert_eq!((r.x, r.y, r.width, r.height), (50.0, 60.0, 150.0, 140.0));
    }

    #[test]
    fn resize_past_opposite_corner_flips() {
        let mut editor = editor_with_images(&["img1"]);
        draw(&mut editor, (100.0, 100.0), (200.0, 200.0));

        // Drag the se handle up-left past the nw corner.
        editor.pointer_down(Point::new(200.0, 200.0));
        editor.pointer_moved(Point::new(40.0, 50.0));
        editor.pointer_up(Point::new(40.0, 50.0));

        let r = &editor.current_rectangles()[0];
        assert_eq!((r.x, r.y, r.width, r.height), (40.0, 50.0, 60.0, 50.0));
        assert!(r.width > 0.0 && r.height > 0.0);
    }

    #[test]
    fn resize_floor_keeps_last_valid_bounds() {
        let mut editor = editor_with_images(&["img1"]);
        draw(&mut editor, (10.0, 10.0), (110.0, 60.0));

        editor.pointer_down(Point::new(110.0, 60.0));
        editor.pointer_moved(Point::new(60.0, 40.0)); // valid: 50x30
        editor.pointer_moved(Point::new(12.0, 40.0)); // width would be 2
        editor.pointer_up(Point::new(12.0, 40.0));

        let r = &editor.current_rectangles()[0];
        assert_eq!((r.x, r.y, r.width, r.height), (10.0, 10.0, 50.0, 30.0));
    }

    #[test]
    fn pointer_leave_abandons_drawing() {
        let mut editor = editor_with_images(&["img1"]);
        editor.pointer_down(Point::new(10.0, 10.0));
        editor.pointer_moved(Point::new(200.0, 200.0));
        editor.pointer_left();

        assert_eq!(editor.interaction, InteractionState::Idle);
        assert!(editor.current_rectangles().is_empty());
    }

    #[test]
    fn pointer_leave_commits_resize_at_last_valid_bounds() {
        let mut editor = editor_with_images(&["img1"]);
        draw(&mut editor, (10.0, 10.0), (110.0, 60.0));

        editor.pointer_down(Point::new(110.0, 60.0));
        editor.pointer_moved(Point::new(160.0, 90.0));
        editor.pointer_left();

        let r = &editor.current_rectangles()[0];
        assert_eq!((r.width, r.height), (150.0, 80.0));
        assert_eq!(editor.interaction, InteractionState::Idle);
    }

    #[test]
    fn annotations_survive_navigation_round_trip() {
        let mut editor = editor_with_images(&["img1", "img2"]);
        draw(&mut editor, (10.0, 10.0), (110.0, 60.0));
        let id = editor.current_rectangles()[0].id.clone();

        editor.next_image();
        assert_eq!(editor.current_image_id(), Some("img2"));
        assert!(editor.current_rectangles().is_empty());
        assert!(editor.selected_id.is_none());

        draw(&mut editor, (5.0, 5.0), (50.0, 50.0));
        editor.prev_image();
        assert_eq!(editor.current_image_id(), Some("img1"));
        let rects = editor.current_rectangles();
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0].id, id);
        assert_eq!(editor.store.count_all(), 2);
    }

    #[test]
    fn navigation_clamps_at_both_ends() {
        let mut editor = editor_with_images(&["img1", "img2"]);
        editor.prev_image();
        assert_eq!(editor.current, 0);
        editor.next_image();
        editor.next_image();
        assert_eq!(editor.current, 1);
    }

    #[test]
    fn delete_clears_selection_and_popup() {
        let mut editor = editor_with_images(&["img1"]);
        draw(&mut editor, (10.0, 10.0), (110.0, 60.0));
        let id = editor.current_rectangles()[0].id.clone();

        editor.delete_rectangle(&id);
        assert!(editor.current_rectangles().is_empty());
        assert!(editor.selected_id.is_none());
        assert!(editor.editor_anchor.is_none());
    }

    #[test]
    fn field_edits_reach_the_store() {
        let mut editor = editor_with_images(&["img1"]);
        draw(&mut editor, (10.0, 10.0), (110.0, 60.0));
        let id = editor.current_rectangles()[0].id.clone();

        editor.set_confidence(&id, Confidence::Low);
        editor.set_transcription(&id, "lorem ipsum");

        let r = editor.selected_rectangle().unwrap();
        assert_eq!(r.confidence, Confidence::Low);
        assert_eq!(r.transcription, "lorem ipsum");
    }

    #[test]
    fn pointer_events_without_catalog_are_ignored() {
        let mut editor = EditorState::new();
        editor.pointer_down(Point::new(10.0, 10.0));
        editor.pointer_up(Point::new(100.0, 100.0));
        assert_eq!(editor.interaction, InteractionState::Idle);
        assert_eq!(editor.store.count_all(), 0);
    }
}
