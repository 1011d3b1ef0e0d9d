//! The eframe application: canvas rendering, the edit popup, navigation and
//! the save/export surface.
//!
//! Rendering is a full redraw from store state every frame, so the canvas
//! can never drift from the store. All pointer handling is translated into
//! image-space calls on [`EditorState`]; nothing in here mutates rectangles
//! directly.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Duration;

use eframe::egui;
use log::{error, info};

use crate::catalog;
use crate::editor::{EditorState, InteractionState};
use crate::export;
use crate::geometry::{self, Corner, Point};
use crate::model::{Confidence, Rectangle, HANDLE_SIZE, STROKE_WIDTH};
use crate::net::{self, NetEvent};

pub struct BoxlabelApp {
    editor: EditorState,
    endpoint: String,

    textures: HashMap<String, egui::TextureHandle>,
    fetching: HashSet<String>,
    failed_images: HashSet<String>,

    tx: Sender<NetEvent>,
    rx: Receiver<NetEvent>,
    saving: bool,

    /// Status line text; `true` marks an error.
    status: Option<(String, bool)>,

    // transcription field state for the edit popup
    editor_buf: String,
    editor_target: Option<String>,
}

impl BoxlabelApp {
    pub fn new(catalog_path: Option<&Path>, endpoint: String) -> Self {
        let (tx, rx) = channel();
        let mut app = Self {
            editor: EditorState::new(),
            endpoint,
            textures: HashMap::new(),
            fetching: HashSet::new(),
            failed_images: HashSet::new(),
            tx,
            rx,
            saving: false,
            status: None,
            editor_buf: String::new(),
            editor_target: None,
        };
        if let Some(path) = catalog_path {
            app.load_catalog(path);
        }
        app
    }

    fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some((text.into(), false));
    }

    fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some((text.into(), true));
    }

    // ── Catalog ─────────────────────────────────────────────────────────

    fn open_catalog_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV", &["csv"])
            .pick_file()
        {
            self.load_catalog(&path);
        }
    }

    fn load_catalog(&mut self, path: &Path) {
        match catalog::load_catalog(path) {
            Ok(images) => {
                let count = images.len();
                self.editor.load_images(images);
                self.textures.clear();
                self.fetching.clear();
                self.failed_images.clear();
                self.saving = false;
                self.set_status(format!("Loaded {count} images"));
            }
            Err(e) => {
                error!("catalog load failed: {e}");
                self.set_error(format!("Catalog load failed: {e}"));
            }
        }
    }

    // ── Networking ──────────────────────────────────────────────────────

    fn drain_net_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.rx.try_recv() {
            match event {
                NetEvent::SaveFinished { image_id, result } => {
                    self.saving = false;
                    match result {
                        Ok(()) => {
                            self.set_status(format!("Saved annotations for {image_id}"));
                            // Advance only if the user is still on the image
                            // that was saved; no-op on the last image.
                            if self.editor.current_image_id() == Some(image_id.as_str()) {
                                self.editor.next_image();
                            }
                        }
                        Err(e) => {
                            // No rollback, no advance: the annotations stay in
                            // memory and the Save button is the retry.
                            self.set_error(format!("Save failed: {e} — press Save to retry"));
                        }
                    }
                }
                NetEvent::ImageFetched { image_id, result } => {
                    self.fetching.remove(&image_id);
                    match result {
                        Ok(bytes) => match image::load_from_memory(&bytes) {
                            Ok(img) => self.install_texture(ctx, &image_id, img),
                            Err(e) => {
                                self.failed_images.insert(image_id.clone());
                                self.set_error(format!("Could not decode {image_id}: {e}"));
                            }
                        },
                        Err(e) => {
                            self.failed_images.insert(image_id.clone());
                            self.set_error(format!("Could not fetch {image_id}: {e}"));
                        }
                    }
                }
            }
        }
    }

    fn install_texture(&mut self, ctx: &egui::Context, image_id: &str, img: image::DynamicImage) {
        let rgba = img.to_rgba8();
        let size = [rgba.width() as usize, rgba.height() as usize];
        let pixels = rgba.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
        let texture = ctx.load_texture(image_id, color_image, egui::TextureOptions::LINEAR);
        self.textures.insert(image_id.to_owned(), texture);
    }

    /// Make sure the active image is loaded or on its way.
    fn ensure_current_image(&mut self, ctx: &egui::Context) {
        let Some(record) = self.editor.current_image() else {
            return;
        };
        let (image_id, url) = (record.id.clone(), record.image_url.clone());
        if self.textures.contains_key(&image_id)
            || self.fetching.contains(&image_id)
            || self.failed_images.contains(&image_id)
        {
            return;
        }

        if net::is_remote(&url) {
            self.fetching.insert(image_id.clone());
            net::fetch_image(&url, image_id, self.tx.clone());
        } else {
            match image::open(&url) {
                Ok(img) => self.install_texture(ctx, &image_id, img),
                Err(e) => {
                    self.failed_images.insert(image_id.clone());
                    self.set_error(format!("Could not open {url}: {e}"));
                }
            }
        }
    }

    // ── Save & export ───────────────────────────────────────────────────

    fn save_current(&mut self) {
        let Some(record) = self.editor.current_image() else {
            return;
        };
        let image_id = record.id.clone();
        let payload =
            export::persistence_payload(&image_id, self.editor.store.rectangles(&image_id));
        match serde_json::to_vec(&payload) {
            Ok(body) => {
                info!("posting {} annotations for {image_id}", payload.annotations.len());
                self.saving = true;
                net::post_annotations(&self.endpoint, body, image_id, self.tx.clone());
            }
            Err(e) => self.set_error(format!("Save failed: {e}")),
        }
    }

    fn export_csv(&mut self) {
        let Some(image_id) = self.editor.current_image_id().map(str::to_owned) else {
            return;
        };
        let bytes = match export::export_csv(&self.editor.store) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.set_error(format!("Export failed: {e}"));
                return;
            }
        };
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(export::export_file_name(&image_id))
            .add_filter("CSV", &["csv"])
            .save_file()
        else {
            return;
        };
        match std::fs::write(&path, bytes) {
            Ok(()) => self.set_status(format!(
                "Exported {} annotations to {}",
                self.editor.store.count_all(),
                path.display()
            )),
            Err(e) => self.set_error(format!("Export failed: {e}")),
        }
    }

    // ── Canvas ──────────────────────────────────────────────────────────

    fn show_canvas(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let canvas_rect = response.rect;
        painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));

        let Some(image_id) = self.editor.current_image_id().map(str::to_owned) else {
            return;
        };
        let Some(texture) = self.textures.get(&image_id) else {
            let text = if self.failed_images.contains(&image_id) {
                format!("Failed to load {image_id}")
            } else {
                format!("Loading {image_id}…")
            };
            painter.text(
                canvas_rect.center(),
                egui::Align2::CENTER_CENTER,
                text,
                egui::FontId::proportional(16.0),
                egui::Color32::GRAY,
            );
            return;
        };

        // The canvas is the image at natural size, scaled to fit the panel.
        let natural = texture.size_vec2();
        let scale = if natural.x > 0.0 && natural.y > 0.0 {
            (canvas_rect.width() / natural.x).min(canvas_rect.height() / natural.y)
        } else {
            1.0
        };
        let img_rect = egui::Rect::from_min_size(canvas_rect.min, natural * scale);

        painter.image(
            texture.id(),
            img_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        let to_image = |pos: egui::Pos2| {
            geometry::to_image_space(
                (natural.x, natural.y),
                (img_rect.width(), img_rect.height()),
                Point::new(pos.x - img_rect.min.x, pos.y - img_rect.min.y),
            )
        };
        let to_screen = |x: f32, y: f32, w: f32, h: f32| {
            egui::Rect::from_min_size(
                img_rect.min + egui::vec2(x, y) * scale,
                egui::vec2(w, h) * scale,
            )
        };

        // Pointer events, translated to image space. A quick click is
        // reported as a click rather than a drag, but it is still a full
        // press/release gesture for the state machine.
        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let p = to_image(pos);
                self.editor.pointer_down(p);
                self.editor.pointer_up(p);
            }
        }
        if response.drag_started_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                self.editor.pointer_down(to_image(pos));
            }
        }
        if response.dragged_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                self.editor.pointer_moved(to_image(pos));
            }
        }
        if response.drag_stopped_by(egui::PointerButton::Primary) {
            let pos = response
                .interact_pointer_pos()
                .or(ctx.input(|i| i.pointer.latest_pos()));
            match pos {
                Some(pos) if img_rect.contains(pos) => self.editor.pointer_up(to_image(pos)),
                // Released outside the canvas: an in-flight draw is
                // abandoned, a resize keeps its last valid bounds.
                _ => self.editor.pointer_left(),
            }
        }

        // Committed rectangles, in store order.
        let selected = self.editor.selected_id.clone();
        for rect in self.editor.current_rectangles() {
            let screen_rect = to_screen(rect.x, rect.y, rect.width, rect.height);
            let color = rect.confidence.color();
            painter.rect_stroke(
                screen_rect,
                0.0,
                egui::Stroke::new(STROKE_WIDTH * scale, color),
                egui::StrokeKind::Middle,
            );

            if !rect.transcription.is_empty() {
                let galley = painter.layout_no_wrap(
                    rect.transcription.clone(),
                    egui::FontId::proportional(14.0 * scale),
                    egui::Color32::WHITE,
                );
                let band = egui::Rect::from_min_size(
                    egui::pos2(
                        screen_rect.min.x,
                        screen_rect.min.y - galley.size().y - 4.0,
                    ),
                    galley.size() + egui::vec2(6.0, 4.0),
                );
                painter.rect_filled(band, 0.0, color);
                painter.galley(band.min + egui::vec2(3.0, 2.0), galley, egui::Color32::WHITE);
            }

            if selected.as_deref() == Some(rect.id.as_str()) {
                draw_handles(&painter, rect, img_rect.min, scale);
            }
        }

        // Live preview of an in-flight draw, stroked like a high-confidence
        // rectangle but never committed to the store.
        if let InteractionState::Drawing { anchor } = self.editor.interaction {
            if let Some(pos) = response
                .hover_pos()
                .or(ctx.input(|i| i.pointer.latest_pos()))
            {
                let (x, y, w, h) = geometry::normalize_drag(anchor, to_image(pos));
                painter.rect_stroke(
                    to_screen(x, y, w, h),
                    0.0,
                    egui::Stroke::new(STROKE_WIDTH * scale, Confidence::High.color()),
                    egui::StrokeKind::Middle,
                );
            }
        }

        self.show_edit_popup(ctx, img_rect, scale);
    }

    /// Confidence selector + transcription field for the selected
    /// rectangle, anchored where the gesture ended.
    fn show_edit_popup(&mut self, ctx: &egui::Context, img_rect: egui::Rect, scale: f32) {
        let Some(anchor) = self.editor.editor_anchor else {
            self.editor_target = None;
            return;
        };
        let Some(rect) = self.editor.selected_rectangle().cloned() else {
            self.editor.close_editor();
            self.editor_target = None;
            return;
        };

        if self.editor_target.as_deref() != Some(rect.id.as_str()) {
            self.editor_buf = rect.transcription.clone();
            self.editor_target = Some(rect.id.clone());
        }

        let screen_pos = img_rect.min + egui::vec2(anchor.x, anchor.y) * scale;
        egui::Area::new(egui::Id::new("rect_editor"))
            .fixed_pos(screen_pos)
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_max_width(220.0);

                    let mut confidence = rect.confidence;
                    egui::ComboBox::from_id_salt("confidence")
                        .selected_text(confidence.label())
                        .show_ui(ui, |ui| {
                            for option in
                                [Confidence::High, Confidence::Medium, Confidence::Low]
                            {
                                ui.selectable_value(&mut confidence, option, option.label());
                            }
                        });
                    if confidence != rect.confidence {
                        self.editor.set_confidence(&rect.id, confidence);
                    }

                    let text_response = ui.add(
                        egui::TextEdit::singleline(&mut self.editor_buf)
                            .hint_text("Transcription"),
                    );
                    if text_response.changed() {
                        self.editor.set_transcription(&rect.id, &self.editor_buf);
                    }

                    ui.horizontal(|ui| {
                        if ui.button("OK").clicked() {
                            self.editor.close_editor();
                        }
                        if ui.button("Delete").clicked() {
                            self.editor.delete_rectangle(&rect.id);
                        }
                    });
                });
            });
    }
}

fn draw_handles(painter: &egui::Painter, rect: &Rectangle, origin: egui::Pos2, scale: f32) {
    for corner in Corner::ALL {
        let c = corner.of(rect);
        let center = origin + egui::vec2(c.x, c.y) * scale;
        let handle = egui::Rect::from_center_size(center, egui::Vec2::splat(HANDLE_SIZE * scale));
        painter.rect_filled(handle, 0.0, egui::Color32::WHITE);
        painter.rect_stroke(
            handle,
            0.0,
            egui::Stroke::new(1.0, egui::Color32::BLACK),
            egui::StrokeKind::Middle,
        );
    }
}

impl eframe::App for BoxlabelApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_net_events(ctx);
        self.ensure_current_image(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Open Catalog…").clicked() {
                    self.open_catalog_dialog();
                }
                if !self.editor.images.is_empty() {
                    ui.separator();
                    if ui.button("◀ Prev").clicked() {
                        self.editor.prev_image();
                    }
                    if ui.button("Next ▶").clicked() {
                        self.editor.next_image();
                    }
                    ui.label(format!(
                        "Image {} of {}",
                        self.editor.current + 1,
                        self.editor.images.len()
                    ));
                    ui.separator();
                    ui.label(format!("{} annotations", self.editor.store.count_all()));
                    ui.separator();
                    let save_label = if self.saving { "Saving…" } else { "Save & Next" };
                    if ui
                        .add_enabled(!self.saving, egui::Button::new(save_label))
                        .clicked()
                    {
                        self.save_current();
                    }
                    if ui.button("Export CSV").clicked() {
                        self.export_csv();
                    }
                }
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            if let Some((text, is_error)) = &self.status {
                let color = if *is_error {
                    egui::Color32::from_rgb(0xef, 0x44, 0x44)
                } else {
                    ui.visuals().text_color()
                };
                ui.colored_label(color, text.as_str());
            } else {
                ui.label("Ready");
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.editor.images.is_empty() {
                ui.vertical_centered(|ui| {
                    ui.add_space(80.0);
                    ui.heading("No catalog loaded");
                    ui.label("Open a CSV file with columns: id, image_url");
                    if ui.button("Upload CSV").clicked() {
                        self.open_catalog_dialog();
                    }
                });
            } else {
                self.show_canvas(ctx, ui);
            }
        });

        // Keep polling while background work is in flight.
        if self.saving || !self.fetching.is_empty() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
