use eframe::egui;
use std::fs;
use std::time::Instant;

use log::{info, warn};

mod export;
mod preset;
mod session;

use export::{ExportOutcome, SaveDialogExporter};
use preset::{Preset, ALL_PRESETS};
use session::Session;

// Formats offered by the open dialog; export is always PNG.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

fn main() -> eframe::Result<()> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("retoque")
            .with_inner_size([900.0, 640.0])
            .with_min_inner_size([480.0, 360.0])
            .with_app_id("retoque"),
        ..Default::default()
    };

    eframe::run_native(
        "retoque",
        options,
        Box::new(|cc| Ok(Box::new(RetoqueApp::new(cc)))),
    )
}

struct RetoqueApp {
    session: Session,
    exporter: SaveDialogExporter,
    selected: Preset,
    texture: Option<egui::TextureHandle>,
    error_message: Option<String>,

    // Display transform
    zoom: f32,
    target_zoom: f32,
    offset: egui::Vec2,
    last_frame_time: Instant,
}

impl RetoqueApp {
    fn new(cc: &eframe::CreationContext<'_>) -> Self {
        egui_extras::install_image_loaders(&cc.egui_ctx);

        Self {
            session: Session::new(),
            exporter: SaveDialogExporter,
            selected: Preset::Blur,
            texture: None,
            error_message: None,
            zoom: 1.0,
            target_zoom: 1.0,
            offset: egui::Vec2::ZERO,
            last_frame_time: Instant::now(),
        }
    }

    /// Re-uploads the session's current image into a GPU texture.
    fn refresh_texture(&mut self, ctx: &egui::Context) {
        match self.session.current_image() {
            Ok(Some(img)) => {
                let rgba = img.to_rgba8();
                let size = [rgba.width() as usize, rgba.height() as usize];
                let pixels = rgba.into_raw();
                let color_image = egui::ColorImage::from_rgba_unmultiplied(size, &pixels);
                self.texture =
                    Some(ctx.load_texture("img", color_image, egui::TextureOptions::LINEAR));
                self.error_message = None;
            }
            Ok(None) => self.texture = None,
            Err(e) => {
                warn!("display refresh failed: {e}");
                self.error_message = Some(format!("Failed to display image: {e}"));
            }
        }
    }

    fn handle_upload(&mut self, ctx: &egui::Context) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file()
        else {
            return;
        };
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("could not read {}: {e}", path.display());
                self.error_message = Some(format!("Failed to read {}: {e}", path.display()));
                return;
            }
        };
        match self.session.upload(&bytes) {
            Ok(()) => {
                info!("loaded {}", path.display());
                self.error_message = None;
                // New image, fresh view transform.
                self.zoom = 1.0;
                self.target_zoom = 1.0;
                self.offset = egui::Vec2::ZERO;
                self.refresh_texture(ctx);
            }
            Err(e) => {
                // Prior session state is untouched; just tell the user.
                warn!("upload rejected: {e}");
                self.error_message = Some(format!("{e}"));
            }
        }
    }

    fn handle_apply(&mut self, ctx: &egui::Context) {
        match self.session.apply_filter(self.selected.name()) {
            Ok(true) => {
                info!(
                    "applied {} (history depth {})",
                    self.selected.name(),
                    self.session.history_len()
                );
                self.refresh_texture(ctx);
            }
            Ok(false) => {} // nothing loaded yet
            Err(e) => {
                warn!("filter failed: {e}");
                self.error_message = Some(format!("{e}"));
            }
        }
    }

    fn handle_undo(&mut self, ctx: &egui::Context) {
        if self.session.undo() {
            info!("undo (history depth {})", self.session.history_len());
            self.refresh_texture(ctx);
        }
    }

    fn handle_reset(&mut self, ctx: &egui::Context) {
        if self.session.reset() {
            info!("reset to original");
            self.refresh_texture(ctx);
        }
    }

    fn handle_export(&mut self) {
        match self.session.export(&self.exporter) {
            Ok(Some(ExportOutcome::Saved(path))) => info!("exported to {}", path.display()),
            Ok(Some(ExportOutcome::Cancelled)) => info!("export cancelled"),
            Ok(None) => {} // nothing loaded yet
            Err(e) => {
                warn!("export failed: {e}");
                self.error_message = Some(format!("{e}"));
            }
        }
    }
}

impl eframe::App for RetoqueApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Delta time for the smooth zoom animation
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;

        let zoom_speed = 15.0;
        let zoom_diff = self.target_zoom - self.zoom;
        if zoom_diff.abs() > 0.001 {
            self.zoom += zoom_diff * (zoom_speed * dt).min(1.0);
            ctx.request_repaint();
        } else {
            self.zoom = self.target_zoom;
        }

        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::Z)) {
            self.handle_undo(ctx);
        }

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                if ui.button("Upload").clicked() {
                    self.handle_upload(ctx);
                }

                egui::ComboBox::from_id_salt("preset")
                    .selected_text(self.selected.name())
                    .show_ui(ui, |ui| {
                        for preset in ALL_PRESETS {
                            ui.selectable_value(&mut self.selected, preset, preset.name());
                        }
                    });

                if ui.button("Apply").clicked() {
                    self.handle_apply(ctx);
                }
                if ui.button("Undo").clicked() {
                    self.handle_undo(ctx);
                }
                if ui.button("Reset").clicked() {
                    self.handle_reset(ctx);
                }
                if ui.button("Export").clicked() {
                    self.handle_export();
                }

                if self.session.history_len() > 0 {
                    ui.separator();
                    ui.weak(format!("{} step(s)", self.session.history_len()));
                }
            });
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(err) = &self.error_message {
                ui.centered_and_justified(|ui| ui.colored_label(egui::Color32::RED, err));
                return;
            }

            if let Some(texture) = &self.texture {
                let available_size = ui.available_size();
                let image_size = texture.size_vec2();

                // Zoom is absolute: 1.0 = one image pixel per screen pixel
                let display_size = image_size * self.zoom;

                let (rect, response) = ui.allocate_exact_size(available_size, egui::Sense::drag());

                // Zoom with scroll (smooth animated)
                let scroll_delta = ctx.input(|i| i.raw_scroll_delta.y);
                if scroll_delta != 0.0 {
                    let zoom_factor = 1.15;
                    if scroll_delta > 0.0 {
                        self.target_zoom *= zoom_factor;
                    } else {
                        self.target_zoom /= zoom_factor;
                    }
                    self.target_zoom = self.target_zoom.clamp(0.05, 50.0);
                    ctx.request_repaint();
                }

                // Drag/Pan
                if response.dragged() {
                    self.offset += response.drag_delta();
                }

                let mut screen_center = rect.center().to_vec2();
                screen_center += self.offset;

                let image_rect =
                    egui::Rect::from_center_size(screen_center.to_pos2(), display_size);

                let painter = ui.painter_at(rect);
                painter.image(
                    texture.id(),
                    image_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            } else {
                ui.centered_and_justified(|ui| ui.label("Upload an image to start"));
            }
        });
    }
}
