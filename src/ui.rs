use crate::config::{ModelChoice, Preferences, Theme, MODEL_PRESETS};
use crate::toast::{Severity, Toaster};
use crate::translator::TranslationError;
use crate::workspace::{TranslationJob, Workspace, LANGUAGES};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use egui_phosphor::regular as icons;
use std::fs;
use std::time::Duration;

pub type Outcome = Result<String, TranslationError>;

const SOURCE_ID: &str = "source_text";

pub struct TranslatorApp {
    prefs: Preferences,
    workspace: Workspace,
    toaster: Toaster,
    api_key_input: String,
    custom_model_input: String,
    jobs: Sender<TranslationJob>,
    outcomes: Receiver<Outcome>,
}

impl TranslatorApp {
    fn new(
        cc: &eframe::CreationContext<'_>,
        prefs: Preferences,
        jobs: Sender<TranslationJob>,
        outcomes: Receiver<Outcome>,
    ) -> Self {
        install_fonts(&cc.egui_ctx);
        apply_theme(&cc.egui_ctx, prefs.theme());
        let mut toaster = Toaster::default();
        if prefs.api_key().is_empty() {
            toaster.show("Enter and save your OpenRouter API key to start", Severity::Warning);
        } else {
            toaster.show("Ready. Press Ctrl+Enter to translate", Severity::Info);
        }
        Self {
            api_key_input: prefs.api_key().to_string(),
            custom_model_input: prefs.custom_model().to_string(),
            prefs,
            workspace: Workspace::default(),
            toaster,
            jobs,
            outcomes,
        }
    }

    fn prepare(&mut self) -> Result<TranslationJob, TranslationError> {
        let credential = self.prefs.api_key();
        if credential.trim().is_empty() {
            return Err(TranslationError::MissingCredential);
        }
        if self.workspace.source_text.trim().is_empty() {
            return Err(TranslationError::EmptyInput);
        }
        let model = self.prefs.resolved_model()?;
        self.workspace.begin(credential, &model)
    }

    fn request_translation(&mut self) {
        let job = match self.prepare() {
            Ok(job) => job,
            Err(e) => {
                self.toaster.show(e.to_string(), e.severity());
                return;
            }
        };
        tracing::info!("queueing translation with model {}", job.model);
        if self.jobs.send(job).is_err() {
            tracing::error!("translation worker is gone");
            self.workspace.abort();
            self.toaster.show("Translation worker stopped; restart the app", Severity::Error);
        }
    }

    fn drain_outcomes(&mut self) {
        while let Ok(outcome) = self.outcomes.try_recv() {
            match &outcome {
                Ok(_) => self.toaster.show("Translation complete", Severity::Success),
                Err(e) => self.toaster.show(format!("Translation failed: {}", e), Severity::Error),
            }
            self.workspace.finish(&outcome);
        }
    }

    fn save_api_key(&mut self) {
        match self.prefs.save_api_key(&self.api_key_input) {
            Ok(true) => {
                self.api_key_input = self.prefs.api_key().to_string();
                self.toaster.show("API key saved", Severity::Success);
            }
            Ok(false) => self.toaster.show("Please enter a valid API key", Severity::Warning),
            Err(e) => self.toaster.show(format!("Could not save API key: {:#}", e), Severity::Error),
        }
    }

    fn toggle_theme(&mut self, ctx: &egui::Context) {
        match self.prefs.toggle_theme() {
            Ok(theme) => apply_theme(ctx, theme),
            Err(e) => self.toaster.show(format!("Could not save theme: {:#}", e), Severity::Error),
        }
    }

    fn copy_result(&mut self, ctx: &egui::Context) {
        if self.workspace.target_text.is_empty() || self.workspace.is_busy() {
            return;
        }
        match write_clipboard_string(ctx, &self.workspace.target_text) {
            Ok(()) => self.toaster.show("Translation copied to clipboard", Severity::Success),
            Err(e) => self.toaster.show(format!("Copy failed: {}", e), Severity::Error),
        }
    }

    fn settings_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading(format!("{} routrans", icons::TRANSLATE));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let icon = match self.prefs.theme() {
                    Theme::Light => icons::MOON,
                    Theme::Dark => icons::SUN,
                };
                if ui.button(icon).on_hover_text("Toggle theme").clicked() {
                    self.toggle_theme(ui.ctx());
                }
            });
        });
        ui.horizontal(|ui| {
            ui.label("OpenRouter API key");
            let resp = ui.add(
                egui::TextEdit::singleline(&mut self.api_key_input)
                    .password(true)
                    .desired_width(320.0),
            );
            let enter = resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button(format!("{} Save", icons::FLOPPY_DISK)).clicked() || enter {
                self.save_api_key();
            }
        });
        ui.horizontal(|ui| {
            ui.label("Model");
            let mut selected = self.prefs.model().as_str().to_string();
            egui::ComboBox::from_id_source("model_select")
                .selected_text(selected.clone())
                .width(280.0)
                .show_ui(ui, |ui| {
                    for id in MODEL_PRESETS {
                        ui.selectable_value(&mut selected, id.to_string(), *id);
                    }
                });
            if selected != self.prefs.model().as_str() {
                if let Err(e) = self.prefs.select_model(&selected) {
                    self.toaster.show(format!("Could not save model: {:#}", e), Severity::Error);
                }
            }
            if *self.prefs.model() == ModelChoice::Custom {
                let resp = ui.add(
                    egui::TextEdit::singleline(&mut self.custom_model_input)
                        .hint_text("e.g. mistralai/mistral-large")
                        .desired_width(240.0),
                );
                if resp.changed() {
                    if let Err(e) = self.prefs.set_custom_model(&self.custom_model_input) {
                        self.toaster.show(format!("Could not save model: {:#}", e), Severity::Error);
                    }
                }
            }
        });
    }

    fn language_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            language_combo(ui, "source_lang", &mut self.workspace.source_lang);
            if ui
                .button(icons::ARROWS_LEFT_RIGHT)
                .on_hover_text("Swap languages")
                .clicked()
                && !self.workspace.is_busy()
            {
                self.workspace.swap();
            }
            language_combo(ui, "target_lang", &mut self.workspace.target_lang);
        });
    }

    fn text_panes(&mut self, ui: &mut egui::Ui) {
        let busy = self.workspace.is_busy();
        let pane_width = (ui.available_width() - 12.0) / 2.0;
        ui.horizontal_top(|ui| {
            ui.vertical(|ui| {
                ui.set_width(pane_width);
                ui.add(
                    egui::TextEdit::multiline(&mut self.workspace.source_text)
                        .id(egui::Id::new(SOURCE_ID))
                        .hint_text("Enter text to translate (Ctrl+Enter)")
                        .desired_rows(16)
                        .desired_width(f32::INFINITY),
                );
                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(!busy, egui::Button::new(format!("{} Clear", icons::TRASH)))
                        .clicked()
                    {
                        self.workspace.clear();
                        ui.memory_mut(|m| m.request_focus(egui::Id::new(SOURCE_ID)));
                    }
                    let label = if busy {
                        format!("{} Translating...", icons::SPINNER)
                    } else {
                        format!("{} Translate", icons::ARROW_RIGHT)
                    };
                    if ui.add_enabled(!busy, egui::Button::new(label)).clicked() {
                        self.request_translation();
                    }
                });
            });
            ui.vertical(|ui| {
                ui.set_width(pane_width);
                // read-only by convention; edits are allowed but never sent anywhere
                ui.add(
                    egui::TextEdit::multiline(&mut self.workspace.target_text)
                        .desired_rows(16)
                        .desired_width(f32::INFINITY),
                );
                if ui.button(format!("{} Copy", icons::COPY)).clicked() {
                    self.copy_result(ui.ctx());
                }
            });
        });
    }
}

impl eframe::App for TranslatorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_outcomes();
        if self.workspace.is_busy() {
            // poll the worker channel even without user input
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        let chord = ctx.input_mut(|i| i.consume_key(egui::Modifiers::COMMAND, egui::Key::Enter));
        if chord && !self.workspace.is_busy() {
            self.request_translation();
        }

        egui::TopBottomPanel::top("settings").show(ctx, |ui| {
            ui.add_space(4.0);
            self.settings_bar(ui);
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.language_bar(ui);
            ui.separator();
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| self.text_panes(ui));
        });

        self.toaster.ui(ctx);
    }
}

fn language_combo(ui: &mut egui::Ui, id: &str, value: &mut String) {
    egui::ComboBox::from_id_source(id)
        .selected_text(value.as_str())
        .width(140.0)
        .show_ui(ui, |ui| {
            for lang in LANGUAGES {
                ui.selectable_value(value, lang.to_string(), *lang);
            }
        });
}

fn apply_theme(ctx: &egui::Context, theme: Theme) {
    match theme {
        Theme::Light => ctx.set_visuals(egui::Visuals::light()),
        Theme::Dark => ctx.set_visuals(egui::Visuals::dark()),
    }
}

/// Phosphor icons plus the first CJK system font we can find.
fn install_fonts(ctx: &egui::Context) {
    let mut fonts = egui::FontDefinitions::default();
    egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);

    let candidates = [
        r"C:\Windows\Fonts\msyh.ttc",
        r"C:\Windows\Fonts\msyh.ttf",
        r"C:\Windows\Fonts\simsun.ttc",
        "/System/Library/Fonts/PingFang.ttc",
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    ];
    match candidates.iter().find_map(|p| fs::read(p).ok().map(|b| (p, b))) {
        Some((path, bytes)) => {
            tracing::info!("loaded CJK font: {}", path);
            fonts.font_data.insert("cjk".to_owned(), egui::FontData::from_owned(bytes));
            // after the defaults and the icon font, so Latin glyphs keep their look
            fonts.families.entry(egui::FontFamily::Proportional).or_default().push("cjk".to_owned());
            fonts.families.entry(egui::FontFamily::Monospace).or_default().push("cjk".to_owned());
        }
        None => tracing::warn!("no CJK font found; CJK text may render as squares"),
    }
    ctx.set_fonts(fonts);
}

#[cfg(windows)]
fn write_clipboard_string(_ctx: &egui::Context, s: &str) -> Result<(), String> {
    clipboard_win::set_clipboard_string(s).map_err(|e| e.to_string())
}

#[cfg(not(windows))]
fn write_clipboard_string(ctx: &egui::Context, s: &str) -> Result<(), String> {
    ctx.output_mut(|o| o.copied_text = s.to_string());
    Ok(())
}

/// Runs the window on the calling thread until it is closed.
pub fn run(
    prefs: Preferences,
    jobs: Sender<TranslationJob>,
    outcomes: Receiver<Outcome>,
) -> anyhow::Result<()> {
    tracing::info!("starting UI event loop");
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("routrans")
            .with_inner_size([960.0, 620.0])
            .with_min_inner_size([640.0, 420.0]),
        ..Default::default()
    };
    eframe::run_native(
        "routrans",
        native_options,
        Box::new(move |cc| Box::new(TranslatorApp::new(cc, prefs, jobs, outcomes))),
    )
    .map_err(|e| anyhow::anyhow!("UI error: {}", e))?;
    tracing::info!("UI event loop exited");
    Ok(())
}
