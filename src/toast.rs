use eframe::egui;
use std::time::{Duration, Instant};

pub const ENTRANCE_DELAY: Duration = Duration::from_millis(10);
pub const DISPLAY_TIME: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Warning,
    Error,
    Info,
}

impl Severity {
    fn colors(self) -> (egui::Color32, egui::Color32) {
        match self {
            Severity::Success => (egui::Color32::from_rgb(0x2e, 0x7d, 0x32), egui::Color32::WHITE),
            Severity::Warning => (egui::Color32::from_rgb(0xf9, 0xa8, 0x25), egui::Color32::BLACK),
            Severity::Error => (egui::Color32::from_rgb(0xc6, 0x28, 0x28), egui::Color32::WHITE),
            Severity::Info => (egui::Color32::from_rgb(0x15, 0x65, 0xc0), egui::Color32::WHITE),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub severity: Severity,
    shown_at: Instant,
}

/// Holds at most one toast; a new one replaces whatever is showing.
#[derive(Debug, Default)]
pub struct Toaster {
    current: Option<Toast>,
}

impl Toaster {
    pub fn show(&mut self, message: impl Into<String>, severity: Severity) {
        self.show_at(message, severity, Instant::now());
    }

    fn show_at(&mut self, message: impl Into<String>, severity: Severity, now: Instant) {
        let message = message.into();
        match severity {
            Severity::Error => tracing::error!("toast: {}", message),
            Severity::Warning => tracing::warn!("toast: {}", message),
            _ => tracing::info!("toast: {}", message),
        }
        self.current = Some(Toast { message, severity, shown_at: now });
    }

    pub fn visible_at(&mut self, now: Instant) -> Option<&Toast> {
        let elapsed = now.saturating_duration_since(self.current.as_ref()?.shown_at);
        if elapsed >= DISPLAY_TIME {
            self.current = None;
            return None;
        }
        if elapsed < ENTRANCE_DELAY {
            return None;
        }
        self.current.as_ref()
    }

    pub fn ui(&mut self, ctx: &egui::Context) {
        if self.current.is_none() {
            return;
        }
        ctx.request_repaint_after(Duration::from_millis(50));
        let Some(toast) = self.visible_at(Instant::now()) else {
            return;
        };
        let (fill, text) = toast.severity.colors();
        egui::Area::new(egui::Id::new("toast"))
            .anchor(egui::Align2::CENTER_BOTTOM, [0.0, -24.0])
            .order(egui::Order::Foreground)
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::none()
                    .fill(fill)
                    .rounding(6.0)
                    .inner_margin(egui::Margin::symmetric(14.0, 8.0))
                    .show(ui, |ui| {
                        ui.label(egui::RichText::new(&toast.message).color(text));
                    });
            });
    }
}
