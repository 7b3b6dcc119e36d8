//! Control Panel Widget
//! Left side panel: data source selection and the analysis controls.

use anyhow::Context;
use egui::{Color32, ComboBox, RichText};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::schema::{self, CoBenefit};
use crate::data::ImputationScope;

const SETTINGS_FILE: &str = "cobenefit_dashboard.json";

/// User-facing analysis settings, persisted between sessions.
#[derive(Clone, Serialize, Deserialize)]
pub struct UserSettings {
    pub data_path: Option<PathBuf>,
    pub selected_year: i32,
    pub selected_category: CoBenefit,
    pub imputation_scope: ImputationScope,
    pub map_seed: u64,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            data_path: None,
            selected_year: schema::DEFAULT_YEAR,
            selected_category: CoBenefit::AirQuality,
            imputation_scope: ImputationScope::default(),
            map_seed: 42,
        }
    }
}

impl UserSettings {
    /// Previous session's settings, or defaults when none were saved.
    pub fn load_or_default() -> Self {
        std::fs::read_to_string(SETTINGS_FILE)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(SETTINGS_FILE, text)
            .with_context(|| format!("writing {SETTINGS_FILE}"))?;
        Ok(())
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPanelAction {
    None,
    BrowseData,
    /// Year, category, or seed changed: recompute from the cached table.
    SettingsChanged,
    /// Imputation scope changed: the cleaned table itself is different.
    ScopeChanged,
}

/// Left side control panel with data selection and analysis controls.
pub struct ControlPanel {
    pub settings: UserSettings,
    pub progress: f32,
    pub status: String,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            settings: UserSettings::load_or_default(),
            progress: 0.0,
            status: "Ready".to_string(),
        }
    }
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("🌱 Cleaner Air, Quieter Cities")
                    .size(18.0)
                    .color(Color32::from_rgb(87, 187, 138)),
            );
            ui.label(
                RichText::new("Environmental Co-Benefit Dashboard 2025-2050")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Data Source Section =====
        ui.label(RichText::new("📁 Data Source").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let path_text = self
                        .settings
                        .data_path
                        .as_ref()
                        .and_then(|p| p.file_name())
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| "No file selected".to_string());

                    ui.label(RichText::new(&path_text).size(12.0).color(
                        if self.settings.data_path.is_some() {
                            Color32::WHITE
                        } else {
                            Color32::GRAY
                        },
                    ));

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("📂 Browse").clicked() {
                            action = ControlPanelAction::BrowseData;
                        }
                    });
                });
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Analysis Controls =====
        ui.label(RichText::new("⚙ Dashboard Controls").size(14.0).strong());
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            ui.add_sized([110.0, 20.0], egui::Label::new("Analysis Year:"));
            ComboBox::from_id_salt("analysis_year")
                .width(100.0)
                .selected_text(self.settings.selected_year.to_string())
                .show_ui(ui, |ui| {
                    for year in schema::years() {
                        if ui
                            .selectable_label(
                                self.settings.selected_year == year,
                                year.to_string(),
                            )
                            .clicked()
                        {
                            self.settings.selected_year = year;
                            action = ControlPanelAction::SettingsChanged;
                        }
                    }
                });
        });

        ui.add_space(8.0);

        ui.label("Co-Benefit Type:");
        ui.horizontal(|ui| {
            for category in CoBenefit::ALL {
                if ui
                    .radio(
                        self.settings.selected_category == category,
                        category.label(),
                    )
                    .clicked()
                {
                    self.settings.selected_category = category;
                    action = ControlPanelAction::SettingsChanged;
                }
            }
        });

        ui.add_space(8.0);

        ui.label("Median Imputation:");
        ui.horizontal(|ui| {
            for (scope, name) in [
                (ImputationScope::Global, "Global"),
                (ImputationScope::PerCategory, "Per Category"),
            ] {
                if ui
                    .radio(self.settings.imputation_scope == scope, name)
                    .clicked()
                    && self.settings.imputation_scope != scope
                {
                    self.settings.imputation_scope = scope;
                    action = ControlPanelAction::ScopeChanged;
                }
            }
        });

        ui.add_space(8.0);

        ui.horizontal(|ui| {
            ui.add_sized([110.0, 20.0], egui::Label::new("Map Seed:"));
            if ui
                .add(egui::DragValue::new(&mut self.settings.map_seed).speed(1))
                .changed()
            {
                action = ControlPanelAction::SettingsChanged;
            }
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Progress Section =====
        ui.label(RichText::new("📊 Progress").size(14.0).strong());
        ui.add_space(5.0);

        ui.add(
            egui::ProgressBar::new(self.progress / 100.0)
                .show_percentage()
                .animate(self.progress > 0.0 && self.progress < 100.0),
        );

        ui.add_space(5.0);

        let status_color = if self.status.contains("Error") {
            Color32::from_rgb(220, 53, 69)
        } else if self.status.contains("Complete") {
            Color32::from_rgb(40, 167, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }

    /// Set progress and status
    pub fn set_progress(&mut self, progress: f32, status: &str) {
        self.progress = progress;
        self.status = status.to_string();
    }
}
