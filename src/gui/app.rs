//! Dashboard Main Application
//! Owns the session: the table cache, background load and recompute threads,
//! and the wiring between the control panel and the chart viewer.

use crate::charts::DashboardCharts;
use crate::data::schema::{YEAR_END, YEAR_START};
use crate::data::{CoBenefit, DataLoader, ImputationScope};
use crate::gui::control_panel::UserSettings;
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction};
use crate::stats::Aggregator;
use egui::SidePanel;
use polars::prelude::*;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

/// Data loading result from background thread
enum LoadResult {
    Progress(String),
    Complete(Arc<DataFrame>),
    Error(String),
}

/// Recompute result from background thread
enum CalcResult {
    Progress(f32, String),
    Complete(Box<DashboardCharts>),
    Error(String),
}

/// Main application window.
pub struct DashboardApp {
    loader: DataLoader,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,

    /// Cleaned table currently on screen, shared read-only with recompute
    /// threads.
    table: Option<Arc<DataFrame>>,
    /// Source reference a background load is running for.
    pending_source: Option<(PathBuf, ImputationScope)>,

    load_rx: Option<Receiver<LoadResult>>,
    is_loading: bool,
    /// A load was requested while one was in flight; rerun with the latest
    /// settings once it finishes.
    load_queued: bool,
    calc_rx: Option<Receiver<CalcResult>>,
    is_calculating: bool,
    /// Same for recomputes: a control change during a pass must not be lost.
    recompute_queued: bool,
}

impl DashboardApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let mut app = Self {
            loader: DataLoader::new(),
            control_panel: ControlPanel::new(),
            chart_viewer: ChartViewer::new(),
            table: None,
            pending_source: None,
            load_rx: None,
            is_loading: false,
            load_queued: false,
            calc_rx: None,
            is_calculating: false,
            recompute_queued: false,
        };

        // Restore the previous session's data source, if any.
        if app.control_panel.settings.data_path.is_some() {
            app.start_load();
        }
        app
    }

    /// Handle data file selection.
    fn handle_browse_data(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .pick_file()
        {
            self.control_panel.settings.data_path = Some(path);
            let _ = self.control_panel.settings.save();
            self.start_load();
        }
    }

    /// Load + clean the configured source, hitting the session cache when the
    /// same reference was already cleaned under the same scope.
    fn start_load(&mut self) {
        if self.is_loading {
            self.load_queued = true;
            return;
        }
        let Some(path) = self.control_panel.settings.data_path.clone() else {
            return;
        };
        let scope = self.control_panel.settings.imputation_scope;

        if let Some(df) = self.loader.get_cached(&path, scope) {
            self.table = Some(df);
            self.control_panel.set_progress(0.0, "Loaded from cache");
            self.start_recompute();
            return;
        }

        self.chart_viewer.clear();
        self.table = None;
        self.pending_source = Some((path.clone(), scope));
        self.control_panel.set_progress(0.0, "Loading data...");
        self.is_loading = true;

        let (tx, rx) = channel();
        self.load_rx = Some(rx);

        thread::spawn(move || {
            let _ = tx.send(LoadResult::Progress("Reading spreadsheet...".to_string()));
            match DataLoader::fetch_and_clean(&path, scope) {
                Ok(df) => {
                    let _ = tx.send(LoadResult::Complete(Arc::new(df)));
                }
                Err(e) => {
                    let _ = tx.send(LoadResult::Error(e.to_string()));
                }
            }
        });
    }

    /// Check for data loading results
    fn check_load_results(&mut self) {
        let rx = self.load_rx.take();
        if let Some(rx) = rx {
            let mut should_keep_receiver = true;

            while let Ok(result) = rx.try_recv() {
                match result {
                    LoadResult::Progress(status) => {
                        self.control_panel.set_progress(0.0, &status);
                    }
                    LoadResult::Complete(df) => {
                        if let Some((path, scope)) = self.pending_source.take() {
                            self.loader.insert(&path, scope, df.clone());
                        }
                        self.control_panel
                            .set_progress(0.0, &format!("Loaded {} cleaned rows", df.height()));
                        self.table = Some(df);
                        self.is_loading = false;
                        should_keep_receiver = false;
                        self.start_recompute();
                    }
                    LoadResult::Error(error) => {
                        self.pending_source = None;
                        self.control_panel
                            .set_progress(0.0, &format!("Error: {}", error));
                        self.is_loading = false;
                        should_keep_receiver = false;
                    }
                }
            }

            if should_keep_receiver {
                self.load_rx = Some(rx);
            } else if self.load_queued {
                // Settings moved on while this load was in flight.
                self.load_queued = false;
                self.start_load();
            }
        }
    }

    /// Recompute every chart from the cached cleaned table.
    fn start_recompute(&mut self) {
        if self.is_calculating {
            self.recompute_queued = true;
            return;
        }
        let Some(df) = self.table.clone() else {
            return;
        };
        let settings = self.control_panel.settings.clone();

        let (tx, rx) = channel();
        self.calc_rx = Some(rx);
        self.is_calculating = true;
        self.control_panel.set_progress(5.0, "Aggregating...");

        thread::spawn(move || {
            Self::run_recompute(tx, df, settings);
        });
    }

    /// Run the full aggregation pass (called from background thread).
    fn run_recompute(tx: Sender<CalcResult>, df: Arc<DataFrame>, settings: UserSettings) {
        let _ = tx.send(CalcResult::Progress(20.0, "Aggregating...".to_string()));

        match Self::build_charts(&df, &settings) {
            Ok(charts) => {
                let _ = tx.send(CalcResult::Complete(Box::new(charts)));
            }
            Err(e) => {
                let _ = tx.send(CalcResult::Error(e.to_string()));
            }
        }
    }

    /// One deterministic pass through the aggregation pipeline.
    fn build_charts(df: &DataFrame, settings: &UserSettings) -> PolarsResult<DashboardCharts> {
        let air_trend = Aggregator::yearly_series(df, CoBenefit::AirQuality)?;
        let noise_trend = Aggregator::yearly_series(df, CoBenefit::Noise)?;
        let comfort = Aggregator::comfort_classification(&air_trend, &noise_trend);

        let (air_totals, noise_totals) = rayon::join(
            || Aggregator::area_totals(df, CoBenefit::AirQuality),
            || Aggregator::area_totals(df, CoBenefit::Noise),
        );

        Ok(DashboardCharts {
            selected_year: settings.selected_year,
            selected_category: settings.selected_category,
            air_total: Aggregator::category_total(df, CoBenefit::AirQuality)?,
            noise_total: Aggregator::category_total(df, CoBenefit::Noise)?,
            top_air: Aggregator::top_n(&air_totals?, 5),
            top_noise: Aggregator::top_n(&noise_totals?, 5),
            air_trend,
            noise_trend,
            comfort,
            ranking: Aggregator::combined_area_ranking(df)?,
            map_points: Aggregator::map_points(
                df,
                settings.selected_category,
                settings.selected_year,
                settings.map_seed,
            )?,
            correlation: Aggregator::correlation_matrix(df)?,
            before_after: Aggregator::before_after(df, YEAR_START, YEAR_END)?,
        })
    }

    /// Check for recompute results
    fn check_calculation_results(&mut self) {
        let rx = self.calc_rx.take();
        if let Some(rx) = rx {
            let mut should_keep_receiver = true;

            while let Ok(result) = rx.try_recv() {
                match result {
                    CalcResult::Progress(progress, status) => {
                        self.control_panel.set_progress(progress, &status);
                    }
                    CalcResult::Complete(charts) => {
                        self.chart_viewer.set_charts(*charts);
                        self.control_panel
                            .set_progress(100.0, "Complete! Dashboard ready");
                        self.is_calculating = false;
                        should_keep_receiver = false;
                    }
                    CalcResult::Error(error) => {
                        self.control_panel
                            .set_progress(0.0, &format!("Error: {}", error));
                        self.is_calculating = false;
                        should_keep_receiver = false;
                    }
                }
            }

            if should_keep_receiver {
                self.calc_rx = Some(rx);
            } else if self.recompute_queued {
                // A control changed mid-pass; rerun with the latest settings.
                self.recompute_queued = false;
                self.start_recompute();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> DashboardApp {
        DashboardApp {
            loader: DataLoader::new(),
            control_panel: ControlPanel::new(),
            chart_viewer: ChartViewer::new(),
            table: None,
            pending_source: None,
            load_rx: None,
            is_loading: false,
            load_queued: false,
            calc_rx: None,
            is_calculating: false,
            recompute_queued: false,
        }
    }

    #[test]
    fn settings_change_during_recompute_starts_a_fresh_pass() {
        let mut app = app();
        app.table = Some(Arc::new(DataFrame::empty()));

        app.is_calculating = true;
        app.start_recompute();
        assert!(app.recompute_queued, "mid-pass change must be remembered");
        assert!(app.calc_rx.is_none());

        // In-flight pass finishes; the remembered change kicks off the next one.
        let (tx, rx) = channel();
        tx.send(CalcResult::Error("aborted".to_string())).unwrap();
        drop(tx);
        app.calc_rx = Some(rx);
        app.check_calculation_results();

        assert!(!app.recompute_queued);
        assert!(app.is_calculating);
        assert!(app.calc_rx.is_some());
    }

    #[test]
    fn scope_change_during_load_starts_a_fresh_load() {
        let mut app = app();
        app.control_panel.settings.data_path =
            Some(PathBuf::from("/nonexistent/projections.csv"));

        app.is_loading = true;
        app.start_load();
        assert!(app.load_queued, "mid-load change must be remembered");
        assert!(app.load_rx.is_none());

        let (tx, rx) = channel();
        tx.send(LoadResult::Error("unreachable".to_string())).unwrap();
        drop(tx);
        app.load_rx = Some(rx);
        app.check_load_results();

        assert!(!app.load_queued);
        assert!(app.is_loading);
        assert!(app.load_rx.is_some());
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for background results
        self.check_load_results();
        self.check_calculation_results();

        // Request repaint while loading or calculating
        if self.is_loading || self.is_calculating {
            ctx.request_repaint();
        }

        // Left panel - Dashboard Controls
        SidePanel::left("control_panel")
            .min_width(300.0)
            .max_width(350.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui);

                    match action {
                        ControlPanelAction::BrowseData => self.handle_browse_data(),
                        ControlPanelAction::SettingsChanged => {
                            let _ = self.control_panel.settings.save();
                            self.start_recompute();
                        }
                        ControlPanelAction::ScopeChanged => {
                            let _ = self.control_panel.settings.save();
                            self.start_load();
                        }
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Chart Viewer
        egui::CentralPanel::default().show(ctx, |ui| {
            self.chart_viewer.show(ui);
        });
    }
}
