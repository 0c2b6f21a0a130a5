//! Main application logic and persistent user settings.
//!
//! The dataset is parsed once at startup and stays immutable for the
//! process lifetime; every frame recomputes the visible charts from the
//! resident records and the selected date range.

use dirs_next as dirs;
use eframe::{App, Frame, NativeOptions, egui};
use egui_extras::DatePickerButton;
use egui_plot::{Legend, Plot, Points};
use rfd::FileDialog;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use log::info;

mod parser;
use parser::{ParseError, read_logs};
mod normalize;
use normalize::{NormalizedSet, normalize};
mod analysis;
use analysis::{
    ExerciseStat, StatKey, aggregate_exercise_stats, compute_summary, filter_records,
    session_bounds, sorted_stats, unique_exercises,
};
mod plotting;
use plotting::{
    StatMetric, format_session_day, format_session_label, format_time_of_day, session_axis,
    stat_series, timeline_chart, timeline_rows,
};
mod export;
use export::{
    save_full_export_json, save_records_csv, save_records_json, save_stats_csv, save_stats_json,
};
mod report;
use report::export_html_report;

/// The parsed, normalized, aggregated log data. Built once per load and
/// never mutated; the UI only reads from it.
struct Dataset {
    records: Vec<NormalizedSet>,
    stats: HashMap<StatKey, ExerciseStat>,
    bounds: Option<(NaiveDate, NaiveDate)>,
}

impl Dataset {
    fn load(dir: &Path) -> Result<Self, ParseError> {
        let raw = read_logs(dir)?;
        let records = normalize(&raw);
        let stats = aggregate_exercise_stats(&records);
        let bounds = session_bounds(&records);
        Ok(Self {
            records,
            stats,
            bounds,
        })
    }

    fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn default_plot_width() -> f32 {
    400.0
}

fn default_plot_height() -> f32 {
    200.0
}

fn default_timeline_height() -> f32 {
    300.0
}

fn default_true() -> bool {
    true
}

/// Persistent configuration, serialized to a JSON file in the platform
/// config directory so the selected range and plot sizes survive restarts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Settings {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    #[serde(default = "default_plot_width")]
    plot_width: f32,
    #[serde(default = "default_plot_height")]
    plot_height: f32,
    #[serde(default = "default_timeline_height")]
    timeline_height: f32,
    #[serde(default = "default_true")]
    auto_load_last: bool,
    last_dir: Option<String>,
}

impl Settings {
    const FILE: &'static str = "training_log_dashboard_settings.json";

    fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(Self::FILE))
    }

    fn load() -> Self {
        if let Some(path) = Self::path() {
            if let Ok(data) = std::fs::read_to_string(&path) {
                if let Ok(cfg) = serde_json::from_str(&data) {
                    return cfg;
                }
            }
        }
        Self::default()
    }

    fn save(&self) {
        if let Some(path) = Self::path() {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(data) = serde_json::to_string_pretty(self) {
                let _ = std::fs::write(path, data);
            }
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            plot_width: default_plot_width(),
            plot_height: default_plot_height(),
            timeline_height: default_timeline_height(),
            auto_load_last: true,
            last_dir: None,
        }
    }
}

struct DashboardApp {
    dataset: Dataset,
    log_dir: PathBuf,
    settings: Settings,
    settings_dirty: bool,
    last_loaded: Option<String>,
    toast_start: Option<Instant>,
    load_error: Option<String>,
    show_settings: bool,
    show_about: bool,
}

impl DashboardApp {
    fn new(dataset: Dataset, log_dir: PathBuf, settings: Settings) -> Self {
        let mut app = Self {
            dataset,
            log_dir,
            settings,
            settings_dirty: false,
            last_loaded: None,
            toast_start: None,
            load_error: None,
            show_settings: false,
            show_about: false,
        };
        app.seed_range_from_bounds();
        app.settings.last_dir = Some(app.log_dir.display().to_string());
        app.settings_dirty = true;
        app
    }

    /// Bind unset pickers to the dataset's min/max session date.
    fn seed_range_from_bounds(&mut self) {
        if let Some((min, max)) = self.dataset.bounds {
            if self.settings.start_date.is_none() {
                self.settings.start_date = Some(min);
            }
            if self.settings.end_date.is_none() {
                self.settings.end_date = Some(max);
            }
        }
    }

    fn date_range(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (self.settings.start_date, self.settings.end_date)
    }

    /// Re-parse `dir` and swap the resident dataset. A failed reload keeps
    /// the current dataset and surfaces the error in the UI instead of
    /// exiting; only the startup load is fatal.
    fn reload(&mut self, dir: PathBuf) {
        match Dataset::load(&dir) {
            Ok(dataset) => {
                let name = dir.display().to_string();
                info!("loaded {} sets from {}", dataset.records.len(), name);
                self.dataset = dataset;
                self.log_dir = dir;
                self.load_error = None;
                self.last_loaded = Some(name.clone());
                self.toast_start = Some(Instant::now());
                self.settings.last_dir = Some(name);
                self.seed_range_from_bounds();
                self.settings_dirty = true;
            }
            Err(err) => {
                log::error!("failed to load workout logs from {}: {err}", dir.display());
                self.load_error = Some(err.to_string());
            }
        }
    }

    fn range_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Start date:");
            let mut start = self
                .settings
                .start_date
                .or(self.dataset.bounds.map(|b| b.0))
                .unwrap_or_else(|| Local::now().date_naive());
            if ui
                .add(DatePickerButton::new(&mut start).id_source("start_date"))
                .changed()
            {
                self.settings.start_date = Some(start);
                self.settings_dirty = true;
            }
            ui.label("End date:");
            let mut end = self
                .settings
                .end_date
                .or(self.dataset.bounds.map(|b| b.1))
                .unwrap_or_else(|| Local::now().date_naive());
            if ui
                .add(DatePickerButton::new(&mut end).id_source("end_date"))
                .changed()
            {
                self.settings.end_date = Some(end);
                self.settings_dirty = true;
            }
            if ui.button("Full range").clicked() {
                if let Some((min, max)) = self.dataset.bounds {
                    self.settings.start_date = Some(min);
                    self.settings.end_date = Some(max);
                    self.settings_dirty = true;
                }
            }

            let (start, end) = self.date_range();
            let summary = compute_summary(&self.dataset.records, start, end);
            ui.separator();
            ui.label(format!(
                "{} sessions, {} sets, {} repetitions in range",
                summary.total_sessions, summary.total_sets, summary.total_repetitions
            ));
        });
    }

    fn timeline_ui(&self, ui: &mut egui::Ui) {
        let (start, end) = self.date_range();
        let sessions = session_axis(&self.dataset.records, start, end);
        let rows = timeline_rows(&self.dataset.records, &sessions, start, end);
        if rows.is_empty() {
            ui.label("No sessions in the selected range.");
            return;
        }
        let axis = sessions.clone();
        Plot::new("timeline")
            .height(self.settings.timeline_height)
            .legend(Legend::default())
            .x_axis_formatter(|mark, _chars, _| format_time_of_day(mark.value))
            .y_axis_formatter(move |mark, _chars, _| format_session_label(&axis, mark.value))
            .show(ui, |plot_ui| {
                for row in &rows {
                    plot_ui.bar_chart(timeline_chart(row, &sessions));
                }
            });
    }

    fn stats_ui(&self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let (start, end) = self.date_range();
        let exercises = unique_exercises(&self.dataset.stats, start, end);
        if exercises.is_empty() {
            ui.label("No exercises in the selected range.");
            return;
        }
        for exercise in &exercises {
            ui.heading(exercise);
            ui.horizontal_wrapped(|ui| {
                for metric in StatMetric::ALL {
                    let series = stat_series(&self.dataset.stats, exercise, metric, start, end);
                    let points = series.points;
                    let mut highlight: Option<[f64; 2]> = None;
                    let resp = Plot::new(format!("stat_{exercise}_{}", metric.label()))
                        .width(self.settings.plot_width)
                        .height(self.settings.plot_height)
                        .x_axis_formatter(|mark, _chars, _| format_session_day(mark.value))
                        .legend(Legend::default())
                        .show(ui, |plot_ui| {
                            let pointer = plot_ui.pointer_coordinate();
                            plot_ui.line(series.line);
                            if let Some(ptr) = pointer {
                                if let Some(p) = nearest_point(ptr, &points) {
                                    highlight = Some(p);
                                    plot_ui.points(
                                        Points::new(vec![p])
                                            .color(egui::Color32::YELLOW)
                                            .highlight(true)
                                            .name("Hovered"),
                                    );
                                }
                            }
                        });
                    if let Some(p) = highlight {
                        if resp.response.hovered() {
                            egui::show_tooltip_at_pointer(
                                ctx,
                                egui::Id::new(("stat_tip", exercise, metric.label())),
                                |ui| {
                                    ui.label(format!(
                                        "{}: {:.0}",
                                        format_session_day(p[0]),
                                        p[1]
                                    ));
                                },
                            );
                        }
                    }
                }
            });
            ui.separator();
        }
    }

    fn export_menu(&mut self, ui: &mut egui::Ui) {
        let (start, end) = self.date_range();
        if ui.button("Export Records CSV").clicked() {
            if let Some(path) = FileDialog::new().add_filter("CSV", &["csv"]).save_file() {
                let records = filter_records(&self.dataset.records, start, end);
                if let Err(err) = save_records_csv(&path, &records) {
                    log::error!("failed to export records: {err}");
                }
            }
            ui.close_menu();
        }
        if ui.button("Export Records JSON").clicked() {
            if let Some(path) = FileDialog::new().add_filter("JSON", &["json"]).save_file() {
                let records = filter_records(&self.dataset.records, start, end);
                if let Err(err) = save_records_json(&path, &records) {
                    log::error!("failed to export records: {err}");
                }
            }
            ui.close_menu();
        }
        if ui.button("Export Stats CSV").clicked() {
            if let Some(path) = FileDialog::new().add_filter("CSV", &["csv"]).save_file() {
                let stats = sorted_stats(&self.dataset.stats, start, end);
                if let Err(err) = save_stats_csv(&path, &stats) {
                    log::error!("failed to export stats: {err}");
                }
            }
            ui.close_menu();
        }
        if ui.button("Export Stats JSON").clicked() {
            if let Some(path) = FileDialog::new().add_filter("JSON", &["json"]).save_file() {
                let stats = sorted_stats(&self.dataset.stats, start, end);
                if let Err(err) = save_stats_json(&path, &stats) {
                    log::error!("failed to export stats: {err}");
                }
            }
            ui.close_menu();
        }
        if ui.button("Export Full JSON").clicked() {
            if let Some(path) = FileDialog::new().add_filter("JSON", &["json"]).save_file() {
                let records = filter_records(&self.dataset.records, start, end);
                let summary = compute_summary(&records, None, None);
                let stats = sorted_stats(&self.dataset.stats, start, end);
                if let Err(err) = save_full_export_json(&path, &summary, &stats) {
                    log::error!("failed to export full dataset: {err}");
                }
            }
            ui.close_menu();
        }
        if ui.button("Export HTML Report").clicked() {
            if let Some(path) = FileDialog::new().add_filter("HTML", &["html"]).save_file() {
                let records = filter_records(&self.dataset.records, start, end);
                let summary = compute_summary(&records, None, None);
                let stats = sorted_stats(&self.dataset.stats, start, end);
                match export_html_report(&path, &summary, &stats) {
                    Ok(()) => {
                        let _ = open::that(&path);
                    }
                    Err(err) => log::error!("failed to export report: {err}"),
                }
            }
            ui.close_menu();
        }
    }
}

fn nearest_point(pointer: egui_plot::PlotPoint, points: &[[f64; 2]]) -> Option<[f64; 2]> {
    points.iter().copied().min_by(|a, b| {
        let da = (a[0] - pointer.x).powi(2) + (a[1] - pointer.y).powi(2);
        let db = (b[0] - pointer.x).powi(2) + (b[1] - pointer.y).powi(2);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    })
}

impl App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // A directory dropped onto the window reloads from it.
        for file in ctx.input(|i| i.raw.dropped_files.clone()) {
            if let Some(path) = file.path {
                if path.is_dir() {
                    self.reload(path);
                }
            }
        }

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Log Directory\u{2026}").clicked() {
                        if let Some(dir) = FileDialog::new().pick_folder() {
                            self.reload(dir);
                        }
                        ui.close_menu();
                    }
                    if ui.button("Reload").clicked() {
                        self.reload(self.log_dir.clone());
                        ui.close_menu();
                    }
                    ui.separator();
                    self.export_menu(ui);
                    ui.separator();
                    if ui.button("Settings").clicked() {
                        self.show_settings = true;
                        ui.close_menu();
                    }
                    if ui.button("Usage Tips").clicked() {
                        self.show_about = true;
                        ui.close_menu();
                    }
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(ref err) = self.load_error {
                ui.colored_label(egui::Color32::RED, err);
            }
            self.range_controls(ui);
            ui.separator();
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Timeline");
                self.timeline_ui(ui);
                ui.separator();
                ui.heading("Per-exercise statistics");
                self.stats_ui(ctx, ui);
            });
        });

        if self.show_settings {
            let mut open = self.show_settings;
            egui::Window::new("Settings")
                .open(&mut open)
                .show(ctx, |ui| {
                    egui::Grid::new("settings_grid").num_columns(2).show(ui, |ui| {
                        ui.label("Plot width:");
                        if ui
                            .add(egui::DragValue::new(&mut self.settings.plot_width).clamp_range(100.0..=1200.0))
                            .changed()
                        {
                            self.settings_dirty = true;
                        }
                        ui.end_row();
                        ui.label("Plot height:");
                        if ui
                            .add(egui::DragValue::new(&mut self.settings.plot_height).clamp_range(50.0..=800.0))
                            .changed()
                        {
                            self.settings_dirty = true;
                        }
                        ui.end_row();
                        ui.label("Timeline height:");
                        if ui
                            .add(
                                egui::DragValue::new(&mut self.settings.timeline_height)
                                    .clamp_range(100.0..=1200.0),
                            )
                            .changed()
                        {
                            self.settings_dirty = true;
                        }
                        ui.end_row();
                        if ui
                            .checkbox(&mut self.settings.auto_load_last, "Reopen last directory")
                            .changed()
                        {
                            self.settings_dirty = true;
                        }
                        ui.end_row();
                    });
                });
            self.show_settings = open;
        }

        if self.show_about {
            let mut open = self.show_about;
            egui::Window::new("Usage Tips").open(&mut open).show(ctx, |ui| {
                ui.label("One log file per session, named after its start timestamp.");
                ui.label("Each line: <start> <end> <exercise> <count>.");
                ui.label("Drop a log directory onto the window to load it.");
                ui.label("The timeline shows every session rebased to a common start.");
            });
            self.show_about = open;
        }

        if let Some(start) = self.toast_start {
            if start.elapsed() < Duration::from_secs(3) {
                let name = self.last_loaded.as_deref().unwrap_or("directory");
                egui::Area::new(egui::Id::new("load_toast"))
                    .anchor(egui::Align2::RIGHT_TOP, [-10.0, 10.0])
                    .show(ctx, |ui| {
                        ui.label(format!(
                            "Loaded {} sets from {}",
                            self.dataset.records.len(),
                            name
                        ));
                    });
            } else {
                self.toast_start = None;
            }
        }

        if self.settings_dirty {
            self.settings.save();
            self.settings_dirty = false;
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.settings.save();
    }
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let settings = Settings::load();
    let log_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| {
            if settings.auto_load_last {
                settings.last_dir.clone().map(PathBuf::from)
            } else {
                None
            }
        })
        .unwrap_or_else(|| PathBuf::from("logs"));

    // A malformed log directory is fatal; the window never opens on a
    // partial dataset.
    let dataset = match Dataset::load(&log_dir) {
        Ok(dataset) => dataset,
        Err(err) => {
            log::error!(
                "failed to load workout logs from {}: {err}",
                log_dir.display()
            );
            std::process::exit(1);
        }
    };
    if dataset.is_empty() {
        log::warn!("no workout logs found in {}", log_dir.display());
    }

    let options = NativeOptions::default();
    eframe::run_native(
        "Training Log Dashboard",
        options,
        Box::new(move |_cc| Box::new(DashboardApp::new(dataset, log_dir, settings))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;

    static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    fn write_log(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn settings_roundtrip() {
        let mut s = Settings::default();
        s.start_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        s.end_date = NaiveDate::from_ymd_opt(2024, 2, 1);
        s.plot_width = 500.0;
        s.plot_height = 250.0;
        s.timeline_height = 400.0;
        s.auto_load_last = false;
        s.last_dir = Some("/tmp/logs".into());

        let json = serde_json::to_string(&s).unwrap();
        let loaded: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(s, loaded);
    }

    #[test]
    fn settings_missing_fields_use_defaults() {
        let loaded: Settings =
            serde_json::from_str("{\"start_date\":null,\"end_date\":null,\"last_dir\":null}")
                .unwrap();
        assert_eq!(loaded.plot_width, default_plot_width());
        assert_eq!(loaded.plot_height, default_plot_height());
        assert!(loaded.auto_load_last);
    }

    #[test]
    fn settings_persistence() {
        use std::env;

        let _guard = ENV_MUTEX.lock().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let prev_config = env::var_os("XDG_CONFIG_HOME");
        unsafe {
            env::set_var("XDG_CONFIG_HOME", dir.path());
        }

        let mut s = Settings::default();
        s.start_date = NaiveDate::from_ymd_opt(2024, 3, 1);
        s.save();
        let loaded = Settings::load();
        assert_eq!(loaded.start_date, NaiveDate::from_ymd_opt(2024, 3, 1));

        if let Some(val) = prev_config {
            unsafe {
                env::set_var("XDG_CONFIG_HOME", val);
            }
        } else {
            unsafe {
                env::remove_var("XDG_CONFIG_HOME");
            }
        }
    }

    #[test]
    fn dataset_load_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        write_log(
            dir.path(),
            "2024-01-01-08-00-00.txt",
            "2024-01-01-08-00-00 2024-01-01-08-00-30 squat 10\n",
        );
        write_log(
            dir.path(),
            "2024-01-03-18-00-00.txt",
            "2024-01-03-18-00-00 2024-01-03-18-00-45 squat 12\n",
        );
        let dataset = Dataset::load(dir.path()).unwrap();
        assert_eq!(dataset.records.len(), 2);
        assert_eq!(dataset.stats.len(), 2);
        assert_eq!(
            dataset.bounds,
            Some((
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
            ))
        );
    }

    #[test]
    fn dataset_load_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        write_log(dir.path(), "2024-01-01-08-00-00.txt", "bad line\n");
        assert!(Dataset::load(dir.path()).is_err());
    }

    #[test]
    fn empty_directory_gives_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = Dataset::load(dir.path()).unwrap();
        assert!(dataset.is_empty());
        assert_eq!(dataset.bounds, None);
    }

    #[test]
    fn new_app_seeds_range_from_bounds() {
        let dir = tempfile::tempdir().unwrap();
        write_log(
            dir.path(),
            "2024-01-01-08-00-00.txt",
            "2024-01-01-08-00-00 2024-01-01-08-00-30 squat 10\n",
        );
        write_log(
            dir.path(),
            "2024-01-05-08-00-00.txt",
            "2024-01-05-08-00-00 2024-01-05-08-00-30 squat 10\n",
        );
        let dataset = Dataset::load(dir.path()).unwrap();
        let app = DashboardApp::new(dataset, dir.path().to_path_buf(), Settings::default());
        assert_eq!(app.settings.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(app.settings.end_date, NaiveDate::from_ymd_opt(2024, 1, 5));
    }

    #[test]
    fn reload_failure_keeps_dataset() {
        let good = tempfile::tempdir().unwrap();
        write_log(
            good.path(),
            "2024-01-01-08-00-00.txt",
            "2024-01-01-08-00-00 2024-01-01-08-00-30 squat 10\n",
        );
        let dataset = Dataset::load(good.path()).unwrap();
        let mut app = DashboardApp::new(dataset, good.path().to_path_buf(), Settings::default());

        let bad = tempfile::tempdir().unwrap();
        write_log(bad.path(), "2024-01-02-08-00-00.txt", "not enough fields\n");
        app.reload(bad.path().to_path_buf());

        assert!(app.load_error.is_some());
        assert_eq!(app.dataset.records.len(), 1);
        assert_eq!(app.log_dir, good.path());
    }
}
