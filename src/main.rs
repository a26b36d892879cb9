use anyhow::{anyhow, Context, Result};
use clap::Parser;
use eframe::egui;
use egui::{Color32, CornerRadius, RichText, ScrollArea, Stroke, Ui, ViewportBuilder};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod controller;
mod db;
mod filter;
mod hn_client;
mod models;
mod state;

use crate::config::{Cli, Command, Settings};
use crate::controller::{StoriesController, ViewMode};
use crate::db::{Database, PreferenceStore, SemiPersistentState};
use crate::hn_client::{HackerStoriesClient, LocalStoriesFetcher, StoryFetcher};
use crate::models::Story;
use crate::state::{stories_reducer, StoriesAction, StoriesState};

const HEADLESS_TIMEOUT: Duration = Duration::from_secs(60);

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "hacker_stories=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_cli(&cli)?;

    match cli.command {
        Some(Command::Search { term }) => run_search(&settings, term),
        Some(Command::Replay { file }) => run_replay(&file),
        None => run_gui(settings),
    }
}

fn open_store(settings: &Settings) -> Result<Arc<dyn PreferenceStore>> {
    match Database::open(&settings.data_dir) {
        Ok(db) => Ok(Arc::new(db)),
        Err(e) => {
            tracing::error!("Failed to open preferences database, search term will not be remembered: {}", e);
            Ok(Arc::new(Database::open_in_memory()?))
        }
    }
}

fn build_controller(settings: &Settings) -> Result<StoriesController> {
    let (fetcher, mode): (Arc<dyn StoryFetcher>, ViewMode) = if settings.offline {
        (Arc::new(LocalStoriesFetcher::new(settings.fetch_delay)), ViewMode::Filtered)
    } else {
        (Arc::new(HackerStoriesClient::new()?), ViewMode::Remote)
    };

    let search_term = SemiPersistentState::new(
        open_store(settings)?,
        &settings.search_key,
        &settings.initial_term,
    );

    Ok(StoriesController::new(fetcher, &settings.endpoint, mode, search_term))
}

fn run_gui(settings: Settings) -> Result<()> {
    tracing::info!("Starting Hacker Stories (offline: {})", settings.offline);
    let mut controller = build_controller(&settings)?;
    controller.mount();

    let options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_inner_size([900.0, 700.0])
            .with_min_inner_size([600.0, 400.0])
            .with_title("Hacker Stories"),
        ..Default::default()
    };

    eframe::run_native(
        "Hacker Stories",
        options,
        Box::new(move |cc| {
            let mut app = HackerStoriesApp::new(controller);

            if let Some(storage) = cc.storage {
                if let Some(theme_str) = storage.get_string("is_dark_mode") {
                    if let Ok(is_dark_mode) = theme_str.parse::<bool>() {
                        app.set_dark_mode(is_dark_mode);
                    }
                }
            }

            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow!("Failed to run application: {}", e))
}

fn run_search(settings: &Settings, term: Option<String>) -> Result<()> {
    let mut controller = build_controller(settings)?;
    search_once(&mut controller, term, HEADLESS_TIMEOUT)?;

    let stories = controller.visible_stories();
    if stories.is_empty() {
        println!("No stories found for '{}'.", controller.search_term());
    }
    for story in stories {
        println!("{}", format_story_line(story));
    }
    Ok(())
}

/// Commit `term` (or keep the remembered one) and run exactly one fetch for it.
fn search_once(controller: &mut StoriesController, term: Option<String>, timeout: Duration) -> Result<()> {
    if let Some(term) = term {
        controller.on_search_input(term);
        controller.on_search_submit();
    }
    // Submitting the remembered term again is a no-op, so fetch it here.
    if !controller.is_pending() {
        controller.mount();
    }

    if !controller.wait_for_fetches(timeout) {
        return Err(anyhow!("Timed out waiting for {}", controller.url()));
    }
    if controller.state().is_error {
        return Err(anyhow!("Something went wrong fetching {}", controller.url()));
    }
    Ok(())
}

fn run_replay(path: &Path) -> Result<()> {
    let file = std::fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let state = replay_actions(BufReader::new(file))?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

fn replay_actions(reader: impl BufRead) -> Result<StoriesState> {
    let mut state = StoriesState::default();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let action = StoriesAction::from_json(&line).with_context(|| format!("line {}", line_no + 1))?;
        state = stories_reducer(state, action);
    }
    Ok(state)
}

fn format_story_line(story: &Story) -> String {
    format!(
        "{} | {} | {} comments | {} points | {}",
        story.title, story.author, story.num_comments, story.points, story.url
    )
}

struct AppTheme {
    background: Color32,
    card_background: Color32,
    text: Color32,
    secondary_text: Color32,
    highlight: Color32,
    error: Color32,
    separator: Color32,
    button_background: Color32,
    button_foreground: Color32,
    button_hover_background: Color32,
}

impl AppTheme {
    fn dark() -> Self {
        Self {
            background: Color32::from_rgb(18, 18, 18),
            card_background: Color32::from_rgb(30, 30, 30),
            text: Color32::from_rgb(240, 240, 240),
            secondary_text: Color32::from_rgb(180, 180, 180),
            highlight: Color32::from_rgb(255, 102, 0), // HN orange
            error: Color32::from_rgb(239, 83, 80),
            separator: Color32::from_rgb(60, 60, 60),
            button_background: Color32::from_rgb(66, 66, 66),
            button_foreground: Color32::from_rgb(240, 240, 240),
            button_hover_background: Color32::from_rgb(80, 80, 80),
        }
    }

    fn light() -> Self {
        Self {
            background: Color32::from_rgb(245, 245, 245),
            card_background: Color32::from_rgb(255, 255, 255),
            text: Color32::from_rgb(20, 20, 20),
            secondary_text: Color32::from_rgb(90, 90, 90),
            highlight: Color32::from_rgb(235, 92, 0),
            error: Color32::from_rgb(198, 40, 40),
            separator: Color32::from_rgb(200, 200, 200),
            button_background: Color32::from_rgb(235, 235, 235),
            button_foreground: Color32::from_rgb(20, 20, 20),
            button_hover_background: Color32::from_rgb(210, 210, 210),
        }
    }

    fn apply_to_ctx(&self, ctx: &egui::Context) {
        let mut style = (*ctx.style()).clone();

        style.visuals.panel_fill = self.background;
        style.visuals.window_fill = self.card_background;
        style.visuals.window_stroke = Stroke::new(1.0, self.separator);
        style.visuals.widgets.noninteractive.bg_fill = self.card_background;
        style.visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, self.text);

        style.visuals.widgets.inactive.bg_fill = self.button_background;
        style.visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, self.button_foreground);
        style.visuals.widgets.hovered.bg_fill = self.button_hover_background;
        style.visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, self.button_foreground);
        style.visuals.widgets.active.bg_fill = self.highlight;
        style.visuals.widgets.active.fg_stroke = Stroke::new(1.0, self.button_foreground);

        style.visuals.selection.bg_fill = self.highlight;
        style.visuals.selection.stroke = Stroke::new(1.0, self.highlight);

        style.visuals.widgets.inactive.corner_radius = CornerRadius::same(4);
        style.visuals.widgets.hovered.corner_radius = CornerRadius::same(4);
        style.visuals.widgets.active.corner_radius = CornerRadius::same(4);

        ctx.set_style(style);
    }
}

struct HackerStoriesApp {
    controller: StoriesController,
    theme: AppTheme,
    is_dark_mode: bool,
    // The search box grabs focus once, on the first frame
    focus_search: bool,
    // Deferred so the list isn't mutated while it is being drawn
    pending_removal: Option<Story>,
}

impl HackerStoriesApp {
    fn new(controller: StoriesController) -> Self {
        Self {
            controller,
            theme: AppTheme::dark(),
            is_dark_mode: true,
            focus_search: true,
            pending_removal: None,
        }
    }

    fn set_dark_mode(&mut self, is_dark_mode: bool) {
        self.is_dark_mode = is_dark_mode;
        self.theme = if is_dark_mode {
            AppTheme::dark()
        } else {
            AppTheme::light()
        };
    }

    fn open_link(&self, url: &str) {
        if let Err(e) = open::that(url) {
            tracing::warn!("Failed to open URL {}: {}", url, e);
        }
    }

    fn render_search_form(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.label(RichText::new("Search:").strong().color(self.theme.text));

            let mut text = self.controller.search_term().to_string();
            let response = ui.add(
                egui::TextEdit::singleline(&mut text)
                    .id(egui::Id::new("search"))
                    .desired_width(280.0),
            );

            if self.focus_search {
                response.request_focus();
                self.focus_search = false;
            }

            if response.changed() {
                self.controller.on_search_input(text);
            }

            // The offline list filters as you type, there is nothing to submit
            if self.controller.mode() == ViewMode::Remote {
                let can_submit = self.controller.can_submit();
                let enter_pressed = can_submit
                    && response.lost_focus()
                    && ui.input(|i| i.key_pressed(egui::Key::Enter));
                let submit_btn = ui.add_enabled(
                    can_submit,
                    egui::Button::new("Submit").corner_radius(CornerRadius::same(4)),
                );

                if submit_btn.clicked() || enter_pressed {
                    self.controller.on_search_submit();
                }
            }
        });
    }

    fn render_story(&mut self, ui: &mut Ui, story: &Story) {
        egui::Frame::new()
            .fill(self.theme.card_background)
            .corner_radius(CornerRadius::same(8))
            .stroke(Stroke::new(1.0, self.theme.separator))
            .inner_margin(12.0)
            .outer_margin(egui::vec2(8.0, 4.0))
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let title_label = ui.add(
                        egui::Label::new(
                            RichText::new(&story.title)
                                .color(self.theme.text)
                                .size(16.0)
                                .strong(),
                        )
                        .sense(egui::Sense::click()),
                    );

                    if title_label.clicked() && !story.url.is_empty() {
                        self.open_link(&story.url);
                    }

                    if title_label.hovered() {
                        ui.output_mut(|o| o.cursor_icon = egui::CursorIcon::PointingHand);
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Dismiss").clicked() {
                            self.pending_removal = Some(story.clone());
                        }
                    });
                });

                ui.horizontal(|ui| {
                    ui.label(RichText::new(&story.author).color(self.theme.secondary_text));
                    ui.add_space(8.0);
                    ui.label(
                        RichText::new(format!("{} comments", story.num_comments))
                            .color(self.theme.secondary_text),
                    );
                    ui.add_space(8.0);
                    ui.label(
                        RichText::new(format!("{} points", story.points))
                            .color(self.theme.secondary_text),
                    );
                });
            });
    }

    fn render_stories(&mut self, ui: &mut Ui) {
        let state = self.controller.state();

        if state.is_error {
            ui.label(RichText::new("Something went wrong ...").color(self.theme.error));
        }

        if state.is_loading {
            ui.label(RichText::new("Loading ...").color(self.theme.secondary_text).italics());
            return;
        }

        let stories: Vec<Story> = self
            .controller
            .visible_stories()
            .into_iter()
            .cloned()
            .collect();

        if stories.is_empty() {
            ui.label(
                RichText::new("No stories found with the given title.")
                    .color(self.theme.secondary_text)
                    .italics(),
            );
            return;
        }

        ScrollArea::vertical()
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                for story in &stories {
                    self.render_story(ui, story);
                }
            });
    }
}

impl eframe::App for HackerStoriesApp {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        storage.set_string("is_dark_mode", self.is_dark_mode.to_string());
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.theme.apply_to_ctx(ctx);

        if self.controller.poll() {
            ctx.request_repaint();
        }
        if self.controller.is_pending() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        if let Some(story) = self.pending_removal.take() {
            self.controller.on_remove_item(&story);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(
                    RichText::new("My Hacker Stories")
                        .color(self.theme.highlight)
                        .size(24.0),
                );

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let theme_icon = if self.is_dark_mode { "☀" } else { "☾" };
                    let theme_btn = ui.add(
                        egui::Button::new(
                            RichText::new(theme_icon)
                                .color(self.theme.button_foreground)
                                .size(18.0),
                        )
                        .min_size(egui::Vec2::new(32.0, 32.0))
                        .corner_radius(CornerRadius::same(16))
                        .fill(self.theme.button_background),
                    );

                    if theme_btn.clicked() {
                        self.set_dark_mode(!self.is_dark_mode);
                        ctx.request_repaint();
                    }
                });
            });

            ui.add_space(8.0);
            self.render_search_form(ui);
            ui.separator();
            self.render_stories(ui);

            if self.controller.mode() == ViewMode::Filtered {
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    ui.label(RichText::new("Searching for").color(self.theme.secondary_text));
                    ui.label(RichText::new(self.controller.search_term()).strong());
                });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hn_client::{FetchError, API_ENDPOINT};
    use crate::models::{initial_stories, StoryId};
    use std::sync::Mutex;

    #[test]
    fn test_replay_folds_actions() {
        let input = r#"
{"type": "FETCH_INIT"}
{"type": "FETCH_SUCCESS", "payload": [{"objectID": 0, "title": "React"}, {"objectID": 1, "title": "Redux"}]}
{"type": "REMOVE_STORY", "payload": {"objectID": 0}}
"#;
        let state = replay_actions(input.as_bytes()).unwrap();

        assert!(!state.is_loading);
        assert!(!state.is_error);
        assert_eq!(state.data.len(), 1);
        assert_eq!(state.data[0].object_id, StoryId::Number(1));
    }

    #[test]
    fn test_replay_aborts_on_unknown_action() {
        let input = "{\"type\": \"FETCH_INIT\"}\n{\"type\": \"RESET\"}\n";
        let err = replay_actions(input.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_format_story_line() {
        let line = format_story_line(&initial_stories()[1]);
        assert_eq!(
            line,
            "Redux | Dan Abramov, Andrew Clark | 2 comments | 5 points | https://redux.js.org/"
        );
    }

    #[test]
    fn test_offline_controller_filters_and_remembers_term() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            endpoint: API_ENDPOINT.to_string(),
            offline: true,
            data_dir: dir.path().to_path_buf(),
            fetch_delay: Duration::ZERO,
            search_key: "search".to_string(),
            initial_term: "React".to_string(),
        };

        let mut controller = build_controller(&settings).unwrap();
        controller.on_search_input("redux");
        controller.mount();
        assert!(controller.wait_for_fetches(Duration::from_secs(5)));

        let visible = controller.visible_stories();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].title, "Redux");

        let store = Database::open(dir.path()).unwrap();
        assert_eq!(store.read("search").unwrap(), Some("redux".to_string()));
    }

    struct RecordingFetcher {
        urls: Mutex<Vec<String>>,
    }

    impl StoryFetcher for RecordingFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<Story>, FetchError> {
            self.urls.lock().unwrap().push(url.to_string());
            Ok(initial_stories())
        }
    }

    fn remote_controller(remembered: &str) -> (StoriesController, Arc<RecordingFetcher>) {
        let fetcher = Arc::new(RecordingFetcher {
            urls: Mutex::new(Vec::new()),
        });
        let store = Arc::new(Database::open_in_memory().unwrap());
        store.write("search", remembered).unwrap();
        let term = SemiPersistentState::new(store, "search", "React");
        let controller = StoriesController::new(fetcher.clone(), API_ENDPOINT, ViewMode::Remote, term);
        (controller, fetcher)
    }

    #[test]
    fn test_search_once_fetches_given_term() {
        let (mut controller, fetcher) = remote_controller("React");

        search_once(&mut controller, Some("Redux".to_string()), Duration::from_secs(5)).unwrap();

        assert_eq!(*fetcher.urls.lock().unwrap(), vec![format!("{}Redux", API_ENDPOINT)]);
        assert_eq!(controller.url(), format!("{}Redux", API_ENDPOINT));
        assert_eq!(controller.visible_stories().len(), 2);
    }

    #[test]
    fn test_search_once_with_remembered_term() {
        let (mut controller, fetcher) = remote_controller("Rust");
        search_once(&mut controller, None, Duration::from_secs(5)).unwrap();
        assert_eq!(*fetcher.urls.lock().unwrap(), vec![format!("{}Rust", API_ENDPOINT)]);

        let (mut controller, fetcher) = remote_controller("Rust");
        search_once(&mut controller, Some("Rust".to_string()), Duration::from_secs(5)).unwrap();
        assert_eq!(*fetcher.urls.lock().unwrap(), vec![format!("{}Rust", API_ENDPOINT)]);
    }
}
