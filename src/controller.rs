use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::db::SemiPersistentState;
use crate::filter::search_stories;
use crate::hn_client::{build_search_url, FetchError, StoryFetcher};
use crate::models::Story;
use crate::state::{stories_reducer, StoriesAction, StoriesState};

/// How the story list is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Bundled stories, narrowed live by the search term.
    Filtered,
    /// Whatever the last search request returned.
    Remote,
}

struct FetchOutcome {
    url: String,
    result: Result<Vec<Story>, FetchError>,
}

/// Single owner of the story list state. Fetches run on worker threads and
/// report back over a channel; only this type applies transitions.
pub struct StoriesController {
    fetcher: Arc<dyn StoryFetcher>,
    endpoint: String,
    mode: ViewMode,
    search_term: SemiPersistentState,
    url: String,
    state: StoriesState,
    pending: usize,
    tx: Sender<FetchOutcome>,
    rx: Receiver<FetchOutcome>,
}

impl StoriesController {
    pub fn new(
        fetcher: Arc<dyn StoryFetcher>,
        endpoint: &str,
        mode: ViewMode,
        search_term: SemiPersistentState,
    ) -> Self {
        let url = build_search_url(endpoint, search_term.get());
        let (tx, rx) = mpsc::channel();

        Self {
            fetcher,
            endpoint: endpoint.to_string(),
            mode,
            search_term,
            url,
            state: StoriesState::default(),
            pending: 0,
            tx,
            rx,
        }
    }

    /// Load stories for the initially committed search.
    pub fn mount(&mut self) {
        self.start_fetch();
    }

    pub fn on_search_input(&mut self, text: impl Into<String>) {
        self.search_term.set(text);
    }

    pub fn on_search_submit(&mut self) {
        let url = build_search_url(&self.endpoint, self.search_term.get());
        if url == self.url {
            tracing::debug!(url = %url, "Search target unchanged, not refetching");
            return;
        }
        self.url = url;
        self.start_fetch();
    }

    /// An empty term is never submitted from the search form.
    pub fn can_submit(&self) -> bool {
        !self.search_term.get().is_empty()
    }

    pub fn on_remove_item(&mut self, story: &Story) {
        self.dispatch(StoriesAction::RemoveStory(story.clone()));
    }

    pub fn dispatch(&mut self, action: StoriesAction) {
        let state = std::mem::take(&mut self.state);
        self.state = stories_reducer(state, action);
    }

    /// Apply every fetch that has finished since the last call. Returns true
    /// if anything was applied.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(outcome) = self.rx.try_recv() {
            self.apply_outcome(outcome);
            changed = true;
        }
        changed
    }

    /// Block until no fetch is outstanding or `timeout` elapses. Returns true
    /// if everything finished.
    pub fn wait_for_fetches(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(outcome) => self.apply_outcome(outcome),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
        true
    }

    pub fn visible_stories(&self) -> Vec<&Story> {
        match self.mode {
            ViewMode::Filtered => search_stories(&self.state.data, self.search_term.get()),
            ViewMode::Remote => self.state.data.iter().collect(),
        }
    }

    pub fn state(&self) -> &StoriesState {
        &self.state
    }

    pub fn search_term(&self) -> &str {
        self.search_term.get()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn is_pending(&self) -> bool {
        self.pending > 0
    }

    fn start_fetch(&mut self) {
        self.dispatch(StoriesAction::FetchInit);
        self.pending += 1;

        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.tx.clone();
        let url = self.url.clone();

        thread::spawn(move || {
            let result = fetcher.fetch(&url);
            // The receiver only goes away when the controller does.
            let _ = tx.send(FetchOutcome { url, result });
        });
    }

    fn apply_outcome(&mut self, outcome: FetchOutcome) {
        self.pending = self.pending.saturating_sub(1);
        match outcome.result {
            Ok(stories) => {
                tracing::debug!(url = %outcome.url, "Fetch finished with {} stories", stories.len());
                self.dispatch(StoriesAction::FetchSuccess(stories));
            }
            Err(e) => {
                tracing::warn!(url = %outcome.url, "Fetch failed: {}", e);
                self.dispatch(StoriesAction::FetchFailure);
            }
        }
    }
}
