use reqwest::blocking::Client;
use std::time::Duration;
use thiserror::Error;

use crate::models::{initial_stories, SearchResponse, Story};

pub const API_ENDPOINT: &str = "https://hn.algolia.com/api/v1/search?query=";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Search API responded with status {0}")]
    Status(u16),

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Anything that can turn a committed search URL into a list of stories.
pub trait StoryFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<Story>, FetchError>;
}

pub fn build_search_url(endpoint: &str, term: &str) -> String {
    format!("{}{}", endpoint, urlencoding::encode(term))
}

pub struct HackerStoriesClient {
    client: Client,
}

impl HackerStoriesClient {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("hacker_stories/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    fn parse_hits(body: &str) -> Result<Vec<Story>, FetchError> {
        let response: SearchResponse = serde_json::from_str(body)?;
        Ok(response.hits)
    }
}

impl StoryFetcher for HackerStoriesClient {
    fn fetch(&self, url: &str) -> Result<Vec<Story>, FetchError> {
        tracing::debug!(url, "Fetching stories");
        let response = self.client.get(url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text()?;
        let stories = Self::parse_hits(&body)?;
        tracing::info!("Loaded {} stories", stories.len());
        Ok(stories)
    }
}

/// Serves the bundled stories after a delay, standing in for a network call.
pub struct LocalStoriesFetcher {
    stories: Vec<Story>,
    delay: Duration,
}

impl LocalStoriesFetcher {
    pub fn new(delay: Duration) -> Self {
        Self {
            stories: initial_stories(),
            delay,
        }
    }
}

impl StoryFetcher for LocalStoriesFetcher {
    fn fetch(&self, _url: &str) -> Result<Vec<Story>, FetchError> {
        std::thread::sleep(self.delay);
        Ok(self.stories.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StoryId;

    #[test]
    fn test_build_search_url() {
        assert_eq!(
            build_search_url(API_ENDPOINT, "Redux"),
            "https://hn.algolia.com/api/v1/search?query=Redux"
        );
        assert_eq!(build_search_url(API_ENDPOINT, ""), API_ENDPOINT);
    }

    #[test]
    fn test_build_search_url_encodes_term() {
        assert_eq!(
            build_search_url("http://localhost/search?query=", "rust & c++"),
            "http://localhost/search?query=rust%20%26%20c%2B%2B"
        );
    }

    #[test]
    fn test_parse_hits() {
        let stories = HackerStoriesClient::parse_hits(
            r#"{"hits": [{"objectID": "1", "title": "Redux", "url": "https://redux.js.org/",
                 "author": "dan", "num_comments": 2, "points": 5}], "page": 0}"#,
        )
        .unwrap();

        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].object_id, StoryId::from("1"));
        assert_eq!(stories[0].author, "dan");
    }

    #[test]
    fn test_parse_garbage_is_decode_error() {
        let result = HackerStoriesClient::parse_hits("<html>rate limited</html>");
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[test]
    fn test_local_fetcher_ignores_url() {
        let fetcher = LocalStoriesFetcher::new(Duration::ZERO);
        let stories = fetcher.fetch("anything").unwrap();
        assert_eq!(stories, initial_stories());
    }
}
