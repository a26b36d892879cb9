use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Story;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoriesState {
    pub data: Vec<Story>,
    pub is_loading: bool,
    pub is_error: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoriesAction {
    FetchInit,
    FetchSuccess(Vec<Story>),
    FetchFailure,
    RemoveStory(Story),
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Unrecognized action: {0}")]
    Unrecognized(String),

    #[error("Malformed action: {0}")]
    Malformed(#[from] serde_json::Error),
}

const ACTION_TYPES: [&str; 4] = ["FETCH_INIT", "FETCH_SUCCESS", "FETCH_FAILURE", "REMOVE_STORY"];

impl StoriesAction {
    /// Decode one action from its JSON form, e.g.
    /// `{"type": "REMOVE_STORY", "payload": {"objectID": 0}}`.
    pub fn from_json(json: &str) -> Result<Self, ActionError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();

        if !ACTION_TYPES.contains(&kind.as_str()) {
            return Err(ActionError::Unrecognized(kind));
        }

        Ok(serde_json::from_value(value)?)
    }
}

pub fn stories_reducer(state: StoriesState, action: StoriesAction) -> StoriesState {
    match action {
        StoriesAction::FetchInit => StoriesState {
            is_loading: true,
            is_error: false,
            ..state
        },
        StoriesAction::FetchSuccess(stories) => StoriesState {
            data: stories,
            is_loading: false,
            is_error: false,
        },
        StoriesAction::FetchFailure => StoriesState {
            is_loading: false,
            is_error: true,
            ..state
        },
        StoriesAction::RemoveStory(item) => StoriesState {
            data: state
                .data
                .into_iter()
                .filter(|story| !story.same_story(&item))
                .collect(),
            ..state
        },
    }
}
