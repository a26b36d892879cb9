use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identifier of a story as the search API hands it out. Algolia sends
/// strings, the bundled fixtures use plain integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoryId {
    Number(i64),
    Text(String),
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoryId::Number(n) => write!(f, "{}", n),
            StoryId::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for StoryId {
    fn from(s: &str) -> Self {
        StoryId::Text(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    #[serde(rename = "objectID")]
    pub object_id: StoryId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub num_comments: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub points: i64,
}

impl Story {
    pub fn same_story(&self, other: &Story) -> bool {
        self.object_id == other.object_id
    }
}

/// Envelope returned by the search endpoint. Only `hits` is consumed.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<Story>,
}

// Ask HN posts come back with `"url": null`, comments with `"title": null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The two stories the offline version starts from.
pub fn initial_stories() -> Vec<Story> {
    vec![
        Story {
            object_id: StoryId::Number(0),
            title: "React".to_string(),
            url: "https://reactjs.org/".to_string(),
            author: "Jordan Walke".to_string(),
            num_comments: 3,
            points: 4,
        },
        Story {
            object_id: StoryId::Number(1),
            title: "Redux".to_string(),
            url: "https://redux.js.org/".to_string(),
            author: "Dan Abramov, Andrew Clark".to_string(),
            num_comments: 2,
            points: 5,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_algolia_hits() {
        let body = r#"{
            "hits": [
                {"objectID": "39000001", "title": "Show HN: a thing", "url": "https://example.com",
                 "author": "pg", "num_comments": 12, "points": 99, "created_at": "2024-01-01T00:00:00Z"},
                {"objectID": "39000002", "title": "Ask HN: anything?", "url": null,
                 "author": "dang", "num_comments": null, "points": 3}
            ],
            "nbHits": 2,
            "page": 0
        }"#;

        let response: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.hits.len(), 2);
        assert_eq!(response.hits[0].object_id, StoryId::from("39000001"));
        assert_eq!(response.hits[0].num_comments, 12);
        assert_eq!(response.hits[1].url, "");
        assert_eq!(response.hits[1].num_comments, 0);
    }

    #[test]
    fn test_numeric_object_id() {
        let story: Story = serde_json::from_str(r#"{"objectID": 7, "title": "React"}"#).unwrap();
        assert_eq!(story.object_id, StoryId::Number(7));
        assert_eq!(story.object_id.to_string(), "7");
        assert_eq!(story.points, 0);
    }

    #[test]
    fn test_missing_hits_is_an_error() {
        assert!(serde_json::from_str::<SearchResponse>(r#"{"results": []}"#).is_err());
    }

    #[test]
    fn test_same_story_compares_ids_only() {
        let stories = initial_stories();
        let mut renamed = stories[0].clone();
        renamed.title = "Something else".to_string();
        assert!(stories[0].same_story(&renamed));
        assert!(!stories[0].same_story(&stories[1]));
    }
}
