//! HTTP API handlers for the catalog

pub mod actors;
pub mod analytics;
pub mod auth;
pub mod health;
pub mod index;
pub mod movies;
pub mod ui;

pub use actors::{create_actor, delete_actor, get_actor_detail, search_actors, update_actor};
pub use analytics::{boxplot_stats, boxplot_svg};
pub use auth::{login, logout, require_login, session_status, update_settings};
pub use health::health_routes;
pub use index::get_index;
pub use movies::{
    analyse_movie, create_movie, delete_movie, get_movie_detail, predict_movie, search_movies,
    update_movie,
};
pub use ui::{serve_app_js, serve_index};

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// Plain acknowledgement, optionally with extra notices
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<String>,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            notices: Vec::new(),
        }
    }
}

/// `?search_query=` for both search endpoints; missing means match all
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub search_query: String,
}

/// Length in characters, not bytes: titles are mostly CJK
pub(crate) fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Reject empty values and values longer than `max` characters
pub(crate) fn required(value: &str, max: usize) -> ApiResult<String> {
    let value = value.trim();
    if value.is_empty() || char_len(value) > max {
        return Err(ApiError::invalid_input());
    }
    Ok(value.to_string())
}

/// Blank becomes `None`; anything longer than `max` characters is rejected
pub(crate) fn optional(value: Option<&str>, max: usize) -> ApiResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if char_len(v) > max => Err(ApiError::invalid_input()),
        Some(v) => Ok(Some(v.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths_count_characters() {
        let title = "哪".repeat(60);
        assert_eq!(required(&title, 60).unwrap(), title);
        assert!(required(&"哪".repeat(61), 60).is_err());
        assert!(required("   ", 60).is_err());
    }

    #[test]
    fn test_optional_blank_is_none() {
        assert_eq!(optional(None, 10).unwrap(), None);
        assert_eq!(optional(Some("  "), 10).unwrap(), None);
        assert_eq!(optional(Some(" 中国 "), 10).unwrap().as_deref(), Some("中国"));
        assert!(optional(Some("abcdefghijk"), 10).is_err());
    }
}
