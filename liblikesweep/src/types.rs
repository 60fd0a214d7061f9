//! Core types for Likesweep

use serde::{Deserialize, Serialize};

/// A post the account has liked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikedItem {
    pub id: String,
    #[serde(default)]
    pub text: String,
}

impl LikedItem {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// One response from the liked-items endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikedPage {
    /// Absent when the account has no likes left
    #[serde(default)]
    pub data: Vec<LikedItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub result_count: Option<u32>,
    #[serde(default)]
    pub next_token: Option<String>,
}

impl LikedPage {
    pub fn new(data: Vec<LikedItem>) -> Self {
        Self { data, meta: None }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

/// What came back from a single delete call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetractOutcome {
    pub status: u16,
    /// Raw `x-rate-limit-reset` value, if the response carried one
    pub rate_limit_reset: Option<String>,
    /// `data.liked` from the body, when the body parsed
    pub liked: Option<bool>,
}

impl RetractOutcome {
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            rate_limit_reset: None,
            liked: None,
        }
    }

    pub fn rate_limited(reset: Option<&str>) -> Self {
        Self {
            status: 429,
            rate_limit_reset: reset.map(str::to_string),
            liked: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }

    /// 2xx and the body does not report the post as still liked
    pub fn is_retracted(&self) -> bool {
        self.is_success() && self.liked != Some(true)
    }
}

/// Body of a successful delete: `{"data":{"liked":false}}`
#[derive(Debug, Deserialize)]
pub(crate) struct RetractBody {
    pub data: RetractData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RetractData {
    pub liked: bool,
}
