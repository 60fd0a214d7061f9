//! Mock likes API for testing
//!
//! Behaves like the real endpoint by default: it holds a set of liked items,
//! serves them a page at a time, and a successful retraction removes the item
//! so the next fetch no longer returns it. Individual fetches and deletes can
//! be scripted to fail or to return a specific status.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::api::LikesApi;
use crate::error::{ApiError, Result};
use crate::types::{LikedItem, LikedPage, RetractOutcome};

/// A call observed by the mock, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Fetch {
        account_id: String,
    },
    Retract {
        account_id: String,
        item_id: String,
        /// Runtime clock at the time of the call (follows paused test time)
        at: tokio::time::Instant,
    },
}

#[derive(Default)]
struct MockState {
    likes: Vec<LikedItem>,
    fetch_script: VecDeque<std::result::Result<LikedPage, ApiError>>,
    retract_script: HashMap<String, VecDeque<std::result::Result<RetractOutcome, ApiError>>>,
}

/// Mock API for testing
#[derive(Clone)]
pub struct MockApi {
    page_size: usize,
    state: Arc<Mutex<MockState>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MockApi {
    /// Create a mock holding `likes`, served 100 per page
    pub fn new(likes: Vec<LikedItem>) -> Self {
        Self::with_page_size(likes, 100)
    }

    pub fn with_page_size(likes: Vec<LikedItem>, page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            state: Arc::new(Mutex::new(MockState {
                likes,
                ..Default::default()
            })),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a fetch response that overrides the stored likes for one call
    pub fn push_fetch(&self, result: std::result::Result<LikedPage, ApiError>) -> &Self {
        self.lock_state().fetch_script.push_back(result);
        self
    }

    /// Queue the result of the next retraction of `item_id`
    ///
    /// Scripted successes still remove the item unless they report
    /// `liked: true`; anything else leaves it liked.
    pub fn push_retract(
        &self,
        item_id: &str,
        result: std::result::Result<RetractOutcome, ApiError>,
    ) -> &Self {
        self.lock_state()
            .retract_script
            .entry(item_id.to_string())
            .or_default()
            .push_back(result);
        self
    }

    /// Likes the mock still holds
    pub fn remaining(&self) -> Vec<LikedItem> {
        self.lock_state().likes.clone()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock_calls().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.lock_calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Fetch { .. }))
            .count()
    }

    /// Item ids passed to `retract_like`, in call order
    pub fn retracted_ids(&self) -> Vec<String> {
        self.lock_calls()
            .iter()
            .filter_map(|c| match c {
                MockCall::Retract { item_id, .. } => Some(item_id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Runtime instants of each `retract_like` call
    pub fn retract_instants(&self) -> Vec<tokio::time::Instant> {
        self.lock_calls()
            .iter()
            .filter_map(|c| match c {
                MockCall::Retract { at, .. } => Some(*at),
                _ => None,
            })
            .collect()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<MockCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl LikesApi for MockApi {
    async fn fetch_liked(&self, account_id: &str) -> Result<LikedPage> {
        self.lock_calls().push(MockCall::Fetch {
            account_id: account_id.to_string(),
        });

        let mut state = self.lock_state();
        if let Some(scripted) = state.fetch_script.pop_front() {
            return scripted.map_err(Into::into);
        }

        let data: Vec<LikedItem> = state.likes.iter().take(self.page_size).cloned().collect();
        Ok(LikedPage::new(data))
    }

    async fn retract_like(&self, account_id: &str, item_id: &str) -> Result<RetractOutcome> {
        self.lock_calls().push(MockCall::Retract {
            account_id: account_id.to_string(),
            item_id: item_id.to_string(),
            at: tokio::time::Instant::now(),
        });

        let mut state = self.lock_state();
        let result = state
            .retract_script
            .get_mut(item_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Ok(RetractOutcome {
                    status: 200,
                    rate_limit_reset: None,
                    liked: Some(false),
                })
            });

        if matches!(&result, Ok(outcome) if outcome.is_retracted()) {
            state.likes.retain(|item| item.id != item_id);
        }

        result.map_err(Into::into)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
