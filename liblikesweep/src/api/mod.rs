//! Likes API abstraction and implementations
//!
//! The sweep only ever needs two calls: list the account's liked items and
//! retract one like. [`LikesApi`] is that seam; [`x::XClient`] talks to the
//! real API and [`mock::MockApi`] scripts responses for tests.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use liblikesweep::api::{LikesApi, x::XClient};
//! use liblikesweep::Config;
//!
//! # async fn example() -> liblikesweep::Result<()> {
//! let config = Arc::new(Config::load()?);
//! let client = XClient::new(config.clone())?;
//!
//! let page = client.fetch_liked(&config.account_id).await?;
//! for item in &page.data {
//!     let outcome = client.retract_like(&config.account_id, &item.id).await?;
//!     println!("{} -> {}", item.id, outcome.status);
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{LikedPage, RetractOutcome};

pub mod x;

// Available for all builds (not just tests) to support integration tests
pub mod mock;

#[async_trait]
pub trait LikesApi: Send + Sync {
    /// Fetch the current page of liked items for `account_id`
    ///
    /// # Errors
    ///
    /// Any error here is fatal to the sweep: transport failures
    /// (`ApiError::Network`), non-success statuses (`ApiError::Status`) and
    /// bodies that are not a liked-items document (`ApiError::Decode`).
    async fn fetch_liked(&self, account_id: &str) -> Result<LikedPage>;

    /// Remove the like on `item_id`
    ///
    /// Every HTTP response, including 429 and other error statuses, is an
    /// `Ok(RetractOutcome)`. `Err` means the request could not be built
    /// (`ApiError::Request`) or never completed (`ApiError::Network`).
    async fn retract_like(&self, account_id: &str, item_id: &str) -> Result<RetractOutcome>;

    /// Short identifier used in log lines
    fn name(&self) -> &str;
}
