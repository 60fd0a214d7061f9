//! The like retraction loop
//!
//! [`Sweeper::run`] alternates between two phases until the account has no
//! likes left:
//!
//! - `Fetching`: ask the API for the current page of liked items. An empty
//!   page ends the run; any error ends it with that error.
//! - `Deleting`: retract each item of the page in order. A failed delete is
//!   reported and skipped. A 429 pauses the whole sweep until the
//!   server-provided reset time before the next delete.
//!
//! The loop re-fetches after every page instead of following a pagination
//! cursor: retracted likes drop out of the listing, so the next fetch returns
//! whatever is left.
//!
//! # Example
//!
//! ```no_run
//! use liblikesweep::api::mock::MockApi;
//! use liblikesweep::sweep::{SweepOptions, Sweeper};
//! use liblikesweep::LikedItem;
//!
//! # async fn example() -> liblikesweep::Result<()> {
//! let api = MockApi::new(vec![LikedItem::new("1", "a")]);
//! let summary = Sweeper::new(&api, "12345", SweepOptions::default())
//!     .run()
//!     .await?;
//! assert_eq!(summary.retracted, 1);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::LikesApi;
use crate::config::SweepConfig;
use crate::error::Result;
use crate::events::{EventBus, SweepEvent};
use crate::rate_limit::{self, RateLimitSignal};
use crate::types::{LikedItem, LikedPage};

#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// Report what would be retracted without deleting anything
    pub dry_run: bool,
    /// Stop after this many non-empty pages
    pub max_pages: Option<u32>,
    /// Pause used when a 429 carries no usable reset time
    pub default_rate_limit_wait: Duration,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self::from(&SweepConfig::default())
    }
}

impl From<&SweepConfig> for SweepOptions {
    fn from(config: &SweepConfig) -> Self {
        Self {
            dry_run: config.dry_run,
            max_pages: config.max_pages,
            default_rate_limit_wait: Duration::from_secs(config.default_rate_limit_wait_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A fetch returned no items
    #[default]
    Exhausted,
    Cancelled,
    PageLimit,
    /// Dry run listed the first page
    DryRun,
}

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub pages_fetched: u32,
    pub attempted: u32,
    /// Deletes answered with a 2xx status and not reported as still liked
    pub retracted: u32,
    /// Deletes answered with any other status (429 included), or with a 2xx
    /// whose body says the post is still liked
    pub rejected: u32,
    /// Deletes that failed before a response arrived
    pub failed: u32,
    pub rate_limited: u32,
    pub stop_reason: StopReason,
}

enum Phase {
    Fetching,
    Deleting(LikedPage),
    Stopped(StopReason),
}

pub struct Sweeper<'a> {
    api: &'a dyn LikesApi,
    account_id: &'a str,
    options: SweepOptions,
    events: EventBus,
    cancel: CancellationToken,
    pages_processed: u32,
    summary: SweepSummary,
}

impl<'a> Sweeper<'a> {
    pub fn new(api: &'a dyn LikesApi, account_id: &'a str, options: SweepOptions) -> Self {
        Self {
            api,
            account_id,
            options,
            events: EventBus::default(),
            cancel: CancellationToken::new(),
            pages_processed: 0,
            summary: SweepSummary::default(),
        }
    }

    /// Publish progress on `events` instead of a private bus
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Stop at the next network call or during a rate-limit pause once
    /// `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Drive fetch and delete passes until the likes run out
    ///
    /// # Errors
    ///
    /// Returns the first fetch error. Delete errors never end the run.
    pub async fn run(mut self) -> Result<SweepSummary> {
        info!(
            api = self.api.name(),
            account = self.account_id,
            dry_run = self.options.dry_run,
            "Starting like sweep"
        );

        let mut phase = Phase::Fetching;
        loop {
            phase = match phase {
                Phase::Fetching => self.fetch().await?,
                Phase::Deleting(page) => self.delete_pass(page).await,
                Phase::Stopped(reason) => {
                    self.summary.stop_reason = reason;
                    info!(
                        reason = ?reason,
                        retracted = self.summary.retracted,
                        failed = self.summary.failed,
                        "Like sweep finished"
                    );
                    return Ok(self.summary);
                }
            };
        }
    }

    async fn fetch(&mut self) -> Result<Phase> {
        if self.cancel.is_cancelled() {
            return Ok(self.cancelled());
        }

        if let Some(max_pages) = self.options.max_pages {
            if self.pages_processed >= max_pages {
                self.events
                    .emit(SweepEvent::PageLimitReached { pages: max_pages });
                return Ok(Phase::Stopped(StopReason::PageLimit));
            }
        }

        self.summary.pages_fetched += 1;
        let page_number = self.summary.pages_fetched;
        self.events
            .emit(SweepEvent::FetchStarted { page: page_number });

        let page = self.api.fetch_liked(self.account_id).await?;
        debug!(
            page = page_number,
            count = page.len(),
            result_count = ?page.meta.as_ref().and_then(|meta| meta.result_count),
            "Fetched liked items"
        );

        if page.is_empty() {
            info!("No more likes to delete");
            self.events.emit(SweepEvent::Exhausted);
            return Ok(Phase::Stopped(StopReason::Exhausted));
        }

        self.events.emit(SweepEvent::PageFetched {
            page: page_number,
            count: page.len(),
        });

        if self.options.dry_run {
            for item in &page.data {
                self.events.emit(SweepEvent::WouldRetract {
                    id: item.id.clone(),
                    text: item.text.clone(),
                });
            }
            return Ok(Phase::Stopped(StopReason::DryRun));
        }

        Ok(Phase::Deleting(page))
    }

    async fn delete_pass(&mut self, page: LikedPage) -> Phase {
        for item in page.data {
            if self.cancel.is_cancelled() {
                return self.cancelled();
            }

            if !self.retract(item).await {
                return self.cancelled();
            }
        }

        self.pages_processed += 1;
        Phase::Fetching
    }

    /// Retract one like. Returns false if cancelled during a rate-limit pause.
    async fn retract(&mut self, item: LikedItem) -> bool {
        self.summary.attempted += 1;

        let outcome = match self.api.retract_like(self.account_id, &item.id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.summary.failed += 1;
                warn!(id = %item.id, error = %e, "Error deleting like");
                self.events.emit(SweepEvent::RetractFailed {
                    id: item.id,
                    error: e.to_string(),
                });
                return true;
            }
        };

        if outcome.is_retracted() {
            self.summary.retracted += 1;
        } else {
            if outcome.is_success() {
                warn!(
                    id = %item.id,
                    status = outcome.status,
                    "Delete answered but post is still liked"
                );
            }
            self.summary.rejected += 1;
        }
        info!(id = %item.id, status = outcome.status, "Deleted like");
        self.events.emit(SweepEvent::Retracted {
            id: item.id,
            text: item.text,
            status: outcome.status,
        });

        if !outcome.is_rate_limited() {
            return true;
        }

        self.summary.rate_limited += 1;
        let signal = RateLimitSignal::from_header(outcome.rate_limit_reset.as_deref());
        let wait = rate_limit::wait_for(
            signal,
            chrono::Utc::now(),
            self.options.default_rate_limit_wait,
        );

        warn!(wait = ?wait, "Rate limit exceeded, waiting for reset");
        self.events.emit(SweepEvent::RateLimited {
            wait_secs: ceil_secs(wait),
            reset_at: signal.map(|s| s.reset_at.timestamp()),
        });

        self.pause(wait).await
    }

    /// Sleep for `wait`; false if cancelled first
    async fn pause(&self, wait: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(wait) => true,
        }
    }

    fn cancelled(&self) -> Phase {
        info!("Sweep cancelled");
        self.events.emit(SweepEvent::Cancelled);
        Phase::Stopped(StopReason::Cancelled)
    }
}

fn ceil_secs(wait: Duration) -> u64 {
    if wait.subsec_nanos() > 0 {
        wait.as_secs() + 1
    } else {
        wait.as_secs()
    }
}
