//! Event system for sweep progress
//!
//! The sweep narrates every fetch, retraction and wait through an in-process
//! broadcast bus. The CLI renders the events as console lines; tests
//! subscribe to assert on what was reported.
//!
//! If no subscribers exist, events are discarded without blocking the sweep.
//!
//! # Example
//!
//! ```no_run
//! use liblikesweep::events::{EventBus, SweepEvent};
//!
//! # async fn example() {
//! let bus = EventBus::default();
//! let mut console = bus.subscribe();
//!
//! bus.emit(SweepEvent::Exhausted);
//!
//! while let Some(event) = console.recv().await {
//!     println!("{}", event);
//! }
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

pub type EventReceiver = mpsc::UnboundedReceiver<SweepEvent>;

/// Fan-out of sweep events
///
/// Each subscriber has its own unbounded queue, so a slow reader delays its
/// own output but never loses a line. Receivers see the stream end once the
/// last clone of the bus is dropped.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<SweepEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event emitted from now on
    pub fn subscribe(&self) -> EventReceiver {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.lock_subscribers().push(sender);
        receiver
    }

    /// Emit an event to all subscribers; never blocks
    pub fn emit(&self, event: SweepEvent) {
        // Subscribers whose receiver is gone are dropped here
        self.lock_subscribers()
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<SweepEvent>>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Events emitted while sweeping likes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SweepEvent {
    FetchStarted {
        /// 1-based fetch counter
        page: u32,
    },

    PageFetched {
        page: u32,
        count: usize,
    },

    /// A fetch came back empty; the sweep is done
    Exhausted,

    /// Dry run: the item would have been retracted
    WouldRetract {
        id: String,
        text: String,
    },

    Retracted {
        id: String,
        text: String,
        status: u16,
    },

    RetractFailed {
        id: String,
        error: String,
    },

    RateLimited {
        wait_secs: u64,
        /// Epoch seconds from the reset header, when it parsed
        reset_at: Option<i64>,
    },

    PageLimitReached {
        pages: u32,
    },

    Cancelled,
}

/// Console rendering of each event
impl fmt::Display for SweepEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepEvent::FetchStarted { page } => write!(f, "Fetching liked tweets (page {})...", page),
            SweepEvent::PageFetched { count, .. } => write!(f, "Found {} liked tweet(s)", count),
            SweepEvent::Exhausted => write!(f, "No more likes to delete."),
            SweepEvent::WouldRetract { id, text } => {
                write!(f, "Would delete like for tweet {}: \"{}\"", id, text)
            }
            SweepEvent::Retracted { text, status, .. } => write!(
                f,
                "Deleted like for tweet: \"{}\", status code: {}",
                text, status
            ),
            SweepEvent::RetractFailed { id, error } => {
                write!(f, "Error deleting like for tweet {}: {}", id, error)
            }
            SweepEvent::RateLimited { wait_secs, .. } => write!(
                f,
                "Rate limit exceeded. Waiting for reset...\nWaiting for {}",
                humantime::format_duration(std::time::Duration::from_secs(*wait_secs))
            ),
            SweepEvent::PageLimitReached { pages } => {
                write!(f, "Stopping after {} page(s) as requested.", pages)
            }
            SweepEvent::Cancelled => write!(f, "Cancelled, stopping."),
        }
    }
}
