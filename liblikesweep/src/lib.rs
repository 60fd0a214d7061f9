//! Likesweep - retract every like on an X account
//!
//! This library holds the sweep loop, the API client it drives, and the
//! configuration, signing and logging plumbing around them. The `likesweep`
//! binary is a thin CLI over [`sweep::Sweeper`].

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod oauth;
pub mod rate_limit;
pub mod sweep;
pub mod types;

// Re-export commonly used types
pub use config::{Config, Credentials, LoadOptions};
pub use error::{ApiError, ConfigError, LikesweepError, Result};
pub use events::{EventBus, SweepEvent};
pub use sweep::{StopReason, SweepOptions, SweepSummary, Sweeper};
pub use types::{LikedItem, LikedPage, RetractOutcome};
