//! # Shared Bus - Store Change Notifications
//!
//! Carries document mutations from store backends to the pipelines that
//! react to them.
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐  subscribe()  ┌──────────────┐
//! │ Store backend│ ────────────→ │  ChangeBus   │ ────────────→ │  ChangeFeed  │
//! │ (one event   │               │ (broadcast)  │               │ prefeed+live │
//! │  per write)  │               └──────────────┘               └──────────────┘
//! └──────────────┘
//! ```
//!
//! Consumers see at-least-once delivery and must treat records idempotently.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod feed;
pub mod publisher;
pub mod subscriber;

pub use events::{ChangeEvent, ChangeFilter, ChangeOp, Collection};
pub use feed::{ChangeFeed, FeedItem};
pub use publisher::{ChangeBus, ChangePublisher};
pub use subscriber::Subscription;

/// Events buffered per subscriber before the slowest one starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;
