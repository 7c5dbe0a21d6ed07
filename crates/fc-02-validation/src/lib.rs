//! # Transaction Validation (fc-02)
//!
//! Decides whether a transaction may be written into a block, or, during a
//! vote, whether it belongs in the block it was found in.
//!
//! ## Rejection Reasons
//!
//! | Kind            | Raised when                                              |
//! |-----------------|----------------------------------------------------------|
//! | `schema`        | bad version, empty inputs/outputs, id mismatch           |
//! | `signature`     | fulfillment fails, or owners differ from the spent output |
//! | `duplicate`     | already in a valid or undecided block                    |
//! | `missing_input` | spent transaction unknown, or not yet in a valid block   |
//! | `double_spend`  | output already spent by a live transaction               |
//! | `amount`        | inputs and outputs do not balance                        |
//! | `asset`         | input assets and declared asset id disagree              |
//!
//! A rejection is a filter decision, never a stage failure. Only store
//! connectivity errors propagate out of [`screen`].
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Rejection reasons and stateless rules
//! - `ports/` - `TransactionValidator` trait and validation context
//! - `service.rs` - `FederationValidator` over the document store
//! - `metrics.rs` - Accept/reject counters by reason

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

pub use domain::{RejectionKind, Result, ValidationError};
pub use metrics::{ValidationMetrics, ValidationSnapshot};
pub use ports::inbound::{TransactionValidator, ValidationContext};
pub use service::{election_status, screen, verdict, FederationValidator};

#[cfg(any(test, feature = "test-utils"))]
pub use ports::inbound::MockValidator;
