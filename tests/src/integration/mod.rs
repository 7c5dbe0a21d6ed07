//! Cross-subsystem integration flows.

pub mod fixtures;

mod block_flow;
mod double_spend;
mod federation_flow;
mod vote_flow;
mod watcher_flow;
