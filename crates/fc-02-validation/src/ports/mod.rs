//! Port traits. The store is consumed through `fc_01_store::DocumentStore`.

pub mod inbound;
