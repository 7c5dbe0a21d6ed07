//! Port traits: the document store API (inbound) and the key-value engine it
//! drives (outbound).

pub mod inbound;
pub mod outbound;
