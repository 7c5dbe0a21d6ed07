//! # Key Layout
//!
//! Documents and secondary indexes share one ordered key space. Numeric
//! components are zero padded so lexicographic order equals numeric order.
//!
//! | Prefix                | Key suffix                               | Value     | Index                         |
//! |-----------------------|------------------------------------------|-----------|-------------------------------|
//! | `backlog/`            | `{tx}`                                   | document  | unique transaction id         |
//! | `backlog_by_assignee/`| `{node}/{ts}/{tx}`                       | tx id     | (assignee, assignment time)   |
//! | `backlog_by_time/`    | `{ts}/{tx}`                              | tx id     | assignment time               |
//! | `bigchain/`           | `{block}`                                | document  | unique block id               |
//! | `bigchain_by_tx/`     | `{tx}/{block}`                           | block id  | block transaction id          |
//! | `bigchain_by_spent/`  | `{tx}/{output}/{spender}/{block}`        | block id  | spent outputs                 |
//! | `bigchain_by_time/`   | `{ts}/{block}`                           | block id  | block timestamp               |
//! | `bigchain_by_number/` | `{n}/{block}`                            | block id  | block number                  |
//! | `votes/`              | `{block}/{node}`                         | document  | unique (block, voter)         |
//! | `votes_by_node/`      | `{node}/{block}`                         | block id  | voter                         |
//! | `meta/genesis`        |                                          | block id  |                               |

use shared_types::entities::{BlockRecord, OutputLink, PendingTransaction, Timestamp};

pub const BACKLOG: &str = "backlog/";
pub const BACKLOG_BY_ASSIGNEE: &str = "backlog_by_assignee/";
pub const BACKLOG_BY_TIME: &str = "backlog_by_time/";
pub const BIGCHAIN: &str = "bigchain/";
pub const BIGCHAIN_BY_TX: &str = "bigchain_by_tx/";
pub const BIGCHAIN_BY_SPENT: &str = "bigchain_by_spent/";
pub const BIGCHAIN_BY_TIME: &str = "bigchain_by_time/";
pub const BIGCHAIN_BY_NUMBER: &str = "bigchain_by_number/";
pub const VOTES: &str = "votes/";
pub const VOTES_BY_NODE: &str = "votes_by_node/";
pub const GENESIS: &str = "meta/genesis";

fn key(parts: std::fmt::Arguments<'_>) -> Vec<u8> {
    parts.to_string().into_bytes()
}

pub fn pending(id: &str) -> Vec<u8> {
    key(format_args!("{BACKLOG}{id}"))
}

pub fn pending_by_assignee(p: &PendingTransaction) -> Vec<u8> {
    key(format_args!(
        "{BACKLOG_BY_ASSIGNEE}{}/{:020}/{}",
        p.assignee,
        p.assignment_timestamp,
        p.id()
    ))
}

pub fn assignee_prefix(node: &str) -> Vec<u8> {
    key(format_args!("{BACKLOG_BY_ASSIGNEE}{node}/"))
}

pub fn pending_by_time(p: &PendingTransaction) -> Vec<u8> {
    key(format_args!(
        "{BACKLOG_BY_TIME}{:020}/{}",
        p.assignment_timestamp,
        p.id()
    ))
}

/// Assignment timestamp encoded in a `backlog_by_time/` key.
pub fn timestamp_of_time_key(raw: &[u8]) -> Option<Timestamp> {
    let text = std::str::from_utf8(raw).ok()?;
    let rest = text.strip_prefix(BACKLOG_BY_TIME)?;
    rest.split('/').next()?.parse().ok()
}

pub fn block(id: &str) -> Vec<u8> {
    key(format_args!("{BIGCHAIN}{id}"))
}

pub fn block_by_tx(tx_id: &str, block_id: &str) -> Vec<u8> {
    key(format_args!("{BIGCHAIN_BY_TX}{tx_id}/{block_id}"))
}

pub fn block_by_tx_prefix(tx_id: &str) -> Vec<u8> {
    key(format_args!("{BIGCHAIN_BY_TX}{tx_id}/"))
}

pub fn spent(link: &OutputLink, spender: &str, block_id: &str) -> Vec<u8> {
    key(format_args!(
        "{BIGCHAIN_BY_SPENT}{}/{:010}/{spender}/{block_id}",
        link.transaction_id, link.output_index
    ))
}

pub fn spent_prefix(link: &OutputLink) -> Vec<u8> {
    key(format_args!(
        "{BIGCHAIN_BY_SPENT}{}/{:010}/",
        link.transaction_id, link.output_index
    ))
}

/// Spending transaction id encoded in a `bigchain_by_spent/` key.
pub fn spender_of_spent_key(raw: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(raw).ok()?;
    let rest = text.strip_prefix(BIGCHAIN_BY_SPENT)?;
    rest.split('/').nth(2).map(str::to_string)
}

pub fn block_by_time(b: &BlockRecord) -> Vec<u8> {
    key(format_args!("{BIGCHAIN_BY_TIME}{:020}/{}", b.block.timestamp, b.id))
}

pub fn block_by_number(b: &BlockRecord) -> Vec<u8> {
    key(format_args!(
        "{BIGCHAIN_BY_NUMBER}{:020}/{}",
        b.block.block_number, b.id
    ))
}

/// Block number encoded in a `bigchain_by_number/` key.
pub fn number_of_number_key(raw: &[u8]) -> Option<u64> {
    let text = std::str::from_utf8(raw).ok()?;
    let rest = text.strip_prefix(BIGCHAIN_BY_NUMBER)?;
    rest.split('/').next()?.parse().ok()
}

pub fn vote(block_id: &str, node: &str) -> Vec<u8> {
    key(format_args!("{VOTES}{block_id}/{node}"))
}

pub fn votes_for_block_prefix(block_id: &str) -> Vec<u8> {
    key(format_args!("{VOTES}{block_id}/"))
}

pub fn vote_by_node(node: &str, block_id: &str) -> Vec<u8> {
    key(format_args!("{VOTES_BY_NODE}{node}/{block_id}"))
}

pub fn votes_by_node_prefix(node: &str) -> Vec<u8> {
    key(format_args!("{VOTES_BY_NODE}{node}/"))
}

pub fn genesis() -> Vec<u8> {
    GENESIS.as_bytes().to_vec()
}
