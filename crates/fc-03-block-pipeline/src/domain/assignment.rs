//! Assignment filter: keep only the backlog records this node must process.

use shared_types::entities::{PendingTransaction, Transaction};

/// The bare transaction if `pending` is assigned to `me`.
pub fn filter_assigned(pending: PendingTransaction, me: &str) -> Option<Transaction> {
    (pending.assignee == me).then_some(pending.transaction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::crypto::NodeKeypair;
    use shared_types::entities::Output;

    fn pending_for(assignee: &str) -> PendingTransaction {
        let owner = NodeKeypair::generate();
        let tx = Transaction::create(
            owner.public_key().to_string(),
            vec![Output::new(1, vec![owner.public_key().to_string()])],
            None,
            None,
        )
        .unwrap();
        PendingTransaction::new(tx, assignee.to_string(), 7)
    }

    #[test]
    fn test_keeps_own_assignment() {
        let pending = pending_for("me");
        let expected = pending.transaction.clone();
        assert_eq!(filter_assigned(pending, "me"), Some(expected));
    }

    #[test]
    fn test_drops_foreign_assignment() {
        assert_eq!(filter_assigned(pending_for("peer"), "me"), None);
    }
}
