//! # Double Spend
//!
//! An output consumed by a transaction in a live block cannot be spent again,
//! and only outputs of valid blocks can be spent at all.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::*;
    use fc_02_validation::{
        election_status, FederationValidator, RejectionKind, TransactionValidator,
        ValidationContext, ValidationError,
    };
    use shared_types::crypto::NodeKeypair;
    use shared_types::election::ElectionStatus;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_second_spend_of_output_rejected() {
        let fed = Federation::start(FederationConfig::nodes(1)).await;
        let (alice, bob, carol) = (
            NodeKeypair::generate(),
            NodeKeypair::generate(),
            NodeKeypair::generate(),
        );

        let mint = create_tx(&alice, 10);
        let (mint_block, _) = fed.commit(&mint, 0).await;
        assert_eq!(
            election_status(fed.store.as_ref(), &mint_block).await.unwrap(),
            ElectionStatus::Valid
        );

        let to_bob = transfer_tx(&mint, &alice, &bob);
        let (_, vote) = fed.commit(&to_bob, 0).await;
        assert!(vote.vote.is_block_valid);

        let to_carol = transfer_tx(&mint, &alice, &carol);
        let validator = FederationValidator::new(Arc::clone(&fed.store));
        let err = validator
            .validate(&to_carol, &ValidationContext::pending())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), RejectionKind::DoubleSpend);
        assert!(matches!(
            err,
            ValidationError::DoubleSpend { ref spender, .. } if *spender == to_bob.id
        ));

        fed.submit(&to_carol, 0).await;
        fed.wait_until_not_pending(&to_carol.id).await;
        assert!(fed
            .store
            .blocks_containing_transaction(&to_carol.id)
            .await
            .unwrap()
            .is_empty());
        let validation = fed.node(0).block_metrics.snapshot().validation;
        assert_eq!(validation.rejected(RejectionKind::DoubleSpend), 1);

        fed.stop().await;
    }

    #[tokio::test]
    async fn test_chained_transfers_accepted() {
        let fed = Federation::start(FederationConfig::nodes(1)).await;
        let (alice, bob, carol) = (
            NodeKeypair::generate(),
            NodeKeypair::generate(),
            NodeKeypair::generate(),
        );

        let mint = create_tx(&alice, 4);
        fed.commit(&mint, 0).await;
        let to_bob = transfer_tx(&mint, &alice, &bob);
        fed.commit(&to_bob, 0).await;
        let to_carol = transfer_tx(&to_bob, &bob, &carol);
        let (_, vote) = fed.commit(&to_carol, 0).await;

        assert!(vote.vote.is_block_valid);
        assert_eq!(to_carol.asset_id(), Some(mint.id.as_str()));

        fed.stop().await;
    }

    #[tokio::test]
    async fn test_spend_of_undecided_output_rejected() {
        // Two voters, one of them silent: blocks never get past undecided.
        let fed = Federation::start(FederationConfig {
            running: 1,
            silent: 1,
            ..FederationConfig::default()
        })
        .await;
        let (alice, bob) = (NodeKeypair::generate(), NodeKeypair::generate());

        let mint = create_tx(&alice, 3);
        let (mint_block, _) = fed.commit(&mint, 0).await;
        assert_eq!(
            election_status(fed.store.as_ref(), &mint_block).await.unwrap(),
            ElectionStatus::Undecided
        );

        let to_bob = transfer_tx(&mint, &alice, &bob);
        fed.submit(&to_bob, 0).await;
        fed.wait_until_not_pending(&to_bob.id).await;

        assert!(fed
            .store
            .blocks_containing_transaction(&to_bob.id)
            .await
            .unwrap()
            .is_empty());
        let validation = fed.node(0).block_metrics.snapshot().validation;
        assert_eq!(validation.rejected(RejectionKind::MissingInput), 1);

        fed.stop().await;
    }
}
