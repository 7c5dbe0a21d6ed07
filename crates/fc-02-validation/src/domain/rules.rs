//! # Stateless Rules
//!
//! Checks that need nothing but the transaction itself. They run before any
//! store lookup so malformed input never costs a round trip.

use super::errors::{Result, ValidationError};
use shared_types::crypto::verify_signature;
use shared_types::entities::{condition_for, Operation, Transaction, TX_VERSION};
use std::collections::HashSet;

/// Shape, id and operation rules.
pub fn check_structure(tx: &Transaction) -> Result<()> {
    if tx.version != TX_VERSION {
        return Err(ValidationError::Schema(format!(
            "unsupported version {}",
            tx.version
        )));
    }
    if tx.inputs.is_empty() {
        return Err(ValidationError::Schema("no inputs".into()));
    }
    if tx.outputs.is_empty() {
        return Err(ValidationError::Schema("no outputs".into()));
    }

    for (i, output) in tx.outputs.iter().enumerate() {
        if output.amount == 0 {
            return Err(ValidationError::Schema(format!("output {i} has zero amount")));
        }
        if output.public_keys.is_empty() {
            return Err(ValidationError::Schema(format!("output {i} has no owners")));
        }
        if output.condition != condition_for(&output.public_keys) {
            return Err(ValidationError::Schema(format!(
                "output {i} condition does not match its keys"
            )));
        }
    }

    for (i, input) in tx.inputs.iter().enumerate() {
        if input.owners_before.is_empty() {
            return Err(ValidationError::Schema(format!("input {i} has no owners")));
        }
    }

    match tx.operation {
        Operation::Create => {
            if tx.inputs.len() != 1 || tx.inputs[0].fulfills.is_some() {
                return Err(ValidationError::Schema(
                    "CREATE takes exactly one input with no link".into(),
                ));
            }
            if tx.asset.id.is_some() {
                return Err(ValidationError::AssetMismatch(
                    "CREATE must not reference an asset id".into(),
                ));
            }
        }
        Operation::Transfer => {
            let mut links = HashSet::with_capacity(tx.inputs.len());
            for (i, input) in tx.inputs.iter().enumerate() {
                let Some(link) = &input.fulfills else {
                    return Err(ValidationError::Schema(format!(
                        "TRANSFER input {i} does not link an output"
                    )));
                };
                if !links.insert(link) {
                    return Err(ValidationError::DoubleSpend {
                        link: link.clone(),
                        spender: tx.id.clone(),
                    });
                }
            }
            if tx.asset.id.is_none() {
                return Err(ValidationError::AssetMismatch(
                    "TRANSFER must reference an asset id".into(),
                ));
            }
        }
    }

    let expected = tx
        .compute_id()
        .map_err(|e| ValidationError::Schema(e.to_string()))?;
    if expected != tx.id {
        return Err(ValidationError::IdMismatch {
            expected,
            actual: tx.id.clone(),
        });
    }
    Ok(())
}

/// Every input carries one valid signature per owner, over the id.
pub fn check_fulfillments(tx: &Transaction) -> Result<()> {
    for (i, input) in tx.inputs.iter().enumerate() {
        if input.fulfillment.len() != input.owners_before.len() {
            return Err(ValidationError::InvalidSignature { input: i });
        }
        let all_signed = input
            .owners_before
            .iter()
            .zip(&input.fulfillment)
            .all(|(owner, sig)| verify_signature(owner, tx.id.as_bytes(), sig));
        if !all_signed {
            return Err(ValidationError::InvalidSignature { input: i });
        }
    }
    Ok(())
}
