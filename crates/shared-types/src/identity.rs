//! # Node Identity
//!
//! The explicit context each stage receives at spawn time: this node's
//! keypair and the federation it votes with.

use crate::crypto::NodeKeypair;
use crate::entities::PublicKey;
use std::sync::Arc;

/// This node's keys plus the ordered federation membership.
#[derive(Debug, Clone)]
pub struct NodeIdentity {
    keypair: Arc<NodeKeypair>,
    federation: Arc<Vec<PublicKey>>,
}

impl NodeIdentity {
    /// Build an identity. The local key is added to the federation if absent.
    pub fn new(keypair: NodeKeypair, federation: Vec<PublicKey>) -> Self {
        let mut federation = federation;
        if !federation.iter().any(|k| k == keypair.public_key()) {
            federation.push(keypair.public_key().to_string());
        }
        Self {
            keypair: Arc::new(keypair),
            federation: Arc::new(federation),
        }
    }

    /// Single-node federation, mostly for tests and local runs.
    pub fn solo(keypair: NodeKeypair) -> Self {
        Self::new(keypair, Vec::new())
    }

    /// This node's public key.
    pub fn me(&self) -> &str {
        self.keypair.public_key()
    }

    pub fn keypair(&self) -> &NodeKeypair {
        &self.keypair
    }

    /// All federation members, this node included.
    pub fn federation(&self) -> &[PublicKey] {
        &self.federation
    }

    /// Federation members other than this node.
    pub fn peers(&self) -> impl Iterator<Item = &PublicKey> {
        let me = self.me().to_string();
        self.federation.iter().filter(move |k| **k != me)
    }

    /// Member after `current` in federation order, wrapping around.
    ///
    /// Unknown keys rotate to the first member.
    pub fn next_in_rotation(&self, current: &str) -> &str {
        let position = self.federation.iter().position(|k| k == current);
        let next = match position {
            Some(i) => (i + 1) % self.federation.len(),
            None => 0,
        };
        &self.federation[next]
    }

    /// A uniformly random federation member.
    pub fn random_member(&self) -> &str {
        use rand::seq::SliceRandom;
        self.federation
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or_else(|| self.me())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_is_always_member() {
        let keys = NodeKeypair::generate();
        let me = keys.public_key().to_string();
        let identity = NodeIdentity::new(keys, vec!["peer-a".into()]);

        assert_eq!(identity.federation().len(), 2);
        assert!(identity.federation().contains(&me));
        assert_eq!(identity.peers().count(), 1);
    }

    #[test]
    fn test_rotation_wraps() {
        let keys = NodeKeypair::generate();
        let me = keys.public_key().to_string();
        let identity = NodeIdentity::new(keys, vec!["a".into(), "b".into()]);

        assert_eq!(identity.next_in_rotation("a"), "b");
        assert_eq!(identity.next_in_rotation("b"), me);
        assert_eq!(identity.next_in_rotation(&me), "a");
        assert_eq!(identity.next_in_rotation("unknown"), "a");
    }

    #[test]
    fn test_solo_rotation_returns_self() {
        let identity = NodeIdentity::solo(NodeKeypair::generate());
        let me = identity.me().to_string();
        assert_eq!(identity.next_in_rotation(&me), me);
        assert_eq!(identity.random_member(), me);
    }
}
