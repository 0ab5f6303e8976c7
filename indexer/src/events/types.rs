//! Event kinds and persisted record types.
//!
//! The oracle emits four event types; each becomes one append-only table
//! row. Records are immutable once written and carry a deterministic id so
//! re-delivery of the same log is a no-op at the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tiny_keccak::{Hasher, Keccak};

/// The four tracked event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    /// A consumer requested entropy.
    EntropyRequested,
    /// A pending request was fulfilled.
    EntropyFulfilled,
    /// The fee recipient address changed.
    FeeRecipientUpdated,
    /// The chaos engine address changed.
    ChaosEngineUpdated,
}

impl EventKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::EntropyRequested,
        Self::EntropyFulfilled,
        Self::FeeRecipientUpdated,
        Self::ChaosEngineUpdated,
    ];

    /// Returns the kind's name as used in the API `type` parameter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EntropyRequested => "EntropyRequested",
            Self::EntropyFulfilled => "EntropyFulfilled",
            Self::FeeRecipientUpdated => "FeeRecipientUpdated",
            Self::ChaosEngineUpdated => "ChaosEngineUpdated",
        }
    }

    /// Parses a kind from its name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// Returns the full Solidity event signature.
    #[must_use]
    pub const fn signature(&self) -> &'static str {
        match self {
            Self::EntropyRequested => "EntropyRequested(uint256,bytes32,bytes32,uint256)",
            Self::EntropyFulfilled => "EntropyFulfilled(uint256,bytes32,bytes32)",
            Self::FeeRecipientUpdated => "FeeRecipientUpdated(address,address)",
            Self::ChaosEngineUpdated => "ChaosEngineUpdated(address,address)",
        }
    }

    /// Returns the event's `topics[0]` value: `keccak256(signature)`.
    #[must_use]
    pub fn topic0(&self) -> String {
        let mut hasher = Keccak::v256();
        hasher.update(self.signature().as_bytes());
        let mut out = [0u8; 32];
        hasher.finalize(&mut out);
        format!("0x{}", hex::encode(out))
    }

    /// Returns the store table this kind persists into.
    #[must_use]
    pub const fn table(&self) -> &'static str {
        match self {
            Self::EntropyRequested => "entropy_requested",
            Self::EntropyFulfilled => "entropy_fulfilled",
            Self::FeeRecipientUpdated => "fee_recipient_updated",
            Self::ChaosEngineUpdated => "chaos_engine_updated",
        }
    }

    /// Returns the number of indexed arguments (topics beyond `topics[0]`).
    #[must_use]
    pub const fn indexed_args(&self) -> usize {
        // All four signatures index exactly two arguments.
        2
    }

    /// Returns true if records of this kind carry a `requestId`.
    #[must_use]
    pub const fn has_request_id(&self) -> bool {
        matches!(self, Self::EntropyRequested | Self::EntropyFulfilled)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific fields of an event record.
///
/// `hashed_consumer` and `hashed_tag` are opaque 32-byte digests, not
/// addresses; resolving them to a sender requires a transaction lookup,
/// which is left to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    /// Fields of an `EntropyRequested` event.
    #[serde(rename_all = "camelCase")]
    EntropyRequested {
        /// Request id as a decimal string (0x-hex if it exceeds u128).
        request_id: String,
        /// Opaque 32-byte consumer digest, 0x-hex.
        hashed_consumer: String,
        /// Opaque 32-byte tag digest, 0x-hex.
        hashed_tag: String,
        /// Fee paid in wei, decimal string (0x-hex if it exceeds u128).
        fee_paid: String,
    },
    /// Fields of an `EntropyFulfilled` event.
    #[serde(rename_all = "camelCase")]
    EntropyFulfilled {
        /// Request id as a decimal string.
        request_id: String,
        /// Opaque 32-byte consumer digest, 0x-hex.
        hashed_consumer: String,
        /// Opaque 32-byte tag digest, 0x-hex.
        hashed_tag: String,
    },
    /// Fields of a `FeeRecipientUpdated` event.
    #[serde(rename_all = "camelCase")]
    FeeRecipientUpdated {
        /// Previous fee recipient address.
        old_recipient: String,
        /// New fee recipient address.
        new_recipient: String,
    },
    /// Fields of a `ChaosEngineUpdated` event.
    #[serde(rename_all = "camelCase")]
    ChaosEngineUpdated {
        /// Previous chaos engine address.
        old_engine: String,
        /// New chaos engine address.
        new_engine: String,
    },
}

impl EventPayload {
    /// Returns the kind this payload belongs to.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::EntropyRequested { .. } => EventKind::EntropyRequested,
            Self::EntropyFulfilled { .. } => EventKind::EntropyFulfilled,
            Self::FeeRecipientUpdated { .. } => EventKind::FeeRecipientUpdated,
            Self::ChaosEngineUpdated { .. } => EventKind::ChaosEngineUpdated,
        }
    }

    /// Returns the request id, for the kinds that carry one.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::EntropyRequested { request_id, .. }
            | Self::EntropyFulfilled { request_id, .. } => Some(request_id),
            _ => None,
        }
    }
}

/// One persisted event record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Deterministic id derived from `(transactionHash, logIndex)`.
    pub id: String,

    /// Which of the four tracked events this is.
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Block the event was emitted in.
    pub block_number: u64,

    /// Hash of the emitting transaction.
    pub transaction_hash: String,

    /// When this record was first persisted.
    pub created_at: DateTime<Utc>,

    /// Type-specific fields.
    #[serde(flatten)]
    pub payload: EventPayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_name_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::parse("Bogus"), None);
    }

    #[test]
    fn topic0_is_32_byte_hex() {
        for kind in EventKind::ALL {
            let topic = kind.topic0();
            assert!(topic.starts_with("0x"));
            assert_eq!(topic.len(), 2 + 64);
        }
    }

    #[test]
    fn topic0_distinct_per_kind() {
        let topics: std::collections::HashSet<_> =
            EventKind::ALL.iter().map(EventKind::topic0).collect();
        assert_eq!(topics.len(), 4);
    }

    #[test]
    fn request_id_only_on_entropy_kinds() {
        assert!(EventKind::EntropyRequested.has_request_id());
        assert!(EventKind::EntropyFulfilled.has_request_id());
        assert!(!EventKind::FeeRecipientUpdated.has_request_id());
        assert!(!EventKind::ChaosEngineUpdated.has_request_id());
    }

    #[test]
    fn record_serializes_with_camel_case_and_type_tag() {
        let record = EventRecord {
            id: "deadbeef".into(),
            kind: EventKind::EntropyRequested,
            block_number: 1234,
            transaction_hash: "0xabc".into(),
            created_at: Utc::now(),
            payload: EventPayload::EntropyRequested {
                request_id: "42".into(),
                hashed_consumer: format!("0x{}", "11".repeat(32)),
                hashed_tag: format!("0x{}", "22".repeat(32)),
                fee_paid: "1000".into(),
            },
        };

        let json = serde_json::to_value(&record).expect("record should serialize");
        assert_eq!(json["type"], "EntropyRequested");
        assert_eq!(json["blockNumber"], 1234);
        assert_eq!(json["requestId"], "42");
        assert_eq!(json["feePaid"], "1000");
    }
}
