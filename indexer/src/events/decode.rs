//! Log normalizer.
//!
//! Turns a raw provider log into exactly one typed [`EventRecord`]. The
//! primary path decodes strictly against the known signature layout
//! (indexed arguments from topics, the rest from the data words). If that
//! fails, a fallback path reconstructs what it can from raw topic
//! positions, so partial ABI metadata does not cost us the record. A log
//! that cannot be decoded either way is reported as [`DecodeOutcome::Failed`]
//! and skipped by the scheduler; it never fails a batch.

use chrono::Utc;
use tiny_keccak::{Hasher, Keccak};

use super::types::{EventKind, EventPayload, EventRecord};
use crate::error::DecodeError;
use crate::rpc::RawLog;

/// Zero digest used when a fallback decode is missing a topic.
const ZERO_DIGEST: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000000";

/// Zero address used when a fallback decode is missing a topic.
const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Result of normalizing one raw log.
#[derive(Debug, Clone)]
pub enum DecodeOutcome {
    /// Structured decode against the event signature succeeded.
    Decoded(EventRecord),
    /// Structured decode failed; fields were recovered from raw topics.
    Fallback(EventRecord),
    /// The log is undecodable either way.
    Failed(DecodeError),
}

impl DecodeOutcome {
    /// Returns the record, if the log decoded on either path.
    #[must_use]
    pub fn into_record(self) -> Option<EventRecord> {
        match self {
            Self::Decoded(record) | Self::Fallback(record) => Some(record),
            Self::Failed(_) => None,
        }
    }

    /// Returns true if the fallback path produced this outcome.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Computes the deterministic record id for a log.
///
/// The id is `keccak256("<tx_hash>:<log_index>")` with the transaction
/// hash lowercased first, so the same log always maps to the same row.
#[must_use]
pub fn event_id(transaction_hash: &str, log_index: u64) -> String {
    let mut hasher = Keccak::v256();
    hasher.update(transaction_hash.to_ascii_lowercase().as_bytes());
    hasher.update(b":");
    hasher.update(log_index.to_string().as_bytes());
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    hex::encode(out)
}

/// Normalizes one raw log of the given kind.
#[must_use]
pub fn decode_log(kind: EventKind, log: &RawLog) -> DecodeOutcome {
    let envelope = match Envelope::from_log(log) {
        Ok(envelope) => envelope,
        Err(err) => return DecodeOutcome::Failed(err),
    };

    match decode_structured(kind, log) {
        Ok(payload) => DecodeOutcome::Decoded(envelope.into_record(kind, payload)),
        Err(primary) => match decode_fallback(kind, log) {
            Ok(payload) => DecodeOutcome::Fallback(envelope.into_record(kind, payload)),
            // Report the structured error; it names the original defect.
            Err(_) => DecodeOutcome::Failed(primary),
        },
    }
}

/// Fields shared by every record, parsed once before either decode path.
struct Envelope {
    block_number: u64,
    transaction_hash: String,
    log_index: u64,
}

impl Envelope {
    fn from_log(log: &RawLog) -> Result<Self, DecodeError> {
        let block_number = log.block_number_u64().ok_or_else(|| DecodeError::BadHex {
            field: "blockNumber",
            value: log.block_number.clone(),
        })?;
        let log_index = log.log_index_u64().ok_or_else(|| DecodeError::BadHex {
            field: "logIndex",
            value: log.log_index.clone(),
        })?;
        Ok(Self {
            block_number,
            transaction_hash: log.transaction_hash.to_ascii_lowercase(),
            log_index,
        })
    }

    fn into_record(self, kind: EventKind, payload: EventPayload) -> EventRecord {
        EventRecord {
            id: event_id(&self.transaction_hash, self.log_index),
            kind,
            block_number: self.block_number,
            transaction_hash: self.transaction_hash,
            created_at: Utc::now(),
            payload,
        }
    }
}

/// Strict decode against the declared signature layout.
fn decode_structured(kind: EventKind, log: &RawLog) -> Result<EventPayload, DecodeError> {
    let expected = 1 + kind.indexed_args();
    if log.topics.len() != expected {
        return Err(DecodeError::TopicCount {
            actual: log.topics.len(),
            expected,
        });
    }
    let topic1 = topic_bytes(&log.topics, 1)?;
    let topic2 = topic_bytes(&log.topics, 2)?;
    let data = data_bytes(&log.data)?;

    match kind {
        EventKind::EntropyRequested => Ok(EventPayload::EntropyRequested {
            request_id: u256_string(&topic1),
            hashed_consumer: digest_string(&topic2),
            hashed_tag: digest_string(&word(&data, 0)?),
            fee_paid: u256_string(&word(&data, 1)?),
        }),
        EventKind::EntropyFulfilled => Ok(EventPayload::EntropyFulfilled {
            request_id: u256_string(&topic1),
            hashed_consumer: digest_string(&topic2),
            hashed_tag: digest_string(&word(&data, 0)?),
        }),
        EventKind::FeeRecipientUpdated => Ok(EventPayload::FeeRecipientUpdated {
            old_recipient: address_string(&topic1),
            new_recipient: address_string(&topic2),
        }),
        EventKind::ChaosEngineUpdated => Ok(EventPayload::ChaosEngineUpdated {
            old_engine: address_string(&topic1),
            new_engine: address_string(&topic2),
        }),
    }
}

/// Positional recovery from whatever topics are present.
///
/// `topics[0]` is the signature, `topics[1..]` the indexed arguments in
/// declared order. Missing topics become zero values; data-carried fields
/// cannot be recovered and also become zero values. A present but
/// malformed topic still fails the log.
fn decode_fallback(kind: EventKind, log: &RawLog) -> Result<EventPayload, DecodeError> {
    if log.topics.is_empty() {
        return Err(DecodeError::MissingTopic(0));
    }
    let topic1 = opt_topic_bytes(&log.topics, 1)?;
    let topic2 = opt_topic_bytes(&log.topics, 2)?;

    let u256_or_zero = |t: &Option<[u8; 32]>| t.as_ref().map_or_else(|| "0".into(), u256_string);
    let digest_or_zero =
        |t: &Option<[u8; 32]>| t.as_ref().map_or_else(|| ZERO_DIGEST.into(), digest_string);
    let address_or_zero =
        |t: &Option<[u8; 32]>| t.as_ref().map_or_else(|| ZERO_ADDRESS.into(), address_string);

    match kind {
        EventKind::EntropyRequested => Ok(EventPayload::EntropyRequested {
            request_id: u256_or_zero(&topic1),
            hashed_consumer: digest_or_zero(&topic2),
            hashed_tag: ZERO_DIGEST.into(),
            fee_paid: "0".into(),
        }),
        EventKind::EntropyFulfilled => Ok(EventPayload::EntropyFulfilled {
            request_id: u256_or_zero(&topic1),
            hashed_consumer: digest_or_zero(&topic2),
            hashed_tag: ZERO_DIGEST.into(),
        }),
        EventKind::FeeRecipientUpdated => Ok(EventPayload::FeeRecipientUpdated {
            old_recipient: address_or_zero(&topic1),
            new_recipient: address_or_zero(&topic2),
        }),
        EventKind::ChaosEngineUpdated => Ok(EventPayload::ChaosEngineUpdated {
            old_engine: address_or_zero(&topic1),
            new_engine: address_or_zero(&topic2),
        }),
    }
}

fn topic_bytes(topics: &[String], index: usize) -> Result<[u8; 32], DecodeError> {
    let raw = topics.get(index).ok_or(DecodeError::MissingTopic(index))?;
    parse_topic(raw)
}

fn opt_topic_bytes(topics: &[String], index: usize) -> Result<Option<[u8; 32]>, DecodeError> {
    topics.get(index).map(|raw| parse_topic(raw)).transpose()
}

fn parse_topic(raw: &str) -> Result<[u8; 32], DecodeError> {
    let stripped = raw.strip_prefix("0x").unwrap_or(raw);
    let bytes = hex::decode(stripped).map_err(|_| DecodeError::BadHex {
        field: "topic",
        value: raw.to_string(),
    })?;
    bytes.try_into().map_err(|_| DecodeError::BadHex {
        field: "topic",
        value: raw.to_string(),
    })
}

fn data_bytes(raw: &str) -> Result<Vec<u8>, DecodeError> {
    let stripped = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(stripped).map_err(|_| DecodeError::BadHex {
        field: "data",
        value: raw.to_string(),
    })
}

/// Returns the `index`-th 32-byte word of the data section.
fn word(data: &[u8], index: usize) -> Result<[u8; 32], DecodeError> {
    let start = index * 32;
    let end = start + 32;
    let slice = data.get(start..end).ok_or(DecodeError::ShortData {
        actual: data.len(),
        expected: end,
    })?;
    let mut out = [0u8; 32];
    out.copy_from_slice(slice);
    Ok(out)
}

/// Renders a 32-byte big-endian integer as a decimal string when it fits
/// u128, otherwise as 0x-hex.
fn u256_string(bytes: &[u8; 32]) -> String {
    if bytes.iter().take(16).all(|b| *b == 0) {
        let mut low = [0u8; 16];
        low.copy_from_slice(&bytes[16..]);
        u128::from_be_bytes(low).to_string()
    } else {
        format!("0x{}", hex::encode(bytes))
    }
}

/// Renders a 32-byte digest as lowercase 0x-hex.
fn digest_string(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Renders the low 20 bytes of a topic as an address.
fn address_string(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(&bytes[12..]))
}
