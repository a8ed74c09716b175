//! Compact binary form of payloads, frontiers, and exported logs.
//!
//! # Wire Format
//!
//! Everything is SBOR-encoded then LZ4-compressed:
//!
//! ```text
//! [u32 LE uncompressed size][LZ4 block]
//! ```
//!
//! The object type is not tagged; the caller knows which decoder to use.

use crate::Payload;
use gossipsim_types::{Event, Frontier};
use sbor::{BasicDecode, BasicEncode};
use thiserror::Error;

/// Errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Message too short")]
    MessageTooShort,

    #[error("SBOR decode error: {0}")]
    SborDecode(String),

    #[error("SBOR encode error: {0}")]
    SborEncode(String),

    #[error("Decompression error: {0}")]
    Decompress(String),
}

/// Encode a gossip payload.
pub fn encode_payload(payload: &Payload) -> Result<Vec<u8>, CodecError> {
    encode(payload)
}

/// Decode a gossip payload.
pub fn decode_payload(data: &[u8]) -> Result<Payload, CodecError> {
    decode(data)
}

/// Encode a frontier for export.
pub fn encode_frontier(frontier: &Frontier) -> Result<Vec<u8>, CodecError> {
    encode(frontier)
}

/// Decode an exported frontier.
pub fn decode_frontier(data: &[u8]) -> Result<Frontier, CodecError> {
    decode(data)
}

/// Encode the events of a log (or any run of events) for export.
pub fn encode_log_events(events: &[Event]) -> Result<Vec<u8>, CodecError> {
    encode(&events.to_vec())
}

/// Decode exported log events.
pub fn decode_log_events(data: &[u8]) -> Result<Vec<Event>, CodecError> {
    decode(data)
}

/// Size of the encoded payload in bytes, or 0 if it cannot be encoded.
pub fn wire_size(payload: &Payload) -> usize {
    encode_payload(payload).map_or(0, |bytes| bytes.len())
}

fn encode<T: BasicEncode + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    let sbor_bytes =
        sbor::basic_encode(value).map_err(|e| CodecError::SborEncode(format!("{:?}", e)))?;
    Ok(lz4_flex::compress_prepend_size(&sbor_bytes))
}

fn decode<T: BasicDecode>(data: &[u8]) -> Result<T, CodecError> {
    if data.is_empty() {
        return Err(CodecError::MessageTooShort);
    }

    let sbor_bytes = lz4_flex::decompress_size_prepended(data)
        .map_err(|e| CodecError::Decompress(e.to_string()))?;

    sbor::basic_decode(&sbor_bytes).map_err(|e| CodecError::SborDecode(format!("{:?}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PayloadKind;
    use gossipsim_types::test_utils::{test_identity, test_keypair};
    use gossipsim_types::{Content, Identity};

    fn chain(len: u64) -> Vec<Event> {
        let keypair = test_keypair(7);
        let mut events: Vec<Event> = Vec::new();
        for index in 0..len {
            let previous = events.last().map(Event::hash);
            events.push(Event::signed(
                &keypair,
                previous,
                index,
                Content::Post(format!("post {index}")),
            ));
        }
        events
    }

    #[test]
    fn test_payload_survives_the_wire() {
        let mut frontier = Frontier::new();
        frontier.insert(test_identity(7), Some(2));
        frontier.insert(test_identity(8), None);
        let payload = Payload::push_pull(test_identity(1), frontier, chain(3));

        let bytes = encode_payload(&payload).unwrap();
        let decoded = decode_payload(&bytes).unwrap();

        assert_eq!(decoded, payload);
        assert_eq!(decoded.kind, PayloadKind::PushPull);
        assert!(decoded.news.iter().all(Event::verify_signature));
    }

    #[test]
    fn test_exported_log_keeps_chain_links() {
        let events = chain(4);
        let decoded = decode_log_events(&encode_log_events(&events).unwrap()).unwrap();

        for pair in decoded.windows(2) {
            assert_eq!(pair[1].previous, Some(pair[0].hash()));
        }
        assert_eq!(decoded.len(), 4);
    }

    #[test]
    fn test_relationship_content_is_encodable() {
        let target: Identity = test_identity(9);
        let event = Event::signed(&test_keypair(1), None, 0, Content::Block(target));
        let decoded = decode_log_events(&encode_log_events(&[event.clone()]).unwrap()).unwrap();
        assert_eq!(decoded, vec![event]);
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            decode_payload(&[]),
            Err(CodecError::MessageTooShort)
        ));
        assert!(matches!(
            decode_frontier(&[0x10, 0, 0, 0, 0xf0]),
            Err(CodecError::Decompress(_))
        ));

        // Valid LZ4 wrapping of bytes that are not SBOR.
        let garbage = lz4_flex::compress_prepend_size(b"not sbor");
        assert!(matches!(
            decode_payload(&garbage),
            Err(CodecError::SborDecode(_))
        ));
    }

    #[test]
    fn test_wire_size_grows_with_news() {
        let me = test_identity(1);
        let empty = wire_size(&Payload::push(me, Vec::new()));
        let full = wire_size(&Payload::push(me, chain(5)));
        assert!(empty > 0);
        assert!(full > empty);
    }
}
