//! Domain-separated signing messages.
//!
//! Log events are the only signed objects in the simulator. The signing
//! message is a domain tag followed by the fixed-layout event header and the
//! content encoding, so a signature can never be replayed as anything else.
//!
//! | Tag | Purpose |
//! |-----|---------|
//! | `log_event:` | Appended log events |

use crate::{Hash, Identity};

/// Domain tag for log events.
///
/// Format: `log_event:` || author || has_previous || previous_hash || index || content
pub const DOMAIN_LOG_EVENT: &[u8] = b"log_event:";

/// Build the signing message for a log event.
pub fn log_event_message(
    author: &Identity,
    previous: Option<&Hash>,
    index: u64,
    content: &[u8],
) -> Vec<u8> {
    // 10 (tag) + 32 (author) + 1 + 32 (previous) + 8 (index)
    let mut message = Vec::with_capacity(83 + content.len());
    message.extend_from_slice(DOMAIN_LOG_EVENT);
    message.extend_from_slice(author.public_key().as_bytes());
    match previous {
        Some(hash) => {
            message.push(1);
            message.extend_from_slice(hash.as_bytes());
        }
        None => {
            message.push(0);
            message.extend_from_slice(Hash::ZERO.as_bytes());
        }
    }
    message.extend_from_slice(&index.to_le_bytes());
    message.extend_from_slice(content);
    message
}
