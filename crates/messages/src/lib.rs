//! Messages exchanged between simulated nodes.

pub mod codec;
mod payload;

pub use codec::CodecError;
pub use payload::{Payload, PayloadKind};
