//! Frame codec.
//!
//! Inbound frames are a [`PushFrame`] envelope whose payload is a
//! gzip-compressed [`Response`]. Acknowledgments reuse only the envelope
//! layer: `payload_type = "ack"` and the raw `internal_ext` bytes as payload.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use prost::Message as _;

use crate::error::{FrameError, Result};
use crate::kind::MessageKind;
use crate::proto::{Message, PushFrame, Response};

/// `payload_type` of outbound acknowledgments.
pub const ACK_PAYLOAD_TYPE: &str = "ack";

/// Smallest buffer that can hold one tagged envelope field.
pub const MIN_ENVELOPE_LEN: usize = 2;

/// Upper bound on the buffer reserved before inflating a payload.
const MAX_INFLATE_HINT: usize = 64 * 1024;

/// Outer wire frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// Server-assigned frame id, echoed back in the ack.
    pub log_id: u64,
    /// Payload tag (`"msg"` inbound, `"ack"` outbound).
    pub payload_type: String,
    /// Compressed batch inbound, raw ack bytes outbound.
    pub payload: Vec<u8>,
}

/// Decompressed inner batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageBatch {
    /// Whether the server expects an ack for this frame.
    pub need_ack: bool,
    /// Opaque cursor echoed back in the ack.
    pub internal_ext: String,
    /// Messages in server-send order.
    pub messages: Vec<RawMessage>,
}

/// A method-tagged message, opaque until routed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawMessage {
    /// Method tag, e.g. `WebcastChatMessage`.
    pub method: String,
    /// Encoded typed message.
    pub payload: Vec<u8>,
}

/// Parse the outer envelope.
pub fn decode_envelope(bytes: &[u8]) -> Result<Envelope> {
    if bytes.len() < MIN_ENVELOPE_LEN {
        return Err(FrameError::MalformedFrame(format!(
            "{} byte(s), need at least {MIN_ENVELOPE_LEN}",
            bytes.len()
        )));
    }
    let frame = PushFrame::decode(bytes)?;
    Ok(Envelope {
        log_id: frame.log_id,
        payload_type: frame.payload_type,
        payload: frame.payload,
    })
}

/// Decompress and parse the envelope payload.
pub fn decode_batch(envelope: &Envelope) -> Result<MessageBatch> {
    let mut raw = Vec::with_capacity(inflate_hint(envelope.payload.len()));
    let _ = GzDecoder::new(envelope.payload.as_slice())
        .read_to_end(&mut raw)
        .map_err(FrameError::Decompression)?;
    let response = Response::decode(raw.as_slice())?;
    Ok(MessageBatch {
        need_ack: response.need_ack,
        internal_ext: response.internal_ext,
        messages: response
            .messages
            .into_iter()
            .map(|m| RawMessage {
                method: m.method,
                payload: m.payload,
            })
            .collect(),
    })
}

/// Initial buffer size for inflating `compressed_len` bytes. The real size
/// is only known after decompression, so the guess is capped.
fn inflate_hint(compressed_len: usize) -> usize {
    compressed_len.saturating_mul(4).min(MAX_INFLATE_HINT)
}

/// Build the acknowledgment for a batch that asked for one.
pub fn encode_ack(log_id: u64, internal_ext: &str) -> Vec<u8> {
    PushFrame {
        log_id,
        payload_type: ACK_PAYLOAD_TYPE.to_string(),
        payload: internal_ext.as_bytes().to_vec(),
        ..PushFrame::default()
    }
    .encode_to_vec()
}

/// Build an inbound frame carrying `response`, gzip-compressed.
///
/// The push service is the only producer in production; this exists for
/// tests and replay tooling.
pub fn encode_batch_frame(log_id: u64, response: &Response) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&response.encode_to_vec())
        .map_err(|e| FrameError::Encode(e.to_string()))?;
    let payload = encoder
        .finish()
        .map_err(|e| FrameError::Encode(e.to_string()))?;
    Ok(PushFrame {
        log_id,
        payload_encoding: "gzip".to_string(),
        payload_type: "msg".to_string(),
        payload,
        ..PushFrame::default()
    }
    .encode_to_vec())
}

/// Wrap a typed message for inclusion in a [`Response`].
pub fn raw_message(kind: MessageKind, body: &impl prost::Message) -> Message {
    Message {
        method: kind.method().to_string(),
        payload: body.encode_to_vec(),
        msg_id: 0,
    }
}
