//! # livecast-protocol
//!
//! The two-layer push protocol spoken by the live-room service:
//!
//! - [`codec`]: outer [`Envelope`] framing, gzip-compressed [`MessageBatch`]
//!   payloads and outbound acknowledgments
//! - [`proto`]: protobuf schemas for frames and the routed room messages
//! - [`kind`]: the closed set of routed method tags and typed decoding into
//!   [`LiveEvent`]
//!
//! Everything here is pure: no I/O, no state.

#![deny(unsafe_code)]

pub mod codec;
pub mod error;
pub mod kind;
pub mod proto;

pub use codec::{
    ACK_PAYLOAD_TYPE, Envelope, MIN_ENVELOPE_LEN, MessageBatch, RawMessage, decode_batch,
    decode_envelope, encode_ack, encode_batch_frame, raw_message,
};
pub use error::{FrameError, Result};
pub use kind::{LiveEvent, MessageKind, STREAM_ENDED_STATUS};
