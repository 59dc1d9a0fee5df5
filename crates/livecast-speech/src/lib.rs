//! # livecast-speech
//!
//! Speech is a serialized side channel. The message router submits
//! [`RenderTask`](livecast_core::RenderTask)s through a [`TaskQueue`] and
//! never waits on rendering; a single worker plays them one at a time.
//!
//! - [`pipeline`]: bounded queue with drop-on-full admission and its worker
//! - [`renderer`]: the [`SpeechRenderer`] capability and the command-line
//!   implementation

#![deny(unsafe_code)]

pub mod error;
pub mod pipeline;
pub mod renderer;

pub use error::SpeechError;
pub use pipeline::{EnqueueOutcome, TaskPipeline, TaskQueue};
pub use renderer::{CommandRenderer, SpeechRenderer};
