//! # livecast-core
//!
//! Shared vocabulary for the livecast crates:
//!
//! - **Identifiers**: [`LiveId`], the validated numeric id of a live room page
//! - **Connection lifecycle**: [`ConnectionState`]
//! - **Speech work**: [`RenderTask`], [`SpeechFeature`], [`SpeechToggles`]
//! - **Collaborators**: [`ViewerDisplay`] sink for viewer counts
//! - **Logging**: subscriber setup and in-memory capture for tests

#![deny(unsafe_code)]

pub mod display;
pub mod features;
pub mod ids;
pub mod logging;
pub mod state;
pub mod task;

pub use display::{NullDisplay, ViewerDisplay};
pub use features::{SpeechFeature, SpeechToggles};
pub use ids::{LiveId, LiveIdError};
pub use state::ConnectionState;
pub use task::RenderTask;
