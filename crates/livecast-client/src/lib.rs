//! # livecast-client
//!
//! The live side of livecast:
//!
//! - [`router`]: maps decoded room messages to display updates and speech
//!   tasks
//! - [`connection`]: owns one push connection at a time; acks, watchdog,
//!   reconnect and teardown
//! - [`watchdog`]: the liveness timer and the single "initiate reconnect" gate
//! - [`controller`]: the control surface that starts, stops and restarts
//!   sessions

#![deny(unsafe_code)]

pub mod connection;
pub mod controller;
pub mod error;
pub mod router;
pub mod watchdog;

pub use connection::{Collaborators, ConnectionManager};
pub use controller::LiveController;
pub use error::{ClientError, Result};
pub use router::{Dispatch, Router};
pub use watchdog::{Disconnect, Tripwire, Watchdog};
