//! # livecast-session
//!
//! Everything needed before a push connection can be opened:
//!
//! - [`resolver`]: session cookie and room id lookup over HTTP
//! - [`url`]: the push URL query and the digest its signature is computed over
//! - [`signer`]: the pluggable [`Signer`] capability

#![deny(unsafe_code)]

pub mod error;
pub mod resolver;
pub mod signer;
pub mod url;

pub use error::{Result, SessionError};
pub use resolver::{HttpSessionResolver, SessionResolver, generate_ms_token};
pub use signer::{CommandSigner, Signer, StaticSigner, signer_from_settings};
pub use url::{PushUrl, SIGNED_KEYS};
