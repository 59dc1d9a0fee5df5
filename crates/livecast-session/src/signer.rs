//! Push URL signing.
//!
//! How the signature is computed is opaque to livecast. A signer sees the
//! query snapshot and returns a string; it must be deterministic for a given
//! snapshot and quick enough not to stall the connect path.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use livecast_settings::SignerSettings;
use tracing::{debug, warn};

use crate::error::{Result, SessionError};
use crate::url::PushUrl;

const DEFAULT_SIGNER_TIMEOUT: Duration = Duration::from_secs(10);

/// Computes the `signature` query parameter.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Sign `url`'s query.
    async fn sign(&self, url: &PushUrl) -> Result<String>;
}

/// Returns the same signature for every query.
#[derive(Clone, Debug, Default)]
pub struct StaticSigner(pub String);

#[async_trait]
impl Signer for StaticSigner {
    async fn sign(&self, _url: &PushUrl) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Runs an external program with the query's MD5 digest as its last
/// argument and reads the signature from stdout.
#[derive(Clone, Debug)]
pub struct CommandSigner {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSigner {
    /// Signer for `argv`. Returns `None` if `argv` is empty.
    pub fn new(argv: &[String], timeout: Duration) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }
}

#[async_trait]
impl Signer for CommandSigner {
    async fn sign(&self, url: &PushUrl) -> Result<String> {
        let digest = url.signature_digest();
        let mut cmd = tokio::process::Command::new(&self.program);
        let _ = cmd
            .args(&self.args)
            .arg(&digest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(program = %self.program, %digest, "running signer");
        let child = cmd
            .spawn()
            .map_err(|e| SessionError::Signer(format!("failed to spawn {}: {e}", self.program)))?;

        let output = tokio::select! {
            result = child.wait_with_output() => {
                result.map_err(|e| SessionError::Signer(format!("signer wait failed: {e}")))?
            }
            () = tokio::time::sleep(self.timeout) => {
                warn!(program = %self.program, timeout_ms = self.timeout.as_millis() as u64, "signer timed out");
                return Err(SessionError::Signer("timed out".into()));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SessionError::Signer(format!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        let signature = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if signature.is_empty() {
            return Err(SessionError::Signer("empty signature".into()));
        }
        Ok(signature)
    }
}

/// Signer described by settings: the configured command, or an empty
/// static signature when none is set.
pub fn signer_from_settings(settings: &SignerSettings) -> Arc<dyn Signer> {
    let timeout = settings
        .timeout_ms
        .map_or(DEFAULT_SIGNER_TIMEOUT, Duration::from_millis);
    match settings
        .command
        .as_deref()
        .and_then(|argv| CommandSigner::new(argv, timeout))
    {
        Some(signer) => Arc::new(signer),
        None => Arc::new(StaticSigner::default()),
    }
}
