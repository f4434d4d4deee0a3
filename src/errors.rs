//! Watched Configuration Source Error Hierarchy
//!
//! Defines error types for the configuration mirror, categorized by the
//! phase they can occur in: construction, connection, watch processing and
//! listener dispatch.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Construction-time configuration violations (missing address,
    /// malformed root path). Never retried.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Backend connection failures surfaced at construction
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Failures while consuming the backend watch stream
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// Faults raised by a registered subscriber during dispatch
    #[error(transparent)]
    Listener(#[from] ListenerError),

    /// Unrecoverable failures requiring teardown
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Backend unreachable within the connect timeout (strict mode only;
    /// lenient mode logs and degrades instead)
    #[error("Failed to connect to config backend {address} in {timeout_ms}ms")]
    Unreachable { address: String, timeout_ms: u64 },

    /// The connection attempt was torn down before reporting an outcome
    #[error("Connection attempt to {address} aborted before an outcome was reported")]
    Aborted { address: String },
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Event payload that is not valid UTF-8; the offending event is
    /// dropped and the watch loop continues
    #[error("Payload of {kind} event at {path} is not valid UTF-8")]
    InvalidPayload {
        path: String,
        kind: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// `start()` called on a source whose watch is already running
    #[error("The backend watch has already been started")]
    AlreadyStarted,
}

/// Fault raised by a registered subscriber while handling an update.
/// Fully isolated: logged by the dispatcher, never propagated.
#[derive(Debug, thiserror::Error)]
#[error("Listener failed while handling an update: {0}")]
pub struct ListenerError(pub String);
