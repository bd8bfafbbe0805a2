//! Error types for TransIP DNS convergence
//!
//! Every failure surfaces to the immediate caller of `apply` or of a
//! service call. Nothing in this workspace retries or suppresses errors.

use thiserror::Error;

/// Result type alias for convergence operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Credential or client configuration is unusable
    ///
    /// Raised before any network activity. Never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The declared fqdn does not belong to any managed domain
    #[error("cannot find domain matching {fqdn}")]
    DomainNotManaged {
        /// The fqdn that failed to resolve
        fqdn: String,
    },

    /// The remote call failed (network, authentication, remote-side error)
    #[error("{}", transport_fault_message(.action, .domain, .message))]
    TransportFault {
        /// The RPC action that failed
        action: String,
        /// The domain the call concerned, when known
        domain: Option<String>,
        /// Transport-provided detail
        message: String,
    },

    /// A desired record is structurally invalid
    #[error("Validation error: {0}")]
    Validation(String),

    /// The remote answered, but not with something we can interpret
    #[error("Malformed response to {action}: {message}")]
    MalformedResponse {
        /// The RPC action whose response was malformed
        action: String,
        /// What was missing or wrong
        message: String,
    },

    /// JSON errors while reading declarations
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn transport_fault_message(action: &str, domain: &Option<String>, message: &str) -> String {
    match domain {
        Some(domain) => format!("Transport fault in {action} for {domain}: {message}"),
        None => format!("Transport fault in {action}: {message}"),
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a "domain not managed" error
    pub fn domain_not_managed(fqdn: impl Into<String>) -> Self {
        Self::DomainNotManaged { fqdn: fqdn.into() }
    }

    /// Create a transport fault
    pub fn transport(
        action: impl Into<String>,
        domain: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self::TransportFault {
            action: action.into(),
            domain: domain.map(str::to_string),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a malformed-response error
    pub fn malformed(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            action: action.into(),
            message: message.into(),
        }
    }

    /// Whether this error was raised before anything was sent to the remote
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Validation(_) | Self::Json(_)
        )
    }
}
