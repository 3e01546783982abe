//! Error taxonomy shared by every simulation component.
//!
//! Fatal conditions (`CryptoUnavailable`) abort the current operation. KDF
//! branch failures are caught per branch by the harness and never escape a
//! multi-KDF run; see [`crate::kdf::KdfHarness::measure_all`].
use crate::kdf::KdfKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    /// Random source or digest oracle could not be used.
    #[error("crypto primitive unavailable: {0}")]
    CryptoUnavailable(String),

    /// A named collaborator (KDF library, corpus) failed to load.
    #[error("failed to load {collaborator}: {message}")]
    CollaboratorLoadFailed {
        collaborator: String,
        message: String,
    },

    /// Parameters with no safe clamped equivalent.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// The user declined a resource-risk confirmation.
    #[error("{kdf} cancelled by user due to high resource request")]
    UserCancelled { kdf: KdfKind },

    /// An abort token fired while the computation was in flight.
    #[error("{kdf} computation aborted")]
    Aborted { kdf: KdfKind },

    /// The KDF invocation itself failed.
    #[error("{kdf} failed: {message}")]
    CollaboratorComputeFailed { kdf: KdfKind, message: String },

    #[error("enter or generate a password first")]
    EmptyPassword,
}

impl SimError {
    pub fn load_failed(collaborator: impl ToString, message: impl ToString) -> Self {
        SimError::CollaboratorLoadFailed {
            collaborator: collaborator.to_string(),
            message: message.to_string(),
        }
    }

    pub fn compute_failed(kdf: KdfKind, message: impl ToString) -> Self {
        SimError::CollaboratorComputeFailed {
            kdf,
            message: message.to_string(),
        }
    }
}
