use alloy_primitives::TxHash;
use alloy_transport::{RpcError, TransportErrorKind};

/// An error occurring at one of the external collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// A JSON RPC error from a chain provider.
    #[error(transparent)]
    Rpc(#[from] RpcError<TransportErrorKind>),
    /// An HTTP error reaching the history backend.
    #[error("history backend http error: {0}")]
    Http(#[from] reqwest::Error),
    /// The history backend answered with an error code.
    #[error("history backend error {code}: {message}")]
    Backend {
        /// The backend error code.
        code: i64,
        /// The backend error message.
        message: String,
    },
    /// Contract return data could not be decoded.
    #[error("failed to decode contract return data: {0}")]
    Decode(#[from] alloy_sol_types::Error),
    /// The claim carries no proof usable by the client.
    #[error("missing claim proof for {0}")]
    MissingClaimProof(TxHash),
    /// Other error.
    #[error("{0}")]
    Other(&'static str),
}

impl ProviderError {
    /// Returns true if the error is transient and the call should be retried on the next poll.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Rpc(_) | Self::Http(_) | Self::Backend { .. })
    }
}
