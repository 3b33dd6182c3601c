//! Structured error types for board operations.

use crate::remote::RemoteError;
use crate::types::ItemId;
use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Caller errors
    InvalidMove,
    ItemNotFound,
    BatchInFlight,

    // Reconciliation
    BatchFailed,
    ReloadFailed,

    // Remote collection
    TransportError,
    ServerRejected,
    DecodeError,

    InternalError,
}

/// Structured error reported to the presentation layer.
///
/// `message` is meant for display; `details` carries the underlying error text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_ids: Vec<ItemId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl SyncError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            item_id: None,
            failed_ids: Vec::new(),
            details: None,
        }
    }

    pub fn with_item(mut self, id: ItemId) -> Self {
        self.item_id = Some(id);
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn item_not_found(id: ItemId) -> Self {
        Self::new(ErrorCode::ItemNotFound, format!("Todo not found: {}", id)).with_item(id)
    }

    pub fn invalid_move(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidMove, reason)
    }

    pub fn batch_in_flight(status: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::BatchInFlight,
            format!("Column {} is still saving a previous move", status),
        )
    }

    /// A reorder batch had at least one failed update; local state was reloaded.
    pub fn batch_failed(failed: &[(ItemId, RemoteError)], attempted: usize) -> Self {
        let mut err = Self::new(
            ErrorCode::BatchFailed,
            format!(
                "Could not save new order: {} of {} updates failed, board reloaded",
                failed.len(),
                attempted
            ),
        );
        err.failed_ids = failed.iter().map(|(id, _)| *id).collect();
        if let Some((_, first)) = failed.first() {
            err.details = Some(first.to_string());
        }
        err
    }

    /// The batch failed and the reload that should have replaced the
    /// optimistic state failed as well.
    pub fn reload_failed(batch: SyncError, reload: &RemoteError) -> Self {
        Self {
            code: ErrorCode::ReloadFailed,
            message: format!("{}; reload failed: {}", batch.message, reload),
            item_id: None,
            failed_ids: batch.failed_ids,
            details: batch.details,
        }
    }

    pub fn remote(err: &RemoteError) -> Self {
        let code = match err {
            RemoteError::Transport { .. } => ErrorCode::TransportError,
            RemoteError::Rejected { .. } => ErrorCode::ServerRejected,
            RemoteError::Decode { .. } => ErrorCode::DecodeError,
        };
        Self::new(code, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SyncError {}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        SyncError::remote(&err)
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for SyncError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<SyncError>() {
            Ok(sync_err) => sync_err,
            Err(err) => SyncError::internal(err),
        }
    }
}

/// Result type for board operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;
