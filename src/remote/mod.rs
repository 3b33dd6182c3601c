//! Remote collection contract.
//!
//! The server exposes each entity kind as a flat REST collection with four
//! per-item operations. There is no bulk write and no transaction, so the
//! board persists a reorder as one `update` per changed item.

pub mod auth;
pub mod http;
pub mod memory;

use crate::types::{ItemId, NewProject, NewSubtask, NewTodo, Project, Subtask, Todo};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use auth::{AuthClient, Registration};
pub use http::HttpCollection;
pub use memory::InMemoryCollection;

/// Failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The server could not be reached or the connection broke.
    #[error("Error: {message}")]
    Transport { message: String },

    /// The server answered with a non-success status.
    #[error("Server returned code {status}, error message is: {detail}")]
    Rejected { status: u16, detail: String },

    /// The server answered successfully but the body did not parse.
    #[error("Could not decode server response: {message}")]
    Decode { message: String },
}

impl RemoteError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn rejected(status: u16, detail: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            detail: detail.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// An entity kind stored in a remote collection.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The entity before the server has assigned it an identity.
    type Draft: Clone + Serialize + Send + Sync + 'static;

    /// Collection path segment under `/api/`.
    const RESOURCE: &'static str;

    fn id(&self) -> ItemId;

    /// Build the stored entity once an identity has been assigned.
    fn from_draft(id: ItemId, draft: Self::Draft) -> Self;
}

impl Entity for Todo {
    type Draft = NewTodo;
    const RESOURCE: &'static str = "todos";

    fn id(&self) -> ItemId {
        self.id
    }

    fn from_draft(id: ItemId, draft: NewTodo) -> Self {
        draft.into_todo(id)
    }
}

impl Entity for Project {
    type Draft = NewProject;
    const RESOURCE: &'static str = "projects";

    fn id(&self) -> ItemId {
        self.id
    }

    fn from_draft(id: ItemId, draft: NewProject) -> Self {
        Project {
            id,
            name: draft.name,
            extra: draft.extra,
        }
    }
}

impl Entity for Subtask {
    type Draft = NewSubtask;
    const RESOURCE: &'static str = "subtasks";

    fn id(&self) -> ItemId {
        self.id
    }

    fn from_draft(id: ItemId, draft: NewSubtask) -> Self {
        Subtask {
            id,
            title: draft.title,
            extra: draft.extra,
        }
    }
}

/// Per-item access to one remote collection.
///
/// Every call may fail independently. Implementations must tolerate
/// concurrent calls on a shared reference.
#[async_trait]
pub trait RemoteCollection<E: Entity>: Send + Sync {
    /// Fetch every row. The result may contain duplicate identities.
    async fn list(&self) -> RemoteResult<Vec<E>>;

    /// Create a row; the returned entity carries the assigned identity.
    async fn create(&self, draft: &E::Draft) -> RemoteResult<E>;

    /// Overwrite the row with the given identity. Resending the same item is harmless.
    async fn update(&self, id: ItemId, item: &E) -> RemoteResult<E>;

    async fn delete(&self, id: ItemId) -> RemoteResult<()>;
}
