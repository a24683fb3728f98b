//! Error types for the object graph walker

use std::path::PathBuf;
use thiserror::Error;

use crate::pdf::object::{ObjectKind, ObjectRef, RefKey};

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the object graph walker
#[derive(Error, Debug)]
pub enum Error {
    /// The document bytes could not be parsed
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The trailer names no entry object, or it points nowhere
    #[error("Catalog could not be retrieved")]
    RootNotFound,

    /// The entry object exists but is not a dictionary
    #[error("Catalog is not a dictionary (found {kind})")]
    MalformedRoot { kind: ObjectKind },

    /// Named lookup in the catalog failed
    #[error("No {0} entry found")]
    EntryNotFound(String),

    /// No object with this number in the cross-reference index
    #[error("Unresolved reference {0}")]
    UnresolvedReference(ObjectRef),

    /// The index holds the object number under another generation
    #[error("Stale reference {reference}: index has generation {found}")]
    StaleReference { reference: ObjectRef, found: u16 },

    /// The object stream a far reference points into does not exist
    #[error("Object stream {0} not found")]
    ContainerNotFound(u32),

    /// The container exists but cannot be read as an object stream
    #[error("Object {container} is not a usable object stream: {reason}")]
    InvalidContainer { container: u32, reason: String },

    /// Far reference past the end of its container
    #[error("Index {index} out of range for object stream {container} ({len} objects)")]
    IndexOutOfRange { container: u32, index: u32, len: usize },

    /// A reference resolved to another reference instead of an object
    #[error("Reference resolved to another reference ({0})")]
    ChainedReference(RefKey),

    /// A reference leads back to an object already on the traversal path
    #[error("Cyclic reference through {0}")]
    CyclicReference(RefKey),

    /// Traversal went deeper than the configured limit
    #[error("Maximum traversal depth {0} exceeded")]
    DepthExceeded(usize),

    /// A stream body could not be decoded
    #[error("Stream decode error: {0}")]
    Codec(String),
}

impl Error {
    /// Whether the failure belongs to one object or reference
    ///
    /// These can be confined to a single traversal branch; everything else
    /// (I/O, parse failures) concerns the whole run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UnresolvedReference(_)
                | Error::StaleReference { .. }
                | Error::ContainerNotFound(_)
                | Error::InvalidContainer { .. }
                | Error::IndexOutOfRange { .. }
                | Error::ChainedReference(_)
                | Error::CyclicReference(_)
                | Error::DepthExceeded(_)
                | Error::Codec(_)
        )
    }
}
