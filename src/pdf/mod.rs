//! PDF object model, sources and traversal

pub mod lopdf_source;
pub mod memory;
pub mod object;
pub mod repository;
pub mod source;
pub mod traverse;

// Re-export commonly used items
pub use lopdf_source::{open_document, open_document_mem, LopdfSource};
pub use memory::{MemorySource, MemorySourceBuilder};
pub use object::{Dictionary, FarRef, Object, ObjectKind, ObjectRef, RefKey, Stream, StreamLength};
pub use repository::Repository;
pub use source::{ObjectSource, RawLocation};
pub use traverse::{traverse, Label, Traverser, Visit, Visitor};
