//! PDF Object Walker Library
//!
//! Resolves indirect references in a PDF and walks the object graph
//! reachable from the document catalog. This library provides:
//! - An owned object model that keeps array and dictionary order
//! - A caching repository that resolves direct and object-stream references
//! - A depth-first traverser with cycle detection and per-branch error policy
//! - Text and JSON renderers for the visited graph
//!
//! # Example
//!
//! ```no_run
//! use pdf_objwalk::options::{OpenOptions, TraverseOptions};
//! use pdf_objwalk::pdf::{open_document, Traverser};
//! use pdf_objwalk::render::TextReport;
//! use std::path::Path;
//!
//! let repository = open_document(Path::new("layers.pdf"), &OpenOptions::default())
//!     .expect("Failed to open PDF");
//! let layers = repository.fetch_entry("OCProperties").expect("No layers");
//!
//! let mut report = TextReport::new(std::io::stdout());
//! Traverser::new(&repository, TraverseOptions::default())
//!     .run("OCProperties", &layers, &mut report)
//!     .expect("Traversal failed");
//! ```

pub mod error;
pub mod options;
pub mod pdf;
pub mod render;

// Re-export commonly used items
pub use error::{Error, Result};
