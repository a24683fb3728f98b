//! Visitors that turn a traversal into output

pub mod text;
pub mod tree;

pub use text::TextReport;
pub use tree::{TreeBuilder, TreeNode};
