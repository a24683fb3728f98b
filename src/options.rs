//! Options for opening documents and walking them

/// Options used when a document is opened
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Trailer key naming the entry object
    pub root_key: String,
    /// Resolve an indirect `/Length` to report a stream's size
    ///
    /// When off, such streams report an unknown length.
    pub resolve_indirect_lengths: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            root_key: "Root".to_string(),
            resolve_indirect_lengths: true,
        }
    }
}

/// What to do when one branch of a traversal fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop the whole walk at the first error
    #[default]
    Abort,
    /// Report the failing branch to the visitor and carry on with its siblings
    SkipBranch,
}

/// Default traversal depth limit
///
/// The walk recurses once per level, so an unbounded chain of references
/// would exhaust the stack.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Options for a traversal
#[derive(Debug, Clone)]
pub struct TraverseOptions {
    /// Deepest level that may be visited; `None` means unbounded
    pub max_depth: Option<usize>,
    /// Failure handling for recoverable, per-object errors
    pub on_error: ErrorPolicy,
    /// Walk the metadata dictionary of every stream
    pub expand_stream_dicts: bool,
}

impl Default for TraverseOptions {
    fn default() -> Self {
        Self {
            max_depth: Some(DEFAULT_MAX_DEPTH),
            on_error: ErrorPolicy::default(),
            expand_stream_dicts: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let open = OpenOptions::default();
        assert_eq!(open.root_key, "Root");
        assert!(open.resolve_indirect_lengths);

        let walk = TraverseOptions::default();
        assert_eq!(walk.max_depth, Some(DEFAULT_MAX_DEPTH));
        assert_eq!(walk.on_error, ErrorPolicy::Abort);
        assert!(!walk.expand_stream_dicts);
    }
}
