//! Depth-first walk over the resolved object graph
//!
//! Every node is dereferenced exactly once, reported to a [`Visitor`], and,
//! for arrays and dictionaries, followed by its children in document order.
//! References currently on the recursion path are tracked so a cycle fails
//! with [`Error::CyclicReference`] instead of recursing forever.

use std::collections::HashSet;
use std::fmt;

use tracing::warn;

use crate::error::{Error, Result};
use crate::options::{ErrorPolicy, TraverseOptions};
use crate::pdf::object::{Object, RefKey, StreamLength};
use crate::pdf::repository::Repository;

/// How a node is addressed from its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label<'a> {
    /// Dictionary key, or the caller-chosen name of the starting object
    Name(&'a [u8]),
    /// Array position
    Index(usize),
}

impl fmt::Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Name(name) => f.write_str(&String::from_utf8_lossy(name)),
            Label::Index(i) => write!(f, "{}", i),
        }
    }
}

/// What a visitor is told about one dereferenced node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Visit<'a> {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(&'a [u8]),
    Name(&'a [u8]),
    Operator(&'a str),
    Stream { length: StreamLength },
    Array { len: usize },
    Dictionary { len: usize },
}

/// Receives every node of a traversal, parents before children
pub trait Visitor {
    fn visit(&mut self, label: &Label<'_>, node: &Visit<'_>, depth: usize) -> Result<()>;

    /// Called instead of `visit` when a branch is dropped under
    /// [`ErrorPolicy::SkipBranch`]
    fn skipped(&mut self, _label: &Label<'_>, _error: &Error, _depth: usize) -> Result<()> {
        Ok(())
    }
}

impl<F> Visitor for F
where
    F: FnMut(&Label<'_>, &Visit<'_>, usize) -> Result<()>,
{
    fn visit(&mut self, label: &Label<'_>, node: &Visit<'_>, depth: usize) -> Result<()> {
        self(label, node, depth)
    }
}

/// Walk `object` and everything reachable from it with default options
pub fn traverse<V: Visitor + ?Sized>(
    repository: &Repository,
    label: &str,
    object: &Object,
    visitor: &mut V,
) -> Result<()> {
    Traverser::new(repository, TraverseOptions::default()).run(label, object, visitor)
}

/// Configured traversal over one repository
pub struct Traverser<'r> {
    repository: &'r Repository,
    options: TraverseOptions,
    active: HashSet<RefKey>,
}

impl<'r> Traverser<'r> {
    pub fn new(repository: &'r Repository, options: TraverseOptions) -> Self {
        Self {
            repository,
            options,
            active: HashSet::new(),
        }
    }

    /// Walk from `object`, labelled `label`, at depth 0
    pub fn run<V: Visitor + ?Sized>(&mut self, label: &str, object: &Object, visitor: &mut V) -> Result<()> {
        self.active.clear();
        self.walk(&Label::Name(label.as_bytes()), object, 0, visitor)
    }

    fn walk<V: Visitor + ?Sized>(
        &mut self,
        label: &Label<'_>,
        object: &Object,
        depth: usize,
        visitor: &mut V,
    ) -> Result<()> {
        if let Some(max) = self.options.max_depth {
            if depth > max {
                return Err(Error::DepthExceeded(max));
            }
        }

        let key = object.ref_key();
        if let Some(key) = key {
            if !self.active.insert(key) {
                return Err(Error::CyclicReference(key));
            }
        }

        let result = self.dispatch(label, object, depth, visitor);

        if let Some(key) = key {
            self.active.remove(&key);
        }
        result
    }

    fn dispatch<V: Visitor + ?Sized>(
        &mut self,
        label: &Label<'_>,
        object: &Object,
        depth: usize,
        visitor: &mut V,
    ) -> Result<()> {
        // Exactly one resolution step; nested references are children's business
        let holder;
        let resolved: &Object = match object.ref_key() {
            Some(key) => {
                holder = self.repository.resolve_key(&key)?;
                holder.as_ref()
            }
            None => object,
        };

        match resolved {
            Object::Null => visitor.visit(label, &Visit::Null, depth),
            Object::Boolean(b) => visitor.visit(label, &Visit::Boolean(*b), depth),
            Object::Integer(n) => visitor.visit(label, &Visit::Integer(*n), depth),
            Object::Real(r) => visitor.visit(label, &Visit::Real(*r), depth),
            Object::String(s) => visitor.visit(label, &Visit::String(s), depth),
            Object::Name(n) => visitor.visit(label, &Visit::Name(n), depth),
            Object::Operator(op) => visitor.visit(label, &Visit::Operator(op), depth),
            Object::Stream(stream) => {
                let length = self.repository.stream_length(stream)?;
                visitor.visit(label, &Visit::Stream { length }, depth)?;
                if self.options.expand_stream_dicts {
                    for (key, value) in stream.dict.iter() {
                        self.child(&Label::Name(key), value, depth + 1, visitor)?;
                    }
                }
                Ok(())
            }
            Object::Array(items) => {
                visitor.visit(label, &Visit::Array { len: items.len() }, depth)?;
                for (i, item) in items.iter().enumerate() {
                    self.child(&Label::Index(i), item, depth + 1, visitor)?;
                }
                Ok(())
            }
            Object::Dictionary(dict) => {
                visitor.visit(label, &Visit::Dictionary { len: dict.len() }, depth)?;
                for (key, value) in dict.iter() {
                    self.child(&Label::Name(key), value, depth + 1, visitor)?;
                }
                Ok(())
            }
            Object::Reference(r) => Err(Error::ChainedReference(RefKey::Direct(*r))),
            Object::FarReference(r) => Err(Error::ChainedReference(RefKey::Far(*r))),
        }
    }

    fn child<V: Visitor + ?Sized>(
        &mut self,
        label: &Label<'_>,
        object: &Object,
        depth: usize,
        visitor: &mut V,
    ) -> Result<()> {
        match self.walk(label, object, depth, visitor) {
            Err(e) if self.options.on_error == ErrorPolicy::SkipBranch && e.is_recoverable() => {
                warn!(label = %label, depth, error = %e, "skipping branch");
                visitor.skipped(label, &e, depth)
            }
            other => other,
        }
    }
}
