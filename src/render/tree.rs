//! Collects a traversal into a serializable tree

use serde::Serialize;

use crate::error::{Error, Result};
use crate::pdf::object::StreamLength;
use crate::pdf::traverse::{Label, Visit, Visitor};

/// One visited object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub label: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Element count for arrays and dictionaries, byte count for streams
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn new(label: &Label<'_>, kind: &'static str) -> Self {
        Self {
            label: label.to_string(),
            kind,
            value: None,
            length: None,
            error: None,
            children: Vec::new(),
        }
    }
}

/// Visitor that rebuilds the visited graph as nested [`TreeNode`]s
///
/// Nodes arrive parents first with their depth, so a stack of open nodes is
/// enough to attach each one to its parent.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    open: Vec<TreeNode>,
    roots: Vec<TreeNode>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close every open node and return the top-level ones
    pub fn finish(mut self) -> Vec<TreeNode> {
        self.close_to(0);
        self.roots
    }

    fn close_to(&mut self, depth: usize) {
        while self.open.len() > depth {
            if let Some(node) = self.open.pop() {
                match self.open.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => self.roots.push(node),
                }
            }
        }
    }

    fn push(&mut self, node: TreeNode, depth: usize) {
        self.close_to(depth);
        self.open.push(node);
    }
}

impl Visitor for TreeBuilder {
    fn visit(&mut self, label: &Label<'_>, visit: &Visit<'_>, depth: usize) -> Result<()> {
        let (kind, value, length) = match visit {
            Visit::Null => ("Null", None, None),
            Visit::Boolean(b) => ("Boolean", Some((*b).into()), None),
            Visit::Integer(n) => ("Integer", Some((*n).into()), None),
            Visit::Real(r) => ("Real", Some((*r).into()), None),
            Visit::String(s) => ("String", Some(String::from_utf8_lossy(s).into()), None),
            Visit::Name(n) => ("Name", Some(String::from_utf8_lossy(n).into()), None),
            Visit::Operator(op) => ("Operator", Some((*op).into()), None),
            Visit::Stream { length } => {
                let length = match length {
                    StreamLength::Known(n) => serde_json::Value::from(*n),
                    StreamLength::Unknown => serde_json::Value::from("unknown"),
                };
                ("Stream", None, Some(length))
            }
            Visit::Array { len } => ("Array", None, Some((*len).into())),
            Visit::Dictionary { len } => ("Dictionary", None, Some((*len).into())),
        };

        let mut node = TreeNode::new(label, kind);
        node.value = value;
        node.length = length;
        self.push(node, depth);
        Ok(())
    }

    fn skipped(&mut self, label: &Label<'_>, error: &Error, depth: usize) -> Result<()> {
        let mut node = TreeNode::new(label, "Error");
        node.error = Some(error.to_string());
        self.push(node, depth);
        Ok(())
    }
}
