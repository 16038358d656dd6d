//! Private markup buffers for the division or verse being built.
//!
//! Source nodes are copied in one at a time, shallowly, as the walk reaches
//! them. A buffer therefore holds exactly the span between the opening
//! boundary and the closing one.

use crate::tei_import::errors::AccumulationError;
use crate::tei_import::markup::{self, Node, NodeKind};

/// Handle to a node inside the currently open buffer.
///
/// Handles from an earlier buffer are rejected, so content cannot leak into
/// the wrong division after a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufNodeId {
    generation: u32,
    index: usize,
}

#[derive(Debug, Clone)]
struct BufEntry {
    node: Node,
    children: Vec<usize>,
}

#[derive(Debug, Default)]
pub struct ContentBuffer {
    generation: u32,
    open: bool,
    entries: Vec<BufEntry>,
}

impl ContentBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh buffer with a root element, dropping anything not yet closed.
    pub fn open(&mut self, root_tag: &str) -> BufNodeId {
        self.generation += 1;
        self.open = true;
        self.entries.clear();
        self.entries.push(BufEntry { node: Node::element(root_tag, Vec::new()), children: Vec::new() });
        BufNodeId { generation: self.generation, index: 0 }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn root(&self) -> Result<BufNodeId, AccumulationError> {
        if !self.open {
            return Err(AccumulationError::NotOpen);
        }
        Ok(BufNodeId { generation: self.generation, index: 0 })
    }

    fn check(&self, id: BufNodeId) -> Result<usize, AccumulationError> {
        if !self.open {
            return Err(AccumulationError::NotOpen);
        }
        if id.generation != self.generation {
            return Err(AccumulationError::StaleHandle { handle: id.generation, current: self.generation });
        }
        if id.index >= self.entries.len() {
            return Err(AccumulationError::UnknownNode(id.index));
        }
        Ok(id.index)
    }

    /// Copy `node` under `parent` without its children. Returns the copy's handle.
    pub fn append_shallow(&mut self, parent: BufNodeId, node: &Node) -> Result<BufNodeId, AccumulationError> {
        let parent_index = self.check(parent)?;

        let copy = Node {
            kind: node.kind,
            tag: node.tag.clone(),
            attrs: node.attrs.clone(),
            text: node.text.clone(),
            children: Vec::new(),
        };

        let index = self.entries.len();
        self.entries.push(BufEntry { node: copy, children: Vec::new() });
        self.entries[parent_index].children.push(index);

        Ok(BufNodeId { generation: self.generation, index })
    }

    /// True if any text node in the buffer has non-whitespace content.
    pub fn has_content(&self) -> bool {
        self.open && self.entries.iter().any(|e| {
            e.node.kind == NodeKind::Text
                && e.node.text.as_deref().map(|t| !t.trim().is_empty()).unwrap_or(false)
        })
    }

    fn build(&self, index: usize) -> Node {
        let entry = &self.entries[index];
        let mut node = entry.node.clone();
        node.children = entry.children.iter().map(|c| self.build(*c)).collect();
        node
    }

    /// The buffer as a tree, without closing it.
    pub fn to_node(&self) -> Result<Node, AccumulationError> {
        let root = self.root()?;
        Ok(self.build(root.index))
    }

    /// Serialize and close. Every handle into this buffer becomes stale.
    pub fn close(&mut self) -> Result<String, AccumulationError> {
        let tree = self.to_node()?;
        self.discard();
        Ok(markup::serialize(&tree))
    }

    /// Close without serializing.
    pub fn discard(&mut self) {
        self.open = false;
        self.entries.clear();
    }
}
