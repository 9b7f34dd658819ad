//! Arena-backed forest of display nodes with pre-order and post-order traversal

use std::fmt;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::entities::IdentityId;
use crate::domain::error::{DomainError, DomainResult};

/// Handle to a display node in the forest.
///
/// Backed by a generational index: once a node is removed its handle never
/// resolves again, even if the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "#{}.{}", slot, generation)
    }
}

/// Tree node bound to exactly one identity.
#[derive(Debug)]
pub struct DisplayNode {
    identity: IdentityId,
    label: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Whether the node is shown expanded
    pub expanded: bool,
}

impl DisplayNode {
    /// Identity this node is bound to. Fixed at construction.
    pub fn identity(&self) -> IdentityId {
        self.identity
    }

    /// Display label mirroring the identity's name.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Parent node, None for children of the virtual root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub(crate) fn set_label(&mut self, label: &str) {
        self.label = label.to_string();
    }
}

/// Arena-based forest of display nodes below a single virtual root.
#[derive(Debug)]
pub struct Forest {
    arena: Arena<DisplayNode>,
    /// Children of the virtual root, in display order
    roots: Vec<NodeId>,
}

impl Default for Forest {
    fn default() -> Self {
        Self::new()
    }
}

impl Forest {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            roots: Vec::new(),
        }
    }

    /// Append a new node under `parent` (or the virtual root).
    #[instrument(level = "trace", skip(self))]
    pub fn insert_node(
        &mut self,
        identity: IdentityId,
        label: &str,
        parent: Option<NodeId>,
    ) -> DomainResult<NodeId> {
        if let Some(parent_id) = parent {
            if !self.contains(parent_id) {
                return Err(DomainError::InvalidParent(parent_id));
            }
        }

        let node = DisplayNode {
            identity,
            label: label.to_string(),
            parent,
            children: Vec::new(),
            expanded: false,
        };
        let node_id = NodeId(self.arena.insert(node));

        match parent.and_then(|p| self.arena.get_mut(p.0)) {
            Some(parent_node) => parent_node.children.push(node_id),
            None => self.roots.push(node_id),
        }

        Ok(node_id)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get_node(&self, id: NodeId) -> Option<&DisplayNode> {
        self.arena.get(id.0)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut DisplayNode> {
        self.arena.get_mut(id.0)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id.0)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Children of `parent`, or the roots when `parent` is None.
    pub fn children_of(&self, parent: Option<NodeId>) -> DomainResult<&[NodeId]> {
        match parent {
            None => Ok(self.roots.as_slice()),
            Some(id) => self
                .get_node(id)
                .map(|node| node.children.as_slice())
                .ok_or(DomainError::UnknownNode(id)),
        }
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Detach `id` from its parent and drop it together with its subtree.
    ///
    /// Children are removed, never re-parented. Returns the removed nodes
    /// in post-order.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_subtree(&mut self, id: NodeId) -> DomainResult<Vec<DisplayNode>> {
        let parent = self
            .get_node(id)
            .ok_or(DomainError::UnknownNode(id))?
            .parent;

        let siblings = match parent.and_then(|p| self.arena.get_mut(p.0)) {
            Some(parent_node) => &mut parent_node.children,
            None => &mut self.roots,
        };
        siblings.retain(|&child| child != id);

        let doomed: Vec<NodeId> = self.iter_postorder_from(id).map(|(idx, _)| idx).collect();
        Ok(doomed
            .into_iter()
            .filter_map(|idx| self.arena.remove(idx.0))
            .collect())
    }

    /// Pre-order traversal of the whole forest.
    #[instrument(level = "trace", skip(self))]
    pub fn iter(&self) -> TreeIterator {
        TreeIterator::new(self, self.roots.clone())
    }

    #[instrument(level = "trace", skip(self))]
    pub fn iter_postorder_from(&self, id: NodeId) -> PostOrderIterator {
        PostOrderIterator::new(self, id)
    }
}

pub struct TreeIterator<'a> {
    forest: &'a Forest,
    stack: Vec<NodeId>,
}

impl<'a> TreeIterator<'a> {
    fn new(forest: &'a Forest, mut start: Vec<NodeId>) -> Self {
        // Stack pops from the end, so the first root goes last
        start.reverse();
        Self {
            forest,
            stack: start,
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (NodeId, &'a DisplayNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.forest.get_node(current) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    forest: &'a Forest,
    stack: Vec<(NodeId, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(forest: &'a Forest, root: NodeId) -> Self {
        Self {
            forest,
            stack: vec![(root, false)],
        }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (NodeId, &'a DisplayNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if let Some(node) = self.forest.get_node(current) {
                if !visited {
                    self.stack.push((current, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current, node));
                }
            }
        }
        None
    }
}
