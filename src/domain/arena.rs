use std::fmt;

use generational_arena::{Arena, Index};
use termtree::Tree;
use tracing::instrument;

use crate::domain::entities::{Href, NavNode};

/// Data payload for arena nodes.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub label: String,
    pub href: Href,
    /// Name of the child script when the children were not loaded
    pub deferred: Option<String>,
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.href)?;
        if let Some(name) = &self.deferred {
            write!(f, " [deferred: {name}]")?;
        }
        Ok(())
    }
}

/// Node in the arena-based navigation view.
#[derive(Debug)]
pub struct ArenaNode {
    pub data: NodeData,
    /// Index of parent node in the arena, None for top-level entries
    pub parent: Option<Index>,
    /// Indices of child nodes in authoring order
    pub children: Vec<Index>,
}

/// Flattened view of a navigation tree with parent links.
///
/// The owned `NavNode` tree is the source of truth; this view adds
/// upward navigation (breadcrumbs) and index-path resolution.
#[derive(Debug, Default)]
pub struct NavArena {
    arena: Arena<ArenaNode>,
    roots: Vec<Index>,
}

impl NavArena {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(level = "trace", skip_all)]
    pub fn from_nodes(nodes: &[NavNode]) -> Self {
        let mut view = Self::new();
        let mut stack: Vec<(&NavNode, Option<Index>)> =
            nodes.iter().rev().map(|n| (n, None)).collect();

        while let Some((node, parent)) = stack.pop() {
            let idx = view.insert_node(
                NodeData {
                    label: node.label.clone(),
                    href: node.href.clone(),
                    deferred: node.deferred_script().map(str::to_string),
                },
                parent,
            );
            for child in node.child_nodes().iter().rev() {
                stack.push((child, Some(idx)));
            }
        }
        view
    }

    #[instrument(level = "trace", skip(self))]
    pub fn insert_node(&mut self, data: NodeData, parent: Option<Index>) -> Index {
        let node = ArenaNode {
            data,
            parent,
            children: Vec::new(),
        };
        let node_idx = self.arena.insert(node);

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else {
            self.roots.push(node_idx);
        }

        node_idx
    }

    pub fn get_node(&self, idx: Index) -> Option<&ArenaNode> {
        self.arena.get(idx)
    }

    pub fn roots(&self) -> &[Index] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn iter(&self) -> PreOrderIterator<'_> {
        PreOrderIterator::new(self)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        self.roots
            .iter()
            .map(|&root| self.calculate_depth(root))
            .max()
            .unwrap_or(0)
    }

    fn calculate_depth(&self, node_idx: Index) -> usize {
        if let Some(node) = self.get_node(node_idx) {
            1 + node
                .children
                .iter()
                .map(|&child| self.calculate_depth(child))
                .max()
                .unwrap_or(0)
        } else {
            0
        }
    }

    /// Labels of nodes without children, left to right.
    pub fn leaf_labels(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, node)| node.children.is_empty())
            .map(|(_, node)| node.data.label.as_str())
            .collect()
    }

    /// Resolve a child-index path below the first root; `[]` is the root itself.
    pub fn find_by_path(&self, path: &[usize]) -> Option<Index> {
        let mut current = *self.roots.first()?;
        for &step in path {
            current = *self.get_node(current)?.children.get(step)?;
        }
        Some(current)
    }

    /// Node data from the top-level entry down to `idx`.
    pub fn breadcrumbs(&self, idx: Index) -> Vec<&NodeData> {
        let mut crumbs = Vec::new();
        let mut current = Some(idx);
        while let Some(node) = current.and_then(|i| self.get_node(i)) {
            crumbs.push(&node.data);
            current = node.parent;
        }
        crumbs.reverse();
        crumbs
    }

    /// Render as text trees, one per top-level entry, down to `max_depth` levels.
    pub fn to_termtrees(&self, max_depth: Option<usize>) -> Vec<Tree<String>> {
        fn build(view: &NavArena, idx: Index, level: usize, max_depth: Option<usize>) -> Tree<String> {
            let Some(node) = view.get_node(idx) else {
                return Tree::new(String::new());
            };
            let mut tree = Tree::new(node.data.to_string());
            if max_depth.map_or(true, |max| level < max) {
                for &child in &node.children {
                    tree.push(build(view, child, level + 1, max_depth));
                }
            } else if !node.children.is_empty() {
                tree.push(Tree::new(format!("… {} more", node.children.len())));
            }
            tree
        }

        self.roots
            .iter()
            .map(|&root| build(self, root, 1, max_depth))
            .collect()
    }
}

pub struct PreOrderIterator<'a> {
    arena: &'a NavArena,
    stack: Vec<Index>,
}

impl<'a> PreOrderIterator<'a> {
    fn new(arena: &'a NavArena) -> Self {
        let stack = arena.roots().iter().rev().copied().collect();
        Self { arena, stack }
    }
}

impl<'a> Iterator for PreOrderIterator<'a> {
    type Item = (Index, &'a ArenaNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}
