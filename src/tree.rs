//! An index-addressed tree arena.
//!
//! Every node of a parsed document lives in one [`Tree`], and is referred to
//! by a copyable [`NodeId`]. Structure is kept as explicit parent/sibling/
//! child indices rather than references, so the parser can hold ids across
//! arbitrary mutation without borrow gymnastics, and the whole document is
//! freed in one shot when the tree drops.

use crate::nodes::Ast;

/// Handle to a node in a [`Tree`]. Only meaningful for the tree that
/// allocated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct TreeNode {
    ast: Ast,
    parent: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
}

/// Arena holding every node of a document.
#[derive(Debug, Default)]
pub struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    pub fn new() -> Self {
        Tree { nodes: vec![] }
    }

    /// Allocates a fresh node with no parent, siblings, or children.
    pub fn alloc(&mut self, ast: Ast) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode {
            ast,
            parent: None,
            prev_sibling: None,
            next_sibling: None,
            first_child: None,
            last_child: None,
        });
        id
    }

    pub fn ast(&self, id: NodeId) -> &Ast {
        &self.nodes[id.0].ast
    }

    pub fn ast_mut(&mut self, id: NodeId) -> &mut Ast {
        &mut self.nodes[id.0].ast
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].last_child
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].next_sibling
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].prev_sibling
    }

    /// Unlinks `id` from its parent and siblings. The node itself (and its
    /// children) stay allocated and can be re-inserted elsewhere.
    pub fn detach(&mut self, id: NodeId) {
        let TreeNode {
            parent,
            prev_sibling,
            next_sibling,
            ..
        } = self.nodes[id.0];

        match prev_sibling {
            Some(prev) => self.nodes[prev.0].next_sibling = next_sibling,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].first_child = next_sibling;
                }
            }
        }
        match next_sibling {
            Some(next) => self.nodes[next.0].prev_sibling = prev_sibling,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].last_child = prev_sibling;
                }
            }
        }

        let node = &mut self.nodes[id.0];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    /// Appends `child` as the last child of `parent`, detaching it from any
    /// previous position first.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        debug_assert_ne!(parent, child);
        self.detach(child);
        let old_last = self.nodes[parent.0].last_child;
        self.nodes[child.0].parent = Some(parent);
        self.nodes[child.0].prev_sibling = old_last;
        match old_last {
            Some(last) => self.nodes[last.0].next_sibling = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
        self.nodes[parent.0].last_child = Some(child);
    }

    /// Inserts `new` as the sibling immediately after `id`.
    pub fn insert_after(&mut self, id: NodeId, new: NodeId) {
        debug_assert_ne!(id, new);
        self.detach(new);
        let parent = self.nodes[id.0].parent;
        let next = self.nodes[id.0].next_sibling;
        self.nodes[new.0].parent = parent;
        self.nodes[new.0].prev_sibling = Some(id);
        self.nodes[new.0].next_sibling = next;
        self.nodes[id.0].next_sibling = Some(new);
        match next {
            Some(next) => self.nodes[next.0].prev_sibling = Some(new),
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].last_child = Some(new);
                }
            }
        }
    }

    /// Inserts `new` as the sibling immediately before `id`.
    pub fn insert_before(&mut self, id: NodeId, new: NodeId) {
        debug_assert_ne!(id, new);
        self.detach(new);
        let parent = self.nodes[id.0].parent;
        let prev = self.nodes[id.0].prev_sibling;
        self.nodes[new.0].parent = parent;
        self.nodes[new.0].prev_sibling = prev;
        self.nodes[new.0].next_sibling = Some(id);
        self.nodes[id.0].prev_sibling = Some(new);
        match prev {
            Some(prev) => self.nodes[prev.0].next_sibling = Some(new),
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].first_child = Some(new);
                }
            }
        }
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id),
        }
    }

    pub fn reverse_children(&self, id: NodeId) -> ReverseChildren<'_> {
        ReverseChildren {
            tree: self,
            next: self.last_child(id),
        }
    }

    /// Pre-order traversal of `id` and everything below it.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            root: id,
            next: Some(id),
        }
    }
}

pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.next_sibling(id);
        Some(id)
    }
}

pub struct ReverseChildren<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl<'a> Iterator for ReverseChildren<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.previous_sibling(id);
        Some(id)
    }
}

pub struct Descendants<'a> {
    tree: &'a Tree,
    root: NodeId,
    next: Option<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = if let Some(child) = self.tree.first_child(id) {
            Some(child)
        } else {
            let mut at = id;
            loop {
                if at == self.root {
                    break None;
                }
                if let Some(sibling) = self.tree.next_sibling(at) {
                    break Some(sibling);
                }
                match self.tree.parent(at) {
                    Some(parent) => at = parent,
                    None => break None,
                }
            }
        };
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Ast, NodeValue, Sourcepos};

    fn node(tree: &mut Tree) -> NodeId {
        tree.alloc(Ast::new(NodeValue::Paragraph, Sourcepos::default().start))
    }

    #[test]
    fn append_and_iterate() {
        let mut tree = Tree::new();
        let root = node(&mut tree);
        let a = node(&mut tree);
        let b = node(&mut tree);
        let c = node(&mut tree);
        tree.append(root, a);
        tree.append(root, b);
        tree.append(root, c);

        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a, b, c]);
        assert_eq!(
            tree.reverse_children(root).collect::<Vec<_>>(),
            vec![c, b, a]
        );
        assert_eq!(tree.parent(b), Some(root));
    }

    #[test]
    fn detach_relinks_siblings() {
        let mut tree = Tree::new();
        let root = node(&mut tree);
        let a = node(&mut tree);
        let b = node(&mut tree);
        let c = node(&mut tree);
        tree.append(root, a);
        tree.append(root, b);
        tree.append(root, c);

        tree.detach(b);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(tree.previous_sibling(c), Some(a));
        assert_eq!(tree.parent(b), None);

        tree.detach(a);
        tree.detach(c);
        assert_eq!(tree.first_child(root), None);
        assert_eq!(tree.last_child(root), None);
    }

    #[test]
    fn insert_before_and_after() {
        let mut tree = Tree::new();
        let root = node(&mut tree);
        let a = node(&mut tree);
        let b = node(&mut tree);
        let c = node(&mut tree);
        tree.append(root, b);
        tree.insert_before(b, a);
        tree.insert_after(b, c);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a, b, c]);
        assert_eq!(tree.first_child(root), Some(a));
        assert_eq!(tree.last_child(root), Some(c));
    }

    #[test]
    fn descendants_preorder() {
        let mut tree = Tree::new();
        let root = node(&mut tree);
        let a = node(&mut tree);
        let a1 = node(&mut tree);
        let b = node(&mut tree);
        tree.append(root, a);
        tree.append(a, a1);
        tree.append(root, b);
        assert_eq!(
            tree.descendants(root).collect::<Vec<_>>(),
            vec![root, a, a1, b]
        );
        assert_eq!(tree.descendants(a).collect::<Vec<_>>(), vec![a, a1]);
    }
}
