// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The node arena for one compilation unit.
//!
//! Nodes refer to each other through [`NodeId`] handles. A node's children are the handles in
//! its child slots whose node points back at it through its parent link; a slot whose node has
//! a different (or no) parent is a plain reference. This is how a closure literal keeps naming
//! its function after the function has been lifted into the module.

use crate::function::Function;
use crate::node::{MetaValue, Node, NodeId, NodeKind};
use crate::position::SourcePosition;
use crate::scope::{ScopeId, Scopes};

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    scopes: Scopes,
    root: NodeId,
}

impl Tree {
    /// A tree holding only an empty module named `name` with a fresh module scope.
    pub fn new(name: impl Into<String>) -> Self {
        let mut scopes = Scopes::new();
        let scope = scopes.new_table(None);
        let mut tree = Self {
            nodes: vec![],
            scopes,
            root: NodeId(0),
        };
        tree.root = tree.alloc(NodeKind::Module {
            name: name.into(),
            scope,
            functions: vec![],
        });
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn module_scope(&self) -> ScopeId {
        match &self.kind(self.root) {
            NodeKind::Module { scope, .. } => *scope,
            other => panic!("tree root is a {} rather than a module", other.name()),
        }
    }

    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    pub fn scopes_mut(&mut self) -> &mut Scopes {
        &mut self.scopes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.node_mut(id).kind
    }

    pub fn function(&self, id: NodeId) -> Option<&Function> {
        match self.kind(id) {
            NodeKind::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn function_mut(&mut self, id: NodeId) -> Option<&mut Function> {
        match self.kind_mut(id) {
            NodeKind::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Scope table of a block node.
    pub fn block_scope(&self, id: NodeId) -> Option<ScopeId> {
        match self.kind(id) {
            NodeKind::Block { scope, .. } => Some(*scope),
            _ => None,
        }
    }

    /// The functions the module currently lists, in declaration order.
    pub fn module_functions(&self) -> Vec<NodeId> {
        match self.kind(self.root) {
            NodeKind::Module { functions, .. } => functions.clone(),
            _ => vec![],
        }
    }

    /// Every function node of the unit in tree order, nested closure functions included.
    pub fn all_functions(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| self.kind(*id).is_function())
            .collect()
    }

    /// Add a node and adopt every node named by its child slots. A closure literal only adopts a
    /// function nobody owns yet, otherwise it is created as a plain reference.
    pub fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let slots = kind.child_slots();
        let is_closure = matches!(kind, NodeKind::Closure(_));
        self.nodes.push(Node::new(kind));
        for child in slots {
            if is_closure && self.parent(child).is_some() {
                continue;
            }
            self.adopt(id, child);
        }
        id
    }

    fn adopt(&mut self, parent: NodeId, child: NodeId) {
        assert!(
            parent != child && !self.ancestors(parent).any(|a| a == child),
            "adopting {child} under {parent} would make the tree cyclic"
        );
        if self.parent(child).is_some() {
            self.detach(child);
        }
        self.node_mut(child).parent = Some(parent);
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Nodes owned by `id`, in walk order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id)
            .child_slots()
            .into_iter()
            .filter(|child| self.parent(*child) == Some(id))
            .collect()
    }

    /// Append `child` to the child list of `parent`, detaching it from its previous owner.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        let len = self.list_len(parent);
        self.insert(parent, len, child);
    }

    /// Insert `child` at `index` in the child list of `parent`, detaching it from its previous
    /// owner.
    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.adopt(parent, child);
        let name = self.kind(parent).name();
        let Some(list) = self.kind_mut(parent).child_list_mut() else {
            panic!("a {name} node has no child list to attach {child} to");
        };
        list.insert(index, child);
    }

    fn list_len(&mut self, parent: NodeId) -> usize {
        self.kind_mut(parent)
            .child_list_mut()
            .map(|list| list.len())
            .unwrap_or(0)
    }

    /// Release `child` from its owner. List slots drop the handle; a closure keeps naming its
    /// function as a reference. Any other fixed slot cannot be emptied.
    pub fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        let parent_kind = self.kind_mut(parent);
        let name = parent_kind.name();
        let in_list = parent_kind
            .child_list_mut()
            .and_then(|list| {
                list.iter()
                    .position(|c| *c == child)
                    .map(|index| list.remove(index))
            })
            .is_some();
        let closure_function =
            matches!(parent_kind, NodeKind::Closure(closure) if closure.function == child);
        assert!(
            in_list || closure_function,
            "{child} sits in a fixed slot of a {name} node and cannot be detached"
        );
        self.node_mut(child).parent = None;
    }

    /// Put `replacement` where `original` sits in its parent. The replacement inherits the
    /// original's position and documentation unless it has its own.
    pub fn replace(&mut self, original: NodeId, replacement: NodeId) {
        let Some(parent) = self.parent(original) else {
            panic!("{original} has no parent to be replaced in");
        };
        if original == replacement {
            return;
        }
        if self.parent(replacement).is_some() {
            self.detach(replacement);
        }
        assert!(
            !self.ancestors(parent).any(|a| a == replacement) && parent != replacement,
            "replacing {original} by {replacement} would make the tree cyclic"
        );
        self.kind_mut(parent).replace_child(original, replacement);
        let (position, documentation) = {
            let node = self.node(original);
            (node.position, node.documentation.clone())
        };
        let node = self.node_mut(replacement);
        node.parent = Some(parent);
        if node.position.is_none() {
            node.position = position;
        }
        if node.documentation.is_none() {
            node.documentation = documentation;
        }
        self.node_mut(original).parent = None;
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |n| self.parent(*n))
    }

    pub fn ancestor(&self, id: NodeId, predicate: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        self.ancestors(id).find(|a| predicate(self.kind(*a)))
    }

    pub fn enclosing_function(&self, id: NodeId) -> Option<NodeId> {
        self.ancestor(id, NodeKind::is_function)
    }

    pub fn enclosing_module(&self, id: NodeId) -> Option<NodeId> {
        self.ancestor(id, |kind| matches!(kind, NodeKind::Module { .. }))
    }

    /// `id` and everything it owns, depth first in walk order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = vec![];
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        out
    }

    pub fn position(&self, id: NodeId) -> Option<SourcePosition> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find_map(|n| self.node(n).position)
    }

    pub fn set_position(&mut self, id: NodeId, position: Option<SourcePosition>) {
        self.node_mut(id).position = position;
    }

    pub fn documentation(&self, id: NodeId) -> Option<&str> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find_map(|n| self.node(n).documentation.as_deref())
    }

    pub fn set_documentation(&mut self, id: NodeId, documentation: Option<String>) {
        self.node_mut(id).documentation = documentation;
    }

    pub fn metadata(&self, id: NodeId, key: &str) -> Option<&MetaValue> {
        self.node(id).metadata.get(key)
    }

    /// Metadata of `id` or, failing that, of its nearest ancestor carrying `key`.
    pub fn inherited_metadata(&self, id: NodeId, key: &str) -> Option<&MetaValue> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find_map(|n| self.node(n).metadata.get(key))
    }

    /// Set or, with `None`, remove a metadata entry.
    pub fn set_metadata(&mut self, id: NodeId, key: &str, value: Option<MetaValue>) {
        let metadata = &mut self.node_mut(id).metadata;
        match value {
            Some(value) => {
                metadata.insert(key.to_string(), value);
            }
            None => {
                metadata.remove(key);
            }
        }
    }

    pub fn metadata_entries(&self, id: NodeId) -> impl Iterator<Item = (&str, &MetaValue)> + '_ {
        self.node(id)
            .metadata
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }
}
