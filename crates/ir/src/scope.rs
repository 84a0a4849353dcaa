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

//! Chained lexical scope tables.
//!
//! Every block owns one table; a table maps names to bindings and optionally points at its
//! enclosing table. Tables and the bindings they hold both live in a [`Scopes`] arena and are
//! addressed by [`ScopeId`] / [`BindingId`], so a binding can be shared between tables and
//! AST nodes without any reference counting.

use crate::binding::{Binding, BindingKind};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::fmt::{Display, Formatter, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BindingId(pub u32);

impl Display for ScopeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

impl Display for BindingId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "binding#{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScopeTable {
    parent: Option<ScopeId>,
    entries: IndexMap<String, BindingId>,
}

#[derive(Debug, Clone, Default)]
pub struct Scopes {
    tables: Vec<ScopeTable>,
    bindings: Vec<Binding>,
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_table(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.tables.len() as u32);
        self.tables.push(ScopeTable {
            parent,
            entries: IndexMap::new(),
        });
        id
    }

    /// A fresh, empty table whose parent is `table`. The parent is left untouched.
    pub fn fork(&mut self, table: ScopeId) -> ScopeId {
        self.new_table(Some(table))
    }

    /// Store a binding in the arena without registering it in any table.
    pub fn alloc_binding(&mut self, binding: Binding) -> BindingId {
        let id = BindingId(self.bindings.len() as u32);
        self.bindings.push(binding);
        id
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id.0 as usize]
    }

    pub fn binding_mut(&mut self, id: BindingId) -> &mut Binding {
        &mut self.bindings[id.0 as usize]
    }

    fn table(&self, id: ScopeId) -> &ScopeTable {
        &self.tables[id.0 as usize]
    }

    fn table_mut(&mut self, id: ScopeId) -> &mut ScopeTable {
        &mut self.tables[id.0 as usize]
    }

    /// Insert (or overwrite) `binding` under its name at this level only.
    pub fn add(&mut self, table: ScopeId, binding: Binding) -> BindingId {
        let id = self.alloc_binding(binding);
        self.add_binding(table, id);
        id
    }

    /// Register an already allocated binding in `table`, sharing it with any other holder.
    pub fn add_binding(&mut self, table: ScopeId, binding: BindingId) {
        let name = self.binding(binding).name.clone();
        self.table_mut(table).entries.insert(name, binding);
    }

    pub fn remove(&mut self, table: ScopeId, name: &str) -> Option<BindingId> {
        self.table_mut(table).entries.shift_remove(name)
    }

    pub fn parent(&self, table: ScopeId) -> Option<ScopeId> {
        self.table(table).parent
    }

    /// The chain starting at `table` itself and ending at its root.
    pub fn chain(&self, table: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(table), move |t| {
            self.parent(*t).filter(|parent| parent != t)
        })
    }

    pub fn has(&self, table: ScopeId, name: &str) -> bool {
        self.get(table, name).is_some()
    }

    pub fn get(&self, table: ScopeId, name: &str) -> Option<BindingId> {
        self.chain(table)
            .find_map(|t| self.table(t).entries.get(name).copied())
    }

    pub fn get_binding(&self, table: ScopeId, name: &str) -> Option<&Binding> {
        self.get(table, name).map(|id| self.binding(id))
    }

    pub fn owns(&self, table: ScopeId, name: &str) -> bool {
        self.table(table).entries.contains_key(name)
    }

    pub fn owned_names(&self, table: ScopeId) -> impl Iterator<Item = &str> + '_ {
        self.table(table).entries.keys().map(String::as_str)
    }

    pub fn owned_bindings(&self, table: ScopeId) -> impl Iterator<Item = BindingId> + '_ {
        self.table(table).entries.values().copied()
    }

    /// Every visible name, own names first, then each ancestor's in turn.
    pub fn names(&self, table: ScopeId) -> IndexSet<String> {
        self.chain(table)
            .flat_map(|t| self.table(t).entries.keys().cloned())
            .collect()
    }

    /// Every visible binding; a name shadowed by a nearer table contributes only the nearer one.
    pub fn bindings(&self, table: ScopeId) -> Vec<BindingId> {
        let mut seen = IndexMap::new();
        for t in self.chain(table) {
            for (name, id) in &self.table(t).entries {
                seen.entry(name.as_str()).or_insert(*id);
            }
        }
        seen.into_values().collect()
    }

    /// Number of entries in this table and all its ancestors, shadowed ones included.
    pub fn len(&self, table: ScopeId) -> usize {
        self.chain(table).map(|t| self.table(t).entries.len()).sum()
    }

    /// Whether this level owns nothing; ancestors are not consulted.
    pub fn is_empty(&self, table: ScopeId) -> bool {
        self.table(table).entries.is_empty()
    }

    /// Whether `other` is `table` itself or somewhere on its parent chain.
    pub fn is_linked_to(&self, table: ScopeId, other: ScopeId) -> bool {
        self.chain(table).any(|t| t == other)
    }

    fn set_parent(&mut self, table: ScopeId, parent: ScopeId) {
        assert!(
            !self.is_linked_to(parent, table),
            "relinking {table} under {parent} would make the scope chain cyclic"
        );
        self.table_mut(table).parent = Some(parent);
    }

    /// Move `table` under `parent`. With `prune`, owned bindings whose name is already
    /// visible from `parent` are dropped so that lookups resolve to the outer binding.
    pub fn relink(&mut self, table: ScopeId, parent: ScopeId, prune: bool) {
        if table == parent {
            return;
        }
        if prune {
            for name in self.names(parent) {
                self.remove(table, &name);
            }
        }
        self.set_parent(table, parent);
    }

    /// Attach the root of `table`'s chain to `top`, unless the two chains already meet.
    pub fn relink_top_level(&mut self, table: ScopeId, top: ScopeId) {
        let mut current = table;
        loop {
            if current == top {
                return;
            }
            match self.parent(current) {
                None => {
                    self.set_parent(current, top);
                    return;
                }
                Some(_) if self.is_linked_to(current, top) || self.is_linked_to(top, current) => {
                    return;
                }
                Some(parent) => current = parent,
            }
        }
    }

    /// A parentless snapshot of everything visible from `table`. Bindings owned by the
    /// table keep their kind; with `treat_outer_as_constant`, inherited local bindings come in as
    /// local constants. Module-level bindings always keep their kind. Copies carry no slot.
    pub fn flatten(&mut self, table: ScopeId, treat_outer_as_constant: bool) -> ScopeId {
        let copies: Vec<Binding> = self
            .bindings(table)
            .into_iter()
            .map(|id| {
                let original = self.binding(id);
                let module_level = original.is_module_level();
                let kind = if !module_level
                    && treat_outer_as_constant
                    && !self.owns(table, &original.name)
                {
                    BindingKind::LocalConstant
                } else {
                    original.kind
                };
                Binding {
                    synthetic: !module_level && original.synthetic,
                    ..Binding::new(original.name.clone(), kind)
                }
            })
            .collect();
        let flat = self.new_table(None);
        for copy in copies {
            self.add(flat, copy);
        }
        flat
    }

    /// Multi-line rendering of a table and its ancestors, nearest first.
    pub fn describe(&self, table: ScopeId) -> String {
        let mut out = String::new();
        for (depth, t) in self.chain(table).enumerate() {
            if depth > 0 {
                out.push_str(" => ");
            }
            let _ = write!(out, "{t} {{");
            for (i, id) in self.table(t).entries.values().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{}", self.binding(*id));
            }
            out.push('}');
        }
        out
    }
}
