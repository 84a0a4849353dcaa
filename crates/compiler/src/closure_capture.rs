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

//! Closure conversion.
//!
//! Every function produced from a closure literal is made self-contained: the names its body
//! reads or writes without declaring them become extra (synthetic) parameters that the closure
//! literal supplies when the closure value is created. Declarations the body never touches are
//! pruned from their scope tables, a closure bound by `let f = |..| ..` may call itself through
//! `f` without capturing it, and converted functions are lifted into the module.

use std::collections::HashMap;

use golo_ir::{Binding, BindingKind, ClosureValue, NodeId, NodeKind, ScopeId, Tree};
use indexmap::IndexSet;
use tracing::{debug, trace, warn};

use crate::options::CompileOptions;

/// What one closure body declares and touches. Nested closures get a context of their own.
#[derive(Debug, Default)]
struct Context {
    /// Every parameter of the function, captured ones included. Never pruned.
    parameters: IndexSet<String>,
    /// Names owned by any block of the function, in discovery order.
    all_references: IndexSet<String>,
    defining_block: HashMap<String, NodeId>,
    /// Names bound by a declaring assignment in the body.
    local_references: IndexSet<String>,
    /// Names read, written or called through, in first-access order.
    accessed: IndexSet<String>,
    tables: Vec<ScopeId>,
}

impl Context {
    fn free_variables(&self) -> Vec<String> {
        self.accessed
            .iter()
            .filter(|name| !self.local_references.contains(*name))
            .cloned()
            .collect()
    }

    fn dead_bindings(&self) -> Vec<String> {
        self.all_references
            .iter()
            .filter(|name| !self.accessed.contains(*name))
            .cloned()
            .collect()
    }
}

struct ClosureConversion<'a> {
    tree: &'a mut Tree,
    options: &'a CompileOptions,
    contexts: Vec<Context>,
    /// Closure functions bound by a declaring assignment, and the name they are bound to.
    self_names: HashMap<NodeId, String>,
}

/// Run closure conversion over a whole compilation unit, in place.
///
/// Running it again on its own output changes nothing.
pub fn convert_closures(tree: &mut Tree, options: &CompileOptions) {
    let root = tree.root();
    debug!("closure conversion: start");
    trace!("before closure conversion:\n{}", tree.dump(root));
    let mut pass = ClosureConversion {
        tree,
        options,
        contexts: vec![],
        self_names: HashMap::new(),
    };
    pass.visit(root);
    trace!("after closure conversion:\n{}", pass.tree.dump(root));
    debug!("closure conversion: done");
}

impl ClosureConversion<'_> {
    fn visit(&mut self, id: NodeId) {
        match self.tree.kind(id) {
            NodeKind::Module { .. } => {
                // Lifted closures are appended while we go; they were converted in place.
                for function in self.tree.module_functions() {
                    self.visit(function);
                }
            }
            NodeKind::Function(_) => self.visit_function(id),
            NodeKind::Block { .. } => self.visit_block(id),
            NodeKind::Assignment { .. } => self.visit_assignment(id),
            NodeKind::ReferenceLookup { name } => {
                let name = name.clone();
                self.accessed(&name);
            }
            NodeKind::FunctionInvocation { name, .. } => {
                let name = name.clone();
                let known = self
                    .contexts
                    .last()
                    .is_some_and(|context| context.all_references.contains(&name));
                if known {
                    self.accessed(&name);
                }
                self.walk(id);
            }
            NodeKind::Closure(_) => self.visit_closure(id),
            NodeKind::TryCatchFinally { .. } => self.visit_try_catch_finally(id),
            NodeKind::Constant(_) | NodeKind::LoopBreak { .. } => {}
            NodeKind::MethodInvocation { .. }
            | NodeKind::BinaryOperation { .. }
            | NodeKind::UnaryOperation { .. }
            | NodeKind::Conditional { .. }
            | NodeKind::Loop { .. }
            | NodeKind::Return { .. }
            | NodeKind::Throw { .. }
            | NodeKind::CollectionLiteral { .. } => self.walk(id),
        }
    }

    fn walk(&mut self, id: NodeId) {
        for child in self.tree.children(id) {
            self.visit(child);
        }
    }

    fn accessed(&mut self, name: &str) {
        if let Some(context) = self.contexts.last_mut() {
            context.accessed.insert(name.to_string());
        }
    }

    fn declared(&mut self, name: &str) {
        if let Some(context) = self.contexts.last_mut() {
            context.local_references.insert(name.to_string());
        }
    }

    fn visit_function(&mut self, id: NodeId) {
        let Some(function) = self.tree.function(id) else {
            return;
        };
        let body = function.body;
        if !function.synthetic {
            self.visit(body);
            return;
        }

        let context = Context {
            parameters: function.all_parameters().map(str::to_string).collect(),
            ..Default::default()
        };
        self.contexts.push(context);
        self.intern_body_table(body);
        self.visit(body);
        if let Some(context) = self.contexts.pop() {
            self.finish_closure(id, context);
        }
    }

    /// Give the closure body a parentless copy of everything it can see, so nothing it resolves
    /// later reaches into the enclosing function.
    fn intern_body_table(&mut self, body: NodeId) {
        let Some(scope) = self.tree.block_scope(body) else {
            return;
        };
        let flat = self.tree.scopes_mut().flatten(scope, true);
        if let NodeKind::Block { scope, .. } = self.tree.kind_mut(body) {
            *scope = flat;
        }
    }

    fn visit_block(&mut self, id: NodeId) {
        let Some(scope) = self.tree.block_scope(id) else {
            return;
        };
        let in_context = match self.contexts.last_mut() {
            Some(context) => {
                if let Some(top) = context.tables.last().copied() {
                    self.tree.scopes_mut().relink(scope, top, true);
                }
                context.tables.push(scope);
                for name in self.tree.scopes().owned_names(scope) {
                    context.defining_block.insert(name.to_string(), id);
                    context.all_references.insert(name.to_string());
                }
                true
            }
            None => false,
        };
        self.walk(id);
        if in_context && let Some(context) = self.contexts.last_mut() {
            context.tables.pop();
        }
    }

    fn visit_assignment(&mut self, id: NodeId) {
        let NodeKind::Assignment {
            binding,
            value,
            declaring,
        } = *self.tree.kind(id)
        else {
            return;
        };
        let (name, module_level) = {
            let binding = self.tree.scopes().binding(binding);
            (binding.name.clone(), binding.is_module_level())
        };

        if module_level {
            self.declared(&name);
        } else {
            let top = self
                .contexts
                .last()
                .and_then(|context| context.tables.last().copied());
            if let Some(target) = top.and_then(|top| self.tree.scopes().get(top, &name))
                && let NodeKind::Assignment { binding, .. } = self.tree.kind_mut(id)
            {
                *binding = target;
            }
            if declaring {
                self.declared(&name);
            }
        }
        self.accessed(&name);

        if declaring && self.options.self_capture {
            if let NodeKind::Closure(closure) = self.tree.kind(value) {
                let function = closure.function;
                if self.tree.parent(function) == Some(value) {
                    self.self_names.insert(function, name);
                }
            }
        }
        self.visit(value);
    }

    fn visit_try_catch_finally(&mut self, id: NodeId) {
        let NodeKind::TryCatchFinally {
            try_block,
            exception_id,
            catch_block,
            finally_block,
        } = self.tree.kind(id).clone()
        else {
            return;
        };
        self.visit(try_block);
        if let Some(catch_block) = catch_block {
            if let Some(exception_id) = &exception_id {
                self.accessed(exception_id);
                self.declared(exception_id);
            }
            self.visit(catch_block);
        }
        if let Some(finally_block) = finally_block {
            self.visit(finally_block);
        }
    }

    fn visit_closure(&mut self, id: NodeId) {
        let NodeKind::Closure(ClosureValue { function, .. }) = *self.tree.kind(id) else {
            return;
        };
        if self.tree.parent(function) == Some(id) {
            self.visit(function);
        }
        let Some(target) = self.tree.function(function) else {
            return;
        };
        if !target.synthetic {
            return;
        }
        // The literal loads its captures from this scope. Declared parameters are bound by the
        // caller, even when an outer binding shares their name.
        let captures = target.synthetic_parameters.clone();
        let Some(top) = self
            .contexts
            .last()
            .and_then(|context| context.tables.last().copied())
        else {
            return;
        };
        for name in captures {
            if self.tree.scopes().has(top, &name) {
                self.accessed(&name);
            }
        }
    }

    fn finish_closure(&mut self, id: NodeId, context: Context) {
        let Some(function) = self.tree.function(id) else {
            return;
        };
        let body = function.body;
        let name = function.name.clone();
        let Some(body_scope) = self.tree.block_scope(body) else {
            return;
        };
        let free = context.free_variables();

        let mut new_self_name = None;
        if let Some(candidate) = self.self_names.remove(&id)
            && free.contains(&candidate)
            && !function.has_parameter(&candidate)
        {
            let already_set = function.self_name().is_some();
            if let Some(function) = self.tree.function_mut(id) {
                match function.set_self_name(&candidate) {
                    Ok(()) if !already_set => new_self_name = Some(candidate),
                    Ok(()) => {}
                    Err(e) => warn!("{e}"),
                }
            }
        }

        let scopes = self.tree.scopes();
        let captures: Vec<String> = free
            .into_iter()
            .filter(|name| {
                !scopes
                    .get_binding(body_scope, name)
                    .is_some_and(|binding| binding.is_module_level())
            })
            .collect();
        let added = match self.tree.function_mut(id) {
            Some(function) => {
                function.add_synthetic_parameters(captures.iter().map(String::as_str))
            }
            None => vec![],
        };

        let mut pruned = vec![];
        if self.options.prune_dead_bindings {
            for dead in context.dead_bindings() {
                if context.parameters.contains(&dead) {
                    continue;
                }
                let Some(block) = context.defining_block.get(&dead) else {
                    continue;
                };
                if let Some(scope) = self.tree.block_scope(*block)
                    && self.tree.scopes_mut().remove(scope, &dead).is_some()
                {
                    pruned.push(dead);
                }
            }
        }

        if let Some(self_name) = &new_self_name {
            self.insert_self_assignment(id, body, body_scope, self_name);
        }

        if self.options.lift_closures {
            self.lift(id);
        }

        debug!(
            function = %name,
            captured = ?added,
            pruned = ?pruned,
            self_name = ?new_self_name,
            "converted closure"
        );
    }

    /// `self_name = <this closure>` as the first statement of the body, so recursive calls go
    /// through a local rather than a capture.
    fn insert_self_assignment(
        &mut self,
        function: NodeId,
        body: NodeId,
        body_scope: ScopeId,
        self_name: &str,
    ) {
        let scopes = self.tree.scopes_mut();
        let binding = match scopes.get(body_scope, self_name) {
            Some(binding) => binding,
            None => scopes.add(
                body_scope,
                Binding::new(self_name, BindingKind::LocalConstant),
            ),
        };
        let value = self.tree.alloc(NodeKind::Closure(ClosureValue::new(function)));
        let assignment = self.tree.alloc(NodeKind::Assignment {
            binding,
            value,
            declaring: true,
        });
        self.tree.insert(body, 0, assignment);
    }

    /// Move a closure's function out of its literal and into the module; the literal keeps
    /// referring to it.
    fn lift(&mut self, function: NodeId) {
        let Some(parent) = self.tree.parent(function) else {
            return;
        };
        if !matches!(self.tree.kind(parent), NodeKind::Closure(_)) {
            return;
        }
        let root = self.tree.root();
        self.tree.detach(function);
        self.tree.attach(root, function);
    }
}
