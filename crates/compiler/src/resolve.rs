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

//! Binding resolution.
//!
//! Assigns every local binding a slot in its function's frame and checks that names are used
//! legally: declared before use, declared once per block, constants assigned once, and
//! `break`/`continue` inside a loop. Every violation is reported to the collector and the walk
//! carries on.

use std::collections::HashSet;

use golo_ir::{
    BindingId, BindingKey, CallDispatch, MetaValue, NodeId, NodeKind, ScopeId, Slot,
    SourcePosition, Tree, describe_position,
};
use tracing::{debug, trace};

use crate::diagnostics::{Diagnostics, ProblemKind};
use crate::options::CompileOptions;

/// Metadata key under which each function records how many slots its frame needs.
pub const FRAME_SIZE: &str = "frame-size";

/// Per-function state. Closures still nested in their literal get a frame of their own.
struct FunctionFrame {
    function: NodeId,
    next_slot: u16,
    tables: Vec<ScopeId>,
    /// For each open block, the bindings assigned so far in it or its enclosing blocks.
    assigned: Vec<HashSet<BindingKey>>,
}

impl FunctionFrame {
    fn new(function: NodeId) -> Self {
        Self {
            function,
            next_slot: 0,
            tables: vec![],
            assigned: vec![],
        }
    }

    fn next_slot(&mut self) -> Slot {
        let slot = Slot(self.next_slot);
        self.next_slot += 1;
        slot
    }
}

struct BindingResolution<'a> {
    tree: &'a mut Tree,
    options: &'a CompileOptions,
    diagnostics: &'a mut Diagnostics,
    frames: Vec<FunctionFrame>,
    /// Bindings of the function being resolved whose block has been entered but whose declaring
    /// assignment has not run yet. Each function starts with an empty set.
    uninitialized: HashSet<BindingKey>,
}

/// Assign slots and report scope errors for a whole compilation unit. Expects closure
/// conversion to have run already, since slots depend on the final parameter lists.
pub fn resolve_bindings(tree: &mut Tree, options: &CompileOptions, diagnostics: &mut Diagnostics) {
    let root = tree.root();
    debug!("binding resolution: start");
    let reported = diagnostics.len();
    let mut pass = BindingResolution {
        tree,
        options,
        diagnostics,
        frames: vec![],
        uninitialized: HashSet::new(),
    };
    pass.visit(root);
    trace!("after binding resolution:\n{}", pass.tree.dump(root));
    debug!(
        problems = pass.diagnostics.len() - reported,
        "binding resolution: done"
    );
}

impl BindingResolution<'_> {
    fn visit(&mut self, id: NodeId) {
        match self.tree.kind(id) {
            NodeKind::Module { .. } => {
                for function in self.tree.module_functions() {
                    self.visit(function);
                }
            }
            NodeKind::Function(_) => self.visit_function(id),
            NodeKind::Block { .. } => self.visit_block(id),
            NodeKind::Assignment { .. } => self.visit_assignment(id),
            NodeKind::ReferenceLookup { name } => {
                let name = name.clone();
                self.visit_reference_lookup(id, &name);
            }
            NodeKind::FunctionInvocation { .. } => self.visit_function_invocation(id),
            NodeKind::LoopBreak { .. } => self.visit_loop_break(id),
            NodeKind::Closure(_) => self.visit_closure(id),
            NodeKind::Constant(_) => {}
            NodeKind::MethodInvocation { .. }
            | NodeKind::BinaryOperation { .. }
            | NodeKind::UnaryOperation { .. }
            | NodeKind::Conditional { .. }
            | NodeKind::Loop { .. }
            | NodeKind::Return { .. }
            | NodeKind::Throw { .. }
            | NodeKind::TryCatchFinally { .. }
            | NodeKind::CollectionLiteral { .. } => self.walk(id),
        }
    }

    fn walk(&mut self, id: NodeId) {
        for child in self.tree.children(id) {
            self.visit(child);
        }
    }

    fn current_table(&self) -> Option<ScopeId> {
        self.frames
            .last()
            .and_then(|frame| frame.tables.last().copied())
    }

    fn report(&mut self, kind: ProblemKind, message: String, node: NodeId) {
        let position = self.tree.position(node);
        self.diagnostics.report(kind, message, position, node);
    }

    fn visit_function(&mut self, id: NodeId) {
        let Some(function) = self.tree.function(id) else {
            return;
        };
        let name = function.name.clone();
        let synthetic = function.synthetic;
        let body = function.body;
        let parameters: Vec<String> = function.all_parameters().map(str::to_string).collect();
        let Some(table) = self.tree.block_scope(body) else {
            return;
        };

        let mut frame = FunctionFrame::new(id);
        for parameter in &parameters {
            let found = self
                .tree
                .scopes()
                .get(table, parameter)
                .filter(|binding| !self.tree.scopes().binding(*binding).is_module_level());
            match found {
                Some(binding) => {
                    self.tree.scopes_mut().binding_mut(binding).slot = Some(frame.next_slot());
                }
                None if !synthetic => panic!(
                    "[please report this bug] {parameter} is not declared in the references of function {name}"
                ),
                None => {}
            }
        }

        self.frames.push(frame);
        let enclosing = std::mem::take(&mut self.uninitialized);
        self.visit(body);
        self.uninitialized = enclosing;
        if let Some(frame) = self.frames.pop() {
            self.tree.set_metadata(
                id,
                FRAME_SIZE,
                Some(MetaValue::Int(i64::from(frame.next_slot))),
            );
            debug!(function = %name, frame_size = frame.next_slot, "resolved function");
        }
    }

    fn visit_block(&mut self, id: NodeId) {
        let Some(table) = self.tree.block_scope(id) else {
            return;
        };
        let Some(frame) = self.frames.last_mut() else {
            self.walk(id);
            return;
        };

        let owned: Vec<BindingId> = self.tree.scopes().owned_bindings(table).collect();
        for binding in owned {
            let binding = self.tree.scopes_mut().binding_mut(binding);
            if binding.slot.is_none() && !binding.is_module_level() {
                binding.slot = Some(frame.next_slot());
                self.uninitialized.insert(binding.key());
            }
        }

        let mut assigned = HashSet::new();
        let function_body = self
            .tree
            .function(frame.function)
            .and_then(|function| self.tree.block_scope(function.body).map(|t| (t, function)));
        if let Some((body_table, function)) = function_body
            && body_table == table
        {
            for parameter in function.all_parameters() {
                if let Some(binding) = self.tree.scopes().get_binding(table, parameter) {
                    assigned.insert(binding.key());
                }
            }
        }
        if let Some(enclosing) = frame.assigned.last() {
            assigned.extend(enclosing.iter().cloned());
        }
        frame.tables.push(table);
        frame.assigned.push(assigned);

        self.walk(id);

        if let Some(frame) = self.frames.last_mut() {
            frame.tables.pop();
            frame.assigned.pop();
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
        let (key, synthetic) = {
            let binding = self.tree.scopes().binding(binding);
            (binding.key(), binding.synthetic)
        };
        let Some(frame) = self.frames.last() else {
            self.visit(value);
            return;
        };
        let position = describe_position(self.tree.position(id));
        let in_initializer = self
            .tree
            .function(frame.function)
            .is_some_and(|function| function.name == self.options.module_initializer);
        let assigned = frame.assigned.last();

        let redeclaring = !synthetic
            && declaring
            && assigned.is_some_and(|assigned| assigned.iter().any(|k| k.name == key.name));
        let assigning_constant = key.kind.is_constant()
            && (assigned.is_some_and(|assigned| assigned.contains(&key))
                || (key.kind.is_module_level() && !in_initializer));

        if redeclaring {
            self.report(
                ProblemKind::ReferenceAlreadyDeclaredInBlock,
                format!(
                    "Declaring a duplicate reference `{}` at {position}",
                    key.name
                ),
                id,
            );
        } else if assigning_constant {
            self.report(
                ProblemKind::AssignConstant,
                format!(
                    "Assigning `{}` at {position} but it is a constant reference",
                    key.name
                ),
                id,
            );
        }

        self.bind_reference(binding, id);
        if let Some(assigned) = self
            .frames
            .last_mut()
            .and_then(|frame| frame.assigned.last_mut())
        {
            assigned.insert(key.clone());
        }
        self.visit(value);
        if declaring && !synthetic {
            self.uninitialized.remove(&key);
        }
    }

    /// Give an assignment target the slot of the binding its name resolves to. Compiler
    /// temporaries nobody declared are added to the current table on the spot.
    fn bind_reference(&mut self, binding: BindingId, node: NodeId) {
        let Some(table) = self.current_table() else {
            return;
        };
        let (name, synthetic, module_level, slotted) = {
            let binding = self.tree.scopes().binding(binding);
            (
                binding.name.clone(),
                binding.synthetic,
                binding.is_module_level(),
                binding.slot.is_some(),
            )
        };
        if slotted {
            return;
        }
        match self.tree.scopes().get(table, &name) {
            Some(found) => {
                let slot = self.tree.scopes().binding(found).slot;
                self.tree.scopes_mut().binding_mut(binding).slot = slot;
            }
            None if synthetic => {
                let Some(frame) = self.frames.last_mut() else {
                    return;
                };
                let slot = frame.next_slot();
                let scopes = self.tree.scopes_mut();
                scopes.binding_mut(binding).slot = Some(slot);
                scopes.add_binding(table, binding);
            }
            None if !module_level => {
                let message = self.undeclared_message(&name, self.tree.position(node));
                self.report(ProblemKind::UndeclaredReference, message, node);
            }
            None => {}
        }
    }

    fn undeclared_message(&self, name: &str, position: Option<SourcePosition>) -> String {
        let mut message = format!("Undeclared reference `{name}`");
        if let Some(function) = self
            .frames
            .last()
            .and_then(|frame| self.tree.function(frame.function))
        {
            let synthetic = if function.synthetic { "synthetic " } else { "" };
            message.push_str(&format!(" in {synthetic}function `{}`", function.name));
        }
        match position {
            Some(position) => message.push_str(&format!(" at {position}")),
            None => message.push_str(" (generated code)"),
        }
        message
    }

    fn visit_reference_lookup(&mut self, id: NodeId, name: &str) {
        let Some(table) = self.current_table() else {
            return;
        };
        let position = self.tree.position(id);
        let problem = match self.tree.scopes().get_binding(table, name) {
            None => Some((
                ProblemKind::UndeclaredReference,
                self.undeclared_message(name, position),
            )),
            Some(binding)
                if !binding.synthetic
                    && !binding.is_module_level()
                    && self.uninitialized.contains(&binding.key()) =>
            {
                Some((
                    ProblemKind::UninitializedReferenceAccess,
                    format!(
                        "Uninitialized reference `{name}` at {}",
                        describe_position(position)
                    ),
                ))
            }
            Some(_) => None,
        };
        if let Some((kind, message)) = problem {
            self.report(kind, message, id);
        }
    }

    fn visit_function_invocation(&mut self, id: NodeId) {
        if let Some(table) = self.current_table()
            && let NodeKind::FunctionInvocation { name, .. } = self.tree.kind(id)
        {
            let resolved = match self.tree.scopes().get_binding(table, name) {
                Some(binding) if binding.is_module_level() => CallDispatch::ModuleValue,
                Some(_) => CallDispatch::LocalValue,
                None => CallDispatch::Static,
            };
            if let NodeKind::FunctionInvocation { dispatch, .. } = self.tree.kind_mut(id) {
                *dispatch = Some(resolved);
            }
        }
        self.walk(id);
    }

    fn visit_loop_break(&mut self, id: NodeId) {
        let enclosing = self
            .tree
            .ancestors(id)
            .take_while(|ancestor| !self.tree.kind(*ancestor).is_function())
            .find(|ancestor| self.tree.kind(*ancestor).is_loop());
        match enclosing {
            Some(found) => {
                if let NodeKind::LoopBreak { enclosing_loop, .. } = self.tree.kind_mut(id) {
                    *enclosing_loop = Some(found);
                }
            }
            None => {
                let message = format!(
                    "continue or break statement outside a loop at {}",
                    describe_position(self.tree.position(id))
                );
                self.report(ProblemKind::BreakOrContinueOutsideLoop, message, id);
            }
        }
    }

    fn visit_closure(&mut self, id: NodeId) {
        let NodeKind::Closure(closure) = self.tree.kind(id) else {
            return;
        };
        let function = closure.function;
        let captured = self
            .tree
            .function(function)
            .map(|target| target.synthetic_parameters.clone())
            .unwrap_or_default();
        if let NodeKind::Closure(closure) = self.tree.kind_mut(id) {
            closure.captured = captured;
        }
        if self.tree.parent(function) == Some(id) {
            self.visit(function);
        }
    }
}
