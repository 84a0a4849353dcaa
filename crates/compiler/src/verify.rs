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

//! Post-resolution invariant checks. A violation means one of the passes is wrong, not the
//! program being compiled.

use std::collections::{HashMap, HashSet};

use golo_ir::{BindingId, CallDispatch, NodeId, NodeKind, Slot, Tree};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("binding `{name}` in function `{function}` has no slot")]
    MissingSlot { function: String, name: String },
    #[error("bindings `{first}` and `{second}` in function `{function}` share slot {slot}")]
    DuplicateSlot {
        function: String,
        first: String,
        second: String,
        slot: Slot,
    },
    #[error("closure over `{function}` captures {captured:?} but the function takes {expected:?}")]
    CaptureMismatch {
        function: String,
        captured: Vec<String>,
        expected: Vec<String>,
    },
    #[error("call to `{name}` at {node} has no dispatch")]
    UnresolvedDispatch { name: String, node: NodeId },
    #[error("call to `{name}` at {node} is static but `{name}` is a visible binding")]
    StaticCallOnBinding { name: String, node: NodeId },
    #[error("loop break at {node} is not attached to a loop")]
    DetachedLoopBreak { node: NodeId },
}

/// Check a resolved tree: slots present and unique per function (assignment targets included),
/// closure captures matching their functions, and every call and loop break resolved.
pub fn verify(tree: &Tree) -> Result<(), InvariantViolation> {
    for function in tree.all_functions() {
        verify_slots(tree, function)?;
    }
    for id in tree.descendants(tree.root()) {
        verify_node(tree, id)?;
    }
    Ok(())
}

fn verify_slots(tree: &Tree, function: NodeId) -> Result<(), InvariantViolation> {
    let Some(target) = tree.function(function) else {
        return Ok(());
    };
    let scopes = tree.scopes();
    let mut seen: HashSet<BindingId> = HashSet::new();
    let mut slots: HashMap<Slot, BindingId> = HashMap::new();

    let blocks = tree
        .descendants(target.body)
        .into_iter()
        .filter(|id| tree.kind(*id).is_block() && tree.enclosing_function(*id) == Some(function));
    for block in blocks {
        let Some(table) = tree.block_scope(block) else {
            continue;
        };
        for id in scopes.owned_bindings(table) {
            let binding = scopes.binding(id);
            if binding.is_module_level() || !seen.insert(id) {
                continue;
            }
            let Some(slot) = binding.slot else {
                return Err(InvariantViolation::MissingSlot {
                    function: target.name.clone(),
                    name: binding.name.clone(),
                });
            };
            if let Some(other) = slots.insert(slot, id) {
                return Err(InvariantViolation::DuplicateSlot {
                    function: target.name.clone(),
                    first: scopes.binding(other).name.clone(),
                    second: binding.name.clone(),
                    slot,
                });
            }
        }
    }
    Ok(())
}

fn verify_node(tree: &Tree, id: NodeId) -> Result<(), InvariantViolation> {
    match tree.kind(id) {
        NodeKind::Closure(closure) => {
            let Some(function) = tree.function(closure.function) else {
                return Ok(());
            };
            if closure.captured != function.synthetic_parameters {
                return Err(InvariantViolation::CaptureMismatch {
                    function: function.name.clone(),
                    captured: closure.captured.clone(),
                    expected: function.synthetic_parameters.clone(),
                });
            }
        }
        NodeKind::FunctionInvocation { name, dispatch, .. } => {
            let visible = tree
                .ancestor(id, NodeKind::is_block)
                .and_then(|block| tree.block_scope(block))
                .is_some_and(|table| tree.scopes().has(table, name));
            match dispatch {
                None => {
                    return Err(InvariantViolation::UnresolvedDispatch {
                        name: name.clone(),
                        node: id,
                    });
                }
                Some(CallDispatch::Static) if visible => {
                    return Err(InvariantViolation::StaticCallOnBinding {
                        name: name.clone(),
                        node: id,
                    });
                }
                Some(_) => {}
            }
        }
        NodeKind::Assignment { binding, .. } => {
            let binding = tree.scopes().binding(*binding);
            if !binding.is_module_level() && binding.slot.is_none() {
                let function = tree
                    .enclosing_function(id)
                    .and_then(|f| tree.function(f))
                    .map(|f| f.name.clone())
                    .unwrap_or_default();
                return Err(InvariantViolation::MissingSlot {
                    function,
                    name: binding.name.clone(),
                });
            }
        }
        NodeKind::LoopBreak {
            enclosing_loop: None,
            ..
        } => return Err(InvariantViolation::DetachedLoopBreak { node: id }),
        _ => {}
    }
    Ok(())
}
