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

//! Indented, line-per-node rendering of an IR subtree, for tracing and tests.

use crate::node::{NodeId, NodeKind};
use crate::tree::Tree;
use itertools::Itertools;
use std::fmt::Write;

const INDENT: &str = "  ";

impl Tree {
    pub fn dump(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, id, 0);
        out
    }

    fn dump_into(&self, out: &mut String, id: NodeId, depth: usize) {
        let pad = INDENT.repeat(depth);
        let _ = write!(out, "{pad}{}", self.describe(id));
        let metadata = self
            .metadata_entries(id)
            .map(|(key, value)| format!("{key}={value}"))
            .join(", ");
        if !metadata.is_empty() {
            let _ = write!(out, " [{metadata}]");
        }
        out.push('\n');

        match self.kind(id) {
            NodeKind::Block { scope, .. } => {
                for binding in self.scopes().owned_bindings(*scope) {
                    let _ = writeln!(out, "{pad}{INDENT}- {}", self.scopes().binding(binding));
                }
            }
            NodeKind::Closure(closure) => {
                for name in closure.captured_names() {
                    let _ = writeln!(out, "{pad}{INDENT}- capture: {name}");
                }
            }
            _ => {}
        }

        for child in self.children(id) {
            self.dump_into(out, child, depth + 1);
        }
    }

    fn describe(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Module { name, .. } => format!("Module {name}"),
            NodeKind::Function(function) => {
                let mut line = format!(
                    "Function {} = |{}|",
                    function.name,
                    function.all_parameters().join(", ")
                );
                if function.synthetic {
                    let _ = write!(
                        line,
                        " (synthetic, {} synthetic parameters)",
                        function.synthetic_parameters.len()
                    );
                }
                if let Some(self_name) = function.self_name() {
                    let _ = write!(line, " self: {self_name}");
                }
                line
            }
            NodeKind::Block { .. } => "Block".to_string(),
            NodeKind::Assignment {
                binding, declaring, ..
            } => {
                let binding = self.scopes().binding(*binding);
                if *declaring {
                    format!("Assignment: {binding} (declaring)")
                } else {
                    format!("Assignment: {binding}")
                }
            }
            NodeKind::ReferenceLookup { name } => format!("Reference lookup: {name}"),
            NodeKind::Constant(literal) => format!("Constant = {literal}"),
            NodeKind::FunctionInvocation { name, dispatch, .. } => match dispatch {
                Some(dispatch) => format!("Function call: {name} ({dispatch})"),
                None => format!("Function call: {name}"),
            },
            NodeKind::MethodInvocation { name, .. } => format!("Method invocation: {name}"),
            NodeKind::BinaryOperation { operator, .. } => format!("Binary operator: {operator}"),
            NodeKind::UnaryOperation { operator, .. } => format!("Unary operator: {operator}"),
            NodeKind::Closure(closure) => {
                let target = self
                    .function(closure.function)
                    .map(|f| f.name.as_str())
                    .unwrap_or("?");
                if self.parent(closure.function) == Some(id) {
                    format!("Closure: {target}")
                } else {
                    format!("Closure reference: {target}")
                }
            }
            NodeKind::Conditional { .. } => "Conditional".to_string(),
            NodeKind::Loop { .. } => "Loop".to_string(),
            NodeKind::LoopBreak { kind, .. } => format!("Loop break: {kind}"),
            NodeKind::Return { .. } => "Return".to_string(),
            NodeKind::Throw { .. } => "Throw".to_string(),
            NodeKind::TryCatchFinally {
                exception_id,
                finally_block,
                ..
            } => {
                let mut line = "Try".to_string();
                if let Some(exception_id) = exception_id {
                    let _ = write!(line, ", catch {exception_id}");
                }
                if finally_block.is_some() {
                    line.push_str(", finally");
                }
                line
            }
            NodeKind::CollectionLiteral { collection, .. } => format!("Collection: {collection}"),
        }
    }
}
