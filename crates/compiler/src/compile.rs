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

use golo_ir::{MetaValue, NodeId, NodeKind, Tree};
use serde::Serialize;
use tracing::{debug, info};

use crate::closure_capture::convert_closures;
use crate::diagnostics::{CompileError, Diagnostics};
use crate::options::CompileOptions;
use crate::resolve::{FRAME_SIZE, resolve_bindings};
use crate::verify::verify;

/// Summary of a function after both passes, ready for code generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledFunction {
    pub name: String,
    pub node: NodeId,
    /// Declared plus captured parameters.
    pub arity: usize,
    pub frame_size: u16,
    pub synthetic_parameters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledUnit {
    pub module: String,
    pub functions: Vec<CompiledFunction>,
}

impl CompiledUnit {
    pub fn function(&self, name: &str) -> Option<&CompiledFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn frame_size(&self, name: &str) -> Option<u16> {
        self.function(name).map(|f| f.frame_size)
    }
}

/// Run closure conversion then binding resolution over `tree`.
///
/// The tree is left converted and resolved even when problems are returned, so callers can
/// still dump or render it.
pub fn compile(tree: &mut Tree, options: &CompileOptions) -> Result<CompiledUnit, CompileError> {
    let module = match tree.kind(tree.root()) {
        NodeKind::Module { name, .. } => name.clone(),
        _ => String::new(),
    };
    info!(module = %module, "compiling");

    convert_closures(tree, options);
    let mut diagnostics = Diagnostics::new();
    resolve_bindings(tree, options, &mut diagnostics);
    diagnostics.into_result(&module)?;

    if options.verify_output
        && let Err(violation) = verify(tree)
    {
        panic!(
            "[please report this bug] {violation}\n{}",
            tree.dump(tree.root())
        );
    }

    let functions = tree
        .all_functions()
        .into_iter()
        .filter_map(|id| {
            let function = tree.function(id)?;
            let frame_size = match tree.metadata(id, FRAME_SIZE) {
                Some(MetaValue::Int(size)) => u16::try_from(*size).unwrap_or(u16::MAX),
                _ => 0,
            };
            Some(CompiledFunction {
                name: function.name.clone(),
                node: id,
                arity: function.arity(),
                frame_size,
                synthetic_parameters: function.synthetic_parameters.clone(),
            })
        })
        .collect::<Vec<_>>();
    debug!(module = %module, functions = functions.len(), "compiled");
    Ok(CompiledUnit { module, functions })
}
