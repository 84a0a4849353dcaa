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

use crate::node::NodeId;
use serde::Serialize;
use strum::{Display, EnumIter};
use thiserror::Error;

/// Name of the function holding module-level `let`/`var` initialisation. It is the only place a
/// module constant may be assigned.
pub const MODULE_INITIALIZER: &str = "<clinit>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
pub enum FunctionScope {
    Module,
    Augmentation,
    Closure,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("function `{function}` already refers to itself as `{existing}`, cannot rename to `{requested}`")]
pub struct SelfNameAlreadySet {
    pub function: String,
    pub existing: String,
    pub requested: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Function {
    pub name: String,
    /// Parameters as written, in declaration order.
    pub parameters: Vec<String>,
    /// Captured values added by closure conversion. Passed ahead of `parameters`.
    pub synthetic_parameters: Vec<String>,
    pub body: NodeId,
    pub scope: FunctionScope,
    /// Produced from a closure literal rather than declared by the user.
    pub synthetic: bool,
    pub varargs: bool,
    self_name: Option<String>,
}

impl Function {
    pub fn new(
        name: impl Into<String>,
        parameters: Vec<String>,
        body: NodeId,
        scope: FunctionScope,
    ) -> Self {
        Self {
            name: name.into(),
            parameters,
            synthetic_parameters: vec![],
            body,
            scope,
            synthetic: false,
            varargs: false,
            self_name: None,
        }
    }

    pub fn closure(name: impl Into<String>, parameters: Vec<String>, body: NodeId) -> Self {
        Self {
            synthetic: true,
            ..Self::new(name, parameters, body, FunctionScope::Closure)
        }
    }

    pub fn arity(&self) -> usize {
        self.parameters.len() + self.synthetic_parameters.len()
    }

    /// Parameter names in calling order: captured values first, then the declared ones.
    pub fn all_parameters(&self) -> impl Iterator<Item = &str> + '_ {
        self.synthetic_parameters
            .iter()
            .chain(self.parameters.iter())
            .map(String::as_str)
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.all_parameters().any(|p| p == name)
    }

    pub fn is_module_initializer(&self) -> bool {
        self.name == MODULE_INITIALIZER
    }

    pub fn is_anonymous(&self) -> bool {
        self.synthetic && self.scope == FunctionScope::Closure
    }

    pub fn self_name(&self) -> Option<&str> {
        self.self_name.as_deref()
    }

    /// Record the name this closure is bound to. Once set it can only be set again to the same
    /// name.
    pub fn set_self_name(&mut self, name: &str) -> Result<(), SelfNameAlreadySet> {
        match &self.self_name {
            None => {
                self.self_name = Some(name.to_string());
                Ok(())
            }
            Some(existing) if existing == name => Ok(()),
            Some(existing) => Err(SelfNameAlreadySet {
                function: self.name.clone(),
                existing: existing.clone(),
                requested: name.to_string(),
            }),
        }
    }

    /// Append captured names, skipping anything already a parameter and the self name. Returns
    /// the names actually added.
    pub fn add_synthetic_parameters<'a>(
        &mut self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Vec<String> {
        let mut added = vec![];
        for name in names {
            if self.has_parameter(name) || self.self_name() == Some(name) {
                continue;
            }
            self.synthetic_parameters.push(name.to_string());
            added.push(name.to_string());
        }
        added
    }
}

/// A closure literal. `function` is owned by the literal until closure conversion lifts it into
/// the module; `captured` mirrors the function's synthetic parameters once bindings are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClosureValue {
    pub function: NodeId,
    pub captured: Vec<String>,
}

impl ClosureValue {
    pub fn new(function: NodeId) -> Self {
        Self {
            function,
            captured: vec![],
        }
    }

    pub fn captured_names(&self) -> &[String] {
        &self.captured
    }

    pub fn capture_count(&self) -> usize {
        self.captured.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum LoopBreakKind {
    Break,
    Continue,
}

/// How a function invocation's callee is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
pub enum CallDispatch {
    /// Dispatched by name to a function of the module or an import.
    Static,
    /// The callee is a local binding holding a function reference.
    LocalValue,
    /// The callee is a module-level binding holding a function reference.
    ModuleValue,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn function() -> Function {
        Function::closure("__closure_0", vec!["a".into(), "b".into()], NodeId(0))
    }

    #[test]
    fn test_parameter_order() {
        let mut f = function();
        assert_eq!(f.arity(), 2);
        let added = f.add_synthetic_parameters(["x", "a", "y", "x"]);
        assert_eq!(added, vec!["x", "y"]);
        assert_eq!(
            f.all_parameters().collect::<Vec<_>>(),
            vec!["x", "y", "a", "b"]
        );
        assert_eq!(f.arity(), 4);
    }

    #[test]
    fn test_self_name_is_skipped() {
        let mut f = function();
        f.set_self_name("fib").unwrap();
        assert_eq!(f.add_synthetic_parameters(["fib", "n"]), vec!["n"]);
    }

    #[test]
    fn test_self_name_set_once() {
        let mut f = function();
        assert_eq!(f.self_name(), None);
        assert!(f.set_self_name("loop").is_ok());
        assert!(f.set_self_name("loop").is_ok());
        let error = f.set_self_name("other").unwrap_err();
        assert_eq!(error.existing, "loop");
        assert_eq!(f.self_name(), Some("loop"));
    }

    #[test]
    fn test_module_initializer() {
        let f = Function::new(MODULE_INITIALIZER, vec![], NodeId(0), FunctionScope::Module);
        assert!(f.is_module_initializer());
        assert!(!f.is_anonymous());
        assert!(function().is_anonymous());
    }
}
