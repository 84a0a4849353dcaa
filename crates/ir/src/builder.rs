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

//! Top-down construction of a module tree, with the same scope bookkeeping the parser performs.
//!
//! Statements are appended to the block under the cursor; nested constructs take a closure that
//! builds their body with the cursor moved inside. Expressions are created detached and adopted
//! by whatever node they are passed to.
//!
//! ```
//! use golo_ir::{BinaryOperator, Builder};
//!
//! let mut b = Builder::new("demo");
//! b.function("inc", &["x"], |b| {
//!     let x = b.lookup("x");
//!     let one = b.int(1);
//!     let sum = b.binary(BinaryOperator::Plus, x, one);
//!     b.let_("y", sum);
//!     let y = b.lookup("y");
//!     b.ret(Some(y));
//! });
//! let tree = b.finish();
//! assert_eq!(tree.module_functions().len(), 1);
//! ```

use crate::binding::{Binding, BindingKind};
use crate::function::{ClosureValue, Function, FunctionScope, LoopBreakKind, MODULE_INITIALIZER};
use crate::node::{BinaryOperator, CollectionKind, Literal, NodeId, NodeKind, UnaryOperator};
use crate::position::SourcePosition;
use crate::scope::ScopeId;
use crate::tree::Tree;

/// Position and documentation waiting for the next node to be built.
#[derive(Debug, Default)]
struct Mark {
    position: Option<SourcePosition>,
    documentation: Option<String>,
}

pub struct Builder {
    tree: Tree,
    blocks: Vec<NodeId>,
    initializer: Option<NodeId>,
    closures: usize,
    pending: Mark,
}

impl Builder {
    pub fn new(module: &str) -> Self {
        Self {
            tree: Tree::new(module),
            blocks: vec![],
            initializer: None,
            closures: 0,
            pending: Mark::default(),
        }
    }

    pub fn finish(self) -> Tree {
        self.tree
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// Position for the next node built.
    pub fn at(&mut self, line: u32, column: u32) -> &mut Self {
        self.pending.position = Some(SourcePosition::new(line, column));
        self
    }

    /// Documentation for the next node built.
    pub fn documented(&mut self, documentation: &str) -> &mut Self {
        self.pending.documentation = Some(documentation.to_string());
        self
    }

    fn take_mark(&mut self) -> Mark {
        std::mem::take(&mut self.pending)
    }

    fn apply(&mut self, id: NodeId, mark: Mark) -> NodeId {
        if mark.position.is_some() {
            self.tree.set_position(id, mark.position);
        }
        if mark.documentation.is_some() {
            self.tree.set_documentation(id, mark.documentation);
        }
        id
    }

    fn node(&mut self, kind: NodeKind) -> NodeId {
        let mark = self.take_mark();
        let id = self.tree.alloc(kind);
        self.apply(id, mark)
    }

    fn current_block(&self) -> NodeId {
        let Some(block) = self.blocks.last() else {
            panic!("statements can only be built inside a function body");
        };
        *block
    }

    fn current_scope(&self) -> ScopeId {
        let block = self.current_block();
        let Some(scope) = self.tree.block_scope(block) else {
            panic!("builder cursor {block} is not a block");
        };
        scope
    }

    fn parameter_scope(&mut self, parent: ScopeId, parameters: &[&str]) -> ScopeId {
        let scopes = self.tree.scopes_mut();
        let scope = scopes.fork(parent);
        for parameter in parameters {
            scopes.add(scope, Binding::new(*parameter, BindingKind::LocalConstant));
        }
        scope
    }

    fn within(&mut self, block: NodeId, body: impl FnOnce(&mut Self)) {
        self.blocks.push(block);
        body(self);
        self.blocks.pop();
    }

    /// A detached block forked from the current scope, filled by `body`.
    fn block_in(&mut self, body: impl FnOnce(&mut Self)) -> NodeId {
        let parent = self.current_scope();
        let scope = self.tree.scopes_mut().fork(parent);
        self.detached_block(scope, body)
    }

    fn detached_block(&mut self, scope: ScopeId, body: impl FnOnce(&mut Self)) -> NodeId {
        let block = self.tree.alloc(NodeKind::Block {
            scope,
            statements: vec![],
        });
        self.within(block, body);
        block
    }

    // Declarations

    /// A module-level function whose body sees the module scope and its own parameters.
    pub fn function(
        &mut self,
        name: &str,
        parameters: &[&str],
        body: impl FnOnce(&mut Self),
    ) -> NodeId {
        self.function_with_scope(name, parameters, FunctionScope::Module, body)
    }

    pub fn function_with_scope(
        &mut self,
        name: &str,
        parameters: &[&str],
        scope: FunctionScope,
        body: impl FnOnce(&mut Self),
    ) -> NodeId {
        let mark = self.take_mark();
        let module_scope = self.tree.module_scope();
        let table = self.parameter_scope(module_scope, parameters);
        let block = self.tree.alloc(NodeKind::Block {
            scope: table,
            statements: vec![],
        });
        let function = self.tree.alloc(NodeKind::Function(Function::new(
            name,
            parameters.iter().map(|p| p.to_string()).collect(),
            block,
            scope,
        )));
        self.apply(function, mark);
        let root = self.tree.root();
        self.tree.attach(root, function);
        self.within(block, body);
        function
    }

    /// A closure literal. Its body forks the scope of the block under the cursor.
    pub fn closure(&mut self, parameters: &[&str], body: impl FnOnce(&mut Self)) -> NodeId {
        let mark = self.take_mark();
        let name = format!("__closure_{}", self.closures);
        self.closures += 1;
        let table = self.parameter_scope(self.current_scope(), parameters);
        let block = self.tree.alloc(NodeKind::Block {
            scope: table,
            statements: vec![],
        });
        let function = self.tree.alloc(NodeKind::Function(Function::closure(
            name,
            parameters.iter().map(|p| p.to_string()).collect(),
            block,
        )));
        self.tree.set_position(function, mark.position);
        let closure = self.tree.alloc(NodeKind::Closure(ClosureValue::new(function)));
        self.apply(closure, mark);
        self.within(block, body);
        closure
    }

    fn initializer_body(&mut self) -> NodeId {
        if let Some(body) = self.initializer {
            return body;
        }
        let module_scope = self.tree.module_scope();
        let table = self.tree.scopes_mut().fork(module_scope);
        let body = self.tree.alloc(NodeKind::Block {
            scope: table,
            statements: vec![],
        });
        let function = self.tree.alloc(NodeKind::Function(Function::new(
            MODULE_INITIALIZER,
            vec![],
            body,
            FunctionScope::Module,
        )));
        let root = self.tree.root();
        self.tree.attach(root, function);
        self.initializer = Some(body);
        body
    }

    fn module_state(&mut self, name: &str, kind: BindingKind, value: NodeId) -> NodeId {
        let body = self.initializer_body();
        let module_scope = self.tree.module_scope();
        let binding = self
            .tree
            .scopes_mut()
            .add(module_scope, Binding::new(name, kind));
        let assignment = self.node(NodeKind::Assignment {
            binding,
            value,
            declaring: true,
        });
        self.tree.attach(body, assignment);
        assignment
    }

    /// Module-level `let`, initialised in the module initializer.
    pub fn module_let(&mut self, name: &str, value: NodeId) -> NodeId {
        self.module_state(name, BindingKind::ModuleConstant, value)
    }

    /// Module-level `var`, initialised in the module initializer.
    pub fn module_var(&mut self, name: &str, value: NodeId) -> NodeId {
        self.module_state(name, BindingKind::ModuleVariable, value)
    }

    // Statements

    /// Append an already built node to the current block.
    pub fn push(&mut self, statement: NodeId) -> NodeId {
        let block = self.current_block();
        self.tree.attach(block, statement);
        statement
    }

    /// A declaring assignment registered in the current scope but not appended anywhere.
    pub fn declaring(&mut self, name: &str, kind: BindingKind, value: NodeId) -> NodeId {
        let scope = self.current_scope();
        let binding = self.tree.scopes_mut().add(scope, Binding::new(name, kind));
        self.node(NodeKind::Assignment {
            binding,
            value,
            declaring: true,
        })
    }

    pub fn let_(&mut self, name: &str, value: NodeId) -> NodeId {
        let assignment = self.declaring(name, BindingKind::LocalConstant, value);
        self.push(assignment)
    }

    pub fn var_(&mut self, name: &str, value: NodeId) -> NodeId {
        let assignment = self.declaring(name, BindingKind::LocalVariable, value);
        self.push(assignment)
    }

    /// A plain assignment to whatever `name` resolves to from here, not appended anywhere. An
    /// unknown name gets a fresh variable that no table holds.
    pub fn assignment(&mut self, name: &str, value: NodeId) -> NodeId {
        let scope = self.current_scope();
        let scopes = self.tree.scopes_mut();
        let binding = match scopes.get(scope, name) {
            Some(binding) => binding,
            None => scopes.alloc_binding(Binding::new(name, BindingKind::LocalVariable)),
        };
        self.node(NodeKind::Assignment {
            binding,
            value,
            declaring: false,
        })
    }

    pub fn assign(&mut self, name: &str, value: NodeId) -> NodeId {
        let assignment = self.assignment(name, value);
        self.push(assignment)
    }

    /// A compiler temporary. It is not registered in any table; binding resolution adds it to
    /// the table it is first assigned in.
    pub fn declare_synthetic(&mut self, name: &str, value: NodeId) -> NodeId {
        let binding = self
            .tree
            .scopes_mut()
            .alloc_binding(Binding::synthetic(name, BindingKind::LocalVariable));
        let assignment = self.node(NodeKind::Assignment {
            binding,
            value,
            declaring: true,
        });
        self.push(assignment)
    }

    pub fn nested_block(&mut self, body: impl FnOnce(&mut Self)) -> NodeId {
        let mark = self.take_mark();
        let block = self.block_in(body);
        self.apply(block, mark);
        self.push(block)
    }

    pub fn if_then(&mut self, condition: NodeId, then: impl FnOnce(&mut Self)) -> NodeId {
        let mark = self.take_mark();
        let then_block = self.block_in(then);
        self.conditional(mark, condition, then_block, None)
    }

    pub fn if_else(
        &mut self,
        condition: NodeId,
        then: impl FnOnce(&mut Self),
        otherwise: impl FnOnce(&mut Self),
    ) -> NodeId {
        let mark = self.take_mark();
        let then_block = self.block_in(then);
        let else_block = self.block_in(otherwise);
        self.conditional(mark, condition, then_block, Some(else_block))
    }

    fn conditional(
        &mut self,
        mark: Mark,
        condition: NodeId,
        then_block: NodeId,
        else_block: Option<NodeId>,
    ) -> NodeId {
        let conditional = self.tree.alloc(NodeKind::Conditional {
            condition,
            then_block,
            else_block,
        });
        self.apply(conditional, mark);
        self.push(conditional)
    }

    pub fn while_loop(&mut self, condition: NodeId, body: impl FnOnce(&mut Self)) -> NodeId {
        let mark = self.take_mark();
        let body = self.block_in(body);
        let node = self.tree.alloc(NodeKind::Loop {
            init: None,
            condition,
            post: None,
            body,
        });
        self.apply(node, mark);
        self.push(node)
    }

    /// `for (init, condition, post) { body }`. The loop sits in a block of its own so the
    /// variable declared by `init` is scoped to it.
    pub fn for_loop(
        &mut self,
        init: impl FnOnce(&mut Self) -> NodeId,
        condition: impl FnOnce(&mut Self) -> NodeId,
        post: impl FnOnce(&mut Self) -> NodeId,
        body: impl FnOnce(&mut Self),
    ) -> NodeId {
        let mark = self.take_mark();
        let parent = self.current_scope();
        let scope = self.tree.scopes_mut().fork(parent);
        let mut node = None;
        let wrapper = self.detached_block(scope, |b| {
            let init = init(b);
            let condition = condition(b);
            let post = post(b);
            let body = b.block_in(body);
            let id = b.tree.alloc(NodeKind::Loop {
                init: Some(init),
                condition,
                post: Some(post),
                body,
            });
            node = Some(b.push(id));
        });
        self.push(wrapper);
        let Some(node) = node else {
            unreachable!("loop body builder always runs");
        };
        self.apply(node, mark)
    }

    pub fn try_catch(
        &mut self,
        try_body: impl FnOnce(&mut Self),
        exception_id: &str,
        catch_body: impl FnOnce(&mut Self),
    ) -> NodeId {
        let mark = self.take_mark();
        let try_block = self.block_in(try_body);
        let catch_block = self.catch_block(exception_id, catch_body);
        self.try_node(mark, try_block, Some((exception_id, catch_block)), None)
    }

    pub fn try_finally(
        &mut self,
        try_body: impl FnOnce(&mut Self),
        finally_body: impl FnOnce(&mut Self),
    ) -> NodeId {
        let mark = self.take_mark();
        let try_block = self.block_in(try_body);
        let finally_block = self.block_in(finally_body);
        self.try_node(mark, try_block, None, Some(finally_block))
    }

    pub fn try_catch_finally(
        &mut self,
        try_body: impl FnOnce(&mut Self),
        exception_id: &str,
        catch_body: impl FnOnce(&mut Self),
        finally_body: impl FnOnce(&mut Self),
    ) -> NodeId {
        let mark = self.take_mark();
        let try_block = self.block_in(try_body);
        let catch_block = self.catch_block(exception_id, catch_body);
        let finally_block = self.block_in(finally_body);
        self.try_node(
            mark,
            try_block,
            Some((exception_id, catch_block)),
            Some(finally_block),
        )
    }

    fn catch_block(&mut self, exception_id: &str, body: impl FnOnce(&mut Self)) -> NodeId {
        let parent = self.current_scope();
        let scopes = self.tree.scopes_mut();
        let scope = scopes.fork(parent);
        scopes.add(
            scope,
            Binding::synthetic(exception_id, BindingKind::LocalConstant),
        );
        self.detached_block(scope, body)
    }

    fn try_node(
        &mut self,
        mark: Mark,
        try_block: NodeId,
        catch: Option<(&str, NodeId)>,
        finally_block: Option<NodeId>,
    ) -> NodeId {
        let node = self.tree.alloc(NodeKind::TryCatchFinally {
            try_block,
            exception_id: catch.map(|(id, _)| id.to_string()),
            catch_block: catch.map(|(_, block)| block),
            finally_block,
        });
        self.apply(node, mark);
        self.push(node)
    }

    pub fn ret(&mut self, value: Option<NodeId>) -> NodeId {
        let node = self.node(NodeKind::Return { value });
        self.push(node)
    }

    pub fn throw(&mut self, value: NodeId) -> NodeId {
        let node = self.node(NodeKind::Throw { value });
        self.push(node)
    }

    pub fn break_(&mut self) -> NodeId {
        self.loop_break(LoopBreakKind::Break)
    }

    pub fn continue_(&mut self) -> NodeId {
        self.loop_break(LoopBreakKind::Continue)
    }

    fn loop_break(&mut self, kind: LoopBreakKind) -> NodeId {
        let node = self.node(NodeKind::LoopBreak {
            kind,
            enclosing_loop: None,
        });
        self.push(node)
    }

    // Expressions

    pub fn lookup(&mut self, name: &str) -> NodeId {
        self.node(NodeKind::ReferenceLookup {
            name: name.to_string(),
        })
    }

    pub fn constant(&mut self, literal: Literal) -> NodeId {
        self.node(NodeKind::Constant(literal))
    }

    pub fn int(&mut self, value: i64) -> NodeId {
        self.constant(Literal::Int(value))
    }

    pub fn string(&mut self, value: &str) -> NodeId {
        self.constant(Literal::Str(value.to_string()))
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.constant(Literal::Bool(value))
    }

    pub fn null(&mut self) -> NodeId {
        self.constant(Literal::Null)
    }

    pub fn call(&mut self, name: &str, arguments: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::FunctionInvocation {
            name: name.to_string(),
            arguments,
            dispatch: None,
        })
    }

    pub fn method(&mut self, receiver: NodeId, name: &str, arguments: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::MethodInvocation {
            receiver,
            name: name.to_string(),
            arguments,
        })
    }

    pub fn binary(&mut self, operator: BinaryOperator, left: NodeId, right: NodeId) -> NodeId {
        self.node(NodeKind::BinaryOperation {
            operator,
            left,
            right,
        })
    }

    pub fn unary(&mut self, operator: UnaryOperator, operand: NodeId) -> NodeId {
        self.node(NodeKind::UnaryOperation { operator, operand })
    }

    pub fn collection(&mut self, collection: CollectionKind, values: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::CollectionLiteral { collection, values })
    }
}
