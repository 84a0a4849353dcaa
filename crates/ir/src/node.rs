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

use crate::function::{CallDispatch, ClosureValue, Function, LoopBreakKind};
use crate::position::SourcePosition;
use crate::scope::{BindingId, ScopeId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use strum::{Display as StrumDisplay, EnumIter, IntoStaticStr};

/// Handle of a node inside a [`crate::Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Side information a pass may hang on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Display for MetaValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MetaValue::Bool(b) => write!(f, "{b}"),
            MetaValue::Int(i) => write!(f, "{i}"),
            MetaValue::Str(s) => write!(f, "{s:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Float(v) => write!(f, "{v:?}"),
            Literal::Str(s) => write!(f, "{s:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, EnumIter, Serialize)]
pub enum BinaryOperator {
    #[strum(to_string = "+")]
    Plus,
    #[strum(to_string = "-")]
    Minus,
    #[strum(to_string = "*")]
    Times,
    #[strum(to_string = "/")]
    Divide,
    #[strum(to_string = "%")]
    Modulo,
    #[strum(to_string = "==")]
    Equals,
    #[strum(to_string = "!=")]
    NotEquals,
    #[strum(to_string = "<")]
    Less,
    #[strum(to_string = "<=")]
    LessOrEquals,
    #[strum(to_string = ">")]
    More,
    #[strum(to_string = ">=")]
    MoreOrEquals,
    #[strum(to_string = "and")]
    And,
    #[strum(to_string = "or")]
    Or,
    #[strum(to_string = "is")]
    Is,
    #[strum(to_string = "isnt")]
    IsNt,
    #[strum(to_string = "oftype")]
    OfType,
    #[strum(to_string = "orIfNull")]
    OrIfNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, EnumIter, Serialize)]
pub enum UnaryOperator {
    #[strum(to_string = "not")]
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, EnumIter, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum CollectionKind {
    Tuple,
    List,
    Vector,
    Set,
    Map,
    Array,
}

/// The closed set of IR constructs the passes understand. Desugared constructs never reach
/// this layer.
#[derive(Debug, Clone, PartialEq, IntoStaticStr, Serialize)]
pub enum NodeKind {
    Module {
        name: String,
        scope: ScopeId,
        functions: Vec<NodeId>,
    },
    Function(Function),
    Block {
        scope: ScopeId,
        statements: Vec<NodeId>,
    },
    Assignment {
        binding: BindingId,
        value: NodeId,
        declaring: bool,
    },
    ReferenceLookup {
        name: String,
    },
    Constant(Literal),
    FunctionInvocation {
        name: String,
        arguments: Vec<NodeId>,
        dispatch: Option<CallDispatch>,
    },
    MethodInvocation {
        receiver: NodeId,
        name: String,
        arguments: Vec<NodeId>,
    },
    BinaryOperation {
        operator: BinaryOperator,
        left: NodeId,
        right: NodeId,
    },
    UnaryOperation {
        operator: UnaryOperator,
        operand: NodeId,
    },
    Closure(ClosureValue),
    Conditional {
        condition: NodeId,
        then_block: NodeId,
        else_block: Option<NodeId>,
    },
    Loop {
        init: Option<NodeId>,
        condition: NodeId,
        post: Option<NodeId>,
        body: NodeId,
    },
    LoopBreak {
        kind: LoopBreakKind,
        enclosing_loop: Option<NodeId>,
    },
    Return {
        value: Option<NodeId>,
    },
    Throw {
        value: NodeId,
    },
    TryCatchFinally {
        try_block: NodeId,
        exception_id: Option<String>,
        catch_block: Option<NodeId>,
        finally_block: Option<NodeId>,
    },
    CollectionLiteral {
        collection: CollectionKind,
        values: Vec<NodeId>,
    },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Every node handle this kind refers to in a child position, in walk order. Whether the
    /// referenced node is actually owned is decided by its parent link.
    pub fn child_slots(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Module { functions, .. } => functions.clone(),
            NodeKind::Function(function) => vec![function.body],
            NodeKind::Block { statements, .. } => statements.clone(),
            NodeKind::Assignment { value, .. } => vec![*value],
            NodeKind::ReferenceLookup { .. }
            | NodeKind::Constant(_)
            | NodeKind::LoopBreak { .. } => vec![],
            NodeKind::FunctionInvocation { arguments, .. } => arguments.clone(),
            NodeKind::MethodInvocation {
                receiver,
                arguments,
                ..
            } => std::iter::once(*receiver)
                .chain(arguments.iter().copied())
                .collect(),
            NodeKind::BinaryOperation { left, right, .. } => vec![*left, *right],
            NodeKind::UnaryOperation { operand, .. } => vec![*operand],
            NodeKind::Closure(closure) => vec![closure.function],
            NodeKind::Conditional {
                condition,
                then_block,
                else_block,
            } => [Some(*condition), Some(*then_block), *else_block]
                .into_iter()
                .flatten()
                .collect(),
            NodeKind::Loop {
                init,
                condition,
                post,
                body,
            } => [*init, Some(*condition), *post, Some(*body)]
                .into_iter()
                .flatten()
                .collect(),
            NodeKind::Return { value } => value.iter().copied().collect(),
            NodeKind::Throw { value } => vec![*value],
            NodeKind::TryCatchFinally {
                try_block,
                catch_block,
                finally_block,
                ..
            } => [Some(*try_block), *catch_block, *finally_block]
                .into_iter()
                .flatten()
                .collect(),
            NodeKind::CollectionLiteral { values, .. } => values.clone(),
        }
    }

    /// The growable child list of this kind, if it has one.
    pub(crate) fn child_list_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match self {
            NodeKind::Module { functions, .. } => Some(functions),
            NodeKind::Block { statements, .. } => Some(statements),
            NodeKind::FunctionInvocation { arguments, .. }
            | NodeKind::MethodInvocation { arguments, .. } => Some(arguments),
            NodeKind::CollectionLiteral { values, .. } => Some(values),
            _ => None,
        }
    }

    /// Point every child slot holding `old` at `new` instead. Returns whether anything changed.
    pub(crate) fn replace_child(&mut self, old: NodeId, new: NodeId) -> bool {
        let mut replaced = false;
        let mut swap = |slot: &mut NodeId| {
            if *slot == old {
                *slot = new;
                replaced = true;
            }
        };
        match self {
            NodeKind::Module { functions: list, .. }
            | NodeKind::Block {
                statements: list, ..
            }
            | NodeKind::FunctionInvocation {
                arguments: list, ..
            }
            | NodeKind::CollectionLiteral { values: list, .. } => {
                list.iter_mut().for_each(&mut swap)
            }
            NodeKind::MethodInvocation {
                receiver,
                arguments,
                ..
            } => {
                swap(receiver);
                arguments.iter_mut().for_each(&mut swap);
            }
            NodeKind::Function(function) => swap(&mut function.body),
            NodeKind::Assignment { value, .. }
            | NodeKind::UnaryOperation { operand: value, .. }
            | NodeKind::Throw { value } => swap(value),
            NodeKind::BinaryOperation { left, right, .. } => {
                swap(left);
                swap(right);
            }
            NodeKind::Closure(closure) => swap(&mut closure.function),
            NodeKind::Conditional {
                condition,
                then_block,
                else_block,
            } => {
                swap(condition);
                swap(then_block);
                else_block.iter_mut().for_each(&mut swap);
            }
            NodeKind::Loop {
                init,
                condition,
                post,
                body,
            } => {
                init.iter_mut().for_each(&mut swap);
                swap(condition);
                post.iter_mut().for_each(&mut swap);
                swap(body);
            }
            NodeKind::Return { value } => value.iter_mut().for_each(&mut swap),
            NodeKind::TryCatchFinally {
                try_block,
                catch_block,
                finally_block,
                ..
            } => {
                swap(try_block);
                catch_block.iter_mut().for_each(&mut swap);
                finally_block.iter_mut().for_each(&mut swap);
            }
            NodeKind::ReferenceLookup { .. }
            | NodeKind::Constant(_)
            | NodeKind::LoopBreak { .. } => {}
        }
        replaced
    }

    pub fn is_function(&self) -> bool {
        matches!(self, NodeKind::Function(_))
    }

    pub fn is_block(&self) -> bool {
        matches!(self, NodeKind::Block { .. })
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, NodeKind::Loop { .. })
    }
}

/// A single IR element. Ownership is expressed through `parent`: a node is a child of the node
/// its `parent` names, and of no other.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) position: Option<SourcePosition>,
    pub(crate) documentation: Option<String>,
    pub(crate) metadata: BTreeMap<String, MetaValue>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            position: None,
            documentation: None,
            metadata: BTreeMap::new(),
        }
    }
}
