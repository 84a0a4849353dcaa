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

//! Intermediate representation shared by the Golo compiler passes: an arena of IR nodes with
//! parent links, chained scope tables, bindings, and a builder standing in for the parser.

mod binding;
mod builder;
mod dump;
mod function;
mod node;
mod position;
mod scope;
mod tree;

pub use crate::binding::{Binding, BindingKey, BindingKind, Slot};
pub use crate::builder::Builder;
pub use crate::function::{
    CallDispatch, ClosureValue, Function, FunctionScope, LoopBreakKind, MODULE_INITIALIZER,
    SelfNameAlreadySet,
};
pub use crate::node::{
    BinaryOperator, CollectionKind, Literal, MetaValue, Node, NodeId, NodeKind, UnaryOperator,
};
pub use crate::position::{SourcePosition, describe_position};
pub use crate::scope::{BindingId, ScopeId, ScopeTable, Scopes};
pub use crate::tree::Tree;
