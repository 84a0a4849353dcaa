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

#![allow(dead_code)]

//! Fixtures shared by the integration tests: small Golo programs built through the IR builder,
//! and lookups into the tree after compilation.

use std::sync::Once;

use golo_compiler::ProblemKind;
use golo_ir::{BinaryOperator, Builder, NodeId, NodeKind, Slot, Tree};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static TRACING: Once = Once::new();

/// Log to the test writer, honouring `RUST_LOG` and defaulting to warnings only.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_test_writer())
            .try_init();
    });
}

pub fn function_named(tree: &Tree, name: &str) -> NodeId {
    tree.all_functions()
        .into_iter()
        .find(|id| tree.function(*id).is_some_and(|f| f.name == name))
        .unwrap_or_else(|| {
            let dump = tree.dump(tree.root());
            panic!("no function named {name}\n{dump}")
        })
}

/// Slot of `binding` as seen from the body of function `function`.
pub fn slot_of(tree: &Tree, function: &str, binding: &str) -> Option<Slot> {
    let id = function_named(tree, function);
    let body = tree.function(id).unwrap().body;
    let table = tree.block_scope(body).unwrap();
    tree.scopes().get_binding(table, binding).and_then(|b| b.slot)
}

pub fn synthetic_parameters(tree: &Tree, function: &str) -> Vec<String> {
    let id = function_named(tree, function);
    tree.function(id).unwrap().synthetic_parameters.clone()
}

/// Captured names of every closure literal over `function`, in tree order.
pub fn captures_of(tree: &Tree, function: &str) -> Vec<Vec<String>> {
    let target = function_named(tree, function);
    tree.descendants(tree.root())
        .into_iter()
        .filter_map(|id| match tree.kind(id) {
            NodeKind::Closure(closure) if closure.function == target => {
                Some(closure.captured.clone())
            }
            _ => None,
        })
        .collect()
}

pub fn kinds(problems: &[golo_compiler::Problem]) -> Vec<ProblemKind> {
    problems.iter().map(|p| p.kind).collect()
}

// =============================================================================
// Programs
// =============================================================================

/// `function f = |x| { let y = x + 1 return y }`
pub fn increment() -> Tree {
    let mut b = Builder::new("scenarios.Increment");
    b.at(1, 1).function("f", &["x"], |b| {
        let x = b.at(2, 11).lookup("x");
        let one = b.int(1);
        let sum = b.binary(BinaryOperator::Plus, x, one);
        b.at(2, 3).let_("y", sum);
        let y = b.lookup("y");
        b.at(3, 3).ret(Some(y));
    });
    b.finish()
}

/// `function main = { let adder = |n| -> |m| -> n + m }`
pub fn curried_adder() -> Tree {
    let mut b = Builder::new("scenarios.Adder");
    b.function("main", &[], |b| {
        let adder = b.at(2, 15).closure(&["n"], |b| {
            let inner = b.at(2, 23).closure(&["m"], |b| {
                let n = b.lookup("n");
                let m = b.lookup("m");
                let sum = b.binary(BinaryOperator::Plus, n, m);
                b.ret(Some(sum));
            });
            b.ret(Some(inner));
        });
        b.at(2, 3).let_("adder", adder);
    });
    b.finish()
}

/// ```golo
/// function main = {
///   let fib = |n| {
///     if n < 2 { return n }
///     return fib(n - 1) + fib(n - 2)
///   }
///   return fib(10)
/// }
/// ```
pub fn recursive_fib() -> Tree {
    let mut b = Builder::new("scenarios.Fib");
    b.function("main", &[], |b| {
        let fib = b.at(2, 13).closure(&["n"], |b| {
            let n = b.lookup("n");
            let two = b.int(2);
            let small = b.binary(BinaryOperator::Less, n, two);
            b.if_then(small, |b| {
                let n = b.lookup("n");
                b.ret(Some(n));
            });
            let recurse = |b: &mut Builder, by: i64| {
                let n = b.lookup("n");
                let by = b.int(by);
                let argument = b.binary(BinaryOperator::Minus, n, by);
                b.call("fib", vec![argument])
            };
            let left = recurse(b, 1);
            let right = recurse(b, 2);
            let sum = b.binary(BinaryOperator::Plus, left, right);
            b.ret(Some(sum));
        });
        b.at(2, 3).let_("fib", fib);
        let ten = b.int(10);
        let call = b.call("fib", vec![ten]);
        b.ret(Some(call));
    });
    b.finish()
}
