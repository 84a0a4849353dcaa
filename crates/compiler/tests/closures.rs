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

mod common;

use common::{
    captures_of, curried_adder, function_named, init_tracing, kinds, recursive_fib, slot_of,
    synthetic_parameters,
};
use golo_compiler::{CompileOptions, ProblemKind, compile, convert_closures};
use golo_ir::{BinaryOperator, Builder, CallDispatch, NodeKind, Slot, Tree};
use pretty_assertions::assert_eq;

/// ```golo
/// function main = {
///   let factor = 3
///   let unused = 0
///   let scale = |x| {
///     let k = 2
///     return x * k * factor
///   }
/// }
/// ```
fn scale_by_factor() -> Tree {
    let mut b = Builder::new("closures.Scale");
    b.function("main", &[], |b| {
        let three = b.int(3);
        b.let_("factor", three);
        let zero = b.int(0);
        b.let_("unused", zero);
        let scale = b.closure(&["x"], |b| {
            let two = b.int(2);
            b.let_("k", two);
            let x = b.lookup("x");
            let k = b.lookup("k");
            let product = b.binary(BinaryOperator::Times, x, k);
            let factor = b.lookup("factor");
            let product = b.binary(BinaryOperator::Times, product, factor);
            b.ret(Some(product));
        });
        b.let_("scale", scale);
    });
    b.finish()
}

fn function_dispatches(tree: &Tree, function: &str) -> Vec<(String, Option<CallDispatch>)> {
    let id = function_named(tree, function);
    tree.descendants(id)
        .into_iter()
        .filter_map(|node| match tree.kind(node) {
            NodeKind::FunctionInvocation { name, dispatch, .. } => Some((name.clone(), *dispatch)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_free_variables_become_synthetic_parameters() {
    init_tracing();
    let mut tree = scale_by_factor();
    let unit = compile(&mut tree, &CompileOptions::default()).unwrap();
    assert_eq!(synthetic_parameters(&tree, "__closure_0"), vec!["factor"]);
    assert_eq!(
        captures_of(&tree, "__closure_0"),
        vec![vec!["factor".to_string()]]
    );
    // Captured values come first.
    assert_eq!(slot_of(&tree, "__closure_0", "factor"), Some(Slot(0)));
    assert_eq!(slot_of(&tree, "__closure_0", "x"), Some(Slot(1)));
    assert_eq!(slot_of(&tree, "__closure_0", "k"), Some(Slot(2)));
    assert_eq!(unit.function("__closure_0").map(|f| f.arity), Some(2));
}

#[test]
fn test_untouched_outer_bindings_are_pruned() {
    let mut tree = scale_by_factor();
    convert_closures(&mut tree, &CompileOptions::default());
    let closure = function_named(&tree, "__closure_0");
    let body = tree.function(closure).unwrap().body;
    let table = tree.block_scope(body).unwrap();
    let names: Vec<_> = tree.scopes().names(table).into_iter().collect();
    assert_eq!(names, vec!["x", "k", "factor"]);
}

#[test]
fn test_pruning_can_be_disabled() {
    let mut tree = scale_by_factor();
    let options = CompileOptions {
        prune_dead_bindings: false,
        ..CompileOptions::default()
    };
    convert_closures(&mut tree, &options);
    let closure = function_named(&tree, "__closure_0");
    let body = tree.function(closure).unwrap().body;
    let table = tree.block_scope(body).unwrap();
    assert!(tree.scopes().has(table, "unused"));
    assert!(tree.scopes().has(table, "scale"));
    assert_eq!(synthetic_parameters(&tree, "__closure_0"), vec!["factor"]);
}

#[test]
fn test_converted_closures_are_lifted() {
    let mut tree = curried_adder();
    convert_closures(&mut tree, &CompileOptions::default());
    let root = tree.root();
    let module_functions: Vec<_> = tree
        .module_functions()
        .into_iter()
        .map(|id| tree.function(id).unwrap().name.clone())
        .collect();
    assert_eq!(module_functions, vec!["main", "__closure_1", "__closure_0"]);
    assert!(tree.dump(root).contains("Closure reference: __closure_0"));
}

#[test]
fn test_unlifted_closures_still_compile() {
    let mut tree = curried_adder();
    let options = CompileOptions {
        lift_closures: false,
        verify_output: true,
        ..CompileOptions::default()
    };
    compile(&mut tree, &options).unwrap();
    assert_eq!(tree.module_functions().len(), 1);
    assert_eq!(
        captures_of(&tree, "__closure_1"),
        vec![vec!["n".to_string()]]
    );
    assert_eq!(slot_of(&tree, "__closure_1", "m"), Some(Slot(1)));
}

#[test]
fn test_self_reference_is_not_captured() {
    let mut tree = recursive_fib();
    let unit = compile(&mut tree, &CompileOptions::default()).unwrap();
    let fib = function_named(&tree, "__closure_0");
    assert_eq!(tree.function(fib).unwrap().self_name(), Some("fib"));
    assert_eq!(
        synthetic_parameters(&tree, "__closure_0"),
        Vec::<String>::new()
    );
    assert_eq!(
        function_dispatches(&tree, "__closure_0"),
        vec![
            ("fib".to_string(), Some(CallDispatch::LocalValue)),
            ("fib".to_string(), Some(CallDispatch::LocalValue)),
        ]
    );
    assert_eq!(unit.frame_size("__closure_0"), Some(2));
    assert_eq!(unit.frame_size("main"), Some(1));
}

#[test]
fn test_self_capture_can_be_disabled() {
    let mut tree = recursive_fib();
    let options = CompileOptions {
        self_capture: false,
        ..CompileOptions::default()
    };
    compile(&mut tree, &options).unwrap();
    let fib = function_named(&tree, "__closure_0");
    assert_eq!(tree.function(fib).unwrap().self_name(), None);
    assert_eq!(synthetic_parameters(&tree, "__closure_0"), vec!["fib"]);
}

#[test]
fn test_conversion_is_idempotent() {
    for build in [scale_by_factor, curried_adder, recursive_fib] {
        let mut tree = build();
        let options = CompileOptions::default();
        convert_closures(&mut tree, &options);
        let once = tree.dump(tree.root());
        convert_closures(&mut tree, &options);
        assert_eq!(tree.dump(tree.root()), once);
    }
}

#[test]
fn test_captured_order_follows_first_access() {
    let mut b = Builder::new("closures.Order");
    b.function("main", &["a", "b"], |b| {
        let closure = b.closure(&[], |b| {
            let second = b.lookup("b");
            let first = b.lookup("a");
            let again = b.lookup("b");
            let list = b.collection(golo_ir::CollectionKind::List, vec![second, first, again]);
            b.ret(Some(list));
        });
        b.let_("pair", closure);
    });
    let mut tree = b.finish();
    compile(&mut tree, &CompileOptions::default()).unwrap();
    assert_eq!(synthetic_parameters(&tree, "__closure_0"), vec!["b", "a"]);
}

#[test]
fn test_module_state_and_unknown_calls_are_not_captured() {
    let mut b = Builder::new("closures.Module");
    let zero = b.int(0);
    b.module_var("counter", zero);
    b.function("main", &[], |b| {
        let closure = b.closure(&["x"], |b| {
            let counter = b.lookup("counter");
            let x = b.lookup("x");
            let sum = b.binary(BinaryOperator::Plus, counter, x);
            b.assign("counter", sum);
            let counter = b.lookup("counter");
            let call = b.call("println", vec![counter]);
            b.push(call);
        });
        b.let_("bump", closure);
    });
    let mut tree = b.finish();
    compile(&mut tree, &CompileOptions::default()).unwrap();
    assert_eq!(
        synthetic_parameters(&tree, "__closure_0"),
        Vec::<String>::new()
    );
    assert_eq!(
        function_dispatches(&tree, "__closure_0"),
        vec![("println".to_string(), Some(CallDispatch::Static))]
    );
}

#[test]
fn test_assigning_a_captured_value_is_rejected() {
    let mut b = Builder::new("closures.Captured");
    b.function("main", &[], |b| {
        let zero = b.int(0);
        b.var_("total", zero);
        let closure = b.closure(&["x"], |b| {
            let total = b.lookup("total");
            let x = b.lookup("x");
            let sum = b.binary(BinaryOperator::Plus, total, x);
            b.at(4, 5).assign("total", sum);
        });
        b.let_("add", closure);
    });
    let mut tree = b.finish();
    let error = compile(&mut tree, &CompileOptions::default()).unwrap_err();
    assert_eq!(kinds(error.problems()), vec![ProblemKind::AssignConstant]);
    assert_eq!(synthetic_parameters(&tree, "__closure_0"), vec!["total"]);
}

#[test]
fn test_undeclared_name_in_closure() {
    let mut b = Builder::new("closures.Missing");
    b.function("main", &[], |b| {
        let closure = b.closure(&[], |b| {
            let missing = b.at(3, 12).lookup("missing");
            b.ret(Some(missing));
        });
        b.let_("broken", closure);
    });
    let mut tree = b.finish();
    let error = compile(&mut tree, &CompileOptions::default()).unwrap_err();
    assert_eq!(
        kinds(error.problems()),
        vec![ProblemKind::UndeclaredReference]
    );
    assert_eq!(
        error.problems()[0].message,
        "Undeclared reference `missing` in synthetic function `__closure_0` at line 3, column 12"
    );
}

/// ```golo
/// function main = {
///   let m = 0
///   let adder = |n| -> |m| -> n + m
///   return m
/// }
/// ```
fn adder_shadowing_outer_binding() -> Tree {
    let mut b = Builder::new("closures.Shadow");
    b.function("main", &[], |b| {
        let zero = b.int(0);
        b.let_("m", zero);
        let adder = b.closure(&["n"], |b| {
            let inner = b.closure(&["m"], |b| {
                let n = b.lookup("n");
                let m = b.lookup("m");
                let sum = b.binary(BinaryOperator::Plus, n, m);
                b.ret(Some(sum));
            });
            b.ret(Some(inner));
        });
        b.let_("adder", adder);
        let m = b.lookup("m");
        b.ret(Some(m));
    });
    b.finish()
}

#[test]
fn test_inner_parameter_does_not_capture_outer_binding() {
    let mut tree = adder_shadowing_outer_binding();
    let unit = compile(&mut tree, &CompileOptions::default()).unwrap();
    assert_eq!(
        synthetic_parameters(&tree, "__closure_0"),
        Vec::<String>::new()
    );
    assert_eq!(synthetic_parameters(&tree, "__closure_1"), vec!["n"]);
    assert_eq!(
        captures_of(&tree, "__closure_0"),
        vec![Vec::<String>::new()]
    );
    assert_eq!(
        captures_of(&tree, "__closure_1"),
        vec![vec!["n".to_string()]]
    );
    assert_eq!(slot_of(&tree, "__closure_1", "m"), Some(Slot(1)));
    assert_eq!(unit.function("__closure_0").map(|f| f.arity), Some(1));
}

#[test]
fn test_inner_parameter_shadowing_is_stable_across_runs() {
    let mut tree = adder_shadowing_outer_binding();
    let options = CompileOptions::default();
    convert_closures(&mut tree, &options);
    let once = tree.dump(tree.root());
    convert_closures(&mut tree, &options);
    assert_eq!(tree.dump(tree.root()), once);
    assert_eq!(
        synthetic_parameters(&tree, "__closure_0"),
        Vec::<String>::new()
    );
}
