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

use golo_ir::{Binding, BindingKind, ScopeId, Scopes};
use proptest::prelude::*;

fn kind() -> impl Strategy<Value = BindingKind> {
    prop_oneof![
        Just(BindingKind::LocalConstant),
        Just(BindingKind::LocalVariable),
        Just(BindingKind::ModuleConstant),
        Just(BindingKind::ModuleVariable),
    ]
}

/// Each inner vec is one level of a chain, outermost first.
fn levels() -> impl Strategy<Value = Vec<Vec<(String, BindingKind)>>> {
    prop::collection::vec(
        prop::collection::vec(("[a-f]", kind()), 0..5),
        1..5,
    )
}

fn build(scopes: &mut Scopes, levels: &[Vec<(String, BindingKind)>]) -> ScopeId {
    let mut table = scopes.new_table(None);
    for (depth, level) in levels.iter().enumerate() {
        if depth > 0 {
            table = scopes.fork(table);
        }
        for (name, kind) in level {
            scopes.add(table, Binding::new(name.clone(), *kind));
        }
    }
    table
}

proptest! {
    #[test]
    fn flatten_preserves_visible_names(levels in levels(), constant in any::<bool>()) {
        let mut scopes = Scopes::new();
        let table = build(&mut scopes, &levels);
        let flat = scopes.flatten(table, constant);

        prop_assert_eq!(scopes.parent(flat), None);
        prop_assert_eq!(scopes.names(flat), scopes.names(table));
        for name in scopes.names(table) {
            let original = scopes.get_binding(table, &name).unwrap().clone();
            let copy = scopes.get_binding(flat, &name).unwrap();
            prop_assert_eq!(copy.slot, None);
            if original.is_module_level() || !constant || scopes.owns(table, &name) {
                prop_assert_eq!(copy.kind, original.kind);
            } else {
                prop_assert_eq!(copy.kind, BindingKind::LocalConstant);
            }
        }
    }

    #[test]
    fn pruned_relink_leaves_no_shadowing(
        outer in levels(),
        inner in prop::collection::vec(("[a-f]", kind()), 0..6),
    ) {
        let mut scopes = Scopes::new();
        let parent = build(&mut scopes, &outer);
        let table = scopes.new_table(None);
        for (name, kind) in &inner {
            scopes.add(table, Binding::new(name.clone(), *kind));
        }
        let visible_before = scopes.names(parent);

        scopes.relink(table, parent, true);

        prop_assert!(scopes.is_linked_to(table, parent));
        for name in scopes.owned_names(table) {
            prop_assert!(!visible_before.contains(name));
        }
        for name in &visible_before {
            prop_assert_eq!(scopes.get(table, name), scopes.get(parent, name));
        }
    }

    #[test]
    fn len_counts_every_level(levels in levels()) {
        let mut scopes = Scopes::new();
        let table = build(&mut scopes, &levels);
        let distinct_per_level: usize = levels
            .iter()
            .map(|level| {
                let mut names: Vec<&str> = level.iter().map(|(n, _)| n.as_str()).collect();
                names.sort();
                names.dedup();
                names.len()
            })
            .sum();
        prop_assert_eq!(scopes.len(table), distinct_per_level);
        prop_assert!(scopes.names(table).len() <= scopes.len(table));
    }
}
