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

use golo_ir::MODULE_INITIALIZER;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CompileOptions {
    /// Whether closure conversion removes bindings a closure body declares but never reads or
    /// writes.
    pub prune_dead_bindings: bool,
    /// Whether a closure bound by a declaring assignment may call itself through that name
    /// without capturing it.
    pub self_capture: bool,
    /// Whether converted closure functions are moved out of their literal and into the module.
    pub lift_closures: bool,
    /// Check slot/capture/dispatch invariants after a successful resolution. A failure here is a
    /// compiler bug and panics.
    pub verify_output: bool,
    /// The only function allowed to assign module-level constants.
    pub module_initializer: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            prune_dead_bindings: true,
            self_capture: true,
            lift_closures: true,
            verify_output: cfg!(debug_assertions),
            module_initializer: MODULE_INITIALIZER.to_string(),
        }
    }
}
