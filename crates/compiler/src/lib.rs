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

//! Middle-end passes of the Golo compiler: closure conversion and binding resolution over the
//! `golo-ir` tree, with the diagnostics they report.
//!
//! ```
//! use golo_compiler::{CompileOptions, compile};
//! use golo_ir::{BinaryOperator, Builder};
//!
//! let mut b = Builder::new("demo");
//! b.function("main", &[], |b| {
//!     let one = b.int(1);
//!     b.let_("x", one);
//!     let x = b.lookup("x");
//!     let one = b.int(1);
//!     let sum = b.binary(BinaryOperator::Plus, x, one);
//!     b.let_("y", sum);
//! });
//! let mut tree = b.finish();
//! let unit = compile(&mut tree, &CompileOptions::default()).unwrap();
//! assert_eq!(unit.frame_size("main"), Some(2));
//! ```

mod closure_capture;
mod compile;
mod diagnostics;
mod options;
mod resolve;
mod verify;

pub use crate::closure_capture::convert_closures;
pub use crate::compile::{CompiledFunction, CompiledUnit, compile};
pub use crate::diagnostics::{
    CompileError, DiagnosticRenderOptions, DiagnosticVerbosity, Diagnostics, Problem, ProblemKind,
    problems_to_json, render_problems,
};
pub use crate::options::CompileOptions;
pub use crate::resolve::{FRAME_SIZE, resolve_bindings};
pub use crate::verify::{InvariantViolation, verify};
