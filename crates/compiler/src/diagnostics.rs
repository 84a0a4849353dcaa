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

//! Problems reported by the resolution passes, and helpers to present them to users.

use std::fmt::{Display, Formatter};
use std::ops::Range;

use ariadne::{CharSet, Config, Label, Report, ReportKind, Source};
use golo_ir::{NodeId, SourcePosition, describe_position};
use itertools::Itertools;
use serde::Serialize;
use strum::{Display as StrumDisplay, EnumIter, IntoStaticStr};
use thiserror::Error;
use tracing::debug;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    StrumDisplay,
    EnumIter,
    IntoStaticStr,
    Serialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemKind {
    UndeclaredReference,
    UninitializedReferenceAccess,
    ReferenceAlreadyDeclaredInBlock,
    AssignConstant,
    BreakOrContinueOutsideLoop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    pub kind: ProblemKind,
    pub message: String,
    /// `None` when the offending node was generated by the compiler.
    pub position: Option<SourcePosition>,
    pub node: NodeId,
}

impl Display for Problem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}): {}",
            self.kind,
            describe_position(self.position),
            self.message
        )
    }
}

/// Collects every problem found during a walk. A pass never stops at the first one.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    problems: Vec<Problem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(
        &mut self,
        kind: ProblemKind,
        message: String,
        position: Option<SourcePosition>,
        node: NodeId,
    ) {
        debug!(%kind, %node, "{message}");
        self.problems.push(Problem {
            kind,
            message,
            position,
            node,
        });
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn count(&self, kind: ProblemKind) -> usize {
        self.problems.iter().filter(|p| p.kind == kind).count()
    }

    /// `Ok` when nothing was reported, otherwise every problem in the order found.
    pub fn into_result(self, module: &str) -> Result<(), CompileError> {
        if self.problems.is_empty() {
            Ok(())
        } else {
            Err(CompileError::Problems {
                module: module.to_string(),
                problems: self.problems,
            })
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum CompileError {
    #[error("In Golo module: {module} ({count} problem(s))", count = .problems.len())]
    Problems {
        module: String,
        problems: Vec<Problem>,
    },
}

impl CompileError {
    pub fn problems(&self) -> &[Problem] {
        match self {
            CompileError::Problems { problems, .. } => problems,
        }
    }
}

/// Verbosity levels for rendering diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticVerbosity {
    /// One line per problem.
    Summary,
    /// Each problem with the source line it points at, when source text is available.
    SourceContext,
}

/// Rendering options for compiler diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticRenderOptions {
    pub verbosity: DiagnosticVerbosity,
    pub use_graphics: bool,
    pub use_color: bool,
}

impl Default for DiagnosticRenderOptions {
    fn default() -> Self {
        Self {
            verbosity: DiagnosticVerbosity::Summary,
            use_graphics: false,
            use_color: false,
        }
    }
}

/// Render all problems together, in the order they were found.
///
/// With [`DiagnosticVerbosity::SourceContext`] and source text, problems carrying a position are
/// drawn with Ariadne; generated-code problems fall back to their summary line.
pub fn render_problems(
    problems: &[Problem],
    source: Option<&str>,
    source_name: &str,
    options: DiagnosticRenderOptions,
) -> String {
    problems
        .iter()
        .map(|problem| {
            let span = match (options.verbosity, source, problem.position) {
                (DiagnosticVerbosity::SourceContext, Some(source), Some(position)) => position
                    .offset_in(source)
                    .map(|start| (source, start..span_end(source, start))),
                _ => None,
            };
            match span {
                Some((source, span)) => render_report(problem, source, span, options),
                None => format!("{source_name}: {problem}"),
            }
        })
        .join("\n")
}

/// The span runs to the end of the identifier-ish token starting at `start`.
fn span_end(source: &str, start: usize) -> usize {
    let token = source
        .chars()
        .skip(start)
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .count();
    start + token.max(1)
}

fn render_report(
    problem: &Problem,
    source: &str,
    span: Range<usize>,
    options: DiagnosticRenderOptions,
) -> String {
    let char_set = if options.use_graphics {
        CharSet::Unicode
    } else {
        CharSet::Ascii
    };
    let report = Report::build(ReportKind::Error, span.clone())
        .with_config(
            Config::default()
                .with_color(options.use_color)
                .with_char_set(char_set),
        )
        .with_code(problem.kind)
        .with_message(&problem.message)
        .with_label(Label::new(span).with_message(label_for(problem.kind)))
        .finish();

    let mut buffer = Vec::new();
    match report.write(Source::from(source), &mut buffer) {
        Ok(()) => String::from_utf8_lossy(&buffer).trim_end().to_string(),
        Err(_) => problem.to_string(),
    }
}

fn label_for(kind: ProblemKind) -> &'static str {
    match kind {
        ProblemKind::UndeclaredReference => "not declared in any enclosing scope",
        ProblemKind::UninitializedReferenceAccess => "read before its declaration runs",
        ProblemKind::ReferenceAlreadyDeclaredInBlock => "already declared in this block",
        ProblemKind::AssignConstant => "constant assigned here",
        ProblemKind::BreakOrContinueOutsideLoop => "no enclosing loop",
    }
}

/// Problems as a JSON array, for editor integrations.
pub fn problems_to_json(problems: &[Problem]) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(problems)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    fn problem(kind: ProblemKind, position: Option<SourcePosition>) -> Problem {
        Problem {
            kind,
            message: format!("something about {kind}"),
            position,
            node: NodeId(7),
        }
    }

    #[test]
    fn test_collector() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.clone().into_result("m").is_ok());
        diagnostics.report(
            ProblemKind::AssignConstant,
            "one".into(),
            None,
            NodeId(1),
        );
        diagnostics.report(
            ProblemKind::AssignConstant,
            "two".into(),
            Some(SourcePosition::new(1, 1)),
            NodeId(2),
        );
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics.count(ProblemKind::AssignConstant), 2);
        assert_eq!(diagnostics.count(ProblemKind::UndeclaredReference), 0);

        let error = diagnostics.into_result("m").unwrap_err();
        assert_eq!(error.to_string(), "In Golo module: m (2 problem(s))");
        assert_eq!(error.problems()[0].message, "one");
    }

    #[test]
    fn test_kind_names() {
        let names: Vec<&'static str> = ProblemKind::iter().map(|k| k.into()).collect();
        assert_eq!(
            names,
            vec![
                "UndeclaredReference",
                "UninitializedReferenceAccess",
                "ReferenceAlreadyDeclaredInBlock",
                "AssignConstant",
                "BreakOrContinueOutsideLoop",
            ]
        );
        assert_eq!(
            ProblemKind::BreakOrContinueOutsideLoop.to_string(),
            "BREAK_OR_CONTINUE_OUTSIDE_LOOP"
        );
    }

    #[test]
    fn test_summary_rendering() {
        let problems = vec![
            problem(
                ProblemKind::UndeclaredReference,
                Some(SourcePosition::new(2, 3)),
            ),
            problem(ProblemKind::AssignConstant, None),
        ];
        let rendered = render_problems(
            &problems,
            None,
            "demo.golo",
            DiagnosticRenderOptions::default(),
        );
        assert_eq!(
            rendered,
            "demo.golo: UNDECLARED_REFERENCE (line 2, column 3): something about UNDECLARED_REFERENCE\n\
             demo.golo: ASSIGN_CONSTANT (generated code): something about ASSIGN_CONSTANT"
        );
    }

    #[test]
    fn test_source_context_rendering() {
        let source = "function main = {\n  println(value)\n}\n";
        let problems = vec![problem(
            ProblemKind::UndeclaredReference,
            Some(SourcePosition::new(2, 11)),
        )];
        let options = DiagnosticRenderOptions {
            verbosity: DiagnosticVerbosity::SourceContext,
            ..Default::default()
        };
        let rendered = render_problems(&problems, Some(source), "demo.golo", options);
        assert!(rendered.contains("something about UNDECLARED_REFERENCE"));
        assert!(rendered.contains("println(value)"));
        assert!(rendered.contains("not declared in any enclosing scope"));
    }

    #[test]
    fn test_json() {
        let problems = vec![problem(
            ProblemKind::UninitializedReferenceAccess,
            Some(SourcePosition::new(4, 13)),
        )];
        let json = problems_to_json(&problems).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "kind": "UNINITIALIZED_REFERENCE_ACCESS",
                "message": "something about UNINITIALIZED_REFERENCE_ACCESS",
                "position": { "line": 4, "column": 13 },
                "node": 7,
            }])
        );
    }
}
