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

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A 1-based line/column pair pointing back into the source text a node came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Char offset of this position inside `source`, if the line exists.
    /// Columns past the end of the line clamp to the line end.
    pub fn offset_in(&self, source: &str) -> Option<usize> {
        if self.line == 0 {
            return None;
        }
        let mut offset = 0;
        for (index, line) in source.split('\n').enumerate() {
            let length = line.chars().count();
            if index + 1 == self.line as usize {
                let column = (self.column.max(1) - 1) as usize;
                return Some(offset + column.min(length));
            }
            offset += length + 1;
        }
        None
    }
}

impl Display for SourcePosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Renders an optional position the way diagnostics mention it.
pub fn describe_position(position: Option<SourcePosition>) -> String {
    match position {
        Some(position) => position.to_string(),
        None => "generated code".to_string(),
    }
}
