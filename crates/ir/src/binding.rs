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
use std::hash::{Hash, Hasher};
use strum::{Display as StrumDisplay, EnumIter};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, StrumDisplay, EnumIter, Serialize,
    Deserialize,
)]
pub enum BindingKind {
    LocalConstant,
    LocalVariable,
    ModuleConstant,
    ModuleVariable,
}

impl BindingKind {
    pub fn is_constant(&self) -> bool {
        matches!(self, Self::LocalConstant | Self::ModuleConstant)
    }

    pub fn is_module_level(&self) -> bool {
        matches!(self, Self::ModuleConstant | Self::ModuleVariable)
    }

    pub fn to_variable(self) -> Self {
        match self {
            Self::LocalConstant | Self::LocalVariable => Self::LocalVariable,
            Self::ModuleConstant | Self::ModuleVariable => Self::ModuleVariable,
        }
    }

    pub fn to_module_level(self) -> Self {
        match self {
            Self::LocalConstant | Self::ModuleConstant => Self::ModuleConstant,
            Self::LocalVariable | Self::ModuleVariable => Self::ModuleVariable,
        }
    }
}

/// Index into a function's local variable area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot(pub u16);

impl Display for Slot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identity of a binding for set membership: two bindings declared in different tables
/// under the same name and kind are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BindingKey {
    pub kind: BindingKind,
    pub name: String,
}

/// A named declaration site. Equality and hashing only look at `(kind, name)`.
#[derive(Debug, Clone, Serialize)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    /// Introduced by the compiler rather than written by the user.
    pub synthetic: bool,
    /// Unassigned until binding resolution runs.
    pub slot: Option<Slot>,
}

impl Binding {
    pub fn new(name: impl Into<String>, kind: BindingKind) -> Self {
        Self {
            name: name.into(),
            kind,
            synthetic: false,
            slot: None,
        }
    }

    pub fn synthetic(name: impl Into<String>, kind: BindingKind) -> Self {
        Self {
            synthetic: true,
            ..Self::new(name, kind)
        }
    }

    pub fn key(&self) -> BindingKey {
        BindingKey {
            kind: self.kind,
            name: self.name.clone(),
        }
    }

    pub fn is_constant(&self) -> bool {
        self.kind.is_constant()
    }

    pub fn is_module_level(&self) -> bool {
        self.kind.is_module_level()
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name == other.name
    }
}

impl Eq for Binding {}

impl Hash for Binding {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.name.hash(state);
    }
}

impl Display for Binding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.name)?;
        if let Some(slot) = self.slot {
            write!(f, " @{slot}")?;
        }
        if self.synthetic {
            write!(f, " (synthetic)")?;
        }
        Ok(())
    }
}
