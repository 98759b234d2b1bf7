//! Language capability snapshots
//!
//! A [`Features`] value describes which optional language capabilities
//! are enabled for a parse. Snapshots are immutable: deriving a variant
//! goes through the by-value `with_*` methods, which produce a new
//! snapshot and leave the original untouched.

use std::collections::HashSet;
use std::fmt;

/// Identifies the capability a feature-gate failure names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Local variable declarations (`var x`)
    LocalVar,
    /// Lambda definitions (`(x) -> ...`)
    Lambda,
    /// Pragma declarations (`#pragma key value`)
    Pragma,
    /// Assignment-family operators
    SideEffect,
    /// Raw register references (`#0`), debug only
    Register,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Feature::LocalVar => "local variable",
            Feature::Lambda => "lambda",
            Feature::Pragma => "pragma",
            Feature::SideEffect => "side effect",
            Feature::Register => "register",
        };
        write!(f, "{}", name)
    }
}

/// The set of capabilities enabled for a parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Features {
    local_var: bool,
    lambda: bool,
    pragma: bool,
    side_effect: bool,
    register: bool,
    reserved: HashSet<String>,
}

impl Default for Features {
    /// Everything on except raw register references
    fn default() -> Self {
        Self {
            local_var: true,
            lambda: true,
            pragma: true,
            side_effect: true,
            register: false,
            reserved: HashSet::new(),
        }
    }
}

impl Features {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local_var(mut self, flag: bool) -> Self {
        self.local_var = flag;
        self
    }

    pub fn with_lambda(mut self, flag: bool) -> Self {
        self.lambda = flag;
        self
    }

    pub fn with_pragma(mut self, flag: bool) -> Self {
        self.pragma = flag;
        self
    }

    pub fn with_side_effect(mut self, flag: bool) -> Self {
        self.side_effect = flag;
        self
    }

    pub fn with_register(mut self, flag: bool) -> Self {
        self.register = flag;
        self
    }

    /// Names scripts may not declare as local symbols
    pub fn with_reserved_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn supports_local_var(&self) -> bool {
        self.local_var
    }

    pub fn supports_lambda(&self) -> bool {
        self.lambda
    }

    pub fn supports_pragma(&self) -> bool {
        self.pragma
    }

    pub fn supports_side_effect(&self) -> bool {
        self.side_effect
    }

    pub fn supports_register(&self) -> bool {
        self.register
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }
}
