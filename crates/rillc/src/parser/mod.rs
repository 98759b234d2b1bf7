//! Rill parser: grammar driver and its support layer
//!
//! `parser.rs` holds the recursive-descent productions; `support.rs`
//! holds the per-parse state they lean on (frames, pragmas, features,
//! failure classification); `control.rs` enforces the feature policy
//! over finished nodes.

mod control;
mod parser;
mod support;

pub use control::FeatureController;
pub use parser::Parser;
pub use support::{ParseContext, read_source_line};

use crate::ast::Script;
use crate::common::CompileResult;
use crate::features::Features;

/// Parse `source` under `features`, returning the finished script with
/// its frame and pragma table attached
pub fn parse(source: &str, features: Features) -> CompileResult<Script> {
    Parser::new(source, features)?.parse()
}
