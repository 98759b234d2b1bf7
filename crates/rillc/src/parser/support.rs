//! Parser support layer: frames, pragmas, feature gates, and failure
//! classification
//!
//! One [`ParseContext`] is exclusively owned by one in-progress parse.
//! The grammar driver calls into it while consuming declaration
//! productions and around every finished node; a violation produces a
//! classified [`CompileError`] that aborts the parse.

use std::collections::BTreeMap;

use super::control::FeatureController;
use crate::ast::{Expr, ExprKind, Literal, Script};
use crate::common::{CompileError, CompileResult, SourceInfo, Span};
use crate::features::{Feature, Features};
use crate::scope::Frame;

/// Reads the text of a 1-based source line, best effort: out-of-range
/// lines (including line 0) yield an empty string.
pub fn read_source_line(source: &str, line: u32) -> String {
    if line == 0 {
        return String::new();
    }
    source
        .lines()
        .nth(line as usize - 1)
        .unwrap_or_default()
        .to_string()
}

/// Per-parse state: the active frame plus the stack of frames suspended
/// while a lambda body is parsed, the feature controller, and the
/// pragma table. Built fresh for every parse.
pub struct ParseContext<'a> {
    source: &'a str,
    features: FeatureController,
    frame: Option<Frame>,
    frames: Vec<Frame>,
    pragmas: Option<BTreeMap<String, Literal>>,
}

impl<'a> ParseContext<'a> {
    pub fn new(source: &'a str, features: Features) -> Self {
        Self {
            source,
            features: FeatureController::new(features),
            frame: None,
            frames: Vec::new(),
            pragmas: None,
        }
    }

    // ========================== Features ============================

    /// The active feature snapshot
    pub fn features(&self) -> &Features {
        self.features.features()
    }

    /// Replace the active feature snapshot wholesale
    pub fn set_features(&mut self, features: Features) {
        self.features.set_features(features);
    }

    /// Toggle raw register references by deriving a new snapshot from
    /// the current one. Debug aid; every other capability carries over.
    pub fn allow_registers(&mut self, flag: bool) {
        let features = self.features().clone().with_register(flag);
        self.features.set_features(features);
    }

    // ============================ Frames ============================

    /// The active frame, if any local symbol has been declared
    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    /// Install a frame before parsing begins, binding pre-declared
    /// parameters
    pub fn set_frame(&mut self, frame: Frame) {
        self.frame = Some(frame);
    }

    /// Suspend the active frame and install a fresh one. Entered for
    /// every lambda body so it gets an isolated register numbering.
    pub fn push_frame(&mut self) {
        if let Some(previous) = self.frame.take() {
            self.frames.push(previous);
        }
        self.frame = Some(Frame::new());
    }

    /// Restore the previously suspended frame, or no frame when the
    /// stack is empty (top-level scope ended)
    pub fn pop_frame(&mut self) {
        self.frame = self.frames.pop();
    }

    /// Register bound to `name` in the active frame. `None` marks a
    /// free/global reference; enclosing frames are never consulted.
    pub fn resolve(&self, name: &str) -> Option<usize> {
        self.frame.as_ref().and_then(|frame| frame.symbol(name))
    }

    // ========================= Declarations =========================

    /// Declare a local variable in the active frame (created on first
    /// use), returning its register. Idempotent for a name already
    /// bound in this frame. Nothing is allocated on rejection.
    pub fn declare_variable(&mut self, name: &str, anchor: Option<Span>) -> CompileResult<usize> {
        if !self.features.allow_variable(name) {
            return Err(self.feature_error(Feature::LocalVar, anchor));
        }
        Ok(self.frame.get_or_insert_with(Frame::new).declare_variable(name))
    }

    /// Declare a script parameter. Parameters are declared before any
    /// statement parsing and occupy the low registers.
    pub fn declare_parameter(&mut self, name: &str, anchor: Option<Span>) -> CompileResult<()> {
        if !self.features.allow_variable(name) {
            return Err(self.feature_error(Feature::LocalVar, anchor));
        }
        self.frame.get_or_insert_with(Frame::new).declare_parameter(name);
        Ok(())
    }

    /// Record a pragma. The table is created on first use and keeps its
    /// keys ordered; re-declaring a key overwrites the value.
    pub fn declare_pragma(
        &mut self,
        key: String,
        value: Literal,
        anchor: Option<Span>,
    ) -> CompileResult<()> {
        if !self.features().supports_pragma() {
            return Err(self.feature_error(Feature::Pragma, anchor));
        }
        self.pragmas.get_or_insert_with(BTreeMap::new).insert(key, value);
        Ok(())
    }

    /// Hand the collected pragmas over to the finished script
    pub fn take_pragmas(&mut self) -> Option<BTreeMap<String, Literal>> {
        self.pragmas.take()
    }

    // ====================== Node lifecycle hooks ====================

    /// Invoked when the grammar opens a node that exists before its
    /// children are complete. An ambiguous statement aborts
    /// immediately, pre-empting any validation of its children.
    pub fn open_node_scope(&self, node: &Expr, current: Option<Span>) -> CompileResult<()> {
        if matches!(node.kind, ExprKind::Ambiguous) {
            return Err(self.ambiguous_error(current));
        }
        Ok(())
    }

    /// Invoked at the end of every node construction: checks assignment
    /// targets, then runs the feature controller over the node as the
    /// final gate.
    pub fn close_node_scope(&self, node: &Expr, current: Option<Span>) -> CompileResult<()> {
        if let ExprKind::Assign { target, .. } = &node.kind {
            if !target.is_left_value() {
                return Err(self.assignment_error(current));
            }
        }
        if let Err(feature) = self.features.control_node(node) {
            return Err(self.feature_error(feature, Some(node.span)));
        }
        Ok(())
    }

    /// Invoked when a script or lambda body finishes construction:
    /// gates lambdas on the active features, attaches the active frame
    /// to the node, and restores the enclosing frame.
    pub fn close_script_scope(&mut self, script: &mut Script) -> CompileResult<()> {
        if script.lambda && !self.features().supports_lambda() {
            return Err(self.feature_error(Feature::Lambda, Some(script.span)));
        }
        // reaccess in case local symbols were declared after the node
        // was first laid down
        if script.scope.as_ref() != self.frame.as_ref() {
            script.scope = self.frame.take();
        }
        self.pop_frame();
        Ok(())
    }

    // ====================== Failure construction ====================

    /// Resolve an anchor span into a located diagnostic plus the text
    /// of the offending source line
    fn located(&self, span: Span) -> (SourceInfo, String) {
        let info = SourceInfo::new(self.source, span);
        let excerpt = read_source_line(self.source, info.line);
        (info, excerpt)
    }

    /// A feature failure naming the disabled capability. Degrades to an
    /// unlocated generic failure when no anchor is obtainable.
    pub fn feature_error(&self, feature: Feature, anchor: Option<Span>) -> CompileError {
        match anchor {
            Some(span) => {
                let (info, excerpt) = self.located(span);
                CompileError::Feature {
                    feature,
                    info,
                    excerpt,
                }
            }
            None => CompileError::parsing(feature.to_string()),
        }
    }

    /// An ambiguous-statement failure anchored at the current lookahead
    /// token: the offending construct has already been consumed by the
    /// time the check fires
    pub fn ambiguous_error(&self, current: Option<Span>) -> CompileError {
        match current {
            Some(span) => {
                let (info, excerpt) = self.located(span);
                CompileError::Ambiguous { info, excerpt }
            }
            None => CompileError::parsing("unrecoverable state"),
        }
    }

    /// An invalid-assignment-target failure anchored at the current
    /// lookahead token
    pub fn assignment_error(&self, current: Option<Span>) -> CompileError {
        match current {
            Some(span) => {
                let (info, excerpt) = self.located(span);
                CompileError::Assignment { info, excerpt }
            }
            None => CompileError::parsing("unrecoverable state"),
        }
    }

    /// A generic parsing failure, located when possible
    pub fn generic_error(&self, message: impl Into<String>, current: Option<Span>) -> CompileError {
        match current {
            Some(span) => {
                let (info, excerpt) = self.located(span);
                CompileError::Parsing {
                    message: message.into(),
                    info: Some(info),
                    excerpt,
                }
            }
            None => CompileError::parsing(message),
        }
    }
}
