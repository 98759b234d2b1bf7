//! Feature policy enforcement over finished parse-tree nodes

use crate::ast::{Expr, ExprKind};
use crate::features::{Feature, Features};

/// Holds the active feature snapshot and answers the parser's policy
/// questions: may this name be declared, may this node exist at all.
#[derive(Debug)]
pub struct FeatureController {
    features: Features,
}

impl FeatureController {
    pub fn new(features: Features) -> Self {
        Self { features }
    }

    /// The active snapshot
    pub fn features(&self) -> &Features {
        &self.features
    }

    /// Replace the active snapshot wholesale
    pub fn set_features(&mut self, features: Features) {
        self.features = features;
    }

    /// Whether `name` may be declared as a local symbol
    pub fn allow_variable(&self, name: &str) -> bool {
        self.features.supports_local_var() && !self.features.is_reserved(name)
    }

    /// Validate a finished node against the active snapshot.
    ///
    /// Runs for every node kind, not only declaration sites: the
    /// constructed tree itself is checked. Returns the violated
    /// capability, if any; the caller attaches the source location.
    pub fn control_node(&self, node: &Expr) -> Result<(), Feature> {
        match &node.kind {
            ExprKind::Lambda(_) if !self.features.supports_lambda() => Err(Feature::Lambda),
            ExprKind::Var { .. } if !self.features.supports_local_var() => Err(Feature::LocalVar),
            ExprKind::Assign { .. } if !self.features.supports_side_effect() => {
                Err(Feature::SideEffect)
            }
            _ => Ok(()),
        }
    }
}
