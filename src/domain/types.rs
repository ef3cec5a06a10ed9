//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during inference
//! - printed as JSON by the CLI
//! - reconstructed later to re-apply a rule by family name + parameter vector

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::domain::parse_number;

/// One training pair: a raw source cell and the target it should map to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamplePair {
    pub source: String,
    pub target: String,
}

/// The ordered training pairs a rule is inferred from.
///
/// Invariant: non-empty. Construction is the only place the invariant is
/// checked; the set is immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleSet {
    pairs: Vec<ExamplePair>,
}

impl ExampleSet {
    pub fn new(pairs: Vec<ExamplePair>) -> Result<Self, AppError> {
        if pairs.is_empty() {
            return Err(AppError::validation(
                "Example set is empty: need at least one (source, target) pair.",
            ));
        }
        Ok(Self { pairs })
    }

    pub fn pairs(&self) -> &[ExamplePair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn first(&self) -> &ExamplePair {
        &self.pairs[0]
    }

    pub fn sources(&self) -> Vec<String> {
        self.pairs.iter().map(|p| p.source.clone()).collect()
    }

    pub fn targets(&self) -> Vec<String> {
        self.pairs.iter().map(|p| p.target.clone()).collect()
    }

    /// Both columns parse as numbers: returns the `(x, y)` pairs, in order.
    ///
    /// `None` as soon as any cell fails to parse; the numeric path is
    /// all-or-nothing by design.
    pub fn numeric_pairs(&self) -> Option<Vec<(f64, f64)>> {
        self.pairs
            .iter()
            .map(|p| Some((parse_number(&p.source)?, parse_number(&p.target)?)))
            .collect()
    }
}

/// The nature of the transformation, as decided once per inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformationType {
    Numeric,
    /// Simple formatting or case changes ("string" in user-facing output).
    #[serde(rename = "string")]
    Text,
    Algorithmic,
    General,
}

impl TransformationType {
    pub fn display_name(self) -> &'static str {
        match self {
            TransformationType::Numeric => "numeric",
            TransformationType::Text => "string",
            TransformationType::Algorithmic => "algorithmic",
            TransformationType::General => "general",
        }
    }
}

/// One parametric function shape considered during numeric fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FamilyKind {
    Proportional,
    Affine,
    Quadratic,
    Exponential,
    Rational,
    Logarithmic,
    PowerLaw,
}

impl FamilyKind {
    /// Fixed evaluation order. Selection ties break toward the earlier entry,
    /// so this order is part of the observable contract.
    pub const ALL: [FamilyKind; 7] = [
        FamilyKind::Proportional,
        FamilyKind::Affine,
        FamilyKind::Quadratic,
        FamilyKind::Exponential,
        FamilyKind::Rational,
        FamilyKind::Logarithmic,
        FamilyKind::PowerLaw,
    ];

    /// Human-readable label used in the formula description.
    pub fn display_name(self) -> &'static str {
        match self {
            FamilyKind::Proportional => "Simple Multiplication",
            FamilyKind::Affine => "Linear",
            FamilyKind::Quadratic => "Quadratic",
            FamilyKind::Exponential => "Exponential",
            FamilyKind::Rational => "Rational",
            FamilyKind::Logarithmic => "Logarithmic",
            FamilyKind::PowerLaw => "Power Law",
        }
    }

    /// Number of fitted parameters, in `a, b, c` order.
    pub fn param_count(self) -> usize {
        match self {
            FamilyKind::Proportional => 1,
            FamilyKind::Affine
            | FamilyKind::Exponential
            | FamilyKind::Logarithmic
            | FamilyKind::PowerLaw => 2,
            FamilyKind::Quadratic | FamilyKind::Rational => 3,
        }
    }

    /// Log/power families are undefined for `x <= 0` and are skipped when any
    /// source value violates the domain.
    pub fn requires_positive_x(self) -> bool {
        matches!(self, FamilyKind::Logarithmic | FamilyKind::PowerLaw)
    }
}

/// A fitted family with its error metrics, computed on the fitting set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateModel {
    pub family: FamilyKind,
    /// Ordered parameter vector (`a`, then `b`, then `c` as applicable).
    pub params: Vec<f64>,
    pub mse: f64,
    pub r2: f64,
}

/// The finalized transformation rule.
///
/// Regeneration replaces the whole value; a rule is never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SynthesizedRule {
    Numeric {
        family: FamilyKind,
        params: Vec<f64>,
    },
    Script {
        code: String,
    },
}

/// Terminal output of one inference run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResult {
    pub rule: SynthesizedRule,
    /// Display text: the formula description for numeric rules, the
    /// synthesized code for script rules. Fixed format, never localized.
    pub description: String,
    pub transformation_type: TransformationType,
    /// Whether the one-shot forced-remote regeneration was triggered.
    pub used_fallback: bool,
}
