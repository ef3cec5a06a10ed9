//! Formatted output: formula descriptions and preview tables.
//!
//! We keep formatting code in one place so:
//! - the fitting/inference code stays clean and testable
//! - the description text stays byte-stable (it is surfaced verbatim to
//!   callers and must be deterministic for identical fitted parameters)

use crate::domain::{CandidateModel, FamilyKind};

/// Render the formula for a fitted family with parameters at 4 decimals.
pub fn format_formula(family: FamilyKind, params: &[f64]) -> String {
    match family {
        FamilyKind::Proportional => format!("y = {:.4} * x", params[0]),
        FamilyKind::Affine => format!("y = {:.4} * x + {:.4}", params[0], params[1]),
        FamilyKind::Quadratic => format!(
            "y = {:.4} * x² + {:.4} * x + {:.4}",
            params[0], params[1], params[2]
        ),
        FamilyKind::Exponential => {
            format!("y = {:.4} * e^({:.4} * x)", params[0], params[1])
        }
        FamilyKind::Rational => format!(
            "y = ({:.4} * x + {:.4}) / (x + {:.4})",
            params[0], params[1], params[2]
        ),
        FamilyKind::Logarithmic => {
            format!("y = {:.4} * ln(x) + {:.4}", params[0], params[1])
        }
        FamilyKind::PowerLaw => format!("y = {:.4} * x^{:.4}", params[0], params[1]),
    }
}

/// The four-line model description surfaced to callers.
pub fn describe_model(model: &CandidateModel) -> String {
    format!(
        "Function type: {}\nFormula: {}\nMean Squared Error: {:.6}\nR-squared Score: {:.6}",
        model.family.display_name(),
        format_formula(model.family, &model.params),
        model.mse,
        model.r2
    )
}

/// One row of the CLI preview table.
#[derive(Debug, Clone)]
pub struct PreviewRow {
    pub input: String,
    pub expected: Option<String>,
    pub predicted: String,
}

/// Format the preview table (training or test rows).
pub fn format_preview(rows: &[PreviewRow]) -> String {
    let mut out = String::new();

    let has_expected = rows.iter().any(|r| r.expected.is_some());
    if has_expected {
        out.push_str(&format!(
            "{:<24} {:<24} {:<24}\n",
            "input", "expected", "predicted"
        ));
        out.push_str(&format!("{:-<24} {:-<24} {:-<24}\n", "", "", ""));
    } else {
        out.push_str(&format!("{:<24} {:<24}\n", "input", "predicted"));
        out.push_str(&format!("{:-<24} {:-<24}\n", "", ""));
    }

    for r in rows {
        if has_expected {
            out.push_str(
                format!(
                    "{:<24} {:<24} {:<24}\n",
                    truncate(&r.input, 24),
                    truncate(r.expected.as_deref().unwrap_or(""), 24),
                    truncate(&r.predicted, 24),
                )
                .trim_end(),
            );
        } else {
            out.push_str(
                format!(
                    "{:<24} {:<24}\n",
                    truncate(&r.input, 24),
                    truncate(&r.predicted, 24),
                )
                .trim_end(),
            );
        }
        out.push('\n');
    }

    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proportional_description_is_byte_stable() {
        let model = CandidateModel {
            family: FamilyKind::Proportional,
            params: vec![2.0],
            mse: 0.0,
            r2: 1.0,
        };
        let desc = describe_model(&model);
        assert_eq!(
            desc,
            "Function type: Simple Multiplication\nFormula: y = 2.0000 * x\nMean Squared Error: 0.000000\nR-squared Score: 1.000000"
        );
        assert!(desc.contains("y = 2.0000 * x"));
        // Deterministic: same input, same bytes.
        assert_eq!(desc, describe_model(&model));
    }

    #[test]
    fn each_family_formula_mentions_its_shape() {
        let cases = [
            (FamilyKind::Affine, vec![1.0, 2.0], "* x +"),
            (FamilyKind::Quadratic, vec![1.0, 2.0, 3.0], "x²"),
            (FamilyKind::Exponential, vec![1.0, 2.0], "e^("),
            (FamilyKind::Rational, vec![1.0, 2.0, 3.0], ") / (x +"),
            (FamilyKind::Logarithmic, vec![1.0, 2.0], "ln(x)"),
            (FamilyKind::PowerLaw, vec![1.0, 2.0], "x^2.0000"),
        ];
        for (family, params, needle) in cases {
            let formula = format_formula(family, &params);
            assert!(formula.contains(needle), "{formula} missing {needle}");
        }
    }

    #[test]
    fn preview_includes_expected_column_only_when_present() {
        let rows = vec![PreviewRow {
            input: "a".to_string(),
            expected: Some("b".to_string()),
            predicted: "b".to_string(),
        }];
        assert!(format_preview(&rows).contains("expected"));

        let rows = vec![PreviewRow {
            input: "a".to_string(),
            expected: None,
            predicted: "b".to_string(),
        }];
        assert!(!format_preview(&rows).contains("expected"));
    }
}
