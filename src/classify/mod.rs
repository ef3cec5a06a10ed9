//! Transformation-type classification.
//!
//! Cheap lexical heuristics decide the obvious cases; everything else
//! is put to the generative backend and the free-text answer is
//! normalized into one of the four types.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::{parse_number, ExampleSet, TransformationType};
use crate::error::AppError;
use crate::llm::GenerativeBackend;

const CLASSIFY_MAX_TOKENS: u32 = 20;

fn digit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d").expect("static regex"))
}

fn letter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z]").expect("static regex"))
}

fn special_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9]").expect("static regex"))
}

/// Classify the transformation demonstrated by the example pairs.
pub fn classify_examples(
    examples: &ExampleSet,
    backend: &GenerativeBackend,
) -> Result<TransformationType, AppError> {
    if let Some(kind) = heuristic_type(examples) {
        log::debug!("classified as {} by heuristics", kind.display_name());
        return Ok(kind);
    }

    let prompt = classification_prompt(examples);
    let reply = backend.generate(&prompt, CLASSIFY_MAX_TOKENS, false)?;
    let kind = normalize_type(&reply);
    log::debug!("classified as {} from model reply", kind.display_name());
    Ok(kind)
}

/// Lexical shortcuts that do not need a model call. Both columns are
/// inspected; a rule-driven pattern on either side decides.
fn heuristic_type(examples: &ExampleSet) -> Option<TransformationType> {
    let sources = examples.sources();
    let targets = examples.targets();

    // Code-like values mixing digits with anything non-numeric are
    // rule-driven, not plain string or numeric transforms.
    let code_like = sources.iter().chain(targets.iter()).any(|s| {
        digit_re().is_match(s) && (letter_re().is_match(s) || special_re().is_match(s))
    });
    if code_like {
        return Some(TransformationType::Algorithmic);
    }

    // A column where only some values parse as numbers needs
    // conditional logic.
    for column in [&sources, &targets] {
        let numeric_count = column.iter().filter(|s| parse_number(s).is_some()).count();
        if numeric_count > 0 && numeric_count < column.len() {
            return Some(TransformationType::Algorithmic);
        }
    }

    None
}

/// One representative pair is enough context for the model; the first
/// pair stands in for the whole set.
fn classification_prompt(examples: &ExampleSet) -> String {
    let pair = examples.first();
    format!(
        "Classify the transformation shown by this input/output example \
         into exactly one category:\n\
         - string: casing, formatting, or rearrangement of text\n\
         - numeric: a mathematical function of a numeric input\n\
         - algorithmic: rule-based logic such as parsing codes or dates\n\
         - general: lookups or mappings with no simple rule\n\n\
         Input: {}\nOutput: {}\n\
         \nAnswer with a single line: Transformation Type: <category>\n",
        pair.source, pair.target
    )
}

/// Normalize a free-text model reply into a transformation type.
///
/// Unrecognized replies default to the string type, which has the most
/// forgiving synthesis prompt.
pub fn normalize_type(reply: &str) -> TransformationType {
    let answer = reply
        .rsplit("Transformation Type:")
        .next()
        .unwrap_or(reply)
        .lines()
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    let has = |needles: &[&str]| needles.iter().any(|n| answer.contains(n));
    if has(&["string", "case", "format"]) {
        TransformationType::Text
    } else if has(&["numeric", "number"]) {
        TransformationType::Numeric
    } else if has(&["algorithmic", "rule", "logic"]) {
        TransformationType::Algorithmic
    } else if has(&["general", "lookup"]) {
        TransformationType::General
    } else {
        TransformationType::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExamplePair;
    use crate::error::ErrorKind;
    use crate::llm::{LocalModel, RemoteState};
    use std::sync::Arc;
    use std::time::Duration;

    fn examples(pairs: &[(&str, &str)]) -> ExampleSet {
        ExampleSet::new(
            pairs
                .iter()
                .map(|(s, t)| ExamplePair {
                    source: s.to_string(),
                    target: t.to_string(),
                })
                .collect(),
        )
        .unwrap()
    }

    struct CannedLocal(&'static str);

    impl LocalModel for CannedLocal {
        fn complete(&self, _prompt: &str, _max_new_tokens: u32) -> Result<String, AppError> {
            Ok(self.0.to_string())
        }
    }

    fn backend(reply: &'static str) -> GenerativeBackend {
        GenerativeBackend::new(
            Some(Arc::new(CannedLocal(reply))),
            RemoteState::Unavailable {
                reason: "no key".to_string(),
            },
            Duration::from_secs(5),
        )
    }

    /// A backend with no tiers at all; any generate call errors.
    fn offline_backend() -> GenerativeBackend {
        GenerativeBackend::new(
            None,
            RemoteState::Unavailable {
                reason: "no key".to_string(),
            },
            Duration::from_secs(5),
        )
    }

    #[test]
    fn alphanumeric_codes_classify_as_algorithmic_without_a_model() {
        let set = examples(&[("ABC123", "123"), ("XYZ456", "456")]);
        assert_eq!(
            heuristic_type(&set),
            Some(TransformationType::Algorithmic)
        );
    }

    #[test]
    fn date_like_values_classify_as_algorithmic() {
        let set = examples(&[("2024-01-05", "05/01/2024")]);
        assert_eq!(
            heuristic_type(&set),
            Some(TransformationType::Algorithmic)
        );
    }

    #[test]
    fn target_column_codes_classify_as_algorithmic_without_a_model() {
        // Only the targets mix digits with letters; an offline backend
        // proves no generative call happens.
        let set = examples(&[("hello", "H3LLO"), ("world", "W0RLD")]);
        let kind = classify_examples(&set, &offline_backend()).unwrap();
        assert_eq!(kind, TransformationType::Algorithmic);
    }

    #[test]
    fn mixed_numeric_target_column_classifies_as_algorithmic() {
        let set = examples(&[("alpha", "12"), ("beta", "n/a")]);
        let kind = classify_examples(&set, &offline_backend()).unwrap();
        assert_eq!(kind, TransformationType::Algorithmic);
    }

    #[test]
    fn whitespace_next_to_digits_counts_as_code_like() {
        let set = examples(&[("1 234", "1234")]);
        assert_eq!(
            heuristic_type(&set),
            Some(TransformationType::Algorithmic)
        );
    }

    #[test]
    fn prompt_carries_only_the_first_pair() {
        let set = examples(&[("hello", "HELLO"), ("world", "WORLD")]);
        let prompt = classification_prompt(&set);
        assert!(prompt.contains("Input: hello"));
        assert!(!prompt.contains("world"));
    }

    #[test]
    fn partially_numeric_columns_classify_as_algorithmic() {
        let set = examples(&[("12", "24"), ("abc", "n/a")]);
        assert_eq!(
            heuristic_type(&set),
            Some(TransformationType::Algorithmic)
        );
    }

    #[test]
    fn plain_text_defers_to_the_model() {
        let set = examples(&[("hello", "HELLO"), ("world", "WORLD")]);
        assert_eq!(heuristic_type(&set), None);
        let kind = classify_examples(&set, &backend("Transformation Type: string")).unwrap();
        assert_eq!(kind, TransformationType::Text);
    }

    #[test]
    fn normalization_keyword_matching() {
        assert_eq!(
            normalize_type("Transformation Type: general lookup"),
            TransformationType::General
        );
        assert_eq!(
            normalize_type("this is a numeric mapping"),
            TransformationType::Numeric
        );
        assert_eq!(
            normalize_type("rule-based"),
            TransformationType::Algorithmic
        );
        assert_eq!(normalize_type("no idea"), TransformationType::Text);
    }

    #[test]
    fn model_failure_surfaces_as_an_error() {
        let set = examples(&[("hello", "HELLO")]);
        let backend = GenerativeBackend::new(
            None,
            RemoteState::Unavailable {
                reason: "no key".to_string(),
            },
            Duration::from_secs(5),
        );
        let err = classify_examples(&set, &backend).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteUnavailable);
    }
}
