//! Extraction of a `def transform` routine from raw model output.
//!
//! Model replies range from clean fenced code to prose with code mixed
//! in. Recovery is layered: fenced block, strict indented-body match,
//! greedy tail match, then a line scan that force-indents a flat body.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{AppError, ErrorKind};

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:python)?[ \t]*\n(.*?)```").expect("static regex")
    })
}

fn strict_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^def\s+transform\s*\([^)]*\)\s*:[ \t]*\n(?:(?:(?: {4}|\t).*)?\n?)*")
            .expect("static regex")
    })
}

fn loose_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)def\s+transform\s*\([^)]*\)\s*:.*").expect("static regex"))
}

/// Pull the transform routine out of a raw model reply.
pub fn extract_function(raw: &str) -> Result<String, AppError> {
    // Fenced block first; it must actually hold the function, not a
    // usage example.
    for captures in fence_re().captures_iter(raw) {
        if let Some(block) = captures.get(1) {
            let block = block.as_str().trim();
            if block.starts_with("def transform") || block.contains("\ndef transform") {
                return Ok(trim_to_def(block));
            }
        }
    }

    if let Some(found) = strict_re().find(raw) {
        let text = found.as_str().trim_end();
        // A header with no indented body is not a usable match; let the
        // looser passes recover it.
        if text.lines().count() > 1 {
            return Ok(text.to_string());
        }
    }

    if let Some(found) = loose_re().find(raw) {
        let candidate = truncate_at_blank_line(found.as_str());
        let candidate = candidate.trim_end();
        // A body that is already indented is usable as-is; otherwise
        // fall through to the forced-indent scan.
        if candidate
            .lines()
            .skip(1)
            .all(|l| l.is_empty() || l.starts_with(' ') || l.starts_with('\t'))
        {
            return Ok(candidate.to_string());
        }
        return Ok(force_indent(candidate));
    }

    Err(AppError::new(
        ErrorKind::NoFunctionFound,
        "Model output contained no transform function.",
    ))
}

/// Drop any leading imports/prose inside a fenced block so the text
/// starts at the function (keeping import lines that precede it).
fn trim_to_def(block: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut seen_def = false;
    for line in block.lines() {
        let trimmed = line.trim_start();
        if !seen_def {
            if trimmed.starts_with("def transform") {
                seen_def = true;
                kept.push(line);
            } else if trimmed.starts_with("import ") || trimmed.starts_with("from ") {
                kept.push(line);
            }
            continue;
        }
        kept.push(line);
    }
    kept.join("\n")
}

/// The greedy match runs to end of text; the function itself ends at
/// the first blank line after the header.
fn truncate_at_blank_line(matched: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    for (i, line) in matched.lines().enumerate() {
        if i > 0 && line.trim().is_empty() {
            break;
        }
        kept.push(line);
    }
    kept.join("\n")
}

/// Re-indent a function whose body lines lost their leading whitespace.
/// The body ends at a blank line or the next top-level definition.
pub fn force_indent(code: &str) -> String {
    let mut out = Vec::new();
    let mut in_body = false;
    for line in code.lines() {
        let trimmed = line.trim_start();
        if !in_body {
            out.push(line.to_string());
            if trimmed.starts_with("def transform") {
                in_body = true;
            }
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with("def ") {
            break;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            out.push(line.to_string());
        } else {
            out.push(format!("    {trimmed}"));
        }
    }
    out.join("\n")
}

/// Last-resort repair: flatten every body line to a single indent
/// level. Nesting is lost, which is acceptable for the simple bodies
/// this recovers.
pub fn repair_indentation(code: &str) -> String {
    let mut out = Vec::new();
    for line in code.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            out.push(String::new());
        } else if trimmed.starts_with("def transform")
            || trimmed.starts_with("import ")
            || trimmed.starts_with("from ")
        {
            out.push(trimmed.to_string());
        } else {
            out.push(format!("    {trimmed}"));
        }
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fenced_python_block() {
        let raw = "Here is the function:\n```python\ndef transform(x):\n    return x.upper()\n```\nHope that helps!";
        let code = extract_function(raw).unwrap();
        assert!(code.starts_with("def transform"));
        assert!(code.contains("return x.upper()"));
    }

    #[test]
    fn skips_fenced_block_without_the_function() {
        let raw = "```\ntransform('abc')\n```\ndef transform(x):\n    return x\n";
        let code = extract_function(raw).unwrap();
        assert!(code.starts_with("def transform"));
        assert!(!code.contains("transform('abc')"));
    }

    #[test]
    fn keeps_imports_preceding_the_def_in_a_fence() {
        let raw = "```python\nimport datetime\n\ndef transform(x):\n    return x\n```";
        let code = extract_function(raw).unwrap();
        assert!(code.starts_with("import datetime"));
    }

    #[test]
    fn extracts_bare_function_from_prose() {
        let raw = "Sure! Use this:\n\ndef transform(x):\n    return x * 2\n\nThat doubles it.";
        let code = extract_function(raw).unwrap();
        assert_eq!(code, "def transform(x):\n    return x * 2");
    }

    #[test]
    fn force_indents_flat_bodies() {
        let raw = "def transform(x):\nreturn x * 2";
        let code = extract_function(raw).unwrap();
        assert_eq!(code, "def transform(x):\n    return x * 2");
    }

    #[test]
    fn flat_body_followed_by_prose_stops_at_the_blank_line() {
        let raw = "def transform(x):\nreturn x * 2\n\nThis doubles the input.";
        let code = extract_function(raw).unwrap();
        assert_eq!(code, "def transform(x):\n    return x * 2");
    }

    #[test]
    fn force_indent_stops_at_the_next_definition() {
        let raw = "def transform(x):\nreturn x\ndef helper():\npass";
        let code = extract_function(raw).unwrap();
        assert_eq!(code, "def transform(x):\n    return x");
    }

    #[test]
    fn missing_function_is_a_typed_error() {
        let err = extract_function("I cannot help with that.").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoFunctionFound);
    }

    #[test]
    fn repair_flattens_to_one_indent_level() {
        let code = "def transform(x):\n  return x\n";
        assert_eq!(repair_indentation(code), "def transform(x):\n    return x");
    }
}
