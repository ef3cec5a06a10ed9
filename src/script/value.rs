//! Runtime values for the transform DSL.

use std::cmp::Ordering;

use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// Insertion-ordered key/value pairs; small dicts only, so linear
    /// lookup is fine.
    Dict(Vec<(Value, Value)>),
    Date(NaiveDateTime),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Date(_) => "datetime",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Dict(items) => !items.is_empty(),
            Value::Date(_) => true,
        }
    }

    /// Numeric view: ints, floats, and bools coerce; everything else
    /// does not.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Equality with numeric cross-type coercion, matching the source
    /// language's `1 == 1.0` and `True == 1` behavior.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// Ordering for `<`/`>` style comparisons. Only same-kind values
    /// (or numbers) are ordered.
    pub fn partial_order(&self, other: &Value) -> Option<Ordering> {
        if let (Some(a), Some(b)) = (self.as_number(), other.as_number()) {
            return a.partial_cmp(&b);
        }
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.partial_order(y)? {
                        Ordering::Equal => continue,
                        other => return Some(other),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        }
    }

    /// `str()` rendering. Floats with no fractional part render with a
    /// trailing `.0` so numeric outputs compare like the originals.
    pub fn py_str(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => format_float(*v),
            Value::Str(s) => s.clone(),
            Value::List(_) | Value::Dict(_) => self.py_repr(),
            Value::Date(d) => d.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// `repr()` rendering, used inside containers.
    pub fn py_repr(&self) -> String {
        match self {
            Value::Str(s) => {
                let mut out = String::with_capacity(s.len() + 2);
                out.push('\'');
                for ch in s.chars() {
                    match ch {
                        '\'' => out.push_str("\\'"),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        '\t' => out.push_str("\\t"),
                        '\r' => out.push_str("\\r"),
                        _ => out.push(ch),
                    }
                }
                out.push('\'');
                out
            }
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(|v| v.py_repr()).collect();
                format!("[{}]", inner.join(", "))
            }
            Value::Dict(items) => {
                let inner: Vec<String> = items
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.py_repr(), v.py_repr()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            _ => self.py_str(),
        }
    }
}

fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if v == v.trunc() && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_floats_keep_a_decimal() {
        assert_eq!(Value::Float(2.0).py_str(), "2.0");
        assert_eq!(Value::Float(2.5).py_str(), "2.5");
        assert_eq!(Value::Float(-3.0).py_str(), "-3.0");
    }

    #[test]
    fn loose_equality_crosses_numeric_kinds() {
        assert!(Value::Int(1).loose_eq(&Value::Float(1.0)));
        assert!(Value::Bool(true).loose_eq(&Value::Int(1)));
        assert!(!Value::Str("1".to_string()).loose_eq(&Value::Int(1)));
    }

    #[test]
    fn containers_render_with_reprs() {
        let v = Value::List(vec![
            Value::Str("a".to_string()),
            Value::Int(1),
            Value::Float(2.0),
        ]);
        assert_eq!(v.py_str(), "['a', 1, 2.0]");
    }

    #[test]
    fn truthiness_matches_emptiness() {
        assert!(!Value::Str(String::new()).truthy());
        assert!(Value::Str("x".to_string()).truthy());
        assert!(!Value::List(vec![]).truthy());
        assert!(!Value::Int(0).truthy());
    }
}
