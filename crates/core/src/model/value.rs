use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

//
// ─── COLUMN KIND ───────────────────────────────────────────────────────────────
//

/// Nominal type of a result column, decided once when the table is built.
///
/// `Null` is the kind of a column that holds nothing but nulls; it is
/// compatible with every other kind when two results are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Null,
    Bool,
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    /// Widen two kinds into one that can hold values of both.
    ///
    /// Null is neutral, integer+float widen to float, bool widens into either
    /// numeric kind, and every other mix falls back to text.
    #[must_use]
    pub fn unify(self, other: ColumnKind) -> ColumnKind {
        use ColumnKind::{Bool, Float, Integer, Null, Text};
        match (self, other) {
            (Null, k) | (k, Null) => k,
            (a, b) if a == b => a,
            (Integer, Float) | (Float, Integer) | (Bool, Float) | (Float, Bool) => Float,
            (Bool, Integer) | (Integer, Bool) => Integer,
            _ => Text,
        }
    }

    /// Whether two same-named columns may be compared value by value.
    #[must_use]
    pub fn is_compatible_with(self, other: ColumnKind) -> bool {
        self == other || self == ColumnKind::Null || other == ColumnKind::Null
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnKind::Null => "null",
            ColumnKind::Bool => "bool",
            ColumnKind::Integer => "integer",
            ColumnKind::Float => "float",
            ColumnKind::Text => "text",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── VALUE ─────────────────────────────────────────────────────────────────────
//

/// A single scalar cell of a tabular result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Kind of this individual value.
    #[must_use]
    pub fn kind(&self) -> ColumnKind {
        match self {
            Value::Null => ColumnKind::Null,
            Value::Bool(_) => ColumnKind::Bool,
            Value::Integer(_) => ColumnKind::Integer,
            Value::Float(_) => ColumnKind::Float,
            Value::Text(_) => ColumnKind::Text,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert this value so it fits a column of `kind`.
    ///
    /// Only widening conversions produced by [`ColumnKind::unify`] are
    /// meaningful; nulls stay null whatever the target kind.
    #[must_use]
    pub fn coerce(self, kind: ColumnKind) -> Value {
        match (self, kind) {
            (Value::Null, _) => Value::Null,
            (Value::Bool(b), ColumnKind::Integer) => Value::Integer(i64::from(b)),
            (Value::Bool(b), ColumnKind::Float) => Value::Float(if b { 1.0 } else { 0.0 }),
            #[allow(clippy::cast_precision_loss)]
            (Value::Integer(i), ColumnKind::Float) => Value::Float(i as f64),
            (v @ Value::Text(_), ColumnKind::Text) => v,
            (v, ColumnKind::Text) => Value::Text(v.to_string()),
            (v, _) => v,
        }
    }

    /// Total order used by the canonical row sort.
    ///
    /// Nulls sort after everything else, floats use IEEE total ordering,
    /// and integers compare numerically against floats.
    #[must_use]
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Greater,
            (_, Value::Null) => Ordering::Less,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            #[allow(clippy::cast_precision_loss)]
            (Value::Integer(a), Value::Float(b)) => {
                (*a as f64).total_cmp(b).then(Ordering::Less)
            }
            #[allow(clippy::cast_precision_loss)]
            (Value::Float(a), Value::Integer(b)) => {
                a.total_cmp(&(*b as f64)).then(Ordering::Greater)
            }
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Integer(_) | Value::Float(_) => 1,
            Value::Text(_) => 2,
            Value::Null => 3,
        }
    }
}

/// Cell equality as used by grading: null equals null and NaN equals NaN.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b) == Ordering::Equal,
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unify_widens_numeric_kinds() {
        assert_eq!(ColumnKind::Integer.unify(ColumnKind::Float), ColumnKind::Float);
        assert_eq!(ColumnKind::Bool.unify(ColumnKind::Integer), ColumnKind::Integer);
        assert_eq!(ColumnKind::Null.unify(ColumnKind::Text), ColumnKind::Text);
        assert_eq!(ColumnKind::Integer.unify(ColumnKind::Text), ColumnKind::Text);
    }

    #[test]
    fn nulls_sort_last() {
        let mut values = vec![Value::Null, Value::Integer(3), Value::Integer(-1)];
        values.sort_by(Value::total_cmp);
        assert_eq!(values, vec![Value::Integer(-1), Value::Integer(3), Value::Null]);
    }

    #[test]
    fn null_equals_null_and_nan_equals_nan() {
        assert_eq!(Value::Null, Value::Null);
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Integer(1), Value::Float(1.0));
    }

    #[test]
    fn coerce_to_text_renders_value() {
        assert_eq!(Value::Integer(7).coerce(ColumnKind::Text), Value::Text("7".into()));
        assert_eq!(Value::Null.coerce(ColumnKind::Float), Value::Null);
    }
}
