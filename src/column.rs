/// GridView Cell Values
///
/// A CellValue is the scalar stored at one column of one row. Cells are
/// compared by their natural ordering when sorting and by their lower-cased
/// string representation when filtering.
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Write};

/// Cell value enum to support the scalar kinds a grid displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Rank used to order cells of different kinds against each other.
    fn kind_rank(&self) -> u8 {
        match self {
            CellValue::Null => 0,
            CellValue::Bool(_) => 1,
            CellValue::Int(_) | CellValue::Float(_) => 2,
            CellValue::Text(_) => 3,
        }
    }

    /// Natural ordering used by the sort comparator.
    ///
    /// Numbers compare numerically regardless of whether they are stored as
    /// integers or floats; NaN ties with every number. Text compares by byte
    /// order. Cells of different kinds order as `Null < Bool < number < Text`.
    pub fn natural_cmp(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Null, CellValue::Null) => Ordering::Equal,
            (CellValue::Bool(a), CellValue::Bool(b)) => a.cmp(b),
            (CellValue::Int(a), CellValue::Int(b)) => a.cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Float(_) | CellValue::Int(_), CellValue::Float(_) | CellValue::Int(_)) => {
                let a = self.as_f64().unwrap_or(f64::NAN);
                let b = other.as_f64().unwrap_or(f64::NAN);
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
            (a, b) => a.kind_rank().cmp(&b.kind_rank()),
        }
    }

    /// Appends the lower-cased string representation of this cell to `out`.
    ///
    /// `Null` renders as the empty string, so it only matches an empty query.
    pub fn write_filter_text(&self, out: &mut String) {
        match self {
            CellValue::Null => {}
            // Same lower-casing as FilterSpec queries, so context-dependent
            // mappings like a word-final sigma agree on both sides.
            CellValue::Text(s) => out.push_str(&s.to_lowercase()),
            other => {
                let start = out.len();
                // Writing into a String never fails.
                let _ = write!(out, "{}", other);
                out[start..].make_ascii_lowercase();
            }
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(v) => write!(f, "{}", v),
            CellValue::Int(v) => write!(f, "{}", v),
            CellValue::Float(v) => write_float(f, *v),
            CellValue::Text(v) => f.write_str(v),
        }
    }
}

/// Writes `v` the way a JavaScript grid renders numbers: plain decimals for
/// magnitudes in `[1e-6, 1e21)`, shortest exponent form (`1e+21`, `1.5e-7`)
/// outside it, `Infinity`/`NaN` spelled out, and no sign on zero.
fn write_float<W: Write>(out: &mut W, v: f64) -> fmt::Result {
    if v.is_nan() {
        return out.write_str("NaN");
    }
    if v.is_infinite() {
        return out.write_str(if v > 0.0 { "Infinity" } else { "-Infinity" });
    }
    if v == 0.0 {
        return out.write_str("0");
    }

    let exp = format!("{:e}", v);
    let (mantissa, exponent) = match exp.split_once('e') {
        Some(parts) => parts,
        None => return write!(out, "{}", v),
    };
    let exponent: i32 = exponent.parse().map_err(|_| fmt::Error)?;
    if (-6..21).contains(&exponent) {
        write!(out, "{}", v)
    } else if exponent < 0 {
        write!(out, "{}e{}", mantissa, exponent)
    } else {
        write!(out, "{}e+{}", mantissa, exponent)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Int(value as i64)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}
