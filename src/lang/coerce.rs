//! Operand normalization for binary operators. The table is keyed on the
//! left operand's kind and is not symmetric.

use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::object::Obj;
use super::value::{Value, ValueKind};

pub const FLOAT_TO_BOOL_WARNING: &str = "converting float to bool can produce unexpected results";
pub const UNSIGNED_FLOAT_WARNING: &str = "converting unsigned to float can produce unexpected results";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoerceError {
    #[error("nothing value in expression")]
    NothingOperand,

    #[error("cannot convert {from} to {to}")]
    Unsupported { from: ValueKind, to: ValueKind },

    #[error("cannot convert \"{text}\" to {to}")]
    InvalidText { text: String, to: ValueKind },

    #[error("conversion patterns unavailable: {0}")]
    Internal(String),
}

/// Which operand the table names for conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    /// Both operands already share the common kind.
    Neither,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coercion {
    pub common: ValueKind,
    pub side: Side,
    pub warning: Option<&'static str>,
}

impl Coercion {
    const fn new(common: ValueKind, side: Side) -> Self {
        Self {
            common,
            side,
            warning: None,
        }
    }

    const fn warn(common: ValueKind, side: Side, warning: &'static str) -> Self {
        Self {
            common,
            side,
            warning: Some(warning),
        }
    }
}

/// The normalization table.
///
/// A `nothing` on the left is always an error. A `nothing` on the right gets
/// a table entry but fails when it is converted.
pub fn coercion(left: ValueKind, right: ValueKind) -> Result<Coercion, CoerceError> {
    use Side::*;
    use ValueKind as K;

    let entry = match (left, right) {
        (K::Nothing, _) => return Err(CoerceError::NothingOperand),

        (K::Obj, K::Obj) => Coercion::new(K::Obj, Neither),
        (K::Obj, _) => Coercion::new(K::Obj, Right),

        (K::Bool, K::Float) => Coercion::warn(K::Bool, Right, FLOAT_TO_BOOL_WARNING),
        (K::Bool, _) => Coercion::new(K::Bool, Right),

        (K::Int, K::Bool) => Coercion::new(K::Bool, Left),
        (K::Int, K::Float) => Coercion::new(K::Float, Left),
        (K::Int, _) => Coercion::new(K::Int, Right),

        (K::Uint, K::Float) => Coercion::warn(K::Uint, Left, UNSIGNED_FLOAT_WARNING),
        (K::Uint, K::Obj) => Coercion::new(K::Uint, Right),
        (K::Uint, _) => Coercion::new(K::Uint, Left),

        (K::Float, K::Bool) => Coercion::warn(K::Float, Left, FLOAT_TO_BOOL_WARNING),
        (K::Float, K::Obj) => Coercion::new(K::Float, Right),
        (K::Float, _) => Coercion::new(K::Float, Left),
    };
    Ok(entry)
}

// ==========================================================================
// Text patterns for object to scalar conversion
// ==========================================================================

struct Patterns {
    signed: Regex,
    unsigned: Regex,
    float: Regex,
    boolean: Regex,
}

static PATTERNS: LazyLock<Result<Patterns, String>> = LazyLock::new(|| {
    let build = |re: &str| Regex::new(re).map_err(|e| e.to_string());
    Ok(Patterns {
        // no leading zeros
        signed: build(r"^[+-]?(0|[1-9][0-9]*)$")?,
        // unsigned values are always written in hex
        unsigned: build(r"(?i)^0x[0-9a-f]+$")?,
        float: build(r"(?i)^[+-]?([0-9]*\.)?[0-9]+(e[-+]?[0-9]+)?$")?,
        boolean: build(r"(?i)^(true|false)$")?,
    })
});

fn patterns() -> Result<&'static Patterns, CoerceError> {
    PATTERNS
        .as_ref()
        .map_err(|e| CoerceError::Internal(e.clone()))
}

pub fn is_signed_text(text: &str) -> bool {
    patterns().is_ok_and(|p| p.signed.is_match(text))
}

pub fn is_unsigned_text(text: &str) -> bool {
    patterns().is_ok_and(|p| p.unsigned.is_match(text))
}

pub fn is_float_text(text: &str) -> bool {
    patterns().is_ok_and(|p| p.float.is_match(text))
}

pub fn is_bool_text(text: &str) -> bool {
    patterns().is_ok_and(|p| p.boolean.is_match(text))
}

fn object_to_scalar(obj: &Obj, to: ValueKind) -> Result<Value, CoerceError> {
    let patterns = patterns()?;
    let Some(text) = obj.as_str() else {
        return Err(CoerceError::Unsupported {
            from: ValueKind::Obj,
            to,
        });
    };
    let invalid = || CoerceError::InvalidText {
        text: text.to_string(),
        to,
    };

    match to {
        ValueKind::Int if patterns.signed.is_match(text) => {
            text.parse::<i64>().map(Value::Int).map_err(|_| invalid())
        }
        ValueKind::Uint if patterns.unsigned.is_match(text) => {
            u64::from_str_radix(&text[2..], 16)
                .map(Value::Uint)
                .map_err(|_| invalid())
        }
        ValueKind::Float if patterns.float.is_match(text) => {
            text.parse::<f64>().map(Value::Float).map_err(|_| invalid())
        }
        ValueKind::Bool if patterns.boolean.is_match(text) => {
            Ok(Value::Bool(text.eq_ignore_ascii_case("true")))
        }
        _ => Err(invalid()),
    }
}

/// Convert one value to `to`.
pub fn convert(value: &Value, to: ValueKind) -> Result<Value, CoerceError> {
    if value.kind() == to {
        return Ok(value.clone());
    }

    let converted = match (value, to) {
        (Value::Nothing, _) => return Err(CoerceError::NothingOperand),

        (Value::Obj(obj), _) => return object_to_scalar(obj, to),
        (_, ValueKind::Obj) => Value::Obj(Rc::new(Obj::string(value.to_text()))),

        (Value::Int(n), ValueKind::Uint) => Value::Uint(*n as u64),
        (Value::Int(n), ValueKind::Float) => Value::Float(*n as f64),
        (Value::Int(n), ValueKind::Bool) => Value::Bool(*n != 0),

        (Value::Uint(n), ValueKind::Int) => Value::Int(*n as i64),
        (Value::Uint(n), ValueKind::Float) => Value::Float(*n as f64),
        (Value::Uint(n), ValueKind::Bool) => Value::Bool(*n != 0),

        (Value::Float(n), ValueKind::Int) => Value::Int(*n as i64),
        (Value::Float(n), ValueKind::Uint) => Value::Uint(*n as u64),
        (Value::Float(n), ValueKind::Bool) => Value::Bool(*n != 0.0),

        (Value::Bool(b), ValueKind::Int) => Value::Int(*b as i64),
        (Value::Bool(b), ValueKind::Uint) => Value::Uint(*b as u64),
        (Value::Bool(b), ValueKind::Float) => Value::Float(if *b { 1.0 } else { 0.0 }),

        _ => {
            return Err(CoerceError::Unsupported {
                from: value.kind(),
                to,
            });
        }
    };
    Ok(converted)
}

/// Two operands of one kind, ready for a binary instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub left: Value,
    pub right: Value,
    pub common: ValueKind,
    pub warning: Option<&'static str>,
}

/// Look up the pair in the table and convert both operands to the common
/// kind. The operand the table names is converted first.
pub fn normalize(left: Value, right: Value) -> Result<Normalized, CoerceError> {
    let entry = coercion(left.kind(), right.kind())?;
    let (left, right) = match entry.side {
        Side::Left => {
            let left = convert(&left, entry.common)?;
            (left, convert(&right, entry.common)?)
        }
        Side::Right | Side::Neither => {
            let right = convert(&right, entry.common)?;
            (convert(&left, entry.common)?, right)
        }
    };
    Ok(Normalized {
        left,
        right,
        common: entry.common,
        warning: entry.warning,
    })
}

/// Normalization for `==` and `!=`. A scalar compared with an object is
/// turned into a string, so the pair compares as text and never fails on
/// the object's contents.
pub fn normalize_equality(left: Value, right: Value) -> Result<Normalized, CoerceError> {
    match (&left, &right) {
        (Value::Int(_) | Value::Uint(_) | Value::Float(_) | Value::Bool(_), Value::Obj(_)) => {
            Ok(Normalized {
                left: convert(&left, ValueKind::Obj)?,
                right,
                common: ValueKind::Obj,
                warning: None,
            })
        }
        _ => normalize(left, right),
    }
}
