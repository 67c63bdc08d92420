use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::object::Obj;

/// Runtime value.
///
/// Values live in the constant pool of a code block and on the VM operand
/// stack. Objects are reference counted so a constant can be pushed any
/// number of times without copying its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// 64-bit signed integer.
    Int(i64),

    /// 64-bit unsigned integer. Written in hex in source text.
    Uint(u64),

    /// 64-bit floating-point number.
    Float(f64),

    Bool(bool),

    /// The unit value, spelled `nothing`.
    Nothing,

    /// Heap object.
    Obj(Rc<Obj>),
}

/// Type tag of a [`Value`], used by the coercion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Uint,
    Float,
    Bool,
    Nothing,
    Obj,
}

impl ValueKind {
    pub const ALL: [ValueKind; 6] = [
        ValueKind::Obj,
        ValueKind::Bool,
        ValueKind::Int,
        ValueKind::Uint,
        ValueKind::Float,
        ValueKind::Nothing,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Int => "signed int",
            ValueKind::Uint => "unsigned int",
            ValueKind::Float => "float",
            ValueKind::Bool => "boolean",
            ValueKind::Nothing => "nothing",
            ValueKind::Obj => "object",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    pub fn string(text: impl Into<String>) -> Self {
        Value::Obj(Rc::new(Obj::string(text)))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Uint(_) => ValueKind::Uint,
            Value::Float(_) => ValueKind::Float,
            Value::Bool(_) => ValueKind::Bool,
            Value::Nothing => ValueKind::Nothing,
            Value::Obj(_) => ValueKind::Obj,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Obj(obj) => obj.as_str(),
            _ => None,
        }
    }

    /// Truth value used by `!`: nothing is false, numbers are true when
    /// non-zero, objects are always true.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Nothing => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Uint(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Obj(_) => true,
        }
    }

    /// Text a scalar takes when it is converted to a string object.
    ///
    /// Unsigned values use the `0x` form so they convert back through the
    /// unsigned pattern; floats always carry a fractional part or exponent.
    pub fn to_text(&self) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Uint(n) => format!("0x{:X}", n),
            Value::Float(n) => format!("{:?}", n),
            Value::Bool(b) => b.to_string(),
            Value::Nothing => "nothing".to_string(),
            Value::Obj(obj) => obj.to_string(),
        }
    }
}

impl std::fmt::Display for Value {
    /// Format a value the way the REPL prints results.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Uint(n) => write!(f, "0x{:X}", n),
            Value::Float(n) => write!(f, "{:.3}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Nothing => write!(f, "nothing"),
            Value::Obj(obj) => write!(f, "{}", obj),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(-7).to_string(), "-7");
        assert_eq!(Value::Uint(31).to_string(), "0x1F");
        assert_eq!(Value::Float(0.0314).to_string(), "0.031");
        assert_eq!(Value::Float(2.0).to_string(), "2.000");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Nothing.to_string(), "nothing");
        assert_eq!(Value::string("hi").to_string(), "hi");
    }

    #[test]
    fn test_to_text() {
        assert_eq!(Value::Int(42).to_text(), "42");
        assert_eq!(Value::Uint(255).to_text(), "0xFF");
        assert_eq!(Value::Float(1.0).to_text(), "1.0");
        assert_eq!(Value::Float(0.5).to_text(), "0.5");
        assert_eq!(Value::Bool(false).to_text(), "false");
    }

    #[test]
    fn test_truthy() {
        assert!(!Value::Nothing.truthy());
        assert!(!Value::Int(0).truthy());
        assert!(Value::Int(-1).truthy());
        assert!(!Value::Uint(0).truthy());
        assert!(!Value::Float(0.0).truthy());
        assert!(Value::Float(0.1).truthy());
        assert!(Value::string("").truthy());
    }

    #[test]
    fn test_kind() {
        assert_eq!(Value::Int(1).kind(), ValueKind::Int);
        assert_eq!(Value::string("x").kind(), ValueKind::Obj);
        assert_eq!(ValueKind::Uint.to_string(), "unsigned int");
    }
}
