use serde::{Deserialize, Serialize};

/// Heap object referenced from a [`Value::Obj`](super::value::Value::Obj).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Obj {
    String(ObjString),
}

/// Owned string buffer. The length is always the byte length of `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjString {
    text: String,
}

impl ObjString {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl Obj {
    pub fn string(text: impl Into<String>) -> Self {
        Obj::String(ObjString::new(text))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Obj::String(_) => "string",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Obj::String(s) => Some(s.as_str()),
        }
    }

    /// `+` on two objects. `None` when the pair has no addition.
    pub fn add(&self, other: &Obj) -> Option<Obj> {
        match (self, other) {
            (Obj::String(a), Obj::String(b)) => {
                let mut text = String::with_capacity(a.len() + b.len());
                text.push_str(a.as_str());
                text.push_str(b.as_str());
                Some(Obj::string(text))
            }
        }
    }

    /// Byte-wise equality; objects of different kinds are never equal.
    pub fn equals(&self, other: &Obj) -> bool {
        match (self, other) {
            (Obj::String(a), Obj::String(b)) => {
                a.len() == b.len() && a.as_str().as_bytes() == b.as_str().as_bytes()
            }
        }
    }
}

impl std::fmt::Display for Obj {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Obj::String(s) => f.write_str(s.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat() {
        let a = Obj::string("ab");
        let b = Obj::string("cd");
        let c = a.add(&b).unwrap();
        assert_eq!(c.as_str(), Some("abcd"));
        // operands are untouched
        assert_eq!(a.as_str(), Some("ab"));
    }

    #[test]
    fn test_equality() {
        assert!(Obj::string("ab").equals(&Obj::string("ab")));
        assert!(!Obj::string("ab").equals(&Obj::string("ac")));
        assert!(!Obj::string("ab").equals(&Obj::string("abc")));
        assert!(Obj::string("").equals(&Obj::string("")));
    }

    #[test]
    fn test_len_is_bytes() {
        let s = ObjString::new("é");
        assert_eq!(s.len(), 2);
        assert!(!s.is_empty());
    }
}
