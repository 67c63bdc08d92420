//! Shared helpers for the integration tests.
#![allow(dead_code)]

use atlang::{Diagnostics, InterpretError, Interpreter, Severity, Source, Value};

/// Evaluate one program in a fresh session.
pub fn eval(source: &str) -> Result<Option<Value>, InterpretError> {
    Interpreter::new().interpret(&Source::text(source))
}

/// Evaluate and unwrap the resulting value.
pub fn eval_value(source: &str) -> Value {
    match eval(source) {
        Ok(Some(value)) => value,
        other => panic!("'{}' should evaluate, got {:?}", source, other),
    }
}

/// Evaluate and return the session so its diagnostics can be inspected.
pub fn eval_session(source: &str) -> (Result<Option<Value>, InterpretError>, Interpreter) {
    let mut interp = Interpreter::new();
    let result = interp.interpret(&Source::text(source));
    (result, interp)
}

pub fn messages(diag: &Diagnostics, severity: Severity) -> Vec<String> {
    diag.entries()
        .iter()
        .filter(|d| d.severity == severity)
        .map(|d| d.message.clone())
        .collect()
}

/// Assert evaluation fails at run time with a message containing `needle`.
pub fn assert_runtime_error(source: &str, needle: &str) {
    let (result, interp) = eval_session(source);
    assert!(
        matches!(result, Err(InterpretError::Runtime(_))),
        "'{}' should fail at run time, got {:?}",
        source,
        result
    );
    let errors = messages(interp.diagnostics(), Severity::RuntimeError);
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert!(errors[0].contains(needle), "expected '{}' in {:?}", needle, errors);
}
