//! Runtime values for the interpreter

use super::callable::{Callable, Class, Instance};
use super::error::{InterpResult, RuntimeError};
use super::native::NativeFault;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Runtime value
#[derive(Clone)]
pub enum Value {
    /// 64-bit integer
    Number(i64),
    /// Immutable string
    String(Rc<str>),
    /// Boolean
    Bool(bool),
    /// Function, native capability or bound method
    Callable(Callable),
    /// User-defined class
    Class(Rc<Class>),
    /// Instance of a user-defined class
    Instance(Rc<RefCell<Instance>>),
    /// Native fault swallowed at a call boundary
    Fault(Rc<NativeFault>),
    /// Absence of a value (`nil`, uninitialized variables, bare `return`)
    Nothing,
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    /// `Nothing` and `false` are falsy, everything else is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nothing => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }

    /// Get type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "bool",
            Value::Callable(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Fault(_) => "fault",
            Value::Nothing => "nothing",
        }
    }

    /// Only numbers, strings and booleans have a printed form
    pub fn is_printable(&self) -> bool {
        matches!(self, Value::Number(_) | Value::String(_) | Value::Bool(_))
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Callable view of the value; classes are callable as constructors
    pub fn as_callable(&self) -> Option<Callable> {
        match self {
            Value::Callable(c) => Some(c.clone()),
            Value::Class(class) => Some(Callable::Class(Rc::clone(class))),
            _ => None,
        }
    }

    pub fn add(&self, other: &Value) -> InterpResult<Value> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.wrapping_add(*b))),
            (Value::String(a), Value::String(b)) => {
                let mut s = String::with_capacity(a.len() + b.len());
                s.push_str(a);
                s.push_str(b);
                Ok(Value::string(s))
            }
            _ => Err(mismatch("cannot add types", self, other)),
        }
    }

    pub fn sub(&self, other: &Value) -> InterpResult<Value> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.wrapping_sub(*b))),
            (Value::String(_), Value::String(_)) => {
                Err(RuntimeError::type_error("cannot subtract strings"))
            }
            _ => Err(mismatch("cannot subtract types", self, other)),
        }
    }

    pub fn mul(&self, other: &Value) -> InterpResult<Value> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.wrapping_mul(*b))),
            (Value::String(_), Value::String(_)) => {
                Err(RuntimeError::type_error("cannot multiply strings"))
            }
            _ => Err(mismatch("cannot multiply types", self, other)),
        }
    }

    /// Integer division truncating toward zero; a zero divisor is rejected
    /// before any division happens.
    pub fn div(&self, other: &Value) -> InterpResult<Value> {
        match (self, other) {
            (Value::Number(_), Value::Number(0)) => Err(RuntimeError::division_by_zero()),
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.wrapping_div(*b))),
            (Value::String(_), Value::String(_)) => {
                Err(RuntimeError::type_error("cannot divide strings"))
            }
            _ => Err(mismatch("cannot divide types", self, other)),
        }
    }

    /// Numeric ordering shared by `>`, `>=`, `<` and `<=`
    pub fn compare(&self, other: &Value) -> InterpResult<std::cmp::Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Ok(a.cmp(b)),
            (Value::String(_), _) | (_, Value::String(_)) => {
                Err(RuntimeError::type_error("cannot compare strings"))
            }
            _ => Err(mismatch("cannot compare types", self, other)),
        }
    }

    /// `Nothing` equals only `Nothing`; other values compare by payload and
    /// never across tags. Reference values compare by identity.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nothing, Value::Nothing) => true,
            (Value::Nothing, _) | (_, Value::Nothing) => false,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a.same_as(b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Fault(a), Value::Fault(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn mismatch(what: &str, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::type_error(format!(
        "{what}: {} and {}",
        left.type_name(),
        right.type_name()
    ))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Callable(c) => write!(f, "<fn {}>", c.name()),
            Value::Class(class) => write!(f, "<class {}>", class.name),
            Value::Instance(instance) => write!(f, "<{} instance>", instance.borrow().class.name),
            Value::Fault(fault) => write!(f, "<fault {fault}>"),
            Value::Nothing => write!(f, "nil"),
        }
    }
}

// Closures can reach themselves through their environment, so Debug stays shallow.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Nothing => write!(f, "Nothing"),
            other => write!(f, "{other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::ErrorKind;
    use std::cmp::Ordering;

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Number(42).to_string(), "42");
        assert_eq!(Value::string("hi").to_string(), "hi");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Nothing.to_string(), "nil");
    }

    #[test]
    fn test_value_truthy() {
        assert!(!Value::Nothing.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0).is_truthy());
        assert!(Value::string("").is_truthy());
    }

    #[test]
    fn test_add_numbers_and_strings() {
        assert_eq!(Value::Number(32).add(&Value::Number(33)).unwrap(), Value::Number(65));
        assert_eq!(
            Value::string("a").add(&Value::string("b")).unwrap(),
            Value::string("ab")
        );
    }

    #[test]
    fn test_add_mixed_is_type_error() {
        let err = Value::Number(1).add(&Value::string("1")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert!(err.message.starts_with("cannot add types"));
    }

    #[test]
    fn test_string_concat_is_associative() {
        let (a, b, c) = (Value::string("a"), Value::string("b"), Value::string("c"));
        let left = a.add(&b).unwrap().add(&c).unwrap();
        let right = a.add(&b.add(&c).unwrap()).unwrap();
        assert_eq!(left.to_string(), right.to_string());
    }

    #[test]
    fn test_sub_mul_reject_strings() {
        let s = Value::string("x");
        assert_eq!(s.sub(&s).unwrap_err().message, "cannot subtract strings");
        assert_eq!(s.mul(&s).unwrap_err().message, "cannot multiply strings");
        assert_eq!(
            Value::Bool(true).sub(&Value::Number(1)).unwrap_err().kind,
            ErrorKind::TypeError
        );
    }

    #[test]
    fn test_div_truncates_toward_zero() {
        assert_eq!(Value::Number(10).div(&Value::Number(3)).unwrap(), Value::Number(3));
        assert_eq!(Value::Number(-7).div(&Value::Number(2)).unwrap(), Value::Number(-3));
    }

    #[test]
    fn test_div_by_zero() {
        let err = Value::Number(1).div(&Value::Number(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
    }

    #[test]
    fn test_div_strings_is_type_error() {
        let s = Value::string("x");
        assert_eq!(s.div(&s).unwrap_err().message, "cannot divide strings");
    }

    #[test]
    fn test_compare() {
        assert_eq!(Value::Number(2).compare(&Value::Number(1)).unwrap(), Ordering::Greater);
        let err = Value::Number(1).compare(&Value::string("1")).unwrap_err();
        assert_eq!(err.message, "cannot compare strings");
        assert!(Value::Bool(true).compare(&Value::Number(1)).is_err());
    }

    #[test]
    fn test_equality() {
        assert!(Value::Number(5).equals(&Value::Number(5)));
        assert!(!Value::Number(5).equals(&Value::string("5")));
        assert!(Value::Nothing.equals(&Value::Nothing));
        assert!(!Value::Nothing.equals(&Value::Bool(false)));
        assert!(!Value::Number(0).equals(&Value::Nothing));
    }

    #[test]
    fn test_wrapping_arithmetic() {
        assert_eq!(
            Value::Number(i64::MAX).add(&Value::Number(1)).unwrap(),
            Value::Number(i64::MIN)
        );
    }

    #[test]
    fn test_printable() {
        assert!(Value::Number(1).is_printable());
        assert!(!Value::Nothing.is_printable());
    }
}
