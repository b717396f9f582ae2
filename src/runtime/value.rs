//! Runtime values. Every value is immutable, so cloning one never aliases
//! state the running program can change.

use crate::runtime::builtins::Builtin;
use crate::runtime::error::ErrorKind;
use crate::runtime::unit::{CompiledUnit, Opcode};
use itertools::Itertools;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// A callable built from a compiled function unit.
#[derive(Clone)]
pub struct Function {
    pub name: Rc<str>,
    pub unit: Rc<CompiledUnit>,
}

impl Function {
    pub fn new(unit: Rc<CompiledUnit>) -> Self {
        Self {
            name: Rc::clone(&unit.name),
            unit,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {} {}>", self.name, self.unit.id())
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<[Value]>),
    Function(Rc<Function>),
    Builtin(Builtin),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::from(items))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Function(_) | Value::Builtin(_) => true,
        }
    }

    /// Source-like representation: strings are quoted.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("{:?}", &**s),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{:.1}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => write!(f, "[{}]", items.iter().map(Value::repr).join(", ")),
            Value::Function(function) => write!(f, "<fn {}>", function.name),
            Value::Builtin(builtin) => write!(f, "<builtin {}>", builtin.name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

fn type_error(op: &str, lhs: &Value, rhs: &Value) -> ErrorKind {
    ErrorKind::Type(format!(
        "unsupported operand types for {}: '{}' and '{}'",
        op,
        lhs.type_name(),
        rhs.type_name()
    ))
}

fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn arithmetic(
    symbol: &str,
    lhs: &Value,
    rhs: &Value,
    int: fn(i64, i64) -> Result<i64, ErrorKind>,
    float: fn(f64, f64) -> f64,
) -> Result<Value, ErrorKind> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => int(*a, *b).map(Value::Int),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(float(*a as f64, *b))),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(float(*a, *b as f64))),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float(*a, *b))),
        _ => Err(type_error(symbol, lhs, rhs)),
    }
}

fn is_zero(value: &Value) -> bool {
    matches!(value, Value::Int(0)) || matches!(value, Value::Float(x) if *x == 0.0)
}

/// Longest list or string a program may build.
pub const MAX_SEQUENCE_LEN: usize = 1 << 20;

/// Reject sequences longer than [`MAX_SEQUENCE_LEN`] before allocating them.
pub fn check_len(len: usize) -> Result<(), ErrorKind> {
    if len > MAX_SEQUENCE_LEN {
        return Err(ErrorKind::TooLarge {
            len,
            limit: MAX_SEQUENCE_LEN,
        });
    }
    Ok(())
}

/// Apply a binary opcode to two operands.
pub fn binary(op: Opcode, lhs: &Value, rhs: &Value) -> Result<Value, ErrorKind> {
    match op {
        Opcode::Add => match (lhs, rhs) {
            (Value::Str(a), Value::Str(b)) => {
                check_len(a.len().saturating_add(b.len()))?;
                Ok(Value::Str(Rc::from(format!("{}{}", a, b))))
            }
            (Value::List(a), Value::List(b)) => {
                check_len(a.len().saturating_add(b.len()))?;
                Ok(Value::list(a.iter().chain(b.iter()).cloned().collect()))
            }
            _ => arithmetic("+", lhs, rhs, |a, b| a.checked_add(b).ok_or(ErrorKind::Overflow), |a, b| a + b),
        },
        Opcode::Sub => arithmetic("-", lhs, rhs, |a, b| a.checked_sub(b).ok_or(ErrorKind::Overflow), |a, b| a - b),
        Opcode::Mul => arithmetic("*", lhs, rhs, |a, b| a.checked_mul(b).ok_or(ErrorKind::Overflow), |a, b| a * b),
        Opcode::Div | Opcode::Mod if is_zero(rhs) && compare(lhs, rhs).is_some() => {
            Err(ErrorKind::ZeroDivision)
        }
        Opcode::Div => arithmetic(
            "/",
            lhs,
            rhs,
            |a, b| a.checked_div_euclid(b).ok_or(ErrorKind::Overflow),
            |a, b| a / b,
        ),
        Opcode::Mod => arithmetic(
            "%",
            lhs,
            rhs,
            |a, b| a.checked_rem_euclid(b).ok_or(ErrorKind::Overflow),
            |a, b| a.rem_euclid(b),
        ),
        Opcode::Eq => Ok(Value::Bool(lhs == rhs)),
        Opcode::Ne => Ok(Value::Bool(lhs != rhs)),
        Opcode::Lt | Opcode::Le | Opcode::Gt | Opcode::Ge => {
            let symbol = match op {
                Opcode::Lt => "<",
                Opcode::Le => "<=",
                Opcode::Gt => ">",
                _ => ">=",
            };
            let ordering = compare(lhs, rhs).ok_or_else(|| type_error(symbol, lhs, rhs))?;
            Ok(Value::Bool(match op {
                Opcode::Lt => ordering.is_lt(),
                Opcode::Le => ordering.is_le(),
                Opcode::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        other => Err(ErrorKind::Type(format!("{} is not a binary operation", other))),
    }
}

/// Apply a unary opcode.
pub fn unary(op: Opcode, operand: &Value) -> Result<Value, ErrorKind> {
    match (op, operand) {
        (Opcode::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (Opcode::Neg, Value::Int(i)) => i.checked_neg().map(Value::Int).ok_or(ErrorKind::Overflow),
        (Opcode::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (Opcode::Neg, value) => Err(ErrorKind::Type(format!(
            "bad operand type for unary -: '{}'",
            value.type_name()
        ))),
        (other, _) => Err(ErrorKind::Type(format!("{} is not a unary operation", other))),
    }
}

/// `container[index]` for lists and strings; negative indices count from the end.
pub fn index(container: &Value, index: &Value) -> Result<Value, ErrorKind> {
    let Value::Int(i) = index else {
        return Err(ErrorKind::Type(format!(
            "indices must be integers, not '{}'",
            index.type_name()
        )));
    };
    let resolve = |len: usize| -> Result<usize, ErrorKind> {
        let position = if *i < 0 { len as i64 + i } else { *i };
        if position < 0 || position >= len as i64 {
            Err(ErrorKind::Index { index: *i, len })
        } else {
            Ok(position as usize)
        }
    };
    match container {
        Value::List(items) => Ok(items[resolve(items.len())?].clone()),
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let c = chars[resolve(chars.len())?];
            Ok(Value::Str(Rc::from(c.to_string())))
        }
        other => Err(ErrorKind::Type(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}
