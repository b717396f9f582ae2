//! Functions available in every namespace.

use crate::runtime::error::ErrorKind;
use crate::runtime::value::{check_len, Value};
use itertools::Itertools;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Len,
    Str,
    Repr,
    Int,
    Push,
    Range,
    Type,
}

const ALL: [Builtin; 8] = [
    Builtin::Print,
    Builtin::Len,
    Builtin::Str,
    Builtin::Repr,
    Builtin::Int,
    Builtin::Push,
    Builtin::Range,
    Builtin::Type,
];

impl Builtin {
    pub fn lookup(name: &str) -> Option<Builtin> {
        ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Len => "len",
            Builtin::Str => "str",
            Builtin::Repr => "repr",
            Builtin::Int => "int",
            Builtin::Push => "push",
            Builtin::Range => "range",
            Builtin::Type => "type",
        }
    }

    fn expect_args(self, args: &[Value], expected: usize) -> Result<(), ErrorKind> {
        if args.len() != expected {
            return Err(ErrorKind::Arity {
                name: self.name().to_string(),
                expected,
                given: args.len(),
            });
        }
        Ok(())
    }

    pub fn call(self, args: Vec<Value>, out: &mut dyn Write) -> Result<Value, ErrorKind> {
        match self {
            Builtin::Print => {
                writeln!(out, "{}", args.iter().join(" "))?;
                Ok(Value::Nil)
            }
            Builtin::Len => {
                self.expect_args(&args, 1)?;
                match &args[0] {
                    Value::List(items) => Ok(Value::Int(items.len() as i64)),
                    Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                    other => Err(ErrorKind::Type(format!(
                        "object of type '{}' has no len()",
                        other.type_name()
                    ))),
                }
            }
            Builtin::Str => {
                self.expect_args(&args, 1)?;
                Ok(Value::str(&args[0].to_string()))
            }
            Builtin::Repr => {
                self.expect_args(&args, 1)?;
                Ok(Value::str(&args[0].repr()))
            }
            Builtin::Int => {
                self.expect_args(&args, 1)?;
                match &args[0] {
                    Value::Int(i) => Ok(Value::Int(*i)),
                    Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
                    Value::Float(x) if x.is_finite() => Ok(Value::Int(x.trunc() as i64)),
                    Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                        ErrorKind::Type(format!("invalid literal for int(): {:?}", &**s))
                    }),
                    other => Err(ErrorKind::Type(format!(
                        "int() argument must be a string or a number, not '{}'",
                        other.type_name()
                    ))),
                }
            }
            Builtin::Push => {
                self.expect_args(&args, 2)?;
                let Value::List(items) = &args[0] else {
                    return Err(ErrorKind::Type(format!(
                        "push() expects a list, not '{}'",
                        args[0].type_name()
                    )));
                };
                check_len(items.len().saturating_add(1))?;
                let mut extended = items.to_vec();
                extended.push(args[1].clone());
                Ok(Value::list(extended))
            }
            Builtin::Range => {
                let (start, stop) = match args.as_slice() {
                    [Value::Int(stop)] => (0, *stop),
                    [Value::Int(start), Value::Int(stop)] => (*start, *stop),
                    [_] | [_, _] => {
                        return Err(ErrorKind::Type("range() expects integers".to_string()))
                    }
                    _ => {
                        return Err(ErrorKind::Arity {
                            name: self.name().to_string(),
                            expected: 2,
                            given: args.len(),
                        })
                    }
                };
                let span = (i128::from(stop) - i128::from(start)).max(0);
                check_len(usize::try_from(span).unwrap_or(usize::MAX))?;
                Ok(Value::list((start..stop).map(Value::Int).collect()))
            }
            Builtin::Type => {
                self.expect_args(&args, 1)?;
                Ok(Value::str(args[0].type_name()))
            }
        }
    }
}
