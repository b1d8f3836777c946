//! Row-wise evaluation of a bound expression tree.
//!
//! Null operands make the whole result null. Int arithmetic is checked;
//! division always yields a float. Dates accept `+`/`-` with an int (days)
//! and `-` with another date (days between).

use std::cmp::Ordering;

use chrono::{Days, NaiveDate};
use tabflow_model::Value;

use super::ast::{BinaryOp, Expr};
use crate::error::EvaluationError;

type EvalResult = Result<Value, EvaluationError>;

pub fn evaluate(expr: &Expr, inputs: &[Value]) -> EvalResult {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Field { name, slot } => slot
            .and_then(|slot| inputs.get(slot))
            .cloned()
            .ok_or_else(|| EvaluationError::UnknownField(name.clone())),
        Expr::Negate(inner) => negate(evaluate(inner, inputs)?),
        Expr::Binary { op, left, right } => {
            let left = evaluate(left, inputs)?;
            let right = evaluate(right, inputs)?;
            binary(*op, left, right)
        }
    }
}

fn negate(value: Value) -> EvalResult {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Int(v) => v.checked_neg().map(Value::Int).ok_or(EvaluationError::Overflow),
        Value::Float(v) => Ok(Value::Float(-v)),
        other => Err(EvaluationError::InvalidNegation(other.type_name())),
    }
}

fn mismatch(op: BinaryOp, left: &Value, right: &Value) -> EvaluationError {
    EvaluationError::TypeMismatch {
        op: op.symbol(),
        left: left.type_name(),
        right: right.type_name(),
    }
}

fn finite(v: f64) -> EvalResult {
    if v.is_finite() {
        Ok(Value::Float(v))
    } else {
        Err(EvaluationError::Overflow)
    }
}

fn shift_days(date: NaiveDate, days: i64) -> EvalResult {
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.map(Value::Date).ok_or(EvaluationError::Overflow)
}

fn binary(op: BinaryOp, left: Value, right: Value) -> EvalResult {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => subtract(left, right),
        BinaryOp::Mul => match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => {
                a.checked_mul(*b).map(Value::Int).ok_or(EvaluationError::Overflow)
            }
            _ => match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => finite(a * b),
                _ => Err(mismatch(op, &left, &right)),
            },
        },
        BinaryOp::Div => match (left.as_f64(), right.as_f64()) {
            (Some(_), Some(b)) if b == 0.0 => Err(EvaluationError::DivisionByZero),
            (Some(a), Some(b)) => finite(a / b),
            _ => Err(mismatch(op, &left, &right)),
        },
        BinaryOp::Concat => Ok(Value::Str(format!("{left}{right}"))),
        BinaryOp::Eq => Ok(Value::Bool(
            compare(&left, &right).is_some_and(Ordering::is_eq),
        )),
        BinaryOp::NotEq => Ok(Value::Bool(
            !compare(&left, &right).is_some_and(Ordering::is_eq),
        )),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(&left, &right).ok_or_else(|| mismatch(op, &left, &right))?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
    }
}

fn add(left: Value, right: Value) -> EvalResult {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => {
            a.checked_add(*b).map(Value::Int).ok_or(EvaluationError::Overflow)
        }
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
        (Value::Date(date), Value::Int(days)) | (Value::Int(days), Value::Date(date)) => {
            shift_days(*date, *days)
        }
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => finite(a + b),
            _ => Err(mismatch(BinaryOp::Add, &left, &right)),
        },
    }
}

fn subtract(left: Value, right: Value) -> EvalResult {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => {
            a.checked_sub(*b).map(Value::Int).ok_or(EvaluationError::Overflow)
        }
        (Value::Date(date), Value::Int(days)) => match days.checked_neg() {
            Some(days) => shift_days(*date, days),
            None => Err(EvaluationError::Overflow),
        },
        (Value::Date(a), Value::Date(b)) => Ok(Value::Int((*a - *b).num_days())),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => finite(a - b),
            _ => Err(mismatch(BinaryOp::Sub, &left, &right)),
        },
    }
}

/// Ordering of two non-null values, or `None` if they are not comparable.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(op: BinaryOp, left: Value, right: Value) -> EvalResult {
        binary(op, left, right)
    }

    fn date(y: i32, m: u32, d: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_int_arithmetic() {
        assert_eq!(eval(BinaryOp::Add, Value::Int(1), Value::Int(4)), Ok(Value::Int(5)));
        assert_eq!(eval(BinaryOp::Mul, Value::Int(3), Value::Float(0.5)), Ok(Value::Float(1.5)));
        assert_eq!(eval(BinaryOp::Div, Value::Int(1), Value::Int(4)), Ok(Value::Float(0.25)));
        assert_eq!(
            eval(BinaryOp::Add, Value::Int(i64::MAX), Value::Int(1)),
            Err(EvaluationError::Overflow)
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            eval(BinaryOp::Div, Value::Int(1), Value::Int(0)),
            Err(EvaluationError::DivisionByZero)
        );
        assert_eq!(
            eval(BinaryOp::Div, Value::Float(1.0), Value::Float(0.0)),
            Err(EvaluationError::DivisionByZero)
        );
    }

    #[test]
    fn test_null_propagates() {
        assert_eq!(eval(BinaryOp::Div, Value::Null, Value::Int(0)), Ok(Value::Null));
        assert_eq!(eval(BinaryOp::Eq, Value::Int(1), Value::Null), Ok(Value::Null));
        assert_eq!(negate(Value::Null), Ok(Value::Null));
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            eval(BinaryOp::Add, Value::from("ab"), Value::from("cd")),
            Ok(Value::from("abcd"))
        );
        assert_eq!(
            eval(BinaryOp::Concat, Value::from("n="), Value::Int(3)),
            Ok(Value::from("n=3"))
        );
        assert_eq!(
            eval(BinaryOp::Mul, Value::from("ab"), Value::Int(2)),
            Err(EvaluationError::TypeMismatch {
                op: "*",
                left: "str",
                right: "int"
            })
        );
    }

    #[test]
    fn test_dates() {
        assert_eq!(eval(BinaryOp::Add, date(2024, 1, 31), Value::Int(1)), Ok(date(2024, 2, 1)));
        assert_eq!(eval(BinaryOp::Sub, date(2024, 3, 1), Value::Int(1)), Ok(date(2024, 2, 29)));
        assert_eq!(eval(BinaryOp::Sub, date(2024, 3, 1), date(2024, 2, 1)), Ok(Value::Int(29)));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval(BinaryOp::Lt, Value::Int(1), Value::Float(1.5)), Ok(Value::Bool(true)));
        assert_eq!(eval(BinaryOp::Eq, Value::from("a"), Value::from("a")), Ok(Value::Bool(true)));
        assert_eq!(eval(BinaryOp::Eq, Value::from("1"), Value::Int(1)), Ok(Value::Bool(false)));
        assert_eq!(eval(BinaryOp::NotEq, Value::from("1"), Value::Int(1)), Ok(Value::Bool(true)));
        assert!(eval(BinaryOp::Gt, Value::from("1"), Value::Int(1)).is_err());
    }
}
