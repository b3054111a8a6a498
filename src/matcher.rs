//! # Matcher
//!
//! Evaluates a [`HasExpression`] against a traveler.
//!
//! Evaluation is pure and never fails: unresolvable paths, failed numeric casts
//! and malformed comparison values all make the condition `false`. Malformed
//! condition values are reported with `tracing::warn!`.
//!
//! ## Absent values
//!
//! When the traveler's value is absent but the condition value is present, every
//! operator yields `false` except `EQ`, `NEQ`, `WITHIN`, `WITHOUT` and `CONTAINS`,
//! which compare structurally (so `NEQ` and `WITHOUT` are `true`).
//!
//! ## Ranges
//!
//! - `INSIDE [a, b]`: `a < val < b`
//! - `OUTSIDE [a, b]`: `val < a || val > b`
//! - `BETWEEN [a, b]`: `a <= val < b`

use crate::expression::{Condition, HasExpression, Operator};
use crate::path;
use crate::traveler::Traveler;
use serde_json::Value;
use tracing::warn;

/// Returns true if `traveler` satisfies `expr`.
///
/// `AND`/`OR` evaluate every child before combining results.
pub fn matches(traveler: &Traveler, expr: &HasExpression) -> bool {
  match expr {
    HasExpression::Condition(cond) => matches_condition(traveler, cond),
    HasExpression::And(children) => {
      let results: Vec<bool> = children.iter().map(|e| matches(traveler, e)).collect();
      results.into_iter().all(|r| r)
    }
    HasExpression::Or(children) => {
      let results: Vec<bool> = children.iter().map(|e| matches(traveler, e)).collect();
      results.into_iter().any(|r| r)
    }
    HasExpression::Not(child) => !matches(traveler, child),
  }
}

/// Returns true if `traveler` satisfies a single condition.
pub fn matches_condition(traveler: &Traveler, cond: &Condition) -> bool {
  let val = path::lookup(traveler, &cond.key);
  let cond_val = match &cond.value {
    Value::String(s) if s.starts_with("$.") => path::lookup(traveler, s),
    Value::Null => None,
    v => Some(v.clone()),
  };

  if val.is_none() && cond_val.is_some() && !handles_absent(cond.condition) {
    return false;
  }

  let val = val.as_ref();
  let cond_val = cond_val.as_ref();

  match cond.condition {
    Operator::Eq => opt_equal(val, cond_val),
    Operator::Neq => !opt_equal(val, cond_val),
    Operator::Gt => compare(val, cond_val, |a, b| a > b),
    Operator::Gte => compare(val, cond_val, |a, b| a >= b),
    Operator::Lt => compare(val, cond_val, |a, b| a < b),
    Operator::Lte => compare(val, cond_val, |a, b| a <= b),
    Operator::Inside => range(val, cond_val, "INSIDE", |v, lo, hi| v > lo && v < hi),
    Operator::Outside => range(val, cond_val, "OUTSIDE", |v, lo, hi| v < lo || v > hi),
    Operator::Between => range(val, cond_val, "BETWEEN", |v, lo, hi| v >= lo && v < hi),
    Operator::Within => member(val, cond_val, "WITHIN"),
    Operator::Without => !member(val, cond_val, "WITHOUT"),
    Operator::Contains => match val {
      Some(Value::Array(items)) => items.iter().any(|v| opt_equal(present(v), cond_val)),
      None => false,
      Some(other) => {
        warn!(value = %other, "CONTAINS expects a list value");
        false
      }
    },
  }
}

/// Operators that define their own result for an absent traveler value.
fn handles_absent(op: Operator) -> bool {
  matches!(
    op,
    Operator::Eq | Operator::Neq | Operator::Within | Operator::Without | Operator::Contains
  )
}

fn compare(val: Option<&Value>, cond_val: Option<&Value>, op: impl Fn(f64, f64) -> bool) -> bool {
  match (to_f64(val), to_f64(cond_val)) {
    (Some(a), Some(b)) => op(a, b),
    _ => false,
  }
}

fn range(
  val: Option<&Value>,
  cond_val: Option<&Value>,
  name: &str,
  op: impl Fn(f64, f64, f64) -> bool,
) -> bool {
  let bounds = match cond_val {
    Some(Value::Array(items)) => items,
    other => {
      warn!(condition = name, value = ?other, "could not cast condition value to a list");
      return false;
    }
  };
  if bounds.len() != 2 {
    warn!(
      condition = name,
      len = bounds.len(),
      "expected a list of length 2 as condition value"
    );
    return false;
  }
  let Some(lower) = to_f64(Some(&bounds[0])) else {
    warn!(condition = name, "could not cast lower bound");
    return false;
  };
  let Some(upper) = to_f64(Some(&bounds[1])) else {
    warn!(condition = name, "could not cast upper bound");
    return false;
  };
  match to_f64(val) {
    Some(v) => op(v, lower, upper),
    None => false,
  }
}

fn member(val: Option<&Value>, cond_val: Option<&Value>, name: &str) -> bool {
  match cond_val {
    Some(Value::Array(items)) => items.iter().any(|v| opt_equal(val, present(v))),
    None => false,
    Some(other) => {
      warn!(condition = name, value = %other, "expected a list as condition value");
      false
    }
  }
}

/// Casts a value to `f64`.
///
/// Numbers cast directly, booleans become 1/0, numeric strings are parsed and an
/// absent value is 0. Anything else fails.
pub fn to_f64(value: Option<&Value>) -> Option<f64> {
  match value {
    None | Some(Value::Null) => Some(0.0),
    Some(Value::Number(n)) => n.as_f64(),
    Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
    Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
    Some(Value::Array(_)) | Some(Value::Object(_)) => None,
  }
}

/// `null` list entries count as absent, like a `null` condition value.
fn present(value: &Value) -> Option<&Value> {
  (!value.is_null()).then_some(value)
}

fn opt_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
  match (a, b) {
    (None, None) => true,
    (Some(a), Some(b)) => values_equal(a, b),
    _ => false,
  }
}

/// Structural equality where numbers compare by value, so `1` equals `1.0`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
      (Some(x), Some(y)) => x == y,
      _ => x == y,
    },
    (Value::Array(xs), Value::Array(ys)) => {
      xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
    }
    (Value::Object(xs), Value::Object(ys)) => {
      xs.len() == ys.len()
        && xs
          .iter()
          .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
    }
    _ => a == b,
  }
}
