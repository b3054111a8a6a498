//! # Has-Expressions
//!
//! The predicate tree used by `Has` filters and `Jump` guards.
//!
//! Expressions serialize in the query's JSON shape:
//!
//! ```json
//! {"and": [
//!   {"condition": {"key": "_label", "value": "Person", "condition": "EQ"}},
//!   {"not": {"condition": {"key": "age", "value": [18, 65], "condition": "INSIDE"}}}
//! ]}
//! ```
//!
//! Evaluation lives in [`crate::matcher`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operator of a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
  /// Structural equality.
  Eq,
  /// Structural inequality.
  Neq,
  /// Numeric `>`.
  Gt,
  /// Numeric `>=`.
  Gte,
  /// Numeric `<`.
  Lt,
  /// Numeric `<=`.
  Lte,
  /// `lower < val < upper`.
  Inside,
  /// `val < lower || val > upper`.
  Outside,
  /// `lower <= val < upper`.
  Between,
  /// `val` is a member of the condition list.
  Within,
  /// `val` is not a member of the condition list.
  Without,
  /// `val` is a list containing the condition value.
  Contains,
}

/// Leaf of a [`HasExpression`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
  /// Path resolved against the traveler, e.g. `age` or `$person.name`.
  pub key: String,
  /// Literal to compare against. A string starting with `$.` is resolved against
  /// the traveler's current element instead.
  #[serde(default)]
  pub value: Value,
  /// Comparison operator.
  pub condition: Operator,
}

/// Boolean predicate tree over a traveler's bound data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HasExpression {
  /// A single comparison.
  Condition(Condition),
  /// True when every child is true. Empty is true.
  And(Vec<HasExpression>),
  /// True when at least one child is true. Empty is false.
  Or(Vec<HasExpression>),
  /// Negation of the child.
  Not(Box<HasExpression>),
}

#[allow(clippy::should_implement_trait)]
impl HasExpression {
  /// Builds a condition leaf.
  pub fn condition(key: impl Into<String>, condition: Operator, value: impl Into<Value>) -> Self {
    HasExpression::Condition(Condition {
      key: key.into(),
      value: value.into(),
      condition,
    })
  }

  /// `key == value`
  pub fn eq(key: impl Into<String>, value: impl Into<Value>) -> Self {
    Self::condition(key, Operator::Eq, value)
  }

  /// `key != value`
  pub fn neq(key: impl Into<String>, value: impl Into<Value>) -> Self {
    Self::condition(key, Operator::Neq, value)
  }

  /// `key > value`
  pub fn gt(key: impl Into<String>, value: impl Into<Value>) -> Self {
    Self::condition(key, Operator::Gt, value)
  }

  /// `key < value`
  pub fn lt(key: impl Into<String>, value: impl Into<Value>) -> Self {
    Self::condition(key, Operator::Lt, value)
  }

  /// `key` is one of `values`.
  pub fn within<V: Into<Value>>(key: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
    let list: Vec<Value> = values.into_iter().map(Into::into).collect();
    Self::condition(key, Operator::Within, Value::Array(list))
  }

  /// `key` is none of `values`.
  pub fn without<V: Into<Value>>(
    key: impl Into<String>,
    values: impl IntoIterator<Item = V>,
  ) -> Self {
    let list: Vec<Value> = values.into_iter().map(Into::into).collect();
    Self::condition(key, Operator::Without, Value::Array(list))
  }

  /// Conjunction.
  pub fn and(children: Vec<HasExpression>) -> Self {
    HasExpression::And(children)
  }

  /// Disjunction.
  pub fn or(children: Vec<HasExpression>) -> Self {
    HasExpression::Or(children)
  }

  /// Negation.
  pub fn not(child: HasExpression) -> Self {
    HasExpression::Not(Box::new(child))
  }
}
