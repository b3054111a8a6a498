//! # Matcher Test Suite
//!
//! Operator truth tables, absent-value handling and boolean combinators.

use crate::element::{DataElement, Element};
use crate::expression::{HasExpression, Operator};
use crate::matcher::{matches, to_f64, values_equal};
use crate::traveler::Traveler;
use serde_json::{Value, json};
use std::sync::Arc;

fn person(age: i64) -> Traveler {
  Traveler::new().with_current(Element::Vertex(
    DataElement::vertex("v1", "Person")
      .with_property("age", age)
      .with_property("name", "alice")
      .with_property("tags", json!(["a", "b"]))
      .with_property("limit", 40),
  ))
}

fn check(t: &Traveler, key: &str, op: Operator, value: Value) -> bool {
  matches(t, &HasExpression::condition(key, op, value))
}

#[test]
fn test_eq_neq() {
  let t = person(30);
  assert!(check(&t, "age", Operator::Eq, json!(30)));
  assert!(check(&t, "age", Operator::Eq, json!(30.0)));
  assert!(!check(&t, "age", Operator::Eq, json!(31)));
  assert!(check(&t, "age", Operator::Neq, json!(31)));
  assert!(!check(&t, "name", Operator::Neq, json!("alice")));
  assert!(check(&t, "_label", Operator::Eq, json!("Person")));
  assert!(check(&t, "_gid", Operator::Eq, json!("v1")));
}

#[test]
fn test_numeric_comparisons() {
  let t = person(30);
  assert!(check(&t, "age", Operator::Gt, json!(29)));
  assert!(!check(&t, "age", Operator::Gt, json!(30)));
  assert!(check(&t, "age", Operator::Gte, json!(30)));
  assert!(!check(&t, "age", Operator::Gte, json!(31)));
  assert!(check(&t, "age", Operator::Lt, json!(31)));
  assert!(!check(&t, "age", Operator::Lt, json!(30)));
  assert!(check(&t, "age", Operator::Lte, json!(30)));
  assert!(!check(&t, "age", Operator::Lte, json!(29)));
  // numeric strings are parsed
  assert!(check(&t, "age", Operator::Gt, json!("29.5")));
  // a failed cast is false, never an error
  assert!(!check(&t, "name", Operator::Gt, json!(1)));
  assert!(!check(&t, "age", Operator::Lt, json!("many")));
}

#[test]
fn test_between_is_half_open() {
  assert!(check(&person(5), "age", Operator::Between, json!([5, 10])));
  assert!(check(&person(9), "age", Operator::Between, json!([5, 10])));
  assert!(!check(&person(10), "age", Operator::Between, json!([5, 10])));
  assert!(!check(&person(4), "age", Operator::Between, json!([5, 10])));
}

#[test]
fn test_inside_is_exclusive() {
  assert!(!check(&person(5), "age", Operator::Inside, json!([5, 10])));
  assert!(check(&person(6), "age", Operator::Inside, json!([5, 10])));
  assert!(!check(&person(10), "age", Operator::Inside, json!([5, 10])));
}

#[test]
fn test_outside() {
  assert!(check(&person(4), "age", Operator::Outside, json!([5, 10])));
  assert!(!check(&person(5), "age", Operator::Outside, json!([5, 10])));
  assert!(!check(&person(10), "age", Operator::Outside, json!([5, 10])));
  assert!(check(&person(11), "age", Operator::Outside, json!([5, 10])));
}

#[test]
fn test_malformed_range_is_false() {
  let t = person(7);
  assert!(!check(&t, "age", Operator::Between, json!(5)));
  assert!(!check(&t, "age", Operator::Between, json!([5])));
  assert!(!check(&t, "age", Operator::Inside, json!(["x", 10])));
}

#[test]
fn test_within_without() {
  let t = person(30);
  assert!(check(&t, "name", Operator::Within, json!(["bob", "alice"])));
  assert!(!check(&t, "name", Operator::Within, json!(["bob"])));
  assert!(check(&t, "name", Operator::Without, json!(["bob"])));
  assert!(!check(&t, "name", Operator::Without, json!(["alice"])));
  assert!(check(&t, "age", Operator::Within, json!([1, 30.0])));
}

#[test]
fn test_without_on_nil_list_is_true() {
  let t = person(30);
  assert!(check(&t, "name", Operator::Without, Value::Null));
  assert!(check(&t, "missing", Operator::Without, Value::Null));
  assert!(!check(&t, "name", Operator::Within, Value::Null));
}

#[test]
fn test_contains() {
  let t = person(30);
  assert!(check(&t, "tags", Operator::Contains, json!("a")));
  assert!(!check(&t, "tags", Operator::Contains, json!("z")));
  // the traveler value must itself be a list
  assert!(!check(&t, "name", Operator::Contains, json!("alice")));
  assert!(!check(&t, "missing", Operator::Contains, json!("a")));
}

#[test]
fn test_absent_value_rule() {
  let t = person(30);
  // every operator outside the exception list is false
  for op in [
    Operator::Gt,
    Operator::Gte,
    Operator::Lt,
    Operator::Lte,
  ] {
    assert!(!check(&t, "missing", op, json!(0)), "{op:?}");
  }
  for op in [Operator::Inside, Operator::Outside, Operator::Between] {
    assert!(!check(&t, "missing", op, json!([-1, 1])), "{op:?}");
  }
  // the exceptions compare structurally
  assert!(!check(&t, "missing", Operator::Eq, json!(0)));
  assert!(check(&t, "missing", Operator::Neq, json!(0)));
  assert!(!check(&t, "missing", Operator::Within, json!([0])));
  assert!(check(&t, "missing", Operator::Without, json!([0])));
}

#[test]
fn test_nil_vs_nil() {
  let t = person(30);
  assert!(check(&t, "missing", Operator::Eq, Value::Null));
  assert!(!check(&t, "missing", Operator::Neq, Value::Null));
  // both sides cast to 0
  assert!(check(&t, "missing", Operator::Gte, Value::Null));
  assert!(!check(&t, "missing", Operator::Gt, Value::Null));
  // null list entries are absent too
  assert!(check(&t, "missing", Operator::Within, json!([null])));
  assert!(check(&t, "missing", Operator::Within, json!(["x", null])));
  assert!(!check(&t, "missing", Operator::Without, json!([null])));
  assert!(!check(&t, "age", Operator::Within, json!([null])));
}

#[test]
fn test_contains_null_entry() {
  let t = Traveler::new().with_current(Element::Vertex(
    DataElement::vertex("v2", "Person").with_property("tags", json!(["a", null])),
  ));
  assert!(check(&t, "tags", Operator::Contains, Value::Null));
  assert!(check(&t, "tags", Operator::Contains, json!("a")));
  assert!(!check(&t, "tags", Operator::Contains, json!("b")));
  assert!(!check(&person(30), "tags", Operator::Contains, Value::Null));
}

#[test]
fn test_present_value_against_nil() {
  let t = person(5);
  assert!(check(&t, "age", Operator::Gt, Value::Null));
  assert!(!check(&t, "age", Operator::Eq, Value::Null));
  assert!(check(&t, "age", Operator::Neq, Value::Null));
}

#[test]
fn test_condition_value_path() {
  let t = person(30);
  assert!(check(&t, "age", Operator::Lt, json!("$.limit")));
  assert!(!check(&t, "age", Operator::Gt, json!("$.limit")));
}

#[test]
fn test_mark_namespace() {
  let v = Arc::new(Element::Vertex(
    DataElement::vertex("v0", "Gene").with_property("symbol", "TP53"),
  ));
  let t = person(30).with_mark("gene", v);
  assert!(check(&t, "$gene.symbol", Operator::Eq, json!("TP53")));
  assert!(check(&t, "$gene._label", Operator::Eq, json!("Gene")));
  assert!(!check(&t, "$other.symbol", Operator::Eq, json!("TP53")));
}

#[test]
fn test_combinators() {
  let t = person(30);
  let yes = HasExpression::eq("name", "alice");
  let no = HasExpression::eq("name", "bob");

  assert!(matches(&t, &HasExpression::and(vec![yes.clone(), yes.clone()])));
  assert!(!matches(&t, &HasExpression::and(vec![yes.clone(), no.clone()])));
  assert!(matches(&t, &HasExpression::or(vec![no.clone(), yes.clone()])));
  assert!(!matches(&t, &HasExpression::or(vec![no.clone(), no.clone()])));
  assert!(matches(&t, &HasExpression::not(no.clone())));
  assert!(!matches(&t, &HasExpression::not(yes)));
  assert!(matches(&t, &HasExpression::and(vec![])));
  assert!(!matches(&t, &HasExpression::or(vec![])));
}

#[test]
fn test_signal_never_matches_data_conditions() {
  let t = Traveler::signal(crate::traveler::Signal {
    id: 1,
    dest: "m".into(),
  });
  assert!(!matches(&t, &HasExpression::eq("_gid", "v1")));
}

#[test]
fn test_evaluation_is_idempotent_and_pure() {
  let t = person(30);
  let before = t.clone();
  let expr = HasExpression::or(vec![
    HasExpression::condition("age", Operator::Between, json!([20, 40])),
    HasExpression::without("name", ["alice"]),
  ]);
  let first = matches(&t, &expr);
  let second = matches(&t, &expr);
  assert_eq!(first, second);
  assert!(first);
  assert_eq!(t, before);
}

#[test]
fn test_expression_json_shape() {
  let expr: HasExpression = serde_json::from_value(json!({
    "and": [
      {"condition": {"key": "_label", "value": "Person", "condition": "EQ"}},
      {"not": {"condition": {"key": "age", "value": [18, 65], "condition": "INSIDE"}}}
    ]
  }))
  .unwrap();
  assert!(matches(&person(70), &expr));
  assert!(!matches(&person(30), &expr));
}

#[test]
fn test_to_f64() {
  assert_eq!(to_f64(None), Some(0.0));
  assert_eq!(to_f64(Some(&json!(true))), Some(1.0));
  assert_eq!(to_f64(Some(&json!(" 2.5 "))), Some(2.5));
  assert_eq!(to_f64(Some(&json!([1]))), None);
  assert!(values_equal(&json!({"a": [1, 2.0]}), &json!({"a": [1.0, 2]})));
  assert!(!values_equal(&json!("1"), &json!(1)));
}
