//! Tests for path lookup and template rendering.

use crate::element::{DataElement, Element};
use crate::path::{exists, lookup, render, split_namespace};
use crate::traveler::{Signal, Traveler};
use serde_json::{Value, json};
use std::sync::Arc;

fn traveler() -> Traveler {
  let gene = Arc::new(Element::Vertex(
    DataElement::vertex("g1", "Gene")
      .with_property("symbol", "TP53")
      .with_property("aliases", json!(["p53", "LFS1"])),
  ));
  Traveler::new()
    .with_current(Element::Edge(
      DataElement::edge("e1", "encodes", "g1", "p1")
        .with_property("score", 0.5)
        .with_property("nested", json!({"deep": {"list": [1, 2, 3]}, "nothing": null})),
    ))
    .with_mark("gene", gene)
}

#[test]
fn test_split_namespace() {
  assert_eq!(split_namespace("a.b"), ("_current", vec!["a", "b"]));
  assert_eq!(split_namespace("$x"), ("x", vec![]));
  assert_eq!(split_namespace("$x.a"), ("x", vec!["a"]));
  assert_eq!(split_namespace("$_current.a"), ("_current", vec!["a"]));
  assert_eq!(split_namespace("$"), ("_current", vec![]));
}

#[test]
fn test_lookup_current() {
  let t = traveler();
  assert_eq!(lookup(&t, "score"), Some(json!(0.5)));
  assert_eq!(lookup(&t, "$.score"), Some(json!(0.5)));
  assert_eq!(lookup(&t, "_gid"), Some(json!("e1")));
  assert_eq!(lookup(&t, "_from"), Some(json!("g1")));
  assert_eq!(lookup(&t, "_to"), Some(json!("p1")));
  assert_eq!(lookup(&t, "_label"), Some(json!("encodes")));
}

#[test]
fn test_lookup_nested_and_indexed() {
  let t = traveler();
  assert_eq!(lookup(&t, "nested.deep.list.1"), Some(json!(2)));
  assert_eq!(lookup(&t, "nested.deep.list[2]"), Some(json!(3)));
  assert_eq!(lookup(&t, "nested.deep.list[9]"), None);
  assert_eq!(lookup(&t, "$gene.aliases[0]"), Some(json!("p53")));
}

#[test]
fn test_lookup_mark() {
  let t = traveler();
  assert_eq!(lookup(&t, "$gene.symbol"), Some(json!("TP53")));
  let whole = lookup(&t, "$gene").unwrap();
  assert_eq!(whole["_gid"], json!("g1"));
  // vertices have no endpoints
  assert_eq!(lookup(&t, "$gene._from"), None);
}

#[test]
fn test_missing_paths_are_absent() {
  let t = traveler();
  assert_eq!(lookup(&t, "nope"), None);
  assert_eq!(lookup(&t, "score.deeper"), None);
  assert_eq!(lookup(&t, "$missing.symbol"), None);
  assert_eq!(lookup(&t, "nested.nothing"), None);
  assert!(!exists(&t, "nested.nothing"));
  assert!(exists(&t, "nested.deep"));
}

#[test]
fn test_empty_and_signal_travelers() {
  assert_eq!(lookup(&Traveler::new(), "a"), None);
  let s = Traveler::signal(Signal {
    id: 1,
    dest: "m".into(),
  });
  assert_eq!(lookup(&s, "$"), None);
  assert_eq!(render(&s, &json!({"a": "a"})), json!({"a": null}));
}

#[test]
fn test_lookup_on_values() {
  let t = Traveler::new().with_current(Element::Value(json!({"a": {"b": 1}})));
  assert_eq!(lookup(&t, "a.b"), Some(json!(1)));
  let c = Traveler::new().with_current(Element::Count(4));
  assert_eq!(lookup(&c, "$"), Some(json!(4)));
}

#[test]
fn test_render() {
  let t = traveler();
  let out = render(
    &t,
    &json!({
      "edge": "_gid",
      "gene": "$gene.symbol",
      "pair": ["_from", "_to"],
      "missing": "nope",
      "literal": 7
    }),
  );
  assert_eq!(
    out,
    json!({
      "edge": "e1",
      "gene": "TP53",
      "pair": ["g1", "p1"],
      "missing": null,
      "literal": null
    })
  );
  assert_eq!(render(&t, &json!("$gene._label")), json!("Gene"));
  assert_eq!(render(&t, &Value::Bool(true)), Value::Null);
}
