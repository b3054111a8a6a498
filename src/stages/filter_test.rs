//! Tests for `has`, `hasKey`, `limit`, `skip`, `range`, `count` and `distinct`.

use crate::element::{DataElement, Element};
use crate::expression::HasExpression;
use crate::mem_graph::MemGraph;
use crate::processor::{GraphHandle, PipelineContext, Processor};
use crate::stages::Stage;
use crate::traveler::{Signal, Traveler};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn person(id: &str, age: i64) -> Traveler {
  Traveler::new().with_current(Element::Vertex(
    DataElement::vertex(id, "Person").with_property("age", age),
  ))
}

fn signal(id: u64) -> Traveler {
  Traveler::signal(Signal {
    id,
    dest: "m".into(),
  })
}

fn ids(out: &[Traveler]) -> Vec<String> {
  out
    .iter()
    .map(|t| match t.get_signal() {
      Some(s) => format!("signal:{}", s.id),
      None => t
        .current()
        .and_then(|e| e.id())
        .unwrap_or_default()
        .to_string(),
    })
    .collect()
}

async fn run_stage(stage: Stage, input: Vec<Traveler>) -> Vec<Traveler> {
  let graph: GraphHandle = Arc::new(MemGraph::new());
  let (in_tx, in_rx) = mpsc::channel(16);
  let (out_tx, mut out_rx) = mpsc::channel(16);
  stage.process(PipelineContext::default(), graph, in_rx, out_tx);
  tokio::spawn(async move {
    for t in input {
      in_tx.send(t).await.unwrap();
    }
  });
  let mut out = Vec::new();
  while let Some(t) = timeout(Duration::from_secs(5), out_rx.recv())
    .await
    .expect("stage did not close its output")
  {
    out.push(t);
  }
  out
}

#[tokio::test]
async fn test_has_filters_and_passes_signals() {
  let out = run_stage(
    Stage::has(HasExpression::gt("age", 30)),
    vec![person("a", 25), signal(1), person("b", 35), person("c", 40)],
  )
  .await;
  assert_eq!(ids(&out), vec!["signal:1", "b", "c"]);
}

#[tokio::test]
async fn test_has_label_and_id() {
  let city = Traveler::new().with_current(Element::Vertex(DataElement::vertex("x", "City")));
  let out = run_stage(
    Stage::has_label(vec!["City".into()]),
    vec![person("a", 1), city.clone()],
  )
  .await;
  assert_eq!(ids(&out), vec!["x"]);

  let out = run_stage(
    Stage::has_id(vec!["a".into(), "x".into()]),
    vec![person("a", 1), person("b", 2), city],
  )
  .await;
  assert_eq!(ids(&out), vec!["a", "x"]);
}

#[test]
fn test_has_step_names() {
  assert_eq!(Stage::has(HasExpression::eq("age", 1)).name(), "Has");
  assert_eq!(Stage::has_label(vec!["City".into()]).name(), "HasLabel");
  assert_eq!(Stage::has_id(vec!["a".into()]).name(), "HasId");
}

#[tokio::test]
async fn test_has_key_requires_every_key() {
  let nameless = Traveler::new().with_current(Element::Vertex(DataElement::vertex("x", "Person")));
  let named = Traveler::new().with_current(Element::Vertex(
    DataElement::vertex("y", "Person")
      .with_property("age", 3)
      .with_property("name", "y"),
  ));
  let out = run_stage(
    Stage::has_key(vec!["age".into()]),
    vec![person("a", 1), nameless.clone(), signal(2), named.clone()],
  )
  .await;
  assert_eq!(ids(&out), vec!["a", "signal:2", "y"]);

  let out = run_stage(
    Stage::has_key(vec!["age".into(), "$.name".into()]),
    vec![person("a", 1), nameless, named],
  )
  .await;
  assert_eq!(ids(&out), vec!["y"]);
}

#[tokio::test]
async fn test_limit_keeps_draining_for_signals() {
  let out = run_stage(
    Stage::limit(2),
    vec![
      person("a", 1),
      person("b", 2),
      person("c", 3),
      signal(4),
      person("d", 4),
      signal(5),
    ],
  )
  .await;
  assert_eq!(ids(&out), vec!["a", "b", "signal:4", "signal:5"]);
}

#[tokio::test]
async fn test_skip() {
  let out = run_stage(
    Stage::skip(2),
    vec![person("a", 1), signal(1), person("b", 2), person("c", 3)],
  )
  .await;
  assert_eq!(ids(&out), vec!["signal:1", "c"]);
}

#[tokio::test]
async fn test_range_window() {
  let input = || {
    vec![
      person("a", 1),
      signal(1),
      person("b", 2),
      person("c", 3),
      person("d", 4),
    ]
  };
  let out = run_stage(Stage::range(1, Some(3)), input()).await;
  assert_eq!(ids(&out), vec!["signal:1", "b", "c"]);

  let out = run_stage(Stage::range(2, None), input()).await;
  assert_eq!(ids(&out), vec!["signal:1", "c", "d"]);

  let out = run_stage(Stage::range(3, Some(3)), input()).await;
  assert_eq!(ids(&out), vec!["signal:1"]);
}

#[tokio::test]
async fn test_count_emits_once_after_close() {
  let out = run_stage(
    Stage::count(),
    vec![person("a", 1), signal(9), person("b", 2), person("c", 3)],
  )
  .await;
  assert_eq!(out.len(), 2);
  assert_eq!(out[0].get_signal().map(|s| s.id), Some(9));
  assert_eq!(
    out[1].current().map(|e| e.to_document()),
    Some(json!(3))
  );
}

#[tokio::test]
async fn test_count_of_nothing_is_zero() {
  let out = run_stage(Stage::count(), vec![]).await;
  assert_eq!(out.len(), 1);
  assert_eq!(out[0].current().map(|e| e.to_document()), Some(json!(0)));
}

#[tokio::test]
async fn test_distinct_on_paths() {
  let out = run_stage(
    Stage::distinct(vec!["age".into()]),
    vec![person("a", 1), person("b", 1), person("c", 2), signal(1)],
  )
  .await;
  assert_eq!(ids(&out), vec!["a", "c", "signal:1"]);
}

#[tokio::test]
async fn test_distinct_defaults_to_element_id() {
  let out = run_stage(
    Stage::distinct(vec![]),
    vec![person("a", 1), person("a", 2), person("b", 1)],
  )
  .await;
  assert_eq!(ids(&out), vec!["a", "b"]);
}

#[tokio::test]
async fn test_cancelled_stage_closes_output() {
  let graph: GraphHandle = Arc::new(MemGraph::new());
  let ctx = PipelineContext::default();
  let (_in_tx, in_rx) = mpsc::channel::<Traveler>(1);
  let (out_tx, mut out_rx) = mpsc::channel(1);
  Stage::limit(10).process(ctx.clone(), graph, in_rx, out_tx);
  ctx.cancel_token().cancel();
  let end = timeout(Duration::from_secs(5), out_rx.recv()).await.unwrap();
  assert!(end.is_none());
}
