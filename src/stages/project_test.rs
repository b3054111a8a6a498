//! Tests for `fields` and `unwind`.

use crate::element::{DataElement, Element};
use crate::mem_graph::MemGraph;
use crate::processor::{GraphHandle, PipelineContext, Processor};
use crate::stages::Stage;
use crate::traveler::{Signal, Traveler};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

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

fn gene() -> Traveler {
  Traveler::new().with_current(Element::Vertex(
    DataElement::vertex("g1", "Gene")
      .with_property("symbol", "TP53")
      .with_property("chrom", 17)
      .with_property("aliases", json!(["p53", "LFS1"]))
      .with_property("loc", json!({"start": 100, "end": 200})),
  ))
}

fn docs(out: &[Traveler]) -> Vec<Value> {
  out
    .iter()
    .map(|t| t.current().map(|e| e.to_document()).unwrap_or(Value::Null))
    .collect()
}

#[tokio::test]
async fn test_fields_keeps_listed_keys() {
  let out = run_stage(
    Stage::fields(vec!["symbol".into(), "$.loc.start".into(), "_gid".into()]),
    vec![gene()],
  )
  .await;
  let doc = &docs(&out)[0];
  assert_eq!(doc["_gid"], "g1");
  assert_eq!(doc["_label"], "Gene");
  assert_eq!(doc["symbol"], "TP53");
  assert_eq!(doc["loc"], json!({"start": 100}));
  assert!(doc.get("chrom").is_none());
  assert!(doc.get("aliases").is_none());
}

#[tokio::test]
async fn test_fields_excludes_and_includes() {
  let out = run_stage(
    Stage::fields(vec!["-aliases".into(), "-loc.end".into()]),
    vec![gene()],
  )
  .await;
  let doc = &docs(&out)[0];
  assert_eq!(doc["symbol"], "TP53");
  assert_eq!(doc["chrom"], 17);
  assert_eq!(doc["loc"], json!({"start": 100}));
  assert!(doc.get("aliases").is_none());

  // kept keys win over dropped ones
  let out = run_stage(
    Stage::fields(vec!["-chrom".into(), "symbol".into()]),
    vec![gene()],
  )
  .await;
  let doc = &docs(&out)[0];
  assert_eq!(doc["symbol"], "TP53");
  assert!(doc.get("chrom").is_none());
  assert!(doc.get("loc").is_none());
}

#[tokio::test]
async fn test_fields_passthrough_cases() {
  let count = Traveler::new().with_current(Element::Count(3));
  let sig = Traveler::signal(Signal {
    id: 4,
    dest: "m".into(),
  });
  let out = run_stage(
    Stage::fields(vec!["symbol".into()]),
    vec![sig, count],
  )
  .await;
  assert_eq!(out.len(), 2);
  assert_eq!(out[0].get_signal().map(|s| s.id), Some(4));
  assert_eq!(docs(&out)[1], json!(3));

  let out = run_stage(Stage::fields(vec![]), vec![gene()]).await;
  assert_eq!(docs(&out)[0]["chrom"], 17);

  // mark paths are ignored, leaving only the reserved keys
  let out = run_stage(Stage::fields(vec!["$other.symbol".into(), "symbol".into()]), vec![gene()]).await;
  assert_eq!(docs(&out)[0]["symbol"], "TP53");
}

#[tokio::test]
async fn test_fields_keeps_marks() {
  let start = gene();
  let marked = start.with_mark("g", Arc::clone(start.current().unwrap()));
  let out = run_stage(Stage::fields(vec!["symbol".into()]), vec![marked]).await;
  let kept = out[0].mark("g").map(|e| e.to_document()).unwrap();
  assert_eq!(kept["chrom"], 17);
}

#[tokio::test]
async fn test_unwind_fans_out_lists() {
  let out = run_stage(Stage::unwind("aliases"), vec![gene()]).await;
  let aliases: Vec<Value> = docs(&out).iter().map(|d| d["aliases"].clone()).collect();
  assert_eq!(aliases, vec![json!("p53"), json!("LFS1")]);
  assert!(docs(&out).iter().all(|d| d["_gid"] == "g1" && d["chrom"] == 17));
}

#[tokio::test]
async fn test_unwind_edge_cases() {
  let empty = Traveler::new().with_current(Element::Vertex(
    DataElement::vertex("e", "Gene").with_property("aliases", json!([])),
  ));
  let sig = Traveler::signal(Signal {
    id: 1,
    dest: "m".into(),
  });
  let out = run_stage(Stage::unwind("$.aliases"), vec![empty, sig]).await;
  assert_eq!(out.len(), 2);
  assert_eq!(docs(&out)[0]["aliases"], Value::Null);
  assert!(out[1].is_signal());

  // scalars and missing fields pass through
  let out = run_stage(Stage::unwind("symbol"), vec![gene()]).await;
  assert_eq!(docs(&out)[0]["symbol"], "TP53");
  let out = run_stage(Stage::unwind("nothing"), vec![gene()]).await;
  assert_eq!(out.len(), 1);
}

#[tokio::test]
async fn test_unwind_nested_field() {
  let v = Traveler::new().with_current(Element::Vertex(
    DataElement::vertex("v", "Sample").with_property("info", json!({"ids": [1, 2, 3]})),
  ));
  let out = run_stage(Stage::unwind("info.ids"), vec![v]).await;
  let ids: Vec<Value> = docs(&out).iter().map(|d| d["info"]["ids"].clone()).collect();
  assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
}
