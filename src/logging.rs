//! Structured JSON logging for the headless lab runner.
//!
//! One JSON object per line on stdout, ordered by a process-wide sequence
//! counter so interleaved task output stays reconstructible.

use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

/// Emit a structured log line for `module` with extra `fields`.
pub fn json_log(module: &str, mut fields: Map<String, Value>) {
    fields.insert("ts".to_string(), json!(Utc::now().to_rfc3339()));
    fields.insert("seq".to_string(), json!(next_seq()));
    fields.insert("module".to_string(), Value::String(module.to_string()));
    println!("{}", Value::Object(fields));
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}
