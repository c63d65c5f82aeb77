//! LD+JSON extraction from HTML

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static LD_JSON_SCRIPT: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
});

/// Parse every LD+JSON script block in `html`. Blocks that are not valid
/// JSON are skipped.
pub fn extract_ld_json(html: &str) -> Vec<Value> {
    let pattern = match LD_JSON_SCRIPT.as_ref() {
        Ok(pattern) => pattern,
        Err(e) => {
            tracing::error!(error = %e, "LD+JSON pattern failed to compile");
            return Vec::new();
        }
    };

    pattern
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .filter_map(|body| match serde_json::from_str(body.as_str().trim()) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unparseable LD+JSON block");
                None
            }
        })
        .collect()
}

/// Flatten LD+JSON blocks into the nodes whose `@type` names an event,
/// in document order.
pub fn extract_event_nodes(blocks: Vec<Value>) -> Vec<Value> {
    let mut nodes = Vec::new();
    for block in blocks {
        collect_events(block, &mut nodes);
    }
    nodes
}

fn collect_events(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_events(item, out);
            }
        }
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                collect_events(graph, out);
            }
            let value = Value::Object(map);
            if is_event(&value) {
                out.push(value);
            }
        }
        _ => {}
    }
}

fn is_event(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => t.ends_with("Event"),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| t.ends_with("Event")),
        _ => false,
    }
}
