use serde_json::Value;
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate.
///
/// Calculation results render as a summary table followed by a per-rule
/// breakdown when applied rules are present.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(value);
            }
        }
        _ => {
            println!("{}", value);
        }
    }
}

fn print_result_table(result: &Value, envelope: &serde_json::Map<String, Value>) {
    if let Value::Object(res_map) = result {
        // Summary: every scalar field of the result.
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in res_map {
            if key == "applied_rules" || key == "tier_breakdown" {
                continue;
            }
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        println!("{}", Table::from(builder));

        if let Some(Value::Array(applied)) = res_map.get("applied_rules") {
            if !applied.is_empty() {
                println!("\nApplied rules:");
                print_applied_rules(applied);
            }
        }
        if let Some(Value::Array(tiers)) = res_map.get("tier_breakdown") {
            if !tiers.is_empty() {
                println!("\nTier breakdown:");
                print_records(tiers);
            }
        }
    } else {
        print_flat_object(&Value::Object(envelope.clone()));
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// One row per applied rule, with the evaluation flattened into columns.
fn print_applied_rules(applied: &[Value]) {
    let mut builder = Builder::default();
    builder.push_record([
        "rule_id",
        "rule_type",
        "scope",
        "priority",
        "calculated",
        "applied",
        "capped",
    ]);
    for item in applied {
        if let Value::Object(map) = item {
            let eval = map.get("evaluation").and_then(|v| v.as_object());
            let get_eval = |key: &str| {
                eval.and_then(|e| e.get(key))
                    .map(format_value)
                    .unwrap_or_default()
            };
            let capped = match (
                eval.and_then(|e| e.get("capped_by_min")).and_then(Value::as_bool),
                eval.and_then(|e| e.get("capped_by_max")).and_then(Value::as_bool),
            ) {
                (Some(true), _) => "min",
                (_, Some(true)) => "max",
                _ => "-",
            };
            builder.push_record([
                map.get("rule_id").map(format_value).unwrap_or_default(),
                map.get("rule_type").map(format_value).unwrap_or_default(),
                map.get("scope").map(format_value).unwrap_or_default(),
                map.get("priority").map(format_value).unwrap_or_default(),
                get_eval("calculated_amount"),
                get_eval("applied_amount"),
                capped.to_string(),
            ]);
        }
    }
    println!("{}", Table::from(builder));
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        println!("{}", Table::from(builder));
    }
}

fn print_records(arr: &[Value]) {
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);
        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }
        println!("{}", Table::from(builder));
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
