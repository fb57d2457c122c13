use serde_json::Value;
use std::io;

/// Write output as CSV to stdout.
///
/// Calculation results emit one row per applied rule; anything else falls
/// back to two-column field/value records.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Object(map) => {
            if let Some(Value::Array(applied)) = map.get("applied_rules") {
                if !applied.is_empty() {
                    write_applied_rules(&mut wtr, applied);
                    let _ = wtr.flush();
                    return;
                }
            }
            let _ = wtr.write_record(["field", "value"]);
            for (key, val) in map {
                let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
            }
        }
        other => {
            let _ = wtr.write_record([&format_csv_value(other)]);
        }
    }

    let _ = wtr.flush();
}

fn write_applied_rules(wtr: &mut csv::Writer<io::StdoutLock<'_>>, applied: &[Value]) {
    let _ = wtr.write_record([
        "rule_id",
        "rule_type",
        "scope",
        "priority",
        "calculated_amount",
        "applied_amount",
        "capped_by_min",
        "capped_by_max",
    ]);
    for item in applied {
        if let Value::Object(map) = item {
            let eval = item.get("evaluation");
            let get_eval = |key: &str| {
                eval.and_then(|e| e.get(key))
                    .map(format_csv_value)
                    .unwrap_or_default()
            };
            let _ = wtr.write_record([
                map.get("rule_id").map(format_csv_value).unwrap_or_default(),
                map.get("rule_type").map(format_csv_value).unwrap_or_default(),
                map.get("scope").map(format_csv_value).unwrap_or_default(),
                map.get("priority").map(format_csv_value).unwrap_or_default(),
                get_eval("calculated_amount"),
                get_eval("applied_amount"),
                get_eval("capped_by_min"),
                get_eval("capped_by_max"),
            ]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
