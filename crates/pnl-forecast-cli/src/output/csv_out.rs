use serde_json::{Map, Value};
use std::io;

/// Write output as CSV to stdout.
///
/// The first tabular field found in the result decides the rows: monthly
/// records, then quarters, then scenario points (one row per scenario and
/// step). Results with nothing tabular fall back to field/value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Object(map) => {
            if let Some(Value::Array(records)) = map.get("records") {
                write_array_csv(&mut wtr, records);
            } else if let Some(Value::Array(quarters)) = map.get("quarters") {
                write_array_csv(&mut wtr, quarters);
            } else if let Some(Value::Array(scenarios)) = map.get("scenarios") {
                write_scenario_points(&mut wtr, scenarios);
            } else if let Some(Value::Array(sections)) = map.get("sections") {
                write_array_csv(&mut wtr, sections);
            } else {
                write_fields(&mut wtr, map);
            }
        }
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_csv_value(result)]);
        }
    }

    let _ = wtr.flush();
}

fn write_fields(wtr: &mut csv::Writer<io::StdoutLock<'_>>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
    }
}

fn write_scenario_points(wtr: &mut csv::Writer<io::StdoutLock<'_>>, scenarios: &[Value]) {
    let mut rows: Vec<Map<String, Value>> = Vec::new();
    for scenario in scenarios {
        let name = scenario.get("scenario").cloned().unwrap_or(Value::Null);
        if let Some(Value::Array(points)) = scenario.get("points") {
            for point in points {
                if let Value::Object(fields) = point {
                    let mut row = Map::new();
                    row.insert("scenario".to_string(), name.clone());
                    row.extend(fields.clone());
                    rows.push(row);
                }
            }
        }
    }
    let rows: Vec<Value> = rows.into_iter().map(Value::Object).collect();
    write_array_csv(wtr, &rows);
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
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
