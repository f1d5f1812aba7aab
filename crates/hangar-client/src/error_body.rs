use serde_json::Value;

/// Extract a human readable message from a Hangar error response.
///
/// Hangar reports validation problems as a `fieldErrors` array of objects
/// carrying an `errorMsg`. A single entry yields its message, several are
/// numbered as `(1) first (2) second`. Without field errors the `message`
/// field is used, then `error`. Anything else falls back to `reason`, the
/// HTTP reason phrase.
pub fn parse_error_message(body: &str, reason: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return reason.to_string();
    };

    if let Some(errors) = value.get("fieldErrors").and_then(Value::as_array) {
        let messages: Vec<&str> = errors
            .iter()
            .filter_map(|e| e.get("errorMsg").and_then(Value::as_str))
            .collect();
        match messages.as_slice() {
            [] => {}
            [single] => return (*single).to_string(),
            many => {
                return many
                    .iter()
                    .enumerate()
                    .map(|(i, msg)| format!("({}) {}", i + 1, msg))
                    .collect::<Vec<_>>()
                    .join(" ");
            }
        }
    }

    for field in ["message", "error"] {
        if let Some(msg) = value.get(field).and_then(Value::as_str)
            && !msg.is_empty()
        {
            return msg.to_string();
        }
    }

    reason.to_string()
}
