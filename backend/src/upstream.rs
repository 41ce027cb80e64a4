use serde_json::Value;

/// Pulls a human readable message out of an upstream error body. Understands
/// `{"detail": ..}`, `{"error": ..}`, `{"error": {"message": ..}}` and `{"title": ..}`.
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);

    field("detail")
        .or_else(|| field("error"))
        .or_else(|| {
            value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .or_else(|| field("title"))
        .filter(|message| !message.trim().is_empty())
}
