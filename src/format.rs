use serde_json::{json, Map, Value};

/// One log record as received from the host framework, borrowed for the
/// duration of formatting.
pub struct LogRecord<'a> {
    pub level: &'a str,
    pub message: &'a str,
    pub meta: &'a Map<String, Value>,
}

/// Caller-supplied replacement for the built-in renderings.
pub type MessageFormatter = Box<dyn Fn(&LogRecord<'_>) -> String + Send + Sync>;

/// Strategy for turning a [`LogRecord`] into the wire-ready message string.
pub enum MessageFormat {
    /// `<level> - <message> - <pretty-printed meta>` (the default).
    Text,
    /// A JSON object with `level`, `msg`, and `meta` keys.
    Json,
    /// The formatter's return value, verbatim.
    Custom(MessageFormatter),
}

impl Default for MessageFormat {
    fn default() -> Self {
        MessageFormat::Text
    }
}

impl MessageFormat {
    /// Renders a record. Deterministic for identical inputs; a panicking
    /// custom formatter propagates to the caller.
    pub fn format(&self, record: &LogRecord<'_>) -> String {
        match self {
            MessageFormat::Json => json!({
                "level": record.level,
                "msg": record.message,
                "meta": record.meta,
            })
            .to_string(),
            MessageFormat::Custom(formatter) => formatter(record),
            MessageFormat::Text => {
                let meta = serde_json::to_string_pretty(record.meta)
                    .unwrap_or_else(|_| "{}".to_string());
                format!("{} - {} - {}", record.level, record.message, meta)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(entries: &[(&str, &str)]) -> Map<String, Value> {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
            .collect()
    }

    #[test]
    fn json_mode_round_trips() {
        let meta = meta(&[("key", "value")]);
        let record = LogRecord {
            level: "level",
            message: "message",
            meta: &meta,
        };

        let rendered = MessageFormat::Json.format(&record);
        let parsed: Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(parsed["level"], "level");
        assert_eq!(parsed["msg"], "message");
        assert_eq!(parsed["meta"]["key"], "value");
    }

    #[test]
    fn text_mode_pretty_prints_meta() {
        let meta = meta(&[("key", "value")]);
        let record = LogRecord {
            level: "level",
            message: "message",
            meta: &meta,
        };

        let rendered = MessageFormat::Text.format(&record);

        assert_eq!(rendered, "level - message - {\n  \"key\": \"value\"\n}");
    }

    #[test]
    fn text_mode_renders_empty_meta_as_empty_object() {
        let meta = Map::new();
        let record = LogRecord {
            level: "level",
            message: "message",
            meta: &meta,
        };

        let rendered = MessageFormat::Text.format(&record);

        assert_eq!(rendered, "level - message - {}");
    }

    #[test]
    fn custom_formatter_output_is_used_verbatim() {
        let meta = meta(&[("key", "value")]);
        let record = LogRecord {
            level: "level",
            message: "message",
            meta: &meta,
        };
        let format = MessageFormat::Custom(Box::new(|_| "custom formatted log message".to_string()));

        assert_eq!(format.format(&record), "custom formatted log message");
    }

    #[test]
    fn format_is_deterministic() {
        let meta = meta(&[("b", "2"), ("a", "1")]);
        let record = LogRecord {
            level: "info",
            message: "msg",
            meta: &meta,
        };

        assert_eq!(
            MessageFormat::Json.format(&record),
            MessageFormat::Json.format(&record)
        );
        assert_eq!(
            MessageFormat::Text.format(&record),
            MessageFormat::Text.format(&record)
        );
    }
}
