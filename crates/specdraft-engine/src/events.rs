use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use specdraft_common::Result;

/// One line of the NDJSON output stream. This enum is the wire contract:
/// variant tags and field names are what consumers parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputEvent {
    Reasoning {
        content: String,
    },
    Content {
        content: String,
    },
    Usage {
        input_tokens: u64,
        output_tokens: u64,
        total_tokens: u64,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
    /// Chat mode only: whether the turn's concatenated content reads as a
    /// complete structured document.
    Metadata {
        is_full_document: bool,
    },
}

impl OutputEvent {
    pub fn usage(input_tokens: u64, output_tokens: u64) -> Self {
        OutputEvent::Usage {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }
}

/// Encodes one event as a JSON object plus trailing newline. Non-ASCII
/// characters are escaped to `\uXXXX` sequences; downstream consumers
/// rely on ASCII-safe lines, so this is part of the wire contract.
pub fn encode_event(event: &OutputEvent) -> Result<String> {
    let raw = serde_json::to_string(event)?;
    let mut line = String::with_capacity(raw.len() + 1);
    for ch in raw.chars() {
        if ch.is_ascii() {
            line.push(ch);
        } else {
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                // Infallible: writing into a String cannot fail.
                let _ = write!(line, "\\u{unit:04x}");
            }
        }
    }
    line.push('\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_their_type_tag() {
        let line = encode_event(&OutputEvent::Content {
            content: "Hello".to_string(),
        })
        .unwrap();
        assert_eq!(line, "{\"type\":\"content\",\"content\":\"Hello\"}\n");
    }

    #[test]
    fn usage_totals_inputs_and_outputs() {
        let line = encode_event(&OutputEvent::usage(10, 5)).unwrap();
        assert_eq!(
            line,
            "{\"type\":\"usage\",\"input_tokens\":10,\"output_tokens\":5,\"total_tokens\":15}\n"
        );
    }

    #[test]
    fn error_code_is_omitted_when_absent() {
        let line = encode_event(&OutputEvent::Error {
            message: "Upstream model error".to_string(),
            code: None,
        })
        .unwrap();
        assert!(!line.contains("code"));

        let line = encode_event(&OutputEvent::Error {
            message: "bad".to_string(),
            code: Some("ERR".to_string()),
        })
        .unwrap();
        assert!(line.contains("\"code\":\"ERR\""));
    }

    #[test]
    fn non_ascii_is_escaped_to_utf16_units() {
        let line = encode_event(&OutputEvent::Content {
            content: "需求".to_string(),
        })
        .unwrap();
        assert_eq!(line, "{\"type\":\"content\",\"content\":\"\\u9700\\u6c42\"}\n");
        assert!(line.is_ascii());
    }

    #[test]
    fn astral_characters_become_surrogate_pairs() {
        let line = encode_event(&OutputEvent::Content {
            content: "ok 🎉".to_string(),
        })
        .unwrap();
        assert_eq!(line, "{\"type\":\"content\",\"content\":\"ok \\ud83c\\udf89\"}\n");
    }

    #[test]
    fn lines_round_trip_through_serde() {
        let event = OutputEvent::Metadata {
            is_full_document: true,
        };
        let line = encode_event(&event).unwrap();
        let parsed: OutputEvent = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed, event);
    }
}
