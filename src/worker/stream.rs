use serde::Deserialize;

/// Events from the worker's stream-json output format
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    #[serde(rename = "assistant")]
    Assistant {
        message: AssistantMessage,
        #[serde(default)]
        session_id: String,
    },

    #[serde(rename = "user")]
    User {},

    #[serde(rename = "result")]
    Result {
        #[serde(default)]
        subtype: String,
        #[serde(default)]
        result: Option<String>,
        #[serde(default)]
        is_error: bool,
        #[serde(default)]
        usage: Option<Usage>,
    },

    #[serde(rename = "system")]
    System {
        #[serde(default)]
        subtype: String,
    },
}

#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// What a stream-json transcript boiled down to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutput {
    /// Final `result` text, or the concatenated assistant text without one
    pub text: String,
    /// Reported usage, if the result event carried any
    pub tokens: Option<u64>,
    pub is_error: bool,
}

/// Decode a stream-json transcript.
///
/// Returns `None` when no line parses as a stream event, so the caller can
/// treat stdout as plain text.
pub fn parse_stream_output(stdout: &str) -> Option<StreamOutput> {
    let mut seen_event = false;
    let mut accumulated = String::new();
    let mut final_result: Option<String> = None;
    let mut tokens = None;
    let mut is_error = false;

    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(event) = serde_json::from_str::<StreamEvent>(line) else {
            continue;
        };
        seen_event = true;
        match event {
            StreamEvent::Assistant { message, .. } => {
                for block in message.content {
                    if let ContentBlock::Text { text } = block {
                        accumulated.push_str(&text);
                        accumulated.push('\n');
                    }
                }
            }
            StreamEvent::Result {
                result,
                is_error: err,
                usage,
                ..
            } => {
                final_result = result;
                is_error = err;
                tokens = usage.map(|u| u.total());
            }
            StreamEvent::User { .. } | StreamEvent::System { .. } => {}
        }
    }

    if !seen_event {
        return None;
    }
    Some(StreamOutput {
        text: final_result.unwrap_or(accumulated),
        tokens,
        is_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assistant_text() {
        let json = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"Hello world"}]},"session_id":"abc"}"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();

        if let StreamEvent::Assistant { message, .. } = event {
            if let ContentBlock::Text { text } = &message.content[0] {
                assert_eq!(text, "Hello world");
            } else {
                panic!("Expected Text");
            }
        } else {
            panic!("Expected Assistant event");
        }
    }

    #[test]
    fn test_tool_use_blocks_are_tolerated() {
        let json = r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"Read","input":{},"id":"1"}]}}"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, StreamEvent::Assistant { .. }));
    }

    #[test]
    fn test_result_text_and_usage_win() {
        let stdout = [
            r#"{"type":"system","subtype":"init"}"#,
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"thinking"}]}}"#,
            r#"{"type":"result","subtype":"success","result":"final answer","is_error":false,"usage":{"input_tokens":120,"output_tokens":30}}"#,
        ]
        .join("\n");

        let out = parse_stream_output(&stdout).unwrap();
        assert_eq!(out.text, "final answer");
        assert_eq!(out.tokens, Some(150));
        assert!(!out.is_error);
    }

    #[test]
    fn test_assistant_text_used_without_result() {
        let stdout = [
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"part one"}]}}"#,
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"part two"}]}}"#,
        ]
        .join("\n");

        let out = parse_stream_output(&stdout).unwrap();
        assert_eq!(out.text, "part one\npart two\n");
        assert_eq!(out.tokens, None);
    }

    #[test]
    fn test_plain_text_is_not_a_stream() {
        assert!(parse_stream_output("just some output\nwith lines").is_none());
        assert!(parse_stream_output("").is_none());
    }
}
