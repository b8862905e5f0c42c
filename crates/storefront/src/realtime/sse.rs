//! Server-sent event framing.
//!
//! The backend writes `event: <name>` and `data: <json>` lines; a blank line
//! ends the event. Comment lines (`:`) are keep-alives.

use serde_json::Value;

use super::RealtimeError;

/// One named event pushed by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeEvent {
    pub name: String,
    pub data: Value,
}

impl RealtimeEvent {
    /// Integer field of the payload, e.g. `id` or `user_id`.
    #[must_use]
    pub fn field_i64(&self, field: &str) -> Option<i64> {
        self.data.get(field).and_then(Value::as_i64)
    }
}

/// Split a complete event off the front of the buffer.
///
/// Works on bytes so multi-byte characters split across chunks survive.
pub(crate) fn extract_sse_event(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let idx = buffer.windows(2).position(|w| w == b"\n\n")?;
    let event = buffer.drain(..idx + 2).take(idx).collect();
    Some(event)
}

/// Normalize CRLF line endings before framing.
pub(crate) fn push_chunk(buffer: &mut Vec<u8>, chunk: &[u8]) {
    buffer.extend(chunk.iter().copied().filter(|&b| b != b'\r'));
}

/// Largest unterminated event kept while waiting for its blank line.
pub(crate) const MAX_PENDING_BYTES: usize = 64 * 1024;

/// Drop a partial event that has outgrown [`MAX_PENDING_BYTES`].
///
/// Call after every complete event has been extracted.
pub(crate) fn enforce_limit(buffer: &mut Vec<u8>) -> Result<(), RealtimeError> {
    if buffer.len() <= MAX_PENDING_BYTES {
        return Ok(());
    }
    let pending = buffer.len();
    buffer.clear();
    buffer.shrink_to(MAX_PENDING_BYTES);
    Err(RealtimeError::Parse(format!(
        "Event exceeded {MAX_PENDING_BYTES} bytes without a terminator ({pending} buffered)"
    )))
}

/// Parse one framed event. `None` for keep-alives and empty frames.
pub(crate) fn parse_sse_event(raw: &[u8]) -> Option<Result<RealtimeEvent, RealtimeError>> {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text,
        Err(e) => return Some(Err(RealtimeError::Parse(format!("Invalid UTF-8: {e}")))),
    };

    let mut name = None;
    let mut data_lines = Vec::new();
    for line in text.lines() {
        if line.starts_with(':') {
            continue;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => name = Some(value.to_string()),
            "data" => data_lines.push(value),
            _ => {}
        }
    }

    if name.is_none() && data_lines.is_empty() {
        return None;
    }

    let data = if data_lines.is_empty() {
        Value::Null
    } else {
        match serde_json::from_str(&data_lines.join("\n")) {
            Ok(value) => value,
            Err(e) => {
                return Some(Err(RealtimeError::Parse(format!(
                    "Failed to parse event data: {e}"
                ))));
            }
        }
    };

    Some(Ok(RealtimeEvent {
        name: name.unwrap_or_else(|| "message".to_string()),
        data,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_sse_event() {
        let mut buffer = b"event: a\ndata: {}\n\nevent: b\ndata: {}\n\n".to_vec();
        assert_eq!(extract_sse_event(&mut buffer).unwrap(), b"event: a\ndata: {}");
        assert_eq!(extract_sse_event(&mut buffer).unwrap(), b"event: b\ndata: {}");
        assert!(extract_sse_event(&mut buffer).is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_extract_sse_event_incomplete() {
        let mut buffer = b"event: order.created\ndata: {\"id\"".to_vec();
        assert!(extract_sse_event(&mut buffer).is_none());
        assert_eq!(buffer, b"event: order.created\ndata: {\"id\"");
    }

    #[test]
    fn test_oversized_partial_event_is_dropped() {
        let mut buffer = Vec::new();
        push_chunk(&mut buffer, b"event: product.updated\ndata: \"");
        push_chunk(&mut buffer, &vec![b'x'; MAX_PENDING_BYTES]);
        assert!(extract_sse_event(&mut buffer).is_none());

        let err = enforce_limit(&mut buffer).unwrap_err();
        assert!(matches!(err, RealtimeError::Parse(_)));
        assert!(buffer.is_empty());

        push_chunk(&mut buffer, b"event: a\ndata: {}\n\n");
        assert!(enforce_limit(&mut buffer).is_ok());
        assert_eq!(extract_sse_event(&mut buffer).unwrap(), b"event: a\ndata: {}");
    }

    #[test]
    fn test_large_chunk_of_complete_events_is_kept() {
        let mut buffer = Vec::new();
        let frame = b"event: ping\ndata: {}\n\n";
        let chunk: Vec<u8> = frame
            .iter()
            .copied()
            .cycle()
            .take(frame.len() * (MAX_PENDING_BYTES / frame.len() + 10))
            .collect();
        push_chunk(&mut buffer, &chunk);
        let mut framed = 0;
        while extract_sse_event(&mut buffer).is_some() {
            framed += 1;
        }
        assert!(framed > MAX_PENDING_BYTES / frame.len());
        assert!(enforce_limit(&mut buffer).is_ok());
    }

    #[test]
    fn test_crlf_is_normalized() {
        let mut buffer = Vec::new();
        push_chunk(&mut buffer, b"event: x\r\ndata: 1\r\n\r\n");
        let raw = extract_sse_event(&mut buffer).unwrap();
        let event = parse_sse_event(&raw).unwrap().unwrap();
        assert_eq!(event.name, "x");
        assert_eq!(event.data, Value::from(1));
    }

    #[test]
    fn test_parse_named_event_with_payload() {
        let event = parse_sse_event(b"event: order.status.changed\ndata: {\"id\": 42, \"user_id\": 7}")
            .unwrap()
            .unwrap();
        assert_eq!(event.name, "order.status.changed");
        assert_eq!(event.field_i64("id"), Some(42));
        assert_eq!(event.field_i64("user_id"), Some(7));
        assert_eq!(event.field_i64("missing"), None);
    }

    #[test]
    fn test_keep_alive_is_skipped() {
        assert!(parse_sse_event(b": ping").is_none());
        assert!(parse_sse_event(b"").is_none());
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(
            parse_sse_event(b"event: x\ndata: {nope"),
            Some(Err(RealtimeError::Parse(_)))
        ));
    }
}
