//! Server-sent-events parsing for the streamed chat reply.
//!
//! The chat endpoint delivers its reply as an SSE stream (`data:` lines
//! carrying JSON chunks). The parser works over any buffered async reader so
//! tests can feed it in-memory byte slices.

use futures_util::StreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::io::StreamReader;

/// A single parsed SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Optional `event:` field.
    pub event: Option<String>,
    /// Accumulated `data:` payload (multi-line data is joined with `\n`).
    pub data: String,
}

/// Wrap a reqwest response body as a buffered reader for [`read_events`].
pub fn response_reader(response: reqwest::Response) -> impl AsyncBufRead + Unpin {
    let bytes = response
        .bytes_stream()
        .map(|result| result.map_err(std::io::Error::other));
    BufReader::new(StreamReader::new(bytes))
}

/// Read SSE events off `reader`, invoking `on_event` for each one.
///
/// Events are terminated by a blank line; consecutive `data:` lines
/// accumulate. `id:`, `retry:` and comment lines are ignored. A trailing
/// event without a final blank line is still flushed.
pub async fn read_events<R>(
    mut reader: R,
    mut on_event: impl FnMut(SseEvent),
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let mut current_event: Option<String> = None;
    let mut current_data = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let line = line.trim_end_matches(['\r', '\n']);

        if line.is_empty() {
            // Blank line ends the event.
            if !current_data.is_empty() {
                on_event(SseEvent {
                    event: current_event.take(),
                    data: std::mem::take(&mut current_data),
                });
            }
            current_event = None;
            continue;
        }

        if let Some(event_type) = line.strip_prefix("event: ") {
            current_event = Some(event_type.to_string());
        } else if let Some(data) = line.strip_prefix("data: ") {
            if !current_data.is_empty() {
                current_data.push('\n');
            }
            current_data.push_str(data);
        }
        // Other fields (id:, retry:, comments) carry nothing we need.
    }

    if !current_data.is_empty() {
        on_event(SseEvent {
            event: current_event,
            data: current_data,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(input: &str) -> Vec<SseEvent> {
        let mut events = Vec::new();
        read_events(input.as_bytes(), |event| events.push(event))
            .await
            .unwrap();
        events
    }

    #[tokio::test]
    async fn test_single_event() {
        let events = collect("data: {\"a\":1}\n\n").await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"a\":1}");
        assert!(events[0].event.is_none());
    }

    #[tokio::test]
    async fn test_events_split_on_blank_lines() {
        let events = collect("data: one\n\ndata: two\n\ndata: three\n\n").await;
        let data: Vec<&str> = events.iter().map(|e| e.data.as_str()).collect();
        assert_eq!(data, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_multiline_data_accumulates() {
        let events = collect("data: first\ndata: second\n\n").await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "first\nsecond");
    }

    #[tokio::test]
    async fn test_event_field_is_captured() {
        let events = collect("event: delta\ndata: body\n\n").await;
        assert_eq!(events[0].event.as_deref(), Some("delta"));
        assert_eq!(events[0].data, "body");
    }

    #[tokio::test]
    async fn test_ignores_comments_ids_and_retry() {
        let events = collect(": keep-alive\nid: 7\nretry: 100\ndata: real\n\n").await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "real");
    }

    #[tokio::test]
    async fn test_trailing_event_without_blank_line_is_flushed() {
        let events = collect("data: tail").await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "tail");
    }

    #[tokio::test]
    async fn test_crlf_line_endings() {
        let events = collect("data: windows\r\n\r\n").await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "windows");
    }
}
