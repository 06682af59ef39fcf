//! Minimal server-sent-events reader for streaming completions.
//!
//! Only `data:` fields matter to the vendors we talk to; `event:`, `id:` and
//! comment lines are dropped. The OpenAI `[DONE]` sentinel is filtered out.

use futures::{Stream, StreamExt};

use crate::provider::ProviderError;

const DONE: &str = "[DONE]";

/// Incremental decoder: feed raw bytes, get complete event payloads back.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            self.line(line.trim_end_matches(|c| c == '\n' || c == '\r'), &mut events);
        }
        events
    }

    /// Flush whatever is left once the body ends.
    pub(crate) fn finish(&mut self) -> Option<String> {
        let mut events = Vec::new();
        if !self.buf.is_empty() {
            let raw = std::mem::take(&mut self.buf);
            let line = String::from_utf8_lossy(&raw).into_owned();
            self.line(line.trim_end_matches('\r'), &mut events);
        }
        self.line("", &mut events);
        events.pop()
    }

    fn line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            if !self.data.is_empty() {
                events.push(self.data.join("\n"));
                self.data.clear();
            }
            return;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            self.data.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
    }
}

/// Turn a streaming HTTP response into its sequence of `data:` payloads.
pub(crate) fn data_events(
    provider: &'static str,
    response: reqwest::Response,
) -> impl Stream<Item = Result<String, ProviderError>> + Send + 'static {
    async_stream::stream! {
        let mut bytes = response.bytes_stream();
        let mut decoder = SseDecoder::default();
        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => {
                    for event in decoder.push(&chunk) {
                        if event != DONE {
                            yield Ok(event);
                        }
                    }
                }
                Err(e) => {
                    yield Err(ProviderError::transport(provider, e));
                    return;
                }
            }
        }
        if let Some(event) = decoder.finish() {
            if event != DONE {
                yield Ok(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_split_across_chunks() {
        let mut d = SseDecoder::default();
        assert!(d.push(b"data: {\"a\":").is_empty());
        assert!(d.push(b"1}\r\n").is_empty());
        assert_eq!(d.push(b"\r\ndata: two\n\n"), vec!["{\"a\":1}", "two"]);
    }

    #[test]
    fn non_data_fields_are_ignored() {
        let mut d = SseDecoder::default();
        let out = d.push(b": keep-alive\nevent: message\nid: 7\ndata: x\n\n");
        assert_eq!(out, vec!["x"]);
    }

    #[test]
    fn multi_line_data_joins_with_newline() {
        let mut d = SseDecoder::default();
        assert_eq!(d.push(b"data: a\ndata: b\n\n"), vec!["a\nb"]);
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut d = SseDecoder::default();
        assert!(d.push(b"data: tail").is_empty());
        assert_eq!(d.finish().as_deref(), Some("tail"));
        assert_eq!(d.finish(), None);
    }
}
