//! Incremental decoding of SSE-style chat completion streams.
//!
//! The network layer delivers bytes in chunks of arbitrary size; a chunk
//! boundary can land anywhere, including inside a JSON token or halfway
//! through a multi-byte UTF-8 sequence. Records are delimited by `\n`, a
//! one-byte ASCII code that never occurs inside a multi-byte sequence, so
//! buffering raw bytes and splitting on newline keeps partial records and
//! partial characters intact until the rest arrives.

use memchr::memchr;
use tracing::{debug, warn};

use crate::api::ChatResponse;

const DONE_SENTINEL: &str = "[DONE]";

enum RecordOutcome {
    Delta(String),
    Done,
    Skip,
}

/// Turns successive byte chunks into text deltas, in arrival order.
///
/// State is one pending-bytes buffer plus a sentinel flag; the decoder is
/// tied to a single in-flight request and is not restartable.
#[derive(Default)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
    saw_done: bool,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the `[DONE]` sentinel has been seen. The sentinel marks
    /// logical end-of-stream; the transport still decides when byte
    /// delivery actually stops.
    pub fn saw_done(&self) -> bool {
        self.saw_done
    }

    /// Feed one chunk and collect the deltas it completes. An empty chunk
    /// yields nothing; an incomplete trailing record is carried over to the
    /// next call.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut deltas = Vec::new();
        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            let outcome = match std::str::from_utf8(&self.buffer[..newline_pos]) {
                Ok(line) => decode_record(line),
                Err(err) => {
                    warn!(%err, "skipping record with invalid UTF-8");
                    RecordOutcome::Skip
                }
            };
            self.buffer.drain(..=newline_pos);

            match outcome {
                RecordOutcome::Delta(content) => deltas.push(content),
                RecordOutcome::Done => self.saw_done = true,
                RecordOutcome::Skip => {}
            }
        }
        deltas
    }
}

fn decode_record(line: &str) -> RecordOutcome {
    let record = line.trim();
    if record.is_empty() {
        return RecordOutcome::Skip;
    }

    let payload = record
        .strip_prefix("data:")
        .or_else(|| record.strip_prefix("message"))
        .map(str::trim_start)
        .unwrap_or(record);

    if payload == DONE_SENTINEL {
        return RecordOutcome::Done;
    }

    match serde_json::from_str::<ChatResponse>(payload) {
        Ok(response) => {
            if let Some(choice) = response.choices.first() {
                if let Some(content) = &choice.delta.content {
                    if !content.is_empty() {
                        return RecordOutcome::Delta(content.clone());
                    }
                }
            }
            RecordOutcome::Skip
        }
        Err(err) => {
            // Truncated records are routine under chunked delivery;
            // malformed ones get the same treatment.
            debug!(%err, "skipping unparsable record");
            RecordOutcome::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(chunks: &[&str]) -> (Vec<String>, StreamDecoder) {
        let mut decoder = StreamDecoder::new();
        let mut deltas = Vec::new();
        for chunk in chunks {
            deltas.extend(decoder.push_chunk(chunk.as_bytes()));
        }
        (deltas, decoder)
    }

    #[test]
    fn whole_records_decode_in_order() {
        let (deltas, decoder) = decode_all(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n",
            "data: [DONE]\n",
        ]);
        assert_eq!(deltas, vec!["Hel", "lo"]);
        assert!(decoder.saw_done());
    }

    #[test]
    fn framing_prefix_is_optional() {
        let json = r#"{"choices":[{"delta":{"content":"same"}}]}"#;
        for line in [
            format!("data: {json}\n"),
            format!("data:{json}\n"),
            format!("{json}\n"),
            format!("message {json}\n"),
        ] {
            let (deltas, _) = decode_all(&[line.as_str()]);
            assert_eq!(deltas, vec!["same"], "line: {line:?}");
        }
    }

    #[test]
    fn done_sentinel_spacing_variants() {
        for line in ["data: [DONE]\n", "data:[DONE]\n"] {
            let (deltas, decoder) = decode_all(&[line]);
            assert!(deltas.is_empty());
            assert!(decoder.saw_done(), "line: {line:?}");
        }
    }

    #[test]
    fn record_split_across_chunks_is_reassembled() {
        let (deltas, _) = decode_all(&["data: {\"cho", "ices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n"]);
        assert_eq!(deltas, vec!["Hi"]);
    }

    #[test]
    fn multibyte_sequence_split_across_chunks_survives() {
        // "é" is 0xC3 0xA9; the boundary lands between the two bytes.
        let mut decoder = StreamDecoder::new();
        assert!(decoder
            .push_chunk(b"data: {\"choices\":[{\"delta\":{\"content\":\"caf\xC3")
            .is_empty());
        let deltas = decoder.push_chunk(b"\xA9\"}}]}\n");
        assert_eq!(deltas, vec!["café"]);
    }

    #[test]
    fn trailing_incomplete_record_is_retained() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder
            .push_chunk(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}")
            .is_empty());
        assert_eq!(decoder.push_chunk(b"\n"), vec!["a"]);
    }

    #[test]
    fn malformed_json_is_skipped_and_decoding_continues() {
        let (deltas, _) = decode_all(&[
            "data: {not json at all\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n",
        ]);
        assert_eq!(deltas, vec!["ok"]);
    }

    #[test]
    fn unexpected_shape_yields_no_delta() {
        let (deltas, _) = decode_all(&[
            "data: {\"choices\":[]}\n",
            "data: {\"choices\":[{}]}\n",
            "data: {\"object\":\"chat.completion.chunk\"}\n",
        ]);
        assert!(deltas.is_empty());
    }

    #[test]
    fn empty_chunks_and_blank_records_produce_nothing() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder.push_chunk(b"").is_empty());
        assert!(decoder.push_chunk(b"\n\n   \n").is_empty());
    }

    #[test]
    fn decoding_continues_past_the_sentinel() {
        let (deltas, decoder) = decode_all(&[
            "data: [DONE]\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n",
        ]);
        assert_eq!(deltas, vec!["late"]);
        assert!(decoder.saw_done());
    }

    #[test]
    fn only_first_choice_is_used() {
        let (deltas, _) = decode_all(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"kept\"}},{\"delta\":{\"content\":\"dropped\"}}]}\n",
        ]);
        assert_eq!(deltas, vec!["kept"]);
    }

    #[test]
    fn empty_content_is_not_emitted() {
        let (deltas, _) = decode_all(&["data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n"]);
        assert!(deltas.is_empty());
    }

    #[test]
    fn invalid_utf8_record_is_skipped() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder.push_chunk(b"data: \xFF\xFE\n").is_empty());
        let deltas =
            decoder.push_chunk(b"data: {\"choices\":[{\"delta\":{\"content\":\"after\"}}]}\n");
        assert_eq!(deltas, vec!["after"]);
    }

    #[test]
    fn deltas_across_one_chunk_with_many_records() {
        let chunk = "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\
                     data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\
                     data: {\"choices\":[{\"delta\":";
        let mut decoder = StreamDecoder::new();
        assert_eq!(decoder.push_chunk(chunk.as_bytes()), vec!["a", "b"]);
        assert_eq!(decoder.push_chunk(b"{\"content\":\"c\"}}]}\n"), vec!["c"]);
    }
}
