//! Batch framer (C2): emits exactly one record to a byte sink and flushes.
//!
//! Canonical byte order (MUST match for any implementation — clients parse
//! line-by-line):
//!   `{"cursor":{"partition":"<P>","offset":"<O>"}`
//!   [`,"events":[<E1>,<E2>,...]`]
//!   `}\n`
//!
//! Event bytes are written verbatim: the framer never validates or
//! re-serializes them, the producer is responsible for each element
//! already being valid JSON.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::model::Cursor;

#[async_trait::async_trait]
pub trait BatchFramer: Send + Sync {
    /// Writes one batch record and flushes. Returns the number of bytes
    /// written, for the caller's bytes-flushed counter.
    async fn write_batch<W>(&self, sink: &mut W, cursor: &Cursor, events: &[String]) -> std::io::Result<usize>
    where
        W: AsyncWrite + Unpin + Send;
}

/// Writes the canonical byte sequence straight to the sink, piece by piece.
/// Used when `SEND_BATCH_VIA_OUTPUT_STREAM` is enabled (§4.5).
pub struct DirectBatchFramer;

#[async_trait::async_trait]
impl BatchFramer for DirectBatchFramer {
    async fn write_batch<W>(&self, sink: &mut W, cursor: &Cursor, events: &[String]) -> std::io::Result<usize>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut written = 0usize;

        written += write_str(sink, "{\"cursor\":{\"partition\":\"").await?;
        written += write_str(sink, &cursor.partition).await?;
        written += write_str(sink, "\",\"offset\":\"").await?;
        written += write_str(sink, &cursor.offset).await?;
        written += write_str(sink, "\"}").await?;

        if !events.is_empty() {
            written += write_str(sink, ",\"events\":[").await?;
            for (i, event) in events.iter().enumerate() {
                if i > 0 {
                    written += write_str(sink, ",").await?;
                }
                written += write_str(sink, event).await?;
            }
            written += write_str(sink, "]").await?;
        }

        written += write_str(sink, "}\n").await?;
        sink.flush().await?;
        Ok(written)
    }
}

/// Assembles the record as a `String` first, then writes it in one shot.
/// Used when `SEND_BATCH_VIA_OUTPUT_STREAM` is disabled. MUST produce
/// byte-identical output to `DirectBatchFramer` for the same input (§8).
pub struct StringBatchFramer;

impl StringBatchFramer {
    fn render(cursor: &Cursor, events: &[String]) -> String {
        let mut out = String::with_capacity(64 + events.iter().map(|e| e.len() + 1).sum::<usize>());
        out.push_str("{\"cursor\":{\"partition\":\"");
        out.push_str(&cursor.partition);
        out.push_str("\",\"offset\":\"");
        out.push_str(&cursor.offset);
        out.push_str("\"}");

        if !events.is_empty() {
            out.push_str(",\"events\":[");
            for (i, event) in events.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(event);
            }
            out.push(']');
        }

        out.push_str("}\n");
        out
    }
}

#[async_trait::async_trait]
impl BatchFramer for StringBatchFramer {
    async fn write_batch<W>(&self, sink: &mut W, cursor: &Cursor, events: &[String]) -> std::io::Result<usize>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let record = Self::render(cursor, events);
        sink.write_all(record.as_bytes()).await?;
        sink.flush().await?;
        Ok(record.len())
    }
}

async fn write_str<W: AsyncWrite + Unpin>(sink: &mut W, s: &str) -> std::io::Result<usize> {
    sink.write_all(s.as_bytes()).await?;
    Ok(s.len())
}

/// Runtime choice between the two framers, selected once per connection
/// from the `SEND_BATCH_VIA_OUTPUT_STREAM` toggle. A plain enum instead of
/// `dyn BatchFramer` because `write_batch` is generic over the sink type
/// and generic methods aren't object-safe.
#[derive(Debug, Clone, Copy)]
pub enum FramerKind {
    Direct,
    ViaString,
}

impl FramerKind {
    pub fn from_toggle(send_via_output_stream: bool) -> Self {
        if send_via_output_stream {
            FramerKind::Direct
        } else {
            FramerKind::ViaString
        }
    }

    pub async fn write_batch<W>(&self, sink: &mut W, cursor: &Cursor, events: &[String]) -> std::io::Result<usize>
    where
        W: AsyncWrite + Unpin + Send,
    {
        match self {
            FramerKind::Direct => DirectBatchFramer.write_batch(sink, cursor, events).await,
            FramerKind::ViaString => StringBatchFramer.write_batch(sink, cursor, events).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor() -> Cursor {
        Cursor { partition: "0".to_string(), offset: "000".to_string() }
    }

    #[tokio::test]
    async fn keep_alive_omits_events_key() {
        let mut buf = Vec::new();
        let bytes = DirectBatchFramer.write_batch(&mut buf, &cursor(), &[]).await.unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "{\"cursor\":{\"partition\":\"0\",\"offset\":\"000\"}}\n");
        assert_eq!(bytes, text.len());
    }

    #[tokio::test]
    async fn single_event_has_no_trailing_comma() {
        let mut buf = Vec::new();
        DirectBatchFramer
            .write_batch(&mut buf, &cursor(), &["{\"a\":1}".to_string()])
            .await
            .unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "{\"cursor\":{\"partition\":\"0\",\"offset\":\"000\"},\"events\":[{\"a\":1}]}\n"
        );
    }

    #[tokio::test]
    async fn multiple_events_are_comma_separated() {
        let mut buf = Vec::new();
        let events = vec!["{\"a\":1}".to_string(), "{\"a\":2}".to_string(), "{\"a\":3}".to_string()];
        DirectBatchFramer.write_batch(&mut buf, &cursor(), &events).await.unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "{\"cursor\":{\"partition\":\"0\",\"offset\":\"000\"},\"events\":[{\"a\":1},{\"a\":2},{\"a\":3}]}\n"
        );
    }

    #[tokio::test]
    async fn no_embedded_newline_besides_the_terminator() {
        let mut buf = Vec::new();
        let events = vec!["{\"a\":1}".to_string(), "{\"a\":2}".to_string()];
        DirectBatchFramer.write_batch(&mut buf, &cursor(), &events).await.unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.matches('\n').count(), 1);
        assert!(text.ends_with('\n'));
    }

    #[tokio::test]
    async fn direct_and_string_framers_are_byte_identical() {
        let scenarios: Vec<Vec<String>> = vec![
            vec![],
            vec!["{\"a\":1}".to_string()],
            vec!["{\"a\":1}".to_string(), "{\"a\":2}".to_string(), "{\"a\":3}".to_string()],
        ];

        for events in scenarios {
            let mut direct = Vec::new();
            let mut via_string = Vec::new();
            DirectBatchFramer.write_batch(&mut direct, &cursor(), &events).await.unwrap();
            StringBatchFramer.write_batch(&mut via_string, &cursor(), &events).await.unwrap();
            assert_eq!(direct, via_string);
        }
    }
}
