//! Line decoding for child process pipes.
//!
//! A pipe is exposed as a lazy stream of UTF-8 lines. End of data simply ends
//! the stream. Lines that are not valid UTF-8 are dropped and reading carries
//! on with the next line.

use futures::stream::{self, Stream, StreamExt};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use super::types::{OutputEvent, StreamKind};

/// Turn a byte pipe into a stream of decoded lines.
///
/// Terminators (`\n` or `\r\n`) are stripped. A trailing line without a
/// terminator is still yielded. A read error ends the stream.
pub fn decoded_lines<R>(reader: R, kind: StreamKind) -> impl Stream<Item = String>
where
    R: AsyncRead + Unpin,
{
    stream::unfold(BufReader::new(reader), move |mut reader| async move {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => return None,
                Ok(_) => {
                    strip_terminator(&mut buf);
                    match String::from_utf8(std::mem::take(&mut buf)) {
                        Ok(line) => return Some((line, reader)),
                        Err(e) => {
                            debug!("Dropping undecodable {} line: {}", kind, e);
                        }
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!("Read error on {}, closing stream: {}", kind, e);
                    return None;
                }
            }
        }
    })
}

/// Drain `reader` line by line into `sink`, tagging each line with `kind`.
///
/// Returns once the pipe is closed or the receiving side is gone.
pub async fn pump_lines<R>(reader: R, kind: StreamKind, sink: UnboundedSender<OutputEvent>)
where
    R: AsyncRead + Unpin,
{
    let lines = decoded_lines(reader, kind);
    tokio::pin!(lines);

    let mut count = 0usize;
    while let Some(line) = lines.next().await {
        count += 1;
        if sink.send(OutputEvent { stream: kind, line }).is_err() {
            debug!("{} receiver dropped, stopping reader", kind);
            break;
        }
    }
    debug!("{} reader finished after {} lines", kind, count);
}

fn strip_terminator(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(input: &[u8]) -> Vec<String> {
        decoded_lines(input, StreamKind::Stdout).collect().await
    }

    #[tokio::test]
    async fn test_splits_lines_in_order() {
        assert_eq!(collect(b"a\nb\nc\n").await, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_strips_crlf() {
        assert_eq!(collect(b"one\r\ntwo\r\n").await, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_keeps_unterminated_last_line() {
        assert_eq!(collect(b"first\nlast").await, vec!["first", "last"]);
    }

    #[tokio::test]
    async fn test_keeps_blank_lines() {
        assert_eq!(collect(b"a\n\nb\n").await, vec!["a", "", "b"]);
    }

    #[tokio::test]
    async fn test_empty_input_yields_nothing() {
        assert!(collect(b"").await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_dropped() {
        let input = b"good\n\xFF\xFE\xFD\nafter\n";
        assert_eq!(collect(input).await, vec!["good", "after"]);
    }

    #[tokio::test]
    async fn test_lone_carriage_return_is_kept() {
        // Only a CR directly before LF is part of the terminator
        assert_eq!(collect(b"progress\r50%\n").await, vec!["progress\r50%"]);
    }

    #[tokio::test]
    async fn test_pump_tags_stream_kind() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        pump_lines(&b"oops\nbad\n"[..], StreamKind::Stderr, tx).await;

        let mut events = Vec::new();
        while let Some(ev) = rx.recv().await {
            events.push(ev);
        }
        assert_eq!(events, vec![OutputEvent::stderr("oops"), OutputEvent::stderr("bad")]);
    }
}
