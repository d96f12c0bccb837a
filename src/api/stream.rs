use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use super::types::{strip_error_prefix, ApiError, ERROR_PREFIX};

/// Incremental UTF-8 decoder for a chunked body.
///
/// An incomplete multi-byte sequence at the end of a chunk is held back and
/// completed by the next chunk. Invalid bytes decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut decoded = String::new();
        let mut rest: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    decoded.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, tail) = rest.split_at(e.valid_up_to());
                    decoded.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(bad) => {
                            decoded.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[bad..];
                        }
                        // Truncated sequence: wait for the next chunk.
                        None => {
                            rest = tail;
                            break;
                        }
                    }
                }
            }
        }

        let consumed = self.pending.len() - rest.len();
        self.pending.drain(..consumed);
        decoded
    }

    /// End of input. A sequence still waiting for its continuation bytes
    /// becomes a single replacement character.
    pub fn flush(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// What a reply chunk does to the displayed message list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyUpdate {
    /// First text of the reply: append a new agent message with this content.
    Started(String),
    /// Full text so far: replace the content of the agent message in place.
    Updated(String),
    /// Stream ended normally with this final text.
    Finished(String),
    /// Stream failed; any partial agent message has to go.
    Failed(String),
}

/// Per-request stream state: decoder carry-over, the accumulated text, how
/// much of it has been shown, and whether the placeholder has already been
/// replaced by a message.
///
/// The backend reports generation failures in-band once the 200 has already
/// been sent, by appending a final `data: ERROR: ...` line to the body. Text
/// from a marker onwards, or a trailing partial marker, is held back until it
/// is either followed by more reply text or the stream ends.
#[derive(Debug, Default)]
pub struct ReplyIngestor {
    decoder: Utf8StreamDecoder,
    buffer: String,
    /// Bytes of `buffer` already reported.
    shown: usize,
    /// Markers before this offset turned out to be ordinary reply text.
    scan_from: usize,
    placeholder_replaced: bool,
}

impl ReplyIngestor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The text reported so far.
    pub fn text(&self) -> &str {
        &self.buffer[..self.shown]
    }

    /// Feed one body chunk. Returns `None` when the chunk adds no visible
    /// text, e.g. when it only carried the start of a split character or of
    /// a possible error marker.
    pub fn push(&mut self, chunk: &[u8]) -> Option<ReplyUpdate> {
        let text = self.decoder.decode(chunk);
        if text.is_empty() {
            return None;
        }
        self.buffer.push_str(&text);
        let held = self.held_from();
        self.reveal(held)
    }

    /// End of stream. Yields `Failed` if the body ended on an error line,
    /// otherwise any update for held-back text followed by `Finished`.
    pub fn finish(&mut self) -> Vec<ReplyUpdate> {
        if self.decoder.has_pending() {
            tracing::debug!("Reply ended inside a multi-byte sequence");
        }
        let tail = self.decoder.flush();
        self.buffer.push_str(&tail);
        let held = self.held_from();

        let mut updates = Vec::new();
        match strip_error_prefix(&self.buffer[held..]) {
            Some(message) => updates.push(ReplyUpdate::Failed(message.to_string())),
            None => {
                updates.extend(self.reveal(self.buffer.len()));
                updates.push(ReplyUpdate::Finished(self.buffer.clone()));
            }
        }

        self.buffer.clear();
        self.shown = 0;
        self.scan_from = 0;
        self.placeholder_replaced = false;
        updates
    }

    /// Offset from which the buffer may still turn out to be an error line.
    fn held_from(&mut self) -> usize {
        while let Some(offset) = self.buffer[self.scan_from..].find(ERROR_PREFIX) {
            let start = self.scan_from + offset;
            let after = &self.buffer[start + ERROR_PREFIX.len()..];
            let followed_by_text = after
                .find('\n')
                .is_some_and(|nl| !after[nl..].trim().is_empty());
            if !followed_by_text {
                return start;
            }
            self.scan_from = start + ERROR_PREFIX.len();
        }

        // The marker is ASCII, so a matching suffix starts on a char boundary.
        let tail = &self.buffer[self.scan_from..];
        let partial = (1..ERROR_PREFIX.len())
            .rev()
            .find(|&n| tail.ends_with(&ERROR_PREFIX[..n]))
            .unwrap_or(0);
        self.buffer.len() - partial
    }

    fn reveal(&mut self, upto: usize) -> Option<ReplyUpdate> {
        if upto <= self.shown {
            return None;
        }
        self.shown = upto;
        let visible = self.buffer[..upto].to_string();
        if self.placeholder_replaced {
            Some(ReplyUpdate::Updated(visible))
        } else {
            self.placeholder_replaced = true;
            Some(ReplyUpdate::Started(visible))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Completed(String),
    Failed(String),
    Cancelled,
}

/// Read `body` to the end, reporting every visible change through `on_update`.
///
/// Cancellation stops reading without a final update; the caller has already
/// moved on and the response is dropped with the stream.
pub async fn ingest_reply<S, F>(mut body: S, cancel: CancellationToken, mut on_update: F) -> IngestOutcome
where
    S: Stream<Item = Result<Bytes, ApiError>> + Unpin,
    F: FnMut(ReplyUpdate),
{
    let mut ingestor = ReplyIngestor::new();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Reply stream cancelled after {} bytes of text", ingestor.text().len());
                return IngestOutcome::Cancelled;
            }
            chunk = body.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                if let Some(update) = ingestor.push(&bytes) {
                    on_update(update);
                }
            }
            Some(Err(e)) => {
                tracing::warn!("Reply stream broke off: {}", e);
                let message = e.to_string();
                on_update(ReplyUpdate::Failed(message.clone()));
                return IngestOutcome::Failed(message);
            }
            None => {
                let mut outcome = IngestOutcome::Completed(String::new());
                for update in ingestor.finish() {
                    outcome = match &update {
                        ReplyUpdate::Failed(m) => IngestOutcome::Failed(m.clone()),
                        ReplyUpdate::Finished(text) => IngestOutcome::Completed(text.clone()),
                        _ => outcome,
                    };
                    on_update(update);
                }
                return outcome;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&[u8]]) -> impl Stream<Item = Result<Bytes, ApiError>> + Unpin {
        let items: Vec<Result<Bytes, ApiError>> =
            parts.iter().map(|p| Ok(Bytes::copy_from_slice(p))).collect();
        futures::stream::iter(items)
    }

    async fn collect(parts: &[&[u8]]) -> (IngestOutcome, Vec<ReplyUpdate>) {
        let mut updates = Vec::new();
        let outcome = ingest_reply(chunks(parts), CancellationToken::new(), |u| updates.push(u)).await;
        (outcome, updates)
    }

    #[test]
    fn test_decoder_carries_split_character() {
        let mut decoder = Utf8StreamDecoder::new();
        let euro = "€".as_bytes();
        assert_eq!(decoder.decode(&euro[..1]), "");
        assert!(decoder.has_pending());
        assert_eq!(decoder.decode(&euro[1..2]), "");
        assert_eq!(decoder.decode(&[euro[2], b'5']), "€5");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(&[b'a', 0xFF, b'b']), "a\u{FFFD}b");
    }

    #[test]
    fn test_decoder_flushes_dangling_sequence() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(&[b'x', 0xE2, 0x82]), "x");
        assert_eq!(decoder.flush(), "\u{FFFD}");
        assert_eq!(decoder.flush(), "");
    }

    #[test]
    fn test_ingestor_starts_once_then_updates() {
        let mut ingestor = ReplyIngestor::new();
        assert_eq!(ingestor.push(b"Hel"), Some(ReplyUpdate::Started("Hel".into())));
        assert_eq!(ingestor.push(b"lo"), Some(ReplyUpdate::Updated("Hello".into())));
        assert_eq!(ingestor.finish(), vec![ReplyUpdate::Finished("Hello".into())]);
        assert_eq!(ingestor.text(), "");
    }

    #[test]
    fn test_ingestor_skips_chunk_without_text() {
        let mut ingestor = ReplyIngestor::new();
        let snowman = "☃".as_bytes();
        assert_eq!(ingestor.push(&snowman[..2]), None);
        assert_eq!(
            ingestor.push(&snowman[2..]),
            Some(ReplyUpdate::Started("☃".into()))
        );
    }

    #[tokio::test]
    async fn test_final_text_is_concatenation_of_chunks() {
        let parts: [&[u8]; 4] = [b"The ", b"answer ", b"is ", b"42."];
        let (outcome, updates) = collect(&parts).await;
        assert_eq!(outcome, IngestOutcome::Completed("The answer is 42.".into()));
        assert_eq!(updates.first(), Some(&ReplyUpdate::Started("The ".into())));
        assert_eq!(
            updates.iter().filter(|u| matches!(u, ReplyUpdate::Started(_))).count(),
            1
        );
        assert_eq!(
            updates.last(),
            Some(&ReplyUpdate::Finished("The answer is 42.".into()))
        );
    }

    #[tokio::test]
    async fn test_multibyte_split_across_chunks() {
        let text = "naïve 日本";
        let bytes = text.as_bytes();
        // Split inside 'ï' and inside '日'.
        let parts: [&[u8]; 3] = [&bytes[..3], &bytes[3..8], &bytes[8..]];
        let (outcome, _) = collect(&parts).await;
        assert_eq!(outcome, IngestOutcome::Completed(text.to_string()));
    }

    #[tokio::test]
    async fn test_empty_stream_emits_no_started() {
        let (outcome, updates) = collect(&[]).await;
        assert_eq!(outcome, IngestOutcome::Completed(String::new()));
        assert_eq!(updates, vec![ReplyUpdate::Finished(String::new())]);
    }

    #[tokio::test]
    async fn test_transport_error_mid_stream() {
        let items: Vec<Result<Bytes, ApiError>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(ApiError::Network("connection reset".into())),
            Ok(Bytes::from_static(b"never read")),
        ];
        let mut updates = Vec::new();
        let outcome = ingest_reply(futures::stream::iter(items), CancellationToken::new(), |u| {
            updates.push(u)
        })
        .await;

        assert_eq!(
            outcome,
            IngestOutcome::Failed("Network error: connection reset".into())
        );
        assert_eq!(updates.len(), 2);
        assert!(matches!(updates[1], ReplyUpdate::Failed(_)));
    }

    #[tokio::test]
    async fn test_in_band_error_line_fails_the_reply() {
        let parts: [&[u8]; 2] = [
            b"Working on it",
            b"data: ERROR: An error occurred during response generation: timeout\n\n",
        ];
        let (outcome, updates) = collect(&parts).await;
        assert_eq!(
            outcome,
            IngestOutcome::Failed("An error occurred during response generation: timeout".into())
        );
        assert!(!updates.iter().any(|u| matches!(u, ReplyUpdate::Finished(_))));
    }

    #[tokio::test]
    async fn test_error_marker_split_across_chunks() {
        let parts: [&[u8]; 2] = [b"Working on it\ndata: ER", b"ROR: timeout\n\n"];
        let (outcome, updates) = collect(&parts).await;
        assert_eq!(outcome, IngestOutcome::Failed("timeout".into()));
        // The partial marker never reaches the screen.
        assert_eq!(
            updates,
            vec![
                ReplyUpdate::Started("Working on it\n".into()),
                ReplyUpdate::Failed("timeout".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_error_only_body_never_starts_a_message() {
        let parts: [&[u8]; 3] = [b"data: ERROR: quo", b"ta exce", b"eded\n\n"];
        let (outcome, updates) = collect(&parts).await;
        assert_eq!(outcome, IngestOutcome::Failed("quota exceeded".into()));
        assert_eq!(updates, vec![ReplyUpdate::Failed("quota exceeded".into())]);
    }

    #[tokio::test]
    async fn test_quoted_error_line_inside_reply_is_kept() {
        let text = "The log shows:\n```\ndata: ERROR: disk full\n```\nFree some space.";
        let bytes = text.as_bytes();
        let parts: [&[u8]; 2] = [&bytes[..30], &bytes[30..]];
        let (outcome, updates) = collect(&parts).await;
        assert_eq!(outcome, IngestOutcome::Completed(text.to_string()));
        assert_eq!(updates.last(), Some(&ReplyUpdate::Finished(text.to_string())));
    }

    #[test]
    fn test_trailing_partial_marker_is_released_at_end() {
        let mut ingestor = ReplyIngestor::new();
        assert_eq!(ingestor.push(b"Read"), Some(ReplyUpdate::Started("Rea".into())));
        assert_eq!(ingestor.text(), "Rea");
        assert_eq!(
            ingestor.finish(),
            vec![
                ReplyUpdate::Updated("Read".into()),
                ReplyUpdate::Finished("Read".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_cancelled_stream_stops_without_update() {
        let cancel = CancellationToken::new();
        let body = chunks(&[b"first"]).chain(futures::stream::pending());
        let mut updates = Vec::new();

        let cancel_later = cancel.clone();
        let outcome = ingest_reply(body, cancel, |u| {
            updates.push(u);
            cancel_later.cancel();
        })
        .await;

        assert_eq!(outcome, IngestOutcome::Cancelled);
        assert_eq!(updates, vec![ReplyUpdate::Started("first".into())]);
    }
}
