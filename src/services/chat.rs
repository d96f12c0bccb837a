use std::sync::Arc;

use crate::api::{ingest_reply, ChatBackend, IngestOutcome, ReplyUpdate};
use crate::services::store::TurnTicket;
use crate::services::upload::{upload_attachment, UploadReceipt};

/// Progress of one submitted prompt, reported back to the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    Uploaded(UploadReceipt),
    Reply(ReplyUpdate),
    /// The turn ended before a reply stream was opened.
    Aborted(String),
}

/// Upload the pending attachment (if any), then stream the reply.
///
/// `on_event` runs on the runtime thread; it is expected to forward the event
/// to the UI, tagged with the ticket's turn id.
pub async fn run_turn<F>(backend: Arc<dyn ChatBackend>, ticket: TurnTicket, mut on_event: F) -> IngestOutcome
where
    F: FnMut(TurnEvent) + Send,
{
    let TurnTicket {
        turn_id,
        chat_id,
        prompt,
        attachment,
        cancel,
    } = ticket;

    if attachment.is_some() {
        match upload_attachment(backend.as_ref(), chat_id, attachment.as_ref()).await {
            Ok(receipt) => on_event(TurnEvent::Uploaded(receipt)),
            Err(e) => {
                on_event(TurnEvent::Aborted(e.to_string()));
                return IngestOutcome::Failed(e.to_string());
            }
        }
    }

    tracing::debug!("Turn {} requesting reply in chat {}", turn_id, chat_id);
    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => return IngestOutcome::Cancelled,
        opened = backend.request_reply(chat_id, &prompt) => opened,
    };

    let body = match opened {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Turn {} refused: {}", turn_id, e);
            let message = e.to_string();
            on_event(TurnEvent::Reply(ReplyUpdate::Failed(message.clone())));
            return IngestOutcome::Failed(message);
        }
    };

    let outcome = ingest_reply(body, cancel, |update| on_event(TurnEvent::Reply(update))).await;
    tracing::debug!("Turn {} ended: {:?}", turn_id, outcome);
    outcome
}
