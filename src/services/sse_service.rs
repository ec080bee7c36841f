use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    dto::sse::ServerEvent,
    error::ServiceError,
    services::sse_events,
    state::{SharedState, game::SessionId},
};

/// Subscribe to a session stream, returning the current snapshot alongside the receiver.
///
/// The subscription is taken under the session lock so no update can slip in between the
/// snapshot and the first received event.
pub async fn subscribe(
    state: &SharedState,
    session_id: SessionId,
) -> Result<(Option<ServerEvent>, broadcast::Receiver<ServerEvent>), ServiceError> {
    let handle = state.sessions().require(session_id)?;
    let session = handle.lock().await;
    let receiver = state.hubs().subscribe(session_id);
    Ok((sse_events::game_update_event(&session), receiver))
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
pub fn to_sse_stream(
    state: SharedState,
    session_id: SessionId,
    initial: Option<ServerEvent>,
    mut receiver: broadcast::Receiver<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        let connected = match initial {
            Some(payload) => tx.send(Ok(to_event(payload))).await.is_ok(),
            None => true,
        };

        if connected {
            forward(&tx, &mut receiver).await;
        }

        drop(receiver);
        state.hubs().prune(session_id);
        tracing::info!(%session_id, "session SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Push broadcast events into `tx` until either side closes.
async fn forward(
    tx: &mpsc::Sender<Result<Event, Infallible>>,
    receiver: &mut broadcast::Receiver<ServerEvent>,
) {
    loop {
        tokio::select! {
            _ = tx.closed() => break,
            recv_result = receiver.recv() => {
                match recv_result {
                    Ok(payload) => {
                        if tx.send(Ok(to_event(payload))).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(_)) => {
                        // Skip lagged messages but keep the stream alive.
                        continue;
                    }
                }
            }
        }
    }
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}
