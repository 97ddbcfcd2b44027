use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    dto::sse::ServerEvent,
    services::{
        sse_events::system_status_event,
        sync_service::{GameWatch, unwatch_game},
    },
    state::SharedState,
};

/// Convert a game subscription into an SSE response.
///
/// The current record is sent first, then every new revision and degraded mode changes. The
/// watcher is released once the client disconnects.
pub fn to_sse_stream(
    state: SharedState,
    watch: GameWatch,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);
    let GameWatch {
        id,
        initial,
        mut receiver,
    } = watch;
    let mut degraded = state.degraded_watcher();

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        let initial_sent = match initial {
            Some(payload) => tx.send(Ok(to_event(payload))).await.is_ok(),
            None => true,
        };

        while initial_sent {
            tokio::select! {
                _ = tx.closed() => break,
                changed = degraded.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let flag = *degraded.borrow_and_update();
                    if let Some(payload) = system_status_event(flag) {
                        if tx.send(Ok(to_event(payload))).await.is_err() {
                            break;
                        }
                    }
                }
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Skip lagged messages; the next revision carries the full record.
                            continue;
                        }
                    }
                }
            }
        }

        unwatch_game(&state, &id);
        tracing::info!(game_id = %id, "game SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}
