use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::Sse,
};
use futures_util::{stream, Stream};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::app::api::AppContext;

#[derive(Deserialize)]
pub struct EventQuery {
    pub account_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/events",
    tag = "SSE",
    params(
        ("account_id" = Option<String>, Query, description = "Only stream events for this account")
    ),
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream"),
    )
)]
pub async fn sse_handler(
    State(context): State<AppContext>,
    Query(query): Query<EventQuery>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = context.state.events.subscribe();
    let account_filter = query.account_id;

    let stream = stream::unfold(
        (receiver, account_filter),
        |(mut rx, account_filter)| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Some(account_id) = &account_filter {
                            if event.account_id() != account_id {
                                continue;
                            }
                        }

                        let event_data = serde_json::to_string(&event).unwrap_or_default();
                        let sse_event = axum::response::sse::Event::default().data(event_data);
                        return Some((Ok(sse_event), (rx, account_filter)));
                    }
                    // Slow subscribers skip missed ticks instead of disconnecting.
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!("SSE subscriber lagged, skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        },
    );

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(std::time::Duration::from_secs(30))
            .text("keep-alive"),
    )
}
