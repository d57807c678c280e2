//! View-all: a sessionless, synchronous listing of the user's events.

use crate::chat::ChatEngine;
use crate::chat::reply::Reply;
use crate::error::Error;

use super::{fmt_cycle, fmt_date};

pub async fn handle(engine: &ChatEngine, user_id: &str) -> Result<Reply, Error> {
    let events = engine.store.list_events_by_user(user_id).await?;
    tracing::debug!(user_id, count = events.len(), "Listing events");
    if events.is_empty() {
        return Ok(Reply::text(
            "You don't have any events yet. /new creates your first one.",
        ));
    }
    let lines = events
        .iter()
        .map(|e| {
            let due = match e.next_due_at {
                Some(d) => format!("due {}", fmt_date(d)),
                None => "no reminder".to_string(),
            };
            format!("{} — {}, {due}", e.name, fmt_cycle(e.cycle))
        })
        .collect();
    Ok(Reply::card(
        format!("Your events ({})", events.len()),
        lines,
    ))
}
