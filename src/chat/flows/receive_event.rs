//! Receive flow: share code → new share grant.

use crate::chat::reply::Reply;
use crate::chat::session::{ChatSession, Flow, ReceiveEventStep};
use crate::chat::{ChatEngine, UserInput};
use crate::error::Error;
use crate::model::Share;
use crate::sharecode;

use super::{fmt_cycle, fmt_date};

pub async fn start(engine: &ChatEngine, user_id: &str) -> Result<Reply, Error> {
    engine
        .begin(user_id, Flow::ReceiveEvent(ReceiveEventStep::EnterCode))
        .await?;
    Ok(enter_code_prompt())
}

pub async fn handle(
    engine: &ChatEngine,
    session: &mut ChatSession,
    step: ReceiveEventStep,
    input: UserInput,
) -> Result<Reply, Error> {
    match (step, input) {
        (ReceiveEventStep::EnterCode, UserInput::Text(code)) => {
            let Some(event_id) = sharecode::decode(&code) else {
                tracing::debug!(input = %code, "Undecodable share code");
                return Ok(invalid_code_reply());
            };
            let Some(event) = engine.store.get_event(event_id).await? else {
                tracing::debug!(%event_id, "Share code references no event");
                return Ok(invalid_code_reply());
            };

            // The owner may have turned the reminder off since issuing the
            // code; a share without a due date would never fire.
            let (Some(cycle), Some(next_due)) = (event.cycle, event.next_due_at) else {
                tracing::info!(event_id = %event.id, "Share refused: event not reminder-ready");
                engine.complete(session).await?;
                return Ok(Reply::text(format!(
                    "\"{}\" isn't accepting shares right now — its owner has reminders turned off.",
                    event.name
                )));
            };

            let recipient_id = session.user_id.clone();
            if engine.store.share_exists(event.id, &recipient_id).await? {
                tracing::info!(event_id = %event.id, "Share ignored: duplicate");
                engine.complete(session).await?;
                return Ok(Reply::text(format!(
                    "You're already subscribed to \"{}\".",
                    event.name
                )));
            }

            let share = Share::new(event.id, &event.user_id, &recipient_id);
            engine.store.create_share(&share).await?;
            engine.store.adjust_share_count(event.id, 1).await?;

            let owner_name = match engine.profiles.display_name(&event.user_id).await {
                Ok(name) => name,
                Err(err) => {
                    tracing::warn!(%err, "Profile lookup failed, falling back to id");
                    event.user_id.clone()
                }
            };
            tracing::info!(
                share_id = %share.id,
                event_id = %event.id,
                owner_id = %event.user_id,
                "Share received"
            );
            engine.complete(session).await?;
            Ok(Reply::card(
                format!("Subscribed to \"{}\"", event.name),
                vec![
                    format!("Shared by: {owner_name}"),
                    format!("Repeats: {}", fmt_cycle(Some(cycle))),
                    format!("Next due: {}", fmt_date(next_due)),
                ],
            ))
        }
        (ReceiveEventStep::EnterCode, _) => Ok(enter_code_prompt()),
    }
}

fn enter_code_prompt() -> Reply {
    Reply::text("Paste the share code you received.")
}

fn invalid_code_reply() -> Reply {
    Reply::text("That code doesn't look right. Double-check it with the person who shared it.")
}
