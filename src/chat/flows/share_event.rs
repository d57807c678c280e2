//! Share flow: name → share code.

use crate::chat::reply::Reply;
use crate::chat::session::{ChatSession, Flow, ShareEventStep};
use crate::chat::{ChatEngine, UserInput};
use crate::error::Error;
use crate::model::MAX_EVENT_SHARES;
use crate::sharecode;

use super::{NameLookup, resolve_event_by_name};

pub async fn start(engine: &ChatEngine, user_id: &str) -> Result<Reply, Error> {
    engine
        .begin(user_id, Flow::ShareEvent(ShareEventStep::EnterName))
        .await?;
    Ok(enter_name_prompt())
}

pub async fn handle(
    engine: &ChatEngine,
    session: &mut ChatSession,
    step: ShareEventStep,
    input: UserInput,
) -> Result<Reply, Error> {
    match (step, input) {
        (ShareEventStep::EnterName, UserInput::Text(name)) => {
            let event = match resolve_event_by_name(engine, &session.user_id, &name).await? {
                NameLookup::Rejected(reply) => return Ok(reply),
                NameLookup::Found(event) => event,
            };

            if !event.reminder_enabled {
                tracing::info!(event_id = %event.id, "Share refused: reminder disabled");
                engine.complete(session).await?;
                return Ok(Reply::text(format!(
                    "\"{}\" has reminders turned off, so there's nothing to share yet. Enable the reminder with /edit first.",
                    event.name
                )));
            }
            if event.share_count >= MAX_EVENT_SHARES {
                tracing::info!(event_id = %event.id, "Share refused: recipient cap reached");
                engine.complete(session).await?;
                return Ok(Reply::text(format!(
                    "\"{}\" is already shared with {MAX_EVENT_SHARES} people, which is the most I support. Revoke one with /revoke to make room.",
                    event.name
                )));
            }

            let code = sharecode::encode(event.id);
            tracing::info!(event_id = %event.id, "Share code issued");
            engine.complete(session).await?;
            Ok(Reply::card(
                format!("Share \"{}\"", event.name),
                vec![
                    format!("Send this code to your friend: {code}"),
                    "They redeem it with /receive and will get the same reminders you do.".to_string(),
                ],
            ))
        }
        (ShareEventStep::EnterName, _) => Ok(enter_name_prompt()),
    }
}

fn enter_name_prompt() -> Reply {
    Reply::text("Which event do you want to share?")
}
