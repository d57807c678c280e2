//! Delete flow: name → confirm → cascade delete.

use crate::chat::reply::{Button, Reply};
use crate::chat::session::{ChatSession, DeleteEventStep, Flow};
use crate::chat::{ChatEngine, UserInput};
use crate::error::Error;

use super::{NameLookup, fmt_date, resolve_event_by_name};

pub(crate) const OPT_DELETE: &str = "Delete event";
pub(crate) const OPT_CANCEL: &str = "Keep it";

pub async fn start(engine: &ChatEngine, user_id: &str) -> Result<Reply, Error> {
    engine
        .begin(user_id, Flow::DeleteEvent(DeleteEventStep::EnterName))
        .await?;
    Ok(enter_name_prompt())
}

pub async fn handle(
    engine: &ChatEngine,
    session: &mut ChatSession,
    step: DeleteEventStep,
    input: UserInput,
) -> Result<Reply, Error> {
    match (step, input) {
        (DeleteEventStep::EnterName, UserInput::Text(name)) => {
            let event = match resolve_event_by_name(engine, &session.user_id, &name).await? {
                NameLookup::Rejected(reply) => return Ok(reply),
                NameLookup::Found(event) => event,
            };
            let step = DeleteEventStep::ConfirmDeletion {
                event_id: event.id,
                name: event.name,
                last_done_at: event.last_done_at,
                next_due_at: event.next_due_at,
            };
            let prompt = confirm_prompt(&step);
            engine.advance(session, Flow::DeleteEvent(step)).await?;
            Ok(prompt)
        }
        (DeleteEventStep::EnterName, _) => Ok(enter_name_prompt()),

        (
            DeleteEventStep::ConfirmDeletion {
                event_id,
                name,
                last_done_at,
                next_due_at,
            },
            UserInput::Text(choice),
        ) => match choice.as_str() {
            OPT_CANCEL => {
                engine.complete(session).await?;
                Ok(Reply::text(format!("\"{name}\" lives on. Nothing was deleted.")))
            }
            OPT_DELETE => {
                let event = engine.require_event(event_id).await?;
                let shares = engine.store.delete_shares_by_event(event_id).await?;
                let records = engine.store.delete_records_by_event(event_id).await?;
                engine.store.delete_event(event_id).await?;
                engine.store.adjust_event_count(&event.user_id, -1).await?;
                tracing::info!(
                    event_id = %event_id,
                    name = %event.name,
                    shares,
                    records,
                    "Event deleted"
                );
                engine.complete(session).await?;
                Ok(Reply::text(format!(
                    "\"{name}\" is gone, along with its history and shares."
                )))
            }
            _ => Ok(confirm_prompt(&DeleteEventStep::ConfirmDeletion {
                event_id,
                name,
                last_done_at,
                next_due_at,
            })),
        },
        (DeleteEventStep::ConfirmDeletion { .. }, _) => Ok(Reply::buttons(
            "Please answer with one of the buttons.",
            vec![Button::option(OPT_DELETE), Button::option(OPT_CANCEL)],
        )),
    }
}

fn enter_name_prompt() -> Reply {
    Reply::text("Which event should I delete?")
}

fn confirm_prompt(step: &DeleteEventStep) -> Reply {
    let DeleteEventStep::ConfirmDeletion {
        name,
        last_done_at,
        next_due_at,
        ..
    } = step
    else {
        return Reply::text("Which event should I delete?");
    };
    let mut text = format!(
        "Delete \"{name}\"? Its completion history and shares go with it. Last done {}.",
        fmt_date(*last_done_at)
    );
    if let Some(due) = next_due_at {
        text.push_str(&format!(" Next due {}.", fmt_date(*due)));
    }
    Reply::buttons(
        text,
        vec![Button::option(OPT_DELETE), Button::option(OPT_CANCEL)],
    )
}
