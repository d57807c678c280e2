//! Find flow: name → event summary with recent history.

use crate::chat::reply::Reply;
use crate::chat::session::{ChatSession, FindEventStep, Flow};
use crate::chat::{ChatEngine, UserInput};
use crate::error::Error;
use crate::model::Event;

use super::{NameLookup, fmt_cycle, fmt_date, resolve_event_by_name};

/// How many completion dates the summary shows.
const RECENT_RECORDS: usize = 10;

pub async fn start(engine: &ChatEngine, user_id: &str) -> Result<Reply, Error> {
    engine
        .begin(user_id, Flow::FindEvent(FindEventStep::EnterName))
        .await?;
    Ok(enter_name_prompt())
}

pub async fn handle(
    engine: &ChatEngine,
    session: &mut ChatSession,
    step: FindEventStep,
    input: UserInput,
) -> Result<Reply, Error> {
    match (step, input) {
        (FindEventStep::EnterName, UserInput::Text(name)) => {
            let event = match resolve_event_by_name(engine, &session.user_id, &name).await? {
                NameLookup::Rejected(reply) => return Ok(reply),
                NameLookup::Found(event) => event,
            };
            let recent = engine
                .store
                .list_recent_records(event.id, RECENT_RECORDS)
                .await?;
            engine.complete(session).await?;
            Ok(summary(&event, &recent))
        }
        (FindEventStep::EnterName, _) => Ok(enter_name_prompt()),
    }
}

fn enter_name_prompt() -> Reply {
    Reply::text("Which event are you looking for?")
}

fn summary(event: &Event, recent: &[chrono::NaiveDate]) -> Reply {
    let mut lines = vec![
        format!(
            "Reminders: {}",
            if event.reminder_enabled { "on" } else { "off" }
        ),
        format!("Repeats: {}", fmt_cycle(event.cycle)),
        format!("Last done: {}", fmt_date(event.last_done_at)),
    ];
    if let Some(due) = event.next_due_at {
        lines.push(format!("Next due: {}", fmt_date(due)));
    }
    if !recent.is_empty() {
        lines.push(format!(
            "Recent: {}",
            recent
                .iter()
                .map(|d| fmt_date(*d))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    Reply::card(event.name.clone(), lines)
}
