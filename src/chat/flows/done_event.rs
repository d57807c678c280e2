//! Mark-done flow: name → done date → record + due-date advance.

use crate::chat::reply::{Button, Reply};
use crate::chat::session::{ChatSession, DoneEventStep, Flow};
use crate::chat::{ChatEngine, UserInput};
use crate::error::Error;
use crate::model::CompletionRecord;
use crate::recurrence::compute_next_due;

use super::{NameLookup, fmt_date, resolve_event_by_name};

pub async fn start(engine: &ChatEngine, user_id: &str) -> Result<Reply, Error> {
    engine
        .begin(user_id, Flow::DoneEvent(DoneEventStep::EnterName))
        .await?;
    Ok(enter_name_prompt())
}

pub async fn handle(
    engine: &ChatEngine,
    session: &mut ChatSession,
    step: DoneEventStep,
    input: UserInput,
) -> Result<Reply, Error> {
    match (step, input) {
        (DoneEventStep::EnterName, UserInput::Text(name)) => {
            let event = match resolve_event_by_name(engine, &session.user_id, &name).await? {
                NameLookup::Rejected(reply) => return Ok(reply),
                NameLookup::Found(event) => event,
            };
            let prompt = select_date_prompt(&event.name);
            engine
                .advance(
                    session,
                    Flow::DoneEvent(DoneEventStep::SelectDoneDate {
                        event_id: event.id,
                        name: event.name,
                    }),
                )
                .await?;
            Ok(prompt)
        }
        (DoneEventStep::EnterName, _) => Ok(enter_name_prompt()),

        (DoneEventStep::SelectDoneDate { event_id, name }, UserInput::Date(done_at)) => {
            let event = engine.require_event(event_id).await?;
            if done_at > engine.today() {
                tracing::debug!(%done_at, "Done date is in the future");
                return Ok(Reply::buttons(
                    "That date hasn't happened yet. Pick today or an earlier day.",
                    vec![Button::date_picker("Pick the date")],
                ));
            }

            engine
                .store
                .create_record(&CompletionRecord::new(event_id, &session.user_id, done_at))
                .await?;
            tracing::info!(event_id = %event_id, %done_at, "Completion recorded");

            // Out-of-order backfills never regress the due calculation.
            let advanced = done_at > event.last_done_at;
            if advanced {
                let next_due = if event.reminder_enabled {
                    event.cycle.map(|c| compute_next_due(done_at, c))
                } else {
                    None
                };
                engine
                    .store
                    .set_last_done(event_id, done_at, next_due)
                    .await?;
                tracing::info!(event_id = %event_id, %done_at, "Due anchor advanced");
            }

            engine.complete(session).await?;

            let mut lines = vec![format!("Logged: {}", fmt_date(done_at))];
            if advanced {
                if let Some(cycle) = event.cycle.filter(|_| event.reminder_enabled) {
                    lines.push(format!(
                        "Next due: {}",
                        fmt_date(compute_next_due(done_at, cycle))
                    ));
                }
            } else {
                lines.push(format!(
                    "Your latest completion is still {}, so the schedule is unchanged.",
                    fmt_date(event.last_done_at)
                ));
            }
            Ok(Reply::card(format!("Nice work on \"{name}\"!"), lines))
        }
        (DoneEventStep::SelectDoneDate { name, .. }, _) => Ok(select_date_prompt(&name)),
    }
}

fn enter_name_prompt() -> Reply {
    Reply::text("Which event did you finish?")
}

fn select_date_prompt(name: &str) -> Reply {
    Reply::buttons(
        format!("When did you do \"{name}\"?"),
        vec![Button::date_picker("Pick the date")],
    )
}
