//! Create-event flow: name → start date → reminder on/off → cycle.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::chat::reply::{Button, Reply};
use crate::chat::session::{ChatSession, Flow, NewEventStep};
use crate::chat::{ChatEngine, UserInput};
use crate::error::Error;
use crate::model::{CompletionRecord, Event};
use crate::recurrence::{Cycle, compute_next_due};
use crate::validate::validate_event_name;

use super::{cycle_example, fmt_cycle, fmt_date, invalid_cycle_reply, name_error_reply};

pub(crate) const OPT_ENABLE_REMINDER: &str = "Enable reminder";
pub(crate) const OPT_NO_REMINDER: &str = "No reminder";

pub async fn start(engine: &ChatEngine, user_id: &str) -> Result<Reply, Error> {
    let user = engine.require_user(user_id).await?;
    if user.is_limited(Utc::now(), engine.free_plan_max_events) {
        tracing::info!(user_id, "New event refused: free plan quota exceeded");
        return Ok(limit_reached(engine.free_plan_max_events));
    }
    engine
        .begin(user_id, Flow::NewEvent(NewEventStep::EnterName))
        .await?;
    Ok(enter_name_prompt())
}

pub async fn handle(
    engine: &ChatEngine,
    session: &mut ChatSession,
    step: NewEventStep,
    input: UserInput,
) -> Result<Reply, Error> {
    match (step, input) {
        (NewEventStep::EnterName, UserInput::Text(name)) => {
            if let Err(err) = validate_event_name(&name) {
                tracing::debug!(input = %name, %err, "Rejected event name");
                return Ok(name_error_reply(&err));
            }
            if engine
                .store
                .get_event_by_name(&session.user_id, &name)
                .await?
                .is_some()
            {
                tracing::debug!(name = %name, "Duplicate event name");
                return Ok(Reply::text(format!(
                    "You already have an event called \"{name}\". Pick a different name."
                )));
            }
            engine
                .advance(session, Flow::NewEvent(NewEventStep::SelectStartDate { name }))
                .await?;
            Ok(select_start_date_prompt())
        }
        (NewEventStep::EnterName, _) => Ok(enter_name_prompt()),

        (NewEventStep::SelectStartDate { name }, UserInput::Date(start_date)) => {
            if start_date > engine.today() {
                tracing::debug!(%start_date, "Start date is in the future");
                return Ok(Reply::buttons(
                    "That date is in the future. Pick today or an earlier day.",
                    vec![Button::date_picker("Pick the start date")],
                ));
            }
            engine
                .advance(
                    session,
                    Flow::NewEvent(NewEventStep::ChooseReminder { name, start_date }),
                )
                .await?;
            Ok(choose_reminder_prompt())
        }
        (NewEventStep::SelectStartDate { .. }, _) => Ok(select_start_date_prompt()),

        (NewEventStep::ChooseReminder { name, start_date }, UserInput::Text(choice)) => {
            match choice.as_str() {
                OPT_ENABLE_REMINDER => {
                    engine
                        .advance(
                            session,
                            Flow::NewEvent(NewEventStep::SelectCycle { name, start_date }),
                        )
                        .await?;
                    Ok(select_cycle_prompt())
                }
                OPT_NO_REMINDER => {
                    let event = persist_event(engine, session, name, start_date, None).await?;
                    engine.complete(session).await?;
                    Ok(Reply::card(
                        format!("\"{}\" is set up", event.name),
                        vec![
                            format!("Started: {}", fmt_date(event.last_done_at)),
                            "Reminders: off".to_string(),
                        ],
                    ))
                }
                _ => Ok(choose_reminder_prompt()),
            }
        }
        (NewEventStep::ChooseReminder { .. }, _) => Ok(choose_reminder_prompt()),

        (NewEventStep::SelectCycle { name, start_date }, UserInput::Text(text)) => {
            if text.eq_ignore_ascii_case("example") {
                return Ok(cycle_example());
            }
            let Some(cycle) = Cycle::parse(&text) else {
                tracing::debug!(input = %text, "Invalid cycle");
                return Ok(invalid_cycle_reply());
            };
            let event = persist_event(engine, session, name, start_date, Some(cycle)).await?;
            engine.complete(session).await?;
            Ok(Reply::card(
                format!("\"{}\" is set up", event.name),
                vec![
                    format!("Started: {}", fmt_date(event.last_done_at)),
                    format!("Repeats: {}", fmt_cycle(event.cycle)),
                    format!(
                        "Next due: {}",
                        event.next_due_at.map(fmt_date).unwrap_or_default()
                    ),
                ],
            ))
        }
        (NewEventStep::SelectCycle { .. }, _) => Ok(select_cycle_prompt()),
    }
}

/// Insert the event, its seed completion record, and bump the owner's
/// event count.
async fn persist_event(
    engine: &ChatEngine,
    session: &ChatSession,
    name: String,
    start_date: NaiveDate,
    cycle: Option<Cycle>,
) -> Result<Event, Error> {
    let event = Event {
        id: Uuid::new_v4(),
        user_id: session.user_id.clone(),
        name,
        reminder_enabled: cycle.is_some(),
        cycle,
        last_done_at: start_date,
        next_due_at: cycle.map(|c| compute_next_due(start_date, c)),
        share_count: 0,
        is_active: true,
    };
    engine.store.create_event(&event).await?;
    engine.store.adjust_event_count(&session.user_id, 1).await?;
    engine
        .store
        .create_record(&CompletionRecord::new(
            event.id,
            &session.user_id,
            start_date,
        ))
        .await?;
    tracing::info!(
        event_id = %event.id,
        name = %event.name,
        user_id = %event.user_id,
        reminder = event.reminder_enabled,
        "Event created"
    );
    Ok(event)
}

fn enter_name_prompt() -> Reply {
    Reply::text("What should we call the new event? (2-20 characters)")
}

fn select_start_date_prompt() -> Reply {
    Reply::buttons(
        "When did you last do it? That date anchors the cycle.",
        vec![Button::date_picker("Pick the start date")],
    )
}

fn choose_reminder_prompt() -> Reply {
    Reply::buttons(
        "Should I remind you when it's due again?",
        vec![
            Button::option(OPT_ENABLE_REMINDER),
            Button::option(OPT_NO_REMINDER),
        ],
    )
}

fn select_cycle_prompt() -> Reply {
    Reply::text(
        "How often does it repeat? Answer like \"3 days\", \"2 weeks\" or \"1 month\" — or type \"example\".",
    )
}

fn limit_reached(free_plan_max: i64) -> Reply {
    Reply::card(
        "Event limit reached",
        vec![
            format!("The free plan covers up to {free_plan_max} events."),
            "Delete one you no longer need, or upgrade to keep adding more.".to_string(),
        ],
    )
}
