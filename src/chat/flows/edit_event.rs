//! Edit flow: rename, toggle the reminder, or change the cycle.
//!
//! Turning a reminder ON for an event that has no cycle yet jumps into the
//! cycle-entry step first; the [`CycleContinuation`] tag tells the terminal
//! handler whether to also flip the flag.

use crate::chat::reply::{Button, Reply};
use crate::chat::session::{
    ChatSession, CycleContinuation, EditEventStep, EventSnapshot, Flow,
};
use crate::chat::{ChatEngine, UserInput};
use crate::error::Error;
use crate::recurrence::{Cycle, compute_next_due};
use crate::validate::validate_event_name;

use super::{
    NameLookup, cycle_example, fmt_cycle, fmt_date, invalid_cycle_reply, name_error_reply,
    resolve_event_by_name,
};

pub(crate) const OPT_NAME: &str = "Name";
pub(crate) const OPT_REMINDER: &str = "Reminder";
pub(crate) const OPT_CYCLE: &str = "Cycle";
pub(crate) const OPT_CONFIRM: &str = "Yes, change it";
pub(crate) const OPT_KEEP: &str = "No, keep it as is";

pub async fn start(engine: &ChatEngine, user_id: &str) -> Result<Reply, Error> {
    engine
        .begin(user_id, Flow::EditEvent(EditEventStep::EnterName))
        .await?;
    Ok(enter_name_prompt())
}

pub async fn handle(
    engine: &ChatEngine,
    session: &mut ChatSession,
    step: EditEventStep,
    input: UserInput,
) -> Result<Reply, Error> {
    match (step, input) {
        (EditEventStep::EnterName, UserInput::Text(name)) => {
            let event = match resolve_event_by_name(engine, &session.user_id, &name).await? {
                NameLookup::Rejected(reply) => return Ok(reply),
                NameLookup::Found(event) => event,
            };
            let snapshot = EventSnapshot {
                event_id: event.id,
                name: event.name,
                reminder_enabled: event.reminder_enabled,
                cycle: event.cycle,
                last_done_at: event.last_done_at,
            };
            let prompt = select_option_prompt(&snapshot);
            engine
                .advance(
                    session,
                    Flow::EditEvent(EditEventStep::SelectOption { event: snapshot }),
                )
                .await?;
            Ok(prompt)
        }
        (EditEventStep::EnterName, _) => Ok(enter_name_prompt()),

        (EditEventStep::SelectOption { event }, UserInput::Text(choice)) => {
            match choice.as_str() {
                OPT_NAME => {
                    let prompt = Reply::text(format!(
                        "What should \"{}\" be called instead?",
                        event.name
                    ));
                    engine
                        .advance(session, Flow::EditEvent(EditEventStep::EnterNewName { event }))
                        .await?;
                    Ok(prompt)
                }
                OPT_REMINDER => {
                    let prompt = confirm_toggle_prompt(&event);
                    engine
                        .advance(
                            session,
                            Flow::EditEvent(EditEventStep::ConfirmToggle { event }),
                        )
                        .await?;
                    Ok(prompt)
                }
                OPT_CYCLE => {
                    if !event.reminder_enabled {
                        tracing::debug!(event_id = %event.event_id, "Cycle edit needs the reminder enabled");
                        return Ok(Reply::buttons(
                            format!(
                                "\"{}\" has reminders turned off, so a cycle wouldn't do anything. Enable the reminder first (pick \"{OPT_REMINDER}\").",
                                event.name
                            ),
                            option_buttons(),
                        ));
                    }
                    engine
                        .advance(
                            session,
                            Flow::EditEvent(EditEventStep::EnterCycle {
                                event,
                                continuation: CycleContinuation::ChangeCycle,
                            }),
                        )
                        .await?;
                    Ok(enter_cycle_prompt())
                }
                _ => Ok(select_option_prompt(&event)),
            }
        }
        (EditEventStep::SelectOption { event }, _) => Ok(select_option_prompt(&event)),

        (EditEventStep::EnterNewName { event }, UserInput::Text(new_name)) => {
            if let Err(err) = validate_event_name(&new_name) {
                tracing::debug!(input = %new_name, %err, "Rejected event name");
                return Ok(name_error_reply(&err));
            }
            if engine
                .store
                .get_event_by_name(&session.user_id, &new_name)
                .await?
                .is_some()
            {
                return Ok(Reply::text(format!(
                    "You already have an event called \"{new_name}\". Pick a different name."
                )));
            }
            engine.require_event(event.event_id).await?;
            engine.store.rename_event(event.event_id, &new_name).await?;
            tracing::info!(event_id = %event.event_id, old = %event.name, new = %new_name, "Event renamed");
            engine.complete(session).await?;
            Ok(Reply::text(format!(
                "Done — \"{}\" is now \"{new_name}\".",
                event.name
            )))
        }
        (EditEventStep::EnterNewName { event }, _) => Ok(Reply::text(format!(
            "What should \"{}\" be called instead?",
            event.name
        ))),

        (EditEventStep::ConfirmToggle { event }, UserInput::Text(choice)) => {
            match choice.as_str() {
                OPT_KEEP => {
                    engine.complete(session).await?;
                    Ok(Reply::text(format!(
                        "No problem, \"{}\" stays as it is.",
                        event.name
                    )))
                }
                OPT_CONFIRM => {
                    let turning_on = !event.reminder_enabled;
                    if turning_on && event.cycle.is_none() {
                        // A reminder needs a cycle. Detour into cycle
                        // entry and finish the toggle there.
                        engine
                            .advance(
                                session,
                                Flow::EditEvent(EditEventStep::EnterCycle {
                                    event,
                                    continuation: CycleContinuation::EnableReminder,
                                }),
                            )
                            .await?;
                        return Ok(Reply::text(
                            "First I need a cycle for it. How often does it repeat? Answer like \"3 days\" or \"1 month\".",
                        ));
                    }

                    let current = engine.require_event(event.event_id).await?;
                    let next_due = if turning_on {
                        current
                            .cycle
                            .map(|c| compute_next_due(current.last_done_at, c))
                    } else {
                        None
                    };
                    engine
                        .store
                        .set_reminder_enabled(event.event_id, turning_on, next_due)
                        .await?;
                    tracing::info!(event_id = %event.event_id, enabled = turning_on, "Reminder toggled");
                    engine.complete(session).await?;

                    if turning_on {
                        Ok(Reply::card(
                            format!("Reminders on for \"{}\"", event.name),
                            vec![format!(
                                "Next due: {}",
                                next_due.map(fmt_date).unwrap_or_default()
                            )],
                        ))
                    } else {
                        Ok(Reply::text(format!(
                            "Reminders are off for \"{}\". The cycle is kept in case you turn them back on.",
                            event.name
                        )))
                    }
                }
                _ => Ok(confirm_toggle_prompt(&event)),
            }
        }
        (EditEventStep::ConfirmToggle { event }, _) => Ok(confirm_toggle_prompt(&event)),

        (EditEventStep::EnterCycle { event, continuation }, UserInput::Text(text)) => {
            if text.eq_ignore_ascii_case("example") {
                return Ok(cycle_example());
            }
            let Some(cycle) = Cycle::parse(&text) else {
                tracing::debug!(input = %text, "Invalid cycle");
                return Ok(invalid_cycle_reply());
            };

            // Recompute from the event's stored anchor, not from today.
            let current = engine.require_event(event.event_id).await?;
            let next_due = compute_next_due(current.last_done_at, cycle);
            engine.store.set_cycle(event.event_id, cycle, next_due).await?;
            if continuation == CycleContinuation::EnableReminder {
                engine
                    .store
                    .set_reminder_enabled(event.event_id, true, Some(next_due))
                    .await?;
            }
            tracing::info!(
                event_id = %event.event_id,
                %cycle,
                %next_due,
                continuation = ?continuation,
                "Cycle updated"
            );
            engine.complete(session).await?;

            let title = match continuation {
                CycleContinuation::ChangeCycle => format!("Cycle updated for \"{}\"", event.name),
                CycleContinuation::EnableReminder => {
                    format!("Reminders on for \"{}\"", event.name)
                }
            };
            Ok(Reply::card(
                title,
                vec![
                    format!("Repeats: {}", fmt_cycle(Some(cycle))),
                    format!("Next due: {}", fmt_date(next_due)),
                ],
            ))
        }
        (EditEventStep::EnterCycle { .. }, _) => Ok(enter_cycle_prompt()),
    }
}

fn option_buttons() -> Vec<Button> {
    vec![
        Button::option(OPT_NAME),
        Button::option(OPT_REMINDER),
        Button::option(OPT_CYCLE),
    ]
}

fn enter_name_prompt() -> Reply {
    Reply::text("Which event do you want to edit?")
}

fn select_option_prompt(event: &EventSnapshot) -> Reply {
    Reply::buttons(
        format!(
            "What should we change about \"{}\"? (reminders {}, cycle {})",
            event.name,
            if event.reminder_enabled { "on" } else { "off" },
            fmt_cycle(event.cycle),
        ),
        option_buttons(),
    )
}

fn confirm_toggle_prompt(event: &EventSnapshot) -> Reply {
    let target = if event.reminder_enabled { "OFF" } else { "ON" };
    Reply::buttons(
        format!("Turn reminders {target} for \"{}\"?", event.name),
        vec![Button::option(OPT_CONFIRM), Button::option(OPT_KEEP)],
    )
}

fn enter_cycle_prompt() -> Reply {
    Reply::text(
        "What should the new cycle be? Answer like \"3 days\", \"2 weeks\" or \"1 month\" — or type \"example\".",
    )
}
