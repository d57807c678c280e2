//! User-settings flow: pick an option → pick a new reminder hour.

use crate::chat::reply::{Button, Reply};
use crate::chat::session::{ChatSession, Flow, UserSettingsStep};
use crate::chat::{ChatEngine, UserInput};
use crate::error::Error;

pub(crate) const OPT_TIME_SLOT: &str = "Notification time";

pub async fn start(engine: &ChatEngine, user_id: &str) -> Result<Reply, Error> {
    engine
        .begin(user_id, Flow::UserSettings(UserSettingsStep::SelectOption))
        .await?;
    Ok(select_option_prompt())
}

pub async fn handle(
    engine: &ChatEngine,
    session: &mut ChatSession,
    step: UserSettingsStep,
    input: UserInput,
) -> Result<Reply, Error> {
    match (step, input) {
        (UserSettingsStep::SelectOption, UserInput::Text(choice)) => {
            if choice != OPT_TIME_SLOT {
                tracing::debug!(input = %choice, "Unknown settings option");
                return Ok(select_option_prompt());
            }
            let user = engine.require_user(&session.user_id).await?;
            let current_slot = user.notification_slot;
            engine
                .advance(
                    session,
                    Flow::UserSettings(UserSettingsStep::SelectTimeSlot { current_slot }),
                )
                .await?;
            Ok(select_slot_prompt(current_slot))
        }
        (UserSettingsStep::SelectOption, _) => Ok(select_option_prompt()),

        (UserSettingsStep::SelectTimeSlot { current_slot }, UserInput::Time(time)) => {
            use chrono::Timelike;
            if time.minute() != 0 {
                tracing::debug!(%time, "Rejected non-slot time");
                return Ok(Reply::buttons(
                    "Reminders go out on the hour. Pick a time ending in :00.",
                    vec![Button::time_picker("Pick an hour")],
                ));
            }
            engine
                .store
                .set_notification_slot(&session.user_id, time.hour())
                .await?;
            tracing::info!(user_id = %session.user_id, hour = time.hour(), "Notification slot updated");
            engine.complete(session).await?;
            Ok(Reply::text(format!(
                "Got it — reminders now arrive around {:02}:00.",
                time.hour()
            )))
        }
        (UserSettingsStep::SelectTimeSlot { current_slot }, _) => {
            Ok(select_slot_prompt(current_slot))
        }
    }
}

fn select_option_prompt() -> Reply {
    Reply::buttons(
        "What would you like to change?",
        vec![Button::option(OPT_TIME_SLOT)],
    )
}

fn select_slot_prompt(current_slot: u32) -> Reply {
    Reply::buttons(
        format!("Your reminders currently arrive around {current_slot:02}:00. Pick a new hour."),
        vec![Button::time_picker("Pick an hour")],
    )
}
