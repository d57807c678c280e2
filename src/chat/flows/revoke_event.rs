//! Revoke flow: name → pick a recipient → drop their share.

use crate::chat::reply::{Button, Reply};
use crate::chat::session::{ChatSession, Flow, Recipient, RevokeEventStep};
use crate::chat::{ChatEngine, UserInput};
use crate::error::Error;

use super::{NameLookup, resolve_event_by_name};

pub async fn start(engine: &ChatEngine, user_id: &str) -> Result<Reply, Error> {
    engine
        .begin(user_id, Flow::RevokeEvent(RevokeEventStep::EnterName))
        .await?;
    Ok(enter_name_prompt())
}

pub async fn handle(
    engine: &ChatEngine,
    session: &mut ChatSession,
    step: RevokeEventStep,
    input: UserInput,
) -> Result<Reply, Error> {
    match (step, input) {
        (RevokeEventStep::EnterName, UserInput::Text(name)) => {
            let event = match resolve_event_by_name(engine, &session.user_id, &name).await? {
                NameLookup::Rejected(reply) => return Ok(reply),
                NameLookup::Found(event) => event,
            };

            let recipient_ids = engine.store.list_share_recipients(event.id).await?;
            if recipient_ids.is_empty() {
                tracing::debug!(event_id = %event.id, "No recipients to revoke");
                engine.complete(session).await?;
                return Ok(Reply::text(format!(
                    "\"{}\" isn't shared with anyone, so there's nothing to revoke.",
                    event.name
                )));
            }

            let mut recipients = Vec::with_capacity(recipient_ids.len());
            for user_id in recipient_ids {
                let display_name = match engine.profiles.display_name(&user_id).await {
                    Ok(name) => name,
                    Err(err) => {
                        tracing::warn!(%err, "Profile lookup failed, falling back to id");
                        user_id.clone()
                    }
                };
                recipients.push(Recipient {
                    user_id,
                    display_name,
                });
            }
            tracing::info!(
                event_id = %event.id,
                count = recipients.len(),
                "Recipients listed for revocation"
            );

            let step = RevokeEventStep::SelectRecipient {
                event_id: event.id,
                name: event.name,
                recipients,
            };
            let prompt = select_recipient_prompt(&step);
            engine.advance(session, Flow::RevokeEvent(step)).await?;
            Ok(prompt)
        }
        (RevokeEventStep::EnterName, _) => Ok(enter_name_prompt()),

        (
            RevokeEventStep::SelectRecipient {
                event_id,
                name,
                recipients,
            },
            UserInput::Text(choice),
        ) => {
            let Some(selected) = recipients.iter().find(|r| r.display_name == choice) else {
                tracing::debug!(input = %choice, "Recipient selection did not match");
                return Ok(select_recipient_prompt(&RevokeEventStep::SelectRecipient {
                    event_id,
                    name,
                    recipients,
                }));
            };

            engine
                .store
                .delete_share(event_id, &selected.user_id)
                .await?;
            engine.store.adjust_share_count(event_id, -1).await?;
            tracing::info!(
                event_id = %event_id,
                recipient_id = %selected.user_id,
                "Share revoked"
            );
            let reply = Reply::text(format!(
                "{} no longer gets reminders for \"{name}\".",
                selected.display_name
            ));
            engine.complete(session).await?;
            Ok(reply)
        }
        (RevokeEventStep::SelectRecipient { .. }, _) => Ok(Reply::text(
            "Pick one of the listed recipients by tapping their name.",
        )),
    }
}

fn enter_name_prompt() -> Reply {
    Reply::text("Which event do you want to stop sharing?")
}

fn select_recipient_prompt(step: &RevokeEventStep) -> Reply {
    let RevokeEventStep::SelectRecipient {
        name, recipients, ..
    } = step
    else {
        return Reply::text("Which event do you want to stop sharing?");
    };
    Reply::buttons(
        format!("Who should stop receiving \"{name}\" reminders?"),
        recipients
            .iter()
            .map(|r| Button::option(r.display_name.clone()))
            .collect(),
    )
}
