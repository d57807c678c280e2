//! One module per conversation kind.

pub mod delete_event;
pub mod done_event;
pub mod edit_event;
pub mod find_event;
pub mod new_event;
pub mod receive_event;
pub mod revoke_event;
pub mod settings;
pub mod share_event;
pub mod view_all;

use chrono::NaiveDate;

use crate::chat::ChatEngine;
use crate::chat::reply::Reply;
use crate::error::Error;
use crate::model::Event;
use crate::recurrence::Cycle;
use crate::validate::{NameError, validate_event_name};

/// Outcome of resolving a user-entered event name.
pub(crate) enum NameLookup {
    /// Validation or lookup failed; send the reply and stay on the
    /// current step.
    Rejected(Reply),
    Found(Event),
}

pub(crate) fn name_error_reply(err: &NameError) -> Reply {
    Reply::text(format!("That name won't work: {err}. Try another one."))
}

pub(crate) fn not_found_reply(name: &str) -> Reply {
    Reply::text(format!(
        "I couldn't find an event called \"{name}\". Check the spelling, or /viewall to see your events."
    ))
}

/// Validate a user-entered name and look the event up under the user.
pub(crate) async fn resolve_event_by_name(
    engine: &ChatEngine,
    user_id: &str,
    text: &str,
) -> Result<NameLookup, Error> {
    if let Err(err) = validate_event_name(text) {
        tracing::debug!(input = text, %err, "Rejected event name");
        return Ok(NameLookup::Rejected(name_error_reply(&err)));
    }
    match engine.store.get_event_by_name(user_id, text).await? {
        Some(event) => Ok(NameLookup::Found(event)),
        None => {
            tracing::debug!(user_id, name = text, "Event not found");
            Ok(NameLookup::Rejected(not_found_reply(text)))
        }
    }
}

pub(crate) fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn fmt_cycle(cycle: Option<Cycle>) -> String {
    match cycle {
        Some(c) => format!("every {c}"),
        None => "not set".to_string(),
    }
}

/// Shared reply for the literal "example" entered at a cycle prompt.
pub(crate) fn cycle_example() -> Reply {
    Reply::card(
        "Cycle examples",
        vec![
            "\"1 day\" — every day".to_string(),
            "\"3 days\" — every three days".to_string(),
            "\"2 weeks\" — every other week".to_string(),
            "\"1 month\" — monthly, clamped to short months".to_string(),
        ],
    )
}

pub(crate) fn invalid_cycle_reply() -> Reply {
    Reply::text(
        "I couldn't read that cycle. Answer like \"3 days\", \"2 weeks\" or \"1 month\" — or type \"example\".",
    )
}
