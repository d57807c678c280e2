//! Conversation engine — turns inbound messages into replies.
//!
//! An inbound message either starts a brand-new conversation via a slash
//! command or continues the user's single ongoing session. Flow handlers
//! own the step graphs; this module owns routing, session lifecycle and
//! the informational commands.

pub mod command;
pub mod flows;
pub mod reply;
pub mod session;

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use rand::seq::SliceRandom;

use crate::error::Error;
use crate::gateway::ProfileLookup;
use crate::model::{Event, SessionStatus, User};
use crate::store::Store;
use crate::validate::sanitize_text;

use command::Command;
use reply::Reply;
use session::{ChatSession, Flow};

/// One inbound user action. Free text arrives as `Text`; date and time
/// picker selections arrive as structured postbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum UserInput {
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
}

/// The conversation engine.
pub struct ChatEngine {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) profiles: Arc<dyn ProfileLookup>,
    pub(crate) timezone: Tz,
    pub(crate) free_plan_max_events: i64,
}

impl ChatEngine {
    pub fn new(
        store: Arc<dyn Store>,
        profiles: Arc<dyn ProfileLookup>,
        timezone: Tz,
        free_plan_max_events: i64,
    ) -> Self {
        Self {
            store,
            profiles,
            timezone,
            free_plan_max_events,
        }
    }

    /// Handle one inbound message and produce the reply to send back.
    pub async fn handle_message(&self, user_id: &str, input: UserInput) -> Result<Reply, Error> {
        let input = match input {
            UserInput::Text(t) => UserInput::Text(sanitize_text(&t)),
            other => other,
        };
        self.ensure_user(user_id).await?;

        match self.store.get_ongoing_session(user_id).await? {
            None => self.handle_idle(user_id, input).await,
            Some(session) => {
                if let UserInput::Text(ref t) = input
                    && Command::parse(t) == Some(Command::Abort)
                {
                    self.store
                        .finish_session(session.id, SessionStatus::Aborted)
                        .await?;
                    tracing::info!(session_id = %session.id, "Session aborted");
                    return Ok(Reply::text(
                        "Okay, I dropped what we were doing. Send a command whenever you're ready.",
                    ));
                }
                self.dispatch(session, input).await
            }
        }
    }

    /// The user tapped "add" (or unblocked the bot).
    pub async fn register_follow(&self, user_id: &str) -> Result<Reply, Error> {
        match self.store.get_user(user_id).await? {
            None => {
                self.store.create_user(user_id).await?;
                tracing::info!(user_id, "User registered");
                Ok(welcome())
            }
            Some(_) => {
                self.store.set_user_active(user_id, true).await?;
                self.store.set_events_active_by_user(user_id, true).await?;
                tracing::info!(user_id, "User reactivated");
                Ok(welcome())
            }
        }
    }

    /// The user blocked the bot.
    pub async fn register_unfollow(&self, user_id: &str) -> Result<(), Error> {
        if self.store.get_user(user_id).await?.is_none() {
            tracing::warn!(user_id, "Unfollow for unknown user");
            return Ok(());
        }
        self.store.set_user_active(user_id, false).await?;
        self.store.set_events_active_by_user(user_id, false).await?;
        tracing::info!(user_id, "User deactivated");
        Ok(())
    }

    // ── Routing ─────────────────────────────────────────────────────

    async fn handle_idle(&self, user_id: &str, input: UserInput) -> Result<Reply, Error> {
        let UserInput::Text(text) = input else {
            // Picker postback after its conversation already ended.
            return Ok(Reply::text(
                "That conversation already ended. Send a command to start a new one.",
            ));
        };
        if !text.starts_with('/') {
            return Ok(greeting());
        }
        match Command::parse(&text) {
            None => Ok(Reply::text(
                "I don't know that command. Try /menu to see what I can do.",
            )),
            Some(Command::Abort) => Ok(Reply::text("There's nothing to abort right now.")),
            Some(Command::Menu) => Ok(menu()),
            Some(Command::Help) => Ok(help()),
            Some(Command::ViewAll) => flows::view_all::handle(self, user_id).await,
            Some(Command::New) => flows::new_event::start(self, user_id).await,
            Some(Command::Find) => flows::find_event::start(self, user_id).await,
            Some(Command::Done) => flows::done_event::start(self, user_id).await,
            Some(Command::Edit) => flows::edit_event::start(self, user_id).await,
            Some(Command::Delete) => flows::delete_event::start(self, user_id).await,
            Some(Command::Share) => flows::share_event::start(self, user_id).await,
            Some(Command::Receive) => flows::receive_event::start(self, user_id).await,
            Some(Command::Revoke) => flows::revoke_event::start(self, user_id).await,
            Some(Command::Settings) => flows::settings::start(self, user_id).await,
        }
    }

    async fn dispatch(&self, mut session: ChatSession, input: UserInput) -> Result<Reply, Error> {
        tracing::debug!(
            session_id = %session.id,
            chat_type = session.flow.chat_type(),
            step = session.flow.step_name(),
            "Routing ongoing session"
        );
        match session.flow.clone() {
            Flow::NewEvent(step) => flows::new_event::handle(self, &mut session, step, input).await,
            Flow::FindEvent(step) => flows::find_event::handle(self, &mut session, step, input).await,
            Flow::DoneEvent(step) => flows::done_event::handle(self, &mut session, step, input).await,
            Flow::EditEvent(step) => flows::edit_event::handle(self, &mut session, step, input).await,
            Flow::DeleteEvent(step) => {
                flows::delete_event::handle(self, &mut session, step, input).await
            }
            Flow::ShareEvent(step) => {
                flows::share_event::handle(self, &mut session, step, input).await
            }
            Flow::ReceiveEvent(step) => {
                flows::receive_event::handle(self, &mut session, step, input).await
            }
            Flow::RevokeEvent(step) => {
                flows::revoke_event::handle(self, &mut session, step, input).await
            }
            Flow::UserSettings(step) => {
                flows::settings::handle(self, &mut session, step, input).await
            }
        }
    }

    // ── Shared helpers for flow handlers ────────────────────────────

    /// "Today" in the bot's display timezone.
    pub(crate) fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// Fetch the user row, creating it on first contact. The platform's
    /// follow callback normally creates it, but that delivery is
    /// best-effort.
    pub(crate) async fn ensure_user(&self, user_id: &str) -> Result<User, Error> {
        if let Some(user) = self.store.get_user(user_id).await? {
            return Ok(user);
        }
        self.store.create_user(user_id).await?;
        tracing::info!(user_id, "User registered on first contact");
        self.require_user(user_id).await
    }

    /// Fetch a user row that must exist.
    pub(crate) async fn require_user(&self, user_id: &str) -> Result<User, Error> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::invariant(format!("user row missing: {user_id}")))
    }

    /// Fetch an event by an id held in session state; absence means the
    /// session has desynchronized from the events table.
    pub(crate) async fn require_event(&self, id: uuid::Uuid) -> Result<Event, Error> {
        self.store
            .get_event(id)
            .await?
            .ok_or_else(|| Error::invariant(format!("event row missing: {id}")))
    }

    /// Create a new ongoing session for the user.
    pub(crate) async fn begin(&self, user_id: &str, flow: Flow) -> Result<(), Error> {
        let session = ChatSession::start(user_id, flow);
        tracing::info!(
            session_id = %session.id,
            user_id,
            chat_type = session.flow.chat_type(),
            "Session created"
        );
        self.store.create_session(&session).await?;
        Ok(())
    }

    /// Advance the session to the next step.
    pub(crate) async fn advance(
        &self,
        session: &mut ChatSession,
        flow: Flow,
    ) -> Result<(), Error> {
        self.store.update_session_flow(session.id, &flow).await?;
        session.flow = flow;
        Ok(())
    }

    /// Terminate the session successfully.
    pub(crate) async fn complete(&self, session: &ChatSession) -> Result<(), Error> {
        self.store
            .finish_session(session.id, SessionStatus::Completed)
            .await?;
        tracing::info!(session_id = %session.id, "Session completed");
        Ok(())
    }
}

// ── Informational replies ───────────────────────────────────────────

const GREETINGS: &[&str] = &[
    "Hi! I keep track of the things you do on repeat. Try /menu.",
    "Hello there — ready to log something? /done is the fastest way.",
    "Hey! Need a nudge? /viewall shows everything I'm tracking for you.",
];

fn greeting() -> Reply {
    let text = GREETINGS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(GREETINGS[0]);
    Reply::text(text)
}

fn welcome() -> Reply {
    Reply::card(
        "Welcome!",
        vec![
            "I remind you about things you do on repeat — watering plants, changing filters, calling home.".to_string(),
            "Start with /new to create your first event.".to_string(),
            "Type /menu any time to see every command.".to_string(),
        ],
    )
}

fn menu() -> Reply {
    Reply::card(
        "Menu",
        vec![
            "/new — create an event".to_string(),
            "/done — log a completion".to_string(),
            "/find — look up one event".to_string(),
            "/viewall — list all events".to_string(),
            "/edit — rename, toggle reminders or change the cycle".to_string(),
            "/delete — remove an event".to_string(),
            "/share — share an event with a friend".to_string(),
            "/receive — redeem a share code".to_string(),
            "/revoke — stop sharing with someone".to_string(),
            "/settings — change your reminder time".to_string(),
            "/abort — cancel the current conversation".to_string(),
        ],
    )
}

fn help() -> Reply {
    Reply::card(
        "How it works",
        vec![
            "Every event has a cycle, like \"3 days\" or \"1 month\".".to_string(),
            "When you log a completion with /done, I compute the next due date from it.".to_string(),
            "Once an event is past due, I ping you during your daily reminder hour.".to_string(),
            "Stuck mid-conversation? /abort always gets you out.".to_string(),
        ],
    )
}
