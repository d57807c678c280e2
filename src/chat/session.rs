//! Chat sessions and their typed step graphs.
//!
//! Each conversation kind is a variant of [`Flow`]; each kind's step enum
//! carries exactly the data accumulated by the steps already passed, so a
//! handler can only read fields the step graph guarantees to exist. The
//! serialized flow is the session's payload; the `chat_type` and
//! `current_step` columns are derived from it for queries and debugging.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::SessionStatus;
use crate::recurrence::Cycle;

/// Persisted state of one in-progress multi-step conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: String,
    pub flow: Flow,
    pub status: SessionStatus,
}

impl ChatSession {
    /// Start a new ongoing session at the given flow's current step.
    pub fn start(user_id: &str, flow: Flow) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            flow,
            status: SessionStatus::Ongoing,
        }
    }
}

/// A conversation kind together with its current typed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "chat_type", content = "step", rename_all = "snake_case")]
pub enum Flow {
    NewEvent(NewEventStep),
    FindEvent(FindEventStep),
    DoneEvent(DoneEventStep),
    EditEvent(EditEventStep),
    DeleteEvent(DeleteEventStep),
    ShareEvent(ShareEventStep),
    ReceiveEvent(ReceiveEventStep),
    RevokeEvent(RevokeEventStep),
    UserSettings(UserSettingsStep),
}

impl Flow {
    pub fn chat_type(&self) -> &'static str {
        match self {
            Self::NewEvent(_) => "new_event",
            Self::FindEvent(_) => "find_event",
            Self::DoneEvent(_) => "done_event",
            Self::EditEvent(_) => "edit_event",
            Self::DeleteEvent(_) => "delete_event",
            Self::ShareEvent(_) => "share_event",
            Self::ReceiveEvent(_) => "receive_event",
            Self::RevokeEvent(_) => "revoke_event",
            Self::UserSettings(_) => "user_settings",
        }
    }

    pub fn step_name(&self) -> &'static str {
        match self {
            Self::NewEvent(step) => step.name(),
            Self::FindEvent(step) => step.name(),
            Self::DoneEvent(step) => step.name(),
            Self::EditEvent(step) => step.name(),
            Self::DeleteEvent(step) => step.name(),
            Self::ShareEvent(step) => step.name(),
            Self::ReceiveEvent(step) => step.name(),
            Self::RevokeEvent(step) => step.name(),
            Self::UserSettings(step) => step.name(),
        }
    }
}

/// A snapshot of the target event captured when a flow resolves it by
/// name. Mutating steps re-fetch by id before writing; the snapshot only
/// drives prompts and branching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub event_id: Uuid,
    pub name: String,
    pub reminder_enabled: bool,
    pub cycle: Option<Cycle>,
    pub last_done_at: NaiveDate,
}

/// A share recipient resolved through the profile lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub user_id: String,
    pub display_name: String,
}

/// Why the cycle-entry step of the edit flow was entered. Turning a
/// reminder on for an event without a cycle jumps here first; the terminal
/// handler branches on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleContinuation {
    ChangeCycle,
    EnableReminder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewEventStep {
    EnterName,
    SelectStartDate {
        name: String,
    },
    ChooseReminder {
        name: String,
        start_date: NaiveDate,
    },
    SelectCycle {
        name: String,
        start_date: NaiveDate,
    },
}

impl NewEventStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EnterName => "enter_name",
            Self::SelectStartDate { .. } => "select_start_date",
            Self::ChooseReminder { .. } => "choose_reminder",
            Self::SelectCycle { .. } => "select_cycle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindEventStep {
    EnterName,
}

impl FindEventStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EnterName => "enter_name",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoneEventStep {
    EnterName,
    SelectDoneDate { event_id: Uuid, name: String },
}

impl DoneEventStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EnterName => "enter_name",
            Self::SelectDoneDate { .. } => "select_done_date",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditEventStep {
    EnterName,
    SelectOption {
        event: EventSnapshot,
    },
    EnterNewName {
        event: EventSnapshot,
    },
    ConfirmToggle {
        event: EventSnapshot,
    },
    EnterCycle {
        event: EventSnapshot,
        continuation: CycleContinuation,
    },
}

impl EditEventStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EnterName => "enter_name",
            Self::SelectOption { .. } => "select_option",
            Self::EnterNewName { .. } => "enter_new_name",
            Self::ConfirmToggle { .. } => "confirm_toggle",
            Self::EnterCycle { .. } => "enter_cycle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteEventStep {
    EnterName,
    ConfirmDeletion {
        event_id: Uuid,
        name: String,
        last_done_at: NaiveDate,
        next_due_at: Option<NaiveDate>,
    },
}

impl DeleteEventStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EnterName => "enter_name",
            Self::ConfirmDeletion { .. } => "confirm_deletion",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareEventStep {
    EnterName,
}

impl ShareEventStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EnterName => "enter_name",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiveEventStep {
    EnterCode,
}

impl ReceiveEventStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EnterCode => "enter_code",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevokeEventStep {
    EnterName,
    SelectRecipient {
        event_id: Uuid,
        name: String,
        recipients: Vec<Recipient>,
    },
}

impl RevokeEventStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EnterName => "enter_name",
            Self::SelectRecipient { .. } => "select_recipient",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserSettingsStep {
    SelectOption,
    SelectTimeSlot { current_slot: u32 },
}

impl UserSettingsStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectOption => "select_option",
            Self::SelectTimeSlot { .. } => "select_time_slot",
        }
    }
}
