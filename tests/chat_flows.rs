//! End-to-end conversation tests: drive the engine through full flows
//! against the in-memory store, the way webhook deliveries would.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};

use routinely::chat::reply::Reply;
use routinely::chat::{ChatEngine, UserInput};
use routinely::error::GatewayError;
use routinely::gateway::ProfileLookup;
use routinely::model::{CompletionRecord, Event, Share};
use routinely::recurrence::{Cycle, CycleUnit};
use routinely::sharecode;
use routinely::store::{LibSqlStore, Store};
use uuid::Uuid;

/// Deterministic profile names for assertions.
struct StubProfiles;

#[async_trait]
impl ProfileLookup for StubProfiles {
    async fn display_name(&self, user_id: &str) -> Result<String, GatewayError> {
        Ok(format!("Friend {user_id}"))
    }
}

const FREE_PLAN_MAX: i64 = 5;

async fn setup() -> (Arc<LibSqlStore>, ChatEngine) {
    let store = Arc::new(LibSqlStore::memory().await.unwrap());
    let engine = ChatEngine::new(
        store.clone(),
        Arc::new(StubProfiles),
        chrono_tz::Asia::Taipei,
        FREE_PLAN_MAX,
    );
    (store, engine)
}

fn text(s: &str) -> UserInput {
    UserInput::Text(s.to_string())
}

fn date(y: i32, m: u32, d: u32) -> UserInput {
    UserInput::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn naive(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Flatten a reply (text, button labels, card lines) for assertions.
fn reply_text(reply: &Reply) -> String {
    match reply {
        Reply::Text { text } => text.clone(),
        Reply::Buttons { text, buttons } => {
            let labels: Vec<&str> = buttons.iter().map(|b| b.label.as_str()).collect();
            format!("{text}\n{}", labels.join("\n"))
        }
        Reply::Card { title, lines } => format!("{title}\n{}", lines.join("\n")),
    }
}

/// Insert an event directly, bypassing the create flow.
async fn seed_event(
    store: &LibSqlStore,
    user_id: &str,
    name: &str,
    cycle: Option<Cycle>,
    last_done: NaiveDate,
) -> Event {
    store.create_user(user_id).await.ok();
    let event = Event {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        name: name.to_string(),
        reminder_enabled: cycle.is_some(),
        cycle,
        last_done_at: last_done,
        next_due_at: cycle.map(|c| routinely::recurrence::compute_next_due(last_done, c)),
        share_count: 0,
        is_active: true,
    };
    store.create_event(&event).await.unwrap();
    store.adjust_event_count(user_id, 1).await.unwrap();
    store
        .create_record(&CompletionRecord::new(event.id, user_id, last_done))
        .await
        .unwrap();
    event
}

#[tokio::test]
async fn create_event_full_flow() {
    let (store, engine) = setup().await;

    let reply = engine.handle_message("u1", text("/new")).await.unwrap();
    assert!(reply_text(&reply).contains("call the new event"));

    // Single CJK character: too short, step does not advance.
    let reply = engine.handle_message("u1", text("水")).await.unwrap();
    assert!(reply_text(&reply).contains("at least 2"));
    let session = store.get_ongoing_session("u1").await.unwrap().unwrap();
    assert_eq!(session.flow.step_name(), "enter_name");

    let reply = engine.handle_message("u1", text("喝水")).await.unwrap();
    assert!(reply_text(&reply).contains("anchors the cycle"));

    let reply = engine.handle_message("u1", date(2024, 1, 1)).await.unwrap();
    assert!(reply_text(&reply).contains("remind you"));

    let reply = engine
        .handle_message("u1", text("Enable reminder"))
        .await
        .unwrap();
    assert!(reply_text(&reply).contains("How often"));

    let reply = engine.handle_message("u1", text("1 week")).await.unwrap();
    assert!(reply_text(&reply).contains("喝水"));
    assert!(reply_text(&reply).contains("2024-01-08"));

    let event = store.get_event_by_name("u1", "喝水").await.unwrap().unwrap();
    assert!(event.reminder_enabled);
    assert_eq!(event.cycle, Some(Cycle::new(1, CycleUnit::Week)));
    assert_eq!(event.last_done_at, naive(2024, 1, 1));
    assert_eq!(event.next_due_at, Some(naive(2024, 1, 8)));

    let user = store.get_user("u1").await.unwrap().unwrap();
    assert_eq!(user.event_count, 1);
    let records = store.list_recent_records(event.id, 10).await.unwrap();
    assert_eq!(records, vec![naive(2024, 1, 1)]);

    // Flow is finished: a stray picker postback no longer lands anywhere.
    assert!(store.get_ongoing_session("u1").await.unwrap().is_none());
    let reply = engine.handle_message("u1", date(2024, 1, 2)).await.unwrap();
    assert!(reply_text(&reply).contains("already ended"));
}

#[tokio::test]
async fn create_event_without_reminder() {
    let (store, engine) = setup().await;
    engine.handle_message("u1", text("/new")).await.unwrap();
    engine.handle_message("u1", text("stretch")).await.unwrap();
    engine.handle_message("u1", date(2024, 3, 10)).await.unwrap();
    let reply = engine
        .handle_message("u1", text("No reminder"))
        .await
        .unwrap();
    assert!(reply_text(&reply).contains("Reminders: off"));

    let event = store
        .get_event_by_name("u1", "stretch")
        .await
        .unwrap()
        .unwrap();
    assert!(!event.reminder_enabled);
    assert_eq!(event.cycle, None);
    assert_eq!(event.next_due_at, None);
}

#[tokio::test]
async fn duplicate_name_is_rejected_at_enter_name() {
    let (store, engine) = setup().await;
    seed_event(&store, "u1", "walk", None, naive(2024, 1, 1)).await;

    engine.handle_message("u1", text("/new")).await.unwrap();
    let reply = engine.handle_message("u1", text("walk")).await.unwrap();
    assert!(reply_text(&reply).contains("already have"));
    let session = store.get_ongoing_session("u1").await.unwrap().unwrap();
    assert_eq!(session.flow.step_name(), "enter_name");
}

#[tokio::test]
async fn future_start_date_is_rejected() {
    let (store, engine) = setup().await;
    engine.handle_message("u1", text("/new")).await.unwrap();
    engine.handle_message("u1", text("journal")).await.unwrap();

    let tomorrow = (Utc::now() + Duration::days(2))
        .with_timezone(&chrono_tz::Asia::Taipei)
        .date_naive();
    let reply = engine
        .handle_message("u1", UserInput::Date(tomorrow))
        .await
        .unwrap();
    assert!(reply_text(&reply).contains("future"));
    let session = store.get_ongoing_session("u1").await.unwrap().unwrap();
    assert_eq!(session.flow.step_name(), "select_start_date");
}

#[tokio::test]
async fn wrong_shaped_input_rerenders_without_advancing() {
    let (store, engine) = setup().await;
    engine.handle_message("u1", text("/new")).await.unwrap();

    // A date where text is expected.
    let reply = engine.handle_message("u1", date(2024, 1, 1)).await.unwrap();
    assert!(reply_text(&reply).contains("call the new event"));
    let session = store.get_ongoing_session("u1").await.unwrap().unwrap();
    assert_eq!(session.flow.step_name(), "enter_name");

    // Free text where the date picker is expected.
    engine.handle_message("u1", text("run")).await.unwrap();
    let reply = engine.handle_message("u1", text("yesterday")).await.unwrap();
    assert!(reply_text(&reply).contains("anchors the cycle"));
    let session = store.get_ongoing_session("u1").await.unwrap().unwrap();
    assert_eq!(session.flow.step_name(), "select_start_date");
}

#[tokio::test]
async fn limited_user_cannot_start_the_create_flow() {
    let (store, engine) = setup().await;
    store.create_user("u1").await.unwrap();
    store
        .adjust_event_count("u1", FREE_PLAN_MAX + 1)
        .await
        .unwrap();

    let reply = engine.handle_message("u1", text("/new")).await.unwrap();
    assert!(reply_text(&reply).contains("limit"));
    assert!(store.get_ongoing_session("u1").await.unwrap().is_none());
}

#[tokio::test]
async fn abort_ends_the_session() {
    let (store, engine) = setup().await;
    engine.handle_message("u1", text("/new")).await.unwrap();
    let reply = engine.handle_message("u1", text("/abort")).await.unwrap();
    assert!(reply_text(&reply).contains("dropped"));
    assert!(store.get_ongoing_session("u1").await.unwrap().is_none());

    // Nothing ongoing now.
    let reply = engine.handle_message("u1", text("/abort")).await.unwrap();
    assert!(reply_text(&reply).contains("nothing to abort"));
}

#[tokio::test]
async fn mark_done_backfill_does_not_regress_due_dates() {
    let (store, engine) = setup().await;
    let cycle = Cycle::new(1, CycleUnit::Week);
    let event = seed_event(&store, "u1", "water plants", Some(cycle), naive(2024, 1, 10)).await;

    // Backfill an earlier completion.
    engine.handle_message("u1", text("/done")).await.unwrap();
    engine
        .handle_message("u1", text("water plants"))
        .await
        .unwrap();
    let reply = engine.handle_message("u1", date(2024, 1, 5)).await.unwrap();
    assert!(reply_text(&reply).contains("unchanged"));

    let loaded = store.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(loaded.last_done_at, naive(2024, 1, 10));
    assert_eq!(loaded.next_due_at, Some(naive(2024, 1, 17)));

    // A strictly later completion advances both.
    engine.handle_message("u1", text("/done")).await.unwrap();
    engine
        .handle_message("u1", text("water plants"))
        .await
        .unwrap();
    let reply = engine.handle_message("u1", date(2024, 1, 12)).await.unwrap();
    assert!(reply_text(&reply).contains("2024-01-19"));

    let loaded = store.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(loaded.last_done_at, naive(2024, 1, 12));
    assert_eq!(loaded.next_due_at, Some(naive(2024, 1, 19)));

    // Seed record plus the two logged above.
    let records = store.list_recent_records(event.id, 10).await.unwrap();
    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn mark_done_rejects_future_dates() {
    let (store, engine) = setup().await;
    let event = seed_event(
        &store,
        "u1",
        "stretch",
        Some(Cycle::new(3, CycleUnit::Day)),
        naive(2024, 1, 1),
    )
    .await;

    engine.handle_message("u1", text("/done")).await.unwrap();
    engine.handle_message("u1", text("stretch")).await.unwrap();

    let tomorrow = (Utc::now() + Duration::days(2))
        .with_timezone(&chrono_tz::Asia::Taipei)
        .date_naive();
    let reply = engine
        .handle_message("u1", UserInput::Date(tomorrow))
        .await
        .unwrap();
    assert!(reply_text(&reply).contains("hasn't happened yet"));

    let session = store.get_ongoing_session("u1").await.unwrap().unwrap();
    assert_eq!(session.flow.step_name(), "select_done_date");
    // Only the seed record exists.
    assert_eq!(store.list_recent_records(event.id, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn edit_rename_rejects_duplicates_then_succeeds() {
    let (store, engine) = setup().await;
    seed_event(&store, "u1", "walk", None, naive(2024, 1, 1)).await;
    seed_event(&store, "u1", "run", None, naive(2024, 1, 1)).await;

    engine.handle_message("u1", text("/edit")).await.unwrap();
    engine.handle_message("u1", text("walk")).await.unwrap();
    engine.handle_message("u1", text("Name")).await.unwrap();

    let reply = engine.handle_message("u1", text("run")).await.unwrap();
    assert!(reply_text(&reply).contains("already have"));

    let reply = engine.handle_message("u1", text("hike")).await.unwrap();
    assert!(reply_text(&reply).contains("hike"));
    assert!(store.get_event_by_name("u1", "hike").await.unwrap().is_some());
    assert!(store.get_event_by_name("u1", "walk").await.unwrap().is_none());
}

#[tokio::test]
async fn edit_toggle_on_without_cycle_detours_into_cycle_entry() {
    let (store, engine) = setup().await;
    let event = seed_event(&store, "u1", "stretch", None, naive(2024, 3, 10)).await;

    engine.handle_message("u1", text("/edit")).await.unwrap();
    engine.handle_message("u1", text("stretch")).await.unwrap();
    engine.handle_message("u1", text("Reminder")).await.unwrap();
    let reply = engine
        .handle_message("u1", text("Yes, change it"))
        .await
        .unwrap();
    assert!(reply_text(&reply).contains("need a cycle"));

    let session = store.get_ongoing_session("u1").await.unwrap().unwrap();
    assert_eq!(session.flow.step_name(), "enter_cycle");

    let reply = engine.handle_message("u1", text("2 weeks")).await.unwrap();
    assert!(reply_text(&reply).contains("Reminders on"));

    let loaded = store.get_event(event.id).await.unwrap().unwrap();
    assert!(loaded.reminder_enabled);
    assert_eq!(loaded.cycle, Some(Cycle::new(2, CycleUnit::Week)));
    // Anchored to the event's last completion, not today.
    assert_eq!(loaded.next_due_at, Some(naive(2024, 3, 24)));
}

#[tokio::test]
async fn edit_toggle_off_clears_the_due_date_but_keeps_the_cycle() {
    let (store, engine) = setup().await;
    let event = seed_event(
        &store,
        "u1",
        "water plants",
        Some(Cycle::new(1, CycleUnit::Week)),
        naive(2024, 1, 1),
    )
    .await;

    engine.handle_message("u1", text("/edit")).await.unwrap();
    engine
        .handle_message("u1", text("water plants"))
        .await
        .unwrap();
    engine.handle_message("u1", text("Reminder")).await.unwrap();
    let reply = engine
        .handle_message("u1", text("Yes, change it"))
        .await
        .unwrap();
    assert!(reply_text(&reply).contains("off"));

    let loaded = store.get_event(event.id).await.unwrap().unwrap();
    assert!(!loaded.reminder_enabled);
    assert_eq!(loaded.cycle, Some(Cycle::new(1, CycleUnit::Week)));
    assert_eq!(loaded.next_due_at, None);
}

#[tokio::test]
async fn edit_cycle_requires_reminder_enabled() {
    let (store, engine) = setup().await;
    seed_event(&store, "u1", "stretch", None, naive(2024, 3, 10)).await;

    engine.handle_message("u1", text("/edit")).await.unwrap();
    engine.handle_message("u1", text("stretch")).await.unwrap();
    let reply = engine.handle_message("u1", text("Cycle")).await.unwrap();
    assert!(reply_text(&reply).contains("reminders turned off"));

    // Back at (still on) the option step, not advanced into cycle entry.
    let session = store.get_ongoing_session("u1").await.unwrap().unwrap();
    assert_eq!(session.flow.step_name(), "select_option");
}

#[tokio::test]
async fn edit_cycle_recomputes_from_the_stored_anchor() {
    let (store, engine) = setup().await;
    let event = seed_event(
        &store,
        "u1",
        "filter change",
        Some(Cycle::new(1, CycleUnit::Week)),
        naive(2024, 1, 1),
    )
    .await;

    engine.handle_message("u1", text("/edit")).await.unwrap();
    engine
        .handle_message("u1", text("filter change"))
        .await
        .unwrap();
    engine.handle_message("u1", text("Cycle")).await.unwrap();
    let reply = engine.handle_message("u1", text("1 month")).await.unwrap();
    assert!(reply_text(&reply).contains("2024-02-01"));

    let loaded = store.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(loaded.cycle, Some(Cycle::new(1, CycleUnit::Month)));
    assert_eq!(loaded.next_due_at, Some(naive(2024, 2, 1)));
}

#[tokio::test]
async fn delete_cascades_shares_records_and_count() {
    let (store, engine) = setup().await;
    let event = seed_event(
        &store,
        "u1",
        "old habit",
        Some(Cycle::new(1, CycleUnit::Day)),
        naive(2024, 1, 1),
    )
    .await;
    for day in 2..=5 {
        store
            .create_record(&CompletionRecord::new(event.id, "u1", naive(2024, 1, day)))
            .await
            .unwrap();
    }
    store
        .create_share(&Share::new(event.id, "u1", "f1"))
        .await
        .unwrap();
    store
        .create_share(&Share::new(event.id, "u1", "f2"))
        .await
        .unwrap();

    engine.handle_message("u1", text("/delete")).await.unwrap();
    let reply = engine.handle_message("u1", text("old habit")).await.unwrap();
    assert!(reply_text(&reply).contains("Delete"));
    let reply = engine
        .handle_message("u1", text("Delete event"))
        .await
        .unwrap();
    assert!(reply_text(&reply).contains("gone"));

    assert!(store.get_event(event.id).await.unwrap().is_none());
    assert!(store.list_recent_records(event.id, 10).await.unwrap().is_empty());
    assert!(store.list_share_recipients(event.id).await.unwrap().is_empty());
    let user = store.get_user("u1").await.unwrap().unwrap();
    assert_eq!(user.event_count, 0);
}

#[tokio::test]
async fn delete_cancel_leaves_everything_alone() {
    let (store, engine) = setup().await;
    let event = seed_event(&store, "u1", "keep me", None, naive(2024, 1, 1)).await;

    engine.handle_message("u1", text("/delete")).await.unwrap();
    engine.handle_message("u1", text("keep me")).await.unwrap();
    let reply = engine.handle_message("u1", text("Keep it")).await.unwrap();
    assert!(reply_text(&reply).contains("Nothing was deleted"));

    assert!(store.get_event(event.id).await.unwrap().is_some());
    let user = store.get_user("u1").await.unwrap().unwrap();
    assert_eq!(user.event_count, 1);
}

#[tokio::test]
async fn deleting_an_unknown_name_reports_not_found() {
    let (store, engine) = setup().await;
    engine.handle_message("u1", text("/delete")).await.unwrap();
    let reply = engine.handle_message("u1", text("no such")).await.unwrap();
    assert!(reply_text(&reply).contains("couldn't find"));
    let session = store.get_ongoing_session("u1").await.unwrap().unwrap();
    assert_eq!(session.flow.step_name(), "enter_name");
}

#[tokio::test]
async fn share_receive_revoke_round_trip() {
    let (store, engine) = setup().await;
    let event = seed_event(
        &store,
        "owner",
        "water plants",
        Some(Cycle::new(1, CycleUnit::Week)),
        naive(2024, 1, 1),
    )
    .await;

    // Owner issues a share code.
    engine.handle_message("owner", text("/share")).await.unwrap();
    let reply = engine
        .handle_message("owner", text("water plants"))
        .await
        .unwrap();
    let code = sharecode::encode(event.id);
    assert!(reply_text(&reply).contains(&code));

    // Recipient redeems it.
    engine
        .handle_message("friend", text("/receive"))
        .await
        .unwrap();
    let reply = engine.handle_message("friend", text(&code)).await.unwrap();
    assert!(reply_text(&reply).contains("Friend owner"));
    assert!(store.share_exists(event.id, "friend").await.unwrap());
    let loaded = store.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(loaded.share_count, 1);

    // Redeeming twice short-circuits without another share.
    engine
        .handle_message("friend", text("/receive"))
        .await
        .unwrap();
    let reply = engine.handle_message("friend", text(&code)).await.unwrap();
    assert!(reply_text(&reply).contains("already subscribed"));
    let loaded = store.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(loaded.share_count, 1);

    // Owner revokes it again.
    engine.handle_message("owner", text("/revoke")).await.unwrap();
    let reply = engine
        .handle_message("owner", text("water plants"))
        .await
        .unwrap();
    assert!(reply_text(&reply).contains("Friend friend"));
    let reply = engine
        .handle_message("owner", text("Friend friend"))
        .await
        .unwrap();
    assert!(reply_text(&reply).contains("no longer gets reminders"));
    assert!(!store.share_exists(event.id, "friend").await.unwrap());
    let loaded = store.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(loaded.share_count, 0);
}

#[tokio::test]
async fn share_requires_reminder_and_respects_the_cap() {
    let (store, engine) = setup().await;
    seed_event(&store, "u1", "no reminder", None, naive(2024, 1, 1)).await;
    let capped = seed_event(
        &store,
        "u1",
        "popular",
        Some(Cycle::new(1, CycleUnit::Week)),
        naive(2024, 1, 1),
    )
    .await;
    store.adjust_share_count(capped.id, 4).await.unwrap();

    engine.handle_message("u1", text("/share")).await.unwrap();
    let reply = engine
        .handle_message("u1", text("no reminder"))
        .await
        .unwrap();
    assert!(reply_text(&reply).contains("nothing to share"));
    assert!(store.get_ongoing_session("u1").await.unwrap().is_none());

    engine.handle_message("u1", text("/share")).await.unwrap();
    let reply = engine.handle_message("u1", text("popular")).await.unwrap();
    assert!(reply_text(&reply).contains("Revoke one"));
    assert!(store.get_ongoing_session("u1").await.unwrap().is_none());
}

#[tokio::test]
async fn receiving_a_bad_code_allows_retry() {
    let (store, engine) = setup().await;
    engine.handle_message("u1", text("/receive")).await.unwrap();
    let reply = engine
        .handle_message("u1", text("not-a-code"))
        .await
        .unwrap();
    assert!(reply_text(&reply).contains("doesn't look right"));
    let session = store.get_ongoing_session("u1").await.unwrap().unwrap();
    assert_eq!(session.flow.step_name(), "enter_code");
}

#[tokio::test]
async fn receiving_a_share_for_a_muted_event_is_refused() {
    let (store, engine) = setup().await;
    // Event exists but its reminder was turned off after the code went out.
    let event = seed_event(&store, "owner", "quiet", None, naive(2024, 1, 1)).await;
    let code = sharecode::encode(event.id);

    engine.handle_message("friend", text("/receive")).await.unwrap();
    let reply = engine.handle_message("friend", text(&code)).await.unwrap();
    assert!(reply_text(&reply).contains("isn't accepting shares"));
    assert!(!store.share_exists(event.id, "friend").await.unwrap());
}

#[tokio::test]
async fn revoking_with_no_recipients_short_circuits() {
    let (store, engine) = setup().await;
    seed_event(
        &store,
        "u1",
        "solo",
        Some(Cycle::new(1, CycleUnit::Week)),
        naive(2024, 1, 1),
    )
    .await;

    engine.handle_message("u1", text("/revoke")).await.unwrap();
    let reply = engine.handle_message("u1", text("solo")).await.unwrap();
    assert!(reply_text(&reply).contains("nothing to revoke"));
    assert!(store.get_ongoing_session("u1").await.unwrap().is_none());
}

#[tokio::test]
async fn settings_rejects_off_hour_times() {
    let (store, engine) = setup().await;
    engine.handle_message("u1", text("/settings")).await.unwrap();
    engine
        .handle_message("u1", text("Notification time"))
        .await
        .unwrap();

    let half_past = NaiveTime::from_hms_opt(21, 30, 0).unwrap();
    let reply = engine
        .handle_message("u1", UserInput::Time(half_past))
        .await
        .unwrap();
    assert!(reply_text(&reply).contains("on the hour"));
    let session = store.get_ongoing_session("u1").await.unwrap().unwrap();
    assert_eq!(session.flow.step_name(), "select_time_slot");

    let on_the_hour = NaiveTime::from_hms_opt(21, 0, 0).unwrap();
    let reply = engine
        .handle_message("u1", UserInput::Time(on_the_hour))
        .await
        .unwrap();
    assert!(reply_text(&reply).contains("21:00"));

    let user = store.get_user("u1").await.unwrap().unwrap();
    assert_eq!(user.notification_slot, 21);
    assert!(store.get_ongoing_session("u1").await.unwrap().is_none());
}

#[tokio::test]
async fn find_and_view_all() {
    let (store, engine) = setup().await;
    seed_event(
        &store,
        "u1",
        "water plants",
        Some(Cycle::new(1, CycleUnit::Week)),
        naive(2024, 1, 1),
    )
    .await;
    seed_event(&store, "u1", "stretch", None, naive(2024, 2, 1)).await;

    engine.handle_message("u1", text("/find")).await.unwrap();
    let reply = engine
        .handle_message("u1", text("water plants"))
        .await
        .unwrap();
    let rendered = reply_text(&reply);
    assert!(rendered.contains("water plants"));
    assert!(rendered.contains("every 1 week"));
    assert!(rendered.contains("2024-01-08"));
    assert!(store.get_ongoing_session("u1").await.unwrap().is_none());

    let reply = engine.handle_message("u1", text("/viewall")).await.unwrap();
    let rendered = reply_text(&reply);
    assert!(rendered.contains("Your events (2)"));
    assert!(rendered.contains("stretch"));
    // View-all never opens a session.
    assert!(store.get_ongoing_session("u1").await.unwrap().is_none());
}

#[tokio::test]
async fn idle_messages_get_greetings_and_unknown_commands_are_called_out() {
    let (_store, engine) = setup().await;
    let reply = engine.handle_message("u1", text("hello there")).await.unwrap();
    assert!(matches!(reply, Reply::Text { .. }));

    let reply = engine.handle_message("u1", text("/bogus")).await.unwrap();
    assert!(reply_text(&reply).contains("don't know that command"));
}

#[tokio::test]
async fn follow_and_unfollow_toggle_activeness() {
    let (store, engine) = setup().await;
    let reply = engine.register_follow("u1").await.unwrap();
    assert!(reply_text(&reply).contains("Welcome"));
    seed_event(&store, "u1", "walk", None, naive(2024, 1, 1)).await;

    engine.register_unfollow("u1").await.unwrap();
    let user = store.get_user("u1").await.unwrap().unwrap();
    assert!(!user.is_active);
    let event = store.get_event_by_name("u1", "walk").await.unwrap().unwrap();
    assert!(!event.is_active);

    engine.register_follow("u1").await.unwrap();
    let user = store.get_user("u1").await.unwrap().unwrap();
    assert!(user.is_active);
    let event = store.get_event_by_name("u1", "walk").await.unwrap().unwrap();
    assert!(event.is_active);

    // Unfollow for a user we never saw is tolerated.
    engine.register_unfollow("ghost").await.unwrap();
}
