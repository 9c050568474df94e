//! Tests for the live log buffer against the mock control and stream seams.

use std::sync::Arc;
use std::time::Duration;

use logdeck_client::test_utils::{MockConnector, MockControl};
use logdeck_client::StreamEvent;
use logdeck_core::{ConnectionState, Credential, Error, LogTarget};

use crate::config::LiveLogSettings;
use crate::credentials::StaticCredentials;
use crate::live_log::{
    LiveLogBuffer, LiveLogDeps, LiveLogMessage, NoticeLevel, RecordingNotifier, RecordingView,
};

type TestBuffer = LiveLogBuffer<MockControl, MockConnector>;

struct Harness {
    buffer: TestBuffer,
    control: Arc<MockControl>,
    connector: Arc<MockConnector>,
    credentials: Arc<StaticCredentials>,
    notifier: Arc<RecordingNotifier>,
    view: Arc<RecordingView>,
}

fn target() -> LogTarget {
    LogTarget::new("10.0.0.5", "8080", "app.log").with_name("orders")
}

fn harness_with(settings: LiveLogSettings, control: MockControl) -> Harness {
    let control = Arc::new(control);
    let connector = Arc::new(MockConnector::new());
    let credentials = Arc::new(StaticCredentials::logged_in(Credential::new(
        "tok", "Bearer",
    )));
    let notifier = Arc::new(RecordingNotifier::new());
    let view = Arc::new(RecordingView::new());

    let buffer = LiveLogBuffer::new(
        target(),
        &settings,
        LiveLogDeps {
            control: Arc::clone(&control),
            connector: Arc::clone(&connector),
            credentials: credentials.clone(),
            notifier: notifier.clone(),
            view: view.clone(),
        },
    );

    Harness {
        buffer,
        control,
        connector,
        credentials,
        notifier,
        view,
    }
}

fn harness() -> Harness {
    harness_with(LiveLogSettings::default(), MockControl::new())
}

fn frame(text: &str) -> String {
    serde_json::json!({ "logContent": text }).to_string()
}

/// Step the buffer until `cond` holds
async fn drive_until(buffer: &mut TestBuffer, cond: impl Fn(&TestBuffer) -> bool) {
    for _ in 0..200 {
        if cond(buffer) {
            return;
        }
        let _ = tokio::time::timeout(Duration::from_millis(100), buffer.step()).await;
    }
    panic!("buffer never reached the expected condition");
}

/// Poll a condition on the collaborators
async fn wait_for(cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never became true");
}

async fn open(h: &mut Harness) {
    h.buffer.start().unwrap();
    drive_until(&mut h.buffer, |b| b.state() == ConnectionState::Open).await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Start / search / stop
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_start_without_credential_has_no_effect() {
    let mut h = harness();
    h.credentials.set(None);

    let err = h.buffer.start().unwrap_err();
    assert!(matches!(err, Error::Unauthenticated));
    assert_eq!(h.buffer.state(), ConnectionState::Idle);
    assert!(h.buffer.session_key().is_none());
    assert_eq!(h.notifier.count(NoticeLevel::Error), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.control.activation_count(), 0);
    assert_eq!(h.connector.connect_count(), 0);
}

#[tokio::test]
async fn test_start_activates_then_opens() {
    let mut h = harness();
    h.buffer.start().unwrap();
    assert_eq!(h.buffer.state(), ConnectionState::Connecting);

    drive_until(&mut h.buffer, |b| b.state() == ConnectionState::Open).await;

    let key = h.buffer.session_key().cloned().unwrap();
    assert_eq!(h.control.activation_keys(), vec![key.clone()]);
    assert!(h.control.activations()[0].search.is_none());

    let request = h.connector.last_request().unwrap();
    assert_eq!(request.session_key, key);
    assert_eq!(request.target, target());
    assert_eq!(h.connector.open_count(), 1);
}

#[tokio::test]
async fn test_login_after_construction_is_picked_up() {
    let mut h = harness();
    h.credentials.set(None);
    assert!(h.buffer.start().is_err());

    h.credentials.set(Some(Credential::new("fresh", "Bearer")));
    open(&mut h).await;
    assert_eq!(
        h.control.activations()[0].credential.access_token,
        "fresh"
    );
}

#[tokio::test]
async fn test_activation_failure_goes_idle_without_transport() {
    let mut h = harness_with(LiveLogSettings::default(), MockControl::rejecting());
    h.buffer.start().unwrap();

    let notifier = h.notifier.clone();
    drive_until(&mut h.buffer, |_| notifier.count(NoticeLevel::Error) == 1).await;

    assert_eq!(h.buffer.state(), ConnectionState::Idle);
    assert_eq!(h.connector.connect_count(), 0);
    assert!(h.buffer.session_key().is_some());
    assert!(!h.buffer.has_running_attempt());
}

#[tokio::test]
async fn test_connect_failure_closes() {
    let mut h = harness();
    h.connector.set_refuse(true);
    h.buffer.start().unwrap();

    drive_until(&mut h.buffer, |b| b.state() == ConnectionState::Closed).await;

    assert_eq!(h.control.activation_count(), 1);
    let (level, message) = h.notifier.last().unwrap();
    assert_eq!(level, NoticeLevel::Error);
    assert!(message.contains("refused"));
}

#[tokio::test]
async fn test_search_reuses_key_and_replaces_transport() {
    let mut h = harness();
    open(&mut h).await;
    let key = h.buffer.session_key().cloned().unwrap();

    h.buffer.search("ERROR").unwrap();
    assert_eq!(h.buffer.state(), ConnectionState::Connecting);
    assert_eq!(h.buffer.search_filter(), Some("ERROR"));
    drive_until(&mut h.buffer, |b| b.state() == ConnectionState::Open).await;

    assert_eq!(h.control.activation_keys(), vec![key.clone(), key.clone()]);
    assert_eq!(h.control.activations()[1].search.as_deref(), Some("ERROR"));
    assert_eq!(h.buffer.session_key(), Some(&key));
    assert_eq!(h.control.deactivation_count(), 0);

    let connector = h.connector.clone();
    wait_for(|| connector.open_count() == 1).await;
    assert_eq!(h.connector.connect_count(), 2);
}

#[tokio::test]
async fn test_empty_search_clears_filter() {
    let mut h = harness();
    h.buffer.search("WARN").unwrap();
    h.buffer.search("").unwrap();
    drive_until(&mut h.buffer, |b| b.state() == ConnectionState::Open).await;

    assert!(h.buffer.search_filter().is_none());
    let last = h.control.activations().pop().unwrap();
    assert!(last.search.is_none());
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let mut h = harness();
    open(&mut h).await;
    let key = h.buffer.session_key().cloned().unwrap();

    h.buffer.stop();
    assert_eq!(h.buffer.state(), ConnectionState::Closed);
    assert!(h.buffer.session_key().is_none());

    h.buffer.stop();
    assert_eq!(h.buffer.state(), ConnectionState::Closed);

    let control = h.control.clone();
    wait_for(|| control.deactivation_count() == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.control.deactivation_count(), 1);
    assert_eq!(h.control.deactivations()[0].session_key, key);
    assert_eq!(h.notifier.count(NoticeLevel::Success), 1);

    let connector = h.connector.clone();
    wait_for(|| connector.open_count() == 0).await;
}

#[tokio::test]
async fn test_wait_deactivated_after_stop() {
    let mut h = harness();
    open(&mut h).await;

    h.buffer.stop();
    h.buffer.wait_deactivated().await;
    assert_eq!(h.control.deactivation_count(), 1);
}

#[tokio::test]
async fn test_stop_before_start_stays_idle() {
    let mut h = harness();
    h.buffer.stop();

    assert_eq!(h.buffer.state(), ConnectionState::Idle);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.control.deactivation_count(), 0);
    assert!(h.notifier.notices().is_empty());
}

#[tokio::test]
async fn test_restart_after_stop_mints_new_key() {
    let mut h = harness();
    open(&mut h).await;
    let first = h.buffer.session_key().cloned().unwrap();

    h.buffer.stop();
    open(&mut h).await;
    let second = h.buffer.session_key().cloned().unwrap();

    assert_ne!(first, second);
}

#[tokio::test]
async fn test_drop_deactivates_and_closes() {
    let mut h = harness();
    open(&mut h).await;
    let key = h.buffer.session_key().cloned().unwrap();

    let Harness {
        buffer,
        control,
        connector,
        notifier,
        ..
    } = h;
    drop(buffer);

    wait_for(|| control.deactivation_count() == 1).await;
    assert_eq!(control.deactivations()[0].session_key, key);
    wait_for(|| connector.open_count() == 0).await;
    assert_eq!(notifier.count(NoticeLevel::Success), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Incoming lines
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_lines_arrive_in_order() {
    let mut h = harness();
    open(&mut h).await;

    for i in 1..=5 {
        assert!(h.connector.push_line(&format!("line {i}")).await);
    }
    drive_until(&mut h.buffer, |b| b.line_count() == 5).await;

    let texts: Vec<_> = h.buffer.lines().map(|l| l.text.clone()).collect();
    assert_eq!(texts, ["line 1", "line 2", "line 3", "line 4", "line 5"]);
    assert_eq!(h.view.lines(), texts);
}

#[tokio::test]
async fn test_malformed_frame_is_dropped_and_stream_continues() {
    let mut h = harness();
    open(&mut h).await;

    assert!(h.connector.push(StreamEvent::Text("not json".into())).await);
    assert!(h.connector.push_line("ok").await);
    drive_until(&mut h.buffer, |b| b.line_count() == 1).await;

    assert_eq!(h.buffer.state(), ConnectionState::Open);
    let errors: Vec<_> = h
        .notifier
        .notices()
        .into_iter()
        .filter(|(level, _)| *level == NoticeLevel::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].1.contains("decode"));
}

#[tokio::test]
async fn test_transport_error_keeps_lines_and_key() {
    let mut h = harness();
    open(&mut h).await;
    h.connector.push_line("before").await;
    drive_until(&mut h.buffer, |b| b.line_count() == 1).await;

    h.connector
        .push(StreamEvent::Error("connection reset".into()))
        .await;
    drive_until(&mut h.buffer, |b| b.state() == ConnectionState::Closed).await;

    assert_eq!(h.buffer.line_count(), 1);
    assert!(h.buffer.session_key().is_some());
    assert!(h.notifier.last().unwrap().1.contains("connection reset"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.control.activation_count(), 1);
    assert_eq!(h.connector.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_until_closed_returns_after_remote_close() {
    let mut h = harness();
    open(&mut h).await;

    for i in 1..=3 {
        h.connector.push_line(&format!("line {i}")).await;
    }
    h.connector.push(StreamEvent::Closed).await;

    tokio::time::timeout(Duration::from_secs(10), h.buffer.run_until_closed())
        .await
        .unwrap();
    assert_eq!(h.buffer.state(), ConnectionState::Closed);
    assert_eq!(h.buffer.line_count(), 3);
}

#[tokio::test]
async fn test_remote_close_warns() {
    let mut h = harness();
    open(&mut h).await;

    h.connector.push(StreamEvent::Closed).await;
    drive_until(&mut h.buffer, |b| b.state() == ConnectionState::Closed).await;

    assert_eq!(h.notifier.last().unwrap().0, NoticeLevel::Warning);
}

#[tokio::test]
async fn test_stale_generation_ignored() {
    let mut h = harness();
    open(&mut h).await;
    let stale = h.buffer.attempt_generation();
    h.buffer.search("x").unwrap();
    assert_ne!(h.buffer.attempt_generation(), stale);

    h.buffer.process_message(LiveLogMessage::Stream {
        generation: stale,
        event: StreamEvent::Text(frame("ghost")),
    });
    h.buffer.process_message(LiveLogMessage::Stream {
        generation: stale,
        event: StreamEvent::Error("late failure".into()),
    });

    assert_eq!(h.buffer.line_count(), 0);
    assert_eq!(h.buffer.state(), ConnectionState::Connecting);
    assert!(h.notifier.notices().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Coalescing and paging
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_view_updates_are_bounded_by_interval() {
    let mut h = harness();
    open(&mut h).await;

    let connector = h.connector.clone();
    let producer = tokio::spawn(async move {
        for i in 0..100 {
            connector.push_line(&format!("line {i}")).await;
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    });

    let started = tokio::time::Instant::now();
    tokio::time::timeout(Duration::from_secs(60), async {
        while h.buffer.line_count() < 100 {
            h.buffer.step().await;
        }
    })
    .await
    .unwrap();
    producer.await.unwrap();

    // ceil(D / 500ms) + 1 over the span the lines took to land
    let span = started.elapsed().as_millis() as u64;
    let bound = span.div_ceil(500) + 1;
    assert!(h.buffer.update_count() <= bound);
    assert!(h.buffer.update_count() >= 2);
    assert_eq!(h.view.update_count() as u64, h.buffer.update_count());

    let texts: Vec<_> = h.buffer.lines().map(|l| l.text.clone()).collect();
    let expected: Vec<_> = (0..100).map(|i| format!("line {i}")).collect();
    assert_eq!(texts, expected);
}

#[tokio::test(start_paused = true)]
async fn test_first_line_shows_immediately_then_coalesces() {
    let mut h = harness();

    h.buffer.append_incoming(&frame("one"));
    assert_eq!(h.buffer.line_count(), 1);
    assert_eq!(h.view.update_count(), 1);

    h.buffer.append_incoming(&frame("two"));
    h.buffer.append_incoming(&frame("three"));
    assert_eq!(h.buffer.line_count(), 1);
    assert_eq!(h.buffer.pending_count(), 2);

    let msg = h.buffer.next_message().await;
    assert_eq!(msg, LiveLogMessage::FlushDue);
    h.buffer.process_message(msg);
    assert_eq!(h.buffer.line_count(), 3);
    assert_eq!(h.view.update_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_flushes_pending_lines() {
    let mut h = harness();
    h.buffer.append_incoming(&frame("a"));
    h.buffer.append_incoming(&frame("b"));
    assert_eq!(h.buffer.pending_count(), 1);

    h.buffer.stop();
    assert_eq!(h.buffer.line_count(), 2);
    assert_eq!(h.buffer.pending_count(), 0);
}

#[tokio::test]
async fn test_paging_newest_first() {
    let mut h = harness();
    for i in 1..=45 {
        h.buffer.append_incoming(&frame(&format!("line {i}")));
    }
    h.buffer.flush();
    assert_eq!(h.buffer.line_count(), 45);
    assert_eq!(h.buffer.page_count(), 3);

    let expect = |range: std::ops::RangeInclusive<i32>| -> Vec<String> {
        range.map(|i| format!("line {i}")).collect()
    };

    assert_eq!(h.buffer.page(), 1);
    assert_eq!(h.view.lines(), expect(26..=45));

    assert_eq!(h.buffer.set_page(2), 2);
    assert_eq!(h.view.lines(), expect(6..=25));

    assert_eq!(h.buffer.set_page(3), 3);
    assert_eq!(h.view.lines(), expect(1..=5));
    let page: Vec<_> = h.buffer.current_page().iter().map(|l| l.text.clone()).collect();
    assert_eq!(page, expect(1..=5));

    assert_eq!(h.buffer.set_page(0), 1);
    assert_eq!(h.buffer.set_page(99), 3);
    assert_eq!(h.view.info().unwrap().page, 3);
}

#[tokio::test]
async fn test_next_and_prev_page() {
    let mut h = harness();
    for i in 1..=45 {
        h.buffer.append_incoming(&frame(&format!("line {i}")));
    }
    h.buffer.flush();

    assert_eq!(h.buffer.prev_page(), 1);
    assert_eq!(h.buffer.next_page(), 2);
    assert_eq!(h.buffer.next_page(), 3);
    assert_eq!(h.buffer.next_page(), 3);
    assert_eq!(h.buffer.prev_page(), 2);
}

#[tokio::test]
async fn test_empty_buffer_pages() {
    let mut h = harness();
    assert_eq!(h.buffer.page_count(), 0);
    assert_eq!(h.buffer.set_page(4), 1);
    assert!(h.view.lines().is_empty());
    assert!(h.buffer.current_page().is_empty());
}

#[tokio::test]
async fn test_line_cap_evicts_oldest() {
    let settings = LiveLogSettings {
        max_lines: Some(10),
        ..LiveLogSettings::default()
    };
    let mut h = harness_with(settings, MockControl::new());
    for i in 1..=25 {
        h.buffer.append_incoming(&frame(&format!("line {i}")));
    }
    h.buffer.flush();

    assert_eq!(h.buffer.line_count(), 10);
    assert_eq!(h.buffer.lines().next().unwrap().text, "line 16");
}

#[tokio::test]
async fn test_auto_scroll_follows_page_end() {
    let settings = LiveLogSettings {
        auto_scroll: true,
        ..LiveLogSettings::default()
    };
    let mut h = harness_with(settings, MockControl::new());
    for i in 1..=3 {
        h.buffer.append_incoming(&frame(&format!("line {i}")));
    }
    h.buffer.flush();
    assert_eq!(h.view.scrolls().last(), Some(&2));

    h.buffer.set_auto_scroll(false);
    let before = h.view.scrolls().len();
    h.buffer.set_page(1);
    assert_eq!(h.view.scrolls().len(), before);
}
