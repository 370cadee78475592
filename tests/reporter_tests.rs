//! Tests for the periodic location reporter.
//!
//! All tests run on a paused tokio clock, so sampling intervals of minutes
//! complete instantly and deterministically.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use shiftwatch::clock::ManualClock;
use shiftwatch::error::{LocationUnavailable, NotifyError, ReportError, ReporterError};
use shiftwatch::models::{Assignment, Position, PositionOptions};
use shiftwatch::services::complaints::{ComplaintBook, ComplaintNotifier, ViolationNotifier};
use shiftwatch::services::live::{LiveLocationRegistry, LiveLocationSink, PositionSink};
use shiftwatch::tracking::{
    LocationReporter, Positioning, ReporterConfig, ScriptedPositioning, ShiftSession, TrackerConfig,
    TrackerPhase,
};

#[derive(Default)]
struct RecordingSink {
    reports: Mutex<Vec<(f64, f64)>>,
}

#[async_trait]
impl PositionSink for RecordingSink {
    async fn report(&self, latitude: f64, longitude: f64) -> Result<(), ReportError> {
        self.reports.lock().push((latitude, longitude));
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl PositionSink for FailingSink {
    async fn report(&self, _latitude: f64, _longitude: f64) -> Result<(), ReportError> {
        Err(ReportError::Failed("upstream rejected".to_string()))
    }
}

struct HangingSink;

#[async_trait]
impl PositionSink for HangingSink {
    async fn report(&self, _latitude: f64, _longitude: f64) -> Result<(), ReportError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

/// Records each report only after `delay` has passed.
struct SlowSink {
    delay: Duration,
    reports: Mutex<Vec<(f64, f64)>>,
}

#[async_trait]
impl PositionSink for SlowSink {
    async fn report(&self, latitude: f64, longitude: f64) -> Result<(), ReportError> {
        tokio::time::sleep(self.delay).await;
        self.reports.lock().push((latitude, longitude));
        Ok(())
    }
}

/// Lodges into the complaint book after `delay`.
struct SlowNotifier {
    delay: Duration,
    inner: ComplaintNotifier,
}

#[async_trait]
impl ViolationNotifier for SlowNotifier {
    async fn report_violation(&self, guard_id: &str) -> Result<(), NotifyError> {
        tokio::time::sleep(self.delay).await;
        self.inner.report_violation(guard_id).await
    }
}

/// Takes `delay` to answer and records how many requests overlap.
struct SlowPositioning {
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: AtomicUsize,
}

impl SlowPositioning {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Positioning for SlowPositioning {
    async fn current_position(&self, _options: PositionOptions) -> Result<Position, LocationUnavailable> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(fix(10.0, 10.0, t0()))
    }
}

const HOUR_MS: i64 = 3_600_000;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
}

fn at(ms: i64) -> DateTime<Utc> {
    t0() + ChronoDuration::milliseconds(ms)
}

fn fix(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Position {
    Position {
        latitude,
        longitude,
        accuracy_m: Some(5.0),
        timestamp,
    }
}

fn assignment() -> Assignment {
    Assignment {
        id: Uuid::new_v4(),
        guard_id: "guard-7".to_string(),
        target_latitude: 10.0,
        target_longitude: 10.0,
        from: t0(),
        to: at(HOUR_MS),
    }
}

fn config() -> ReporterConfig {
    ReporterConfig {
        interval: Duration::from_secs(1),
        position_options: PositionOptions {
            high_accuracy: true,
            timeout_ms: 30_000,
            max_age_ms: 0,
        },
        collaborator_timeout: Duration::from_secs(10),
    }
}

fn idle_session(clock: Arc<ManualClock>) -> Arc<ShiftSession> {
    Arc::new(ShiftSession::new(
        TrackerConfig::default(),
        Arc::new(ComplaintNotifier::new(Arc::new(ComplaintBook::new()))),
        clock,
        Duration::from_secs(10),
    ))
}

fn fixes_every_second(count: i64) -> Vec<Result<Position, LocationUnavailable>> {
    (0..count).map(|i| Ok(fix(10.0, 10.0, at(i * 1_000)))).collect()
}

// ==================== Lifecycle ====================

#[tokio::test(start_paused = true)]
async fn test_first_sample_is_immediate() {
    let positioning = Arc::new(ScriptedPositioning::new(fixes_every_second(5)));
    let sink = Arc::new(RecordingSink::default());
    let reporter = LocationReporter::new(
        positioning.clone(),
        sink.clone(),
        idle_session(Arc::new(ManualClock::new(t0()))),
        config(),
    );

    reporter.start_with(Duration::from_secs(60)).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(positioning.requests(), 1);
    assert_eq!(sink.reports.lock().len(), 1);
    reporter.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_samples_at_fixed_cadence() {
    let positioning = Arc::new(ScriptedPositioning::new(fixes_every_second(20)));
    let reporter = LocationReporter::new(
        positioning.clone(),
        Arc::new(RecordingSink::default()),
        idle_session(Arc::new(ManualClock::new(t0()))),
        config(),
    );

    reporter.start_with(Duration::from_secs(1)).unwrap();
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    reporter.stop().await;

    // ticks at 0s, 1s, 2s and 3s
    assert_eq!(positioning.requests(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_stop_halts_sampling() {
    let positioning = Arc::new(ScriptedPositioning::new(fixes_every_second(100)));
    let reporter = LocationReporter::new(
        positioning.clone(),
        Arc::new(RecordingSink::default()),
        idle_session(Arc::new(ManualClock::new(t0()))),
        config(),
    );

    reporter.start_with(Duration::from_secs(1)).unwrap();
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    reporter.stop().await;
    assert!(!reporter.is_running());

    let after_stop = positioning.requests();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(positioning.requests(), after_stop);
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() {
    let reporter = LocationReporter::new(
        Arc::new(ScriptedPositioning::new(fixes_every_second(5))),
        Arc::new(RecordingSink::default()),
        idle_session(Arc::new(ManualClock::new(t0()))),
        config(),
    );

    // before start
    reporter.stop().await;

    reporter.start_with(Duration::from_secs(1)).unwrap();
    reporter.stop().await;
    reporter.stop().await;
    assert!(!reporter.is_running());

    // can be started again
    reporter.start_with(Duration::from_secs(1)).unwrap();
    assert!(reporter.is_running());
    reporter.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_start_uses_configured_interval() {
    let positioning = Arc::new(ScriptedPositioning::new(fixes_every_second(20)));
    let reporter = LocationReporter::new(
        positioning.clone(),
        Arc::new(RecordingSink::default()),
        idle_session(Arc::new(ManualClock::new(t0()))),
        ReporterConfig {
            interval: Duration::from_secs(2),
            ..config()
        },
    );

    reporter.start().unwrap();
    tokio::time::sleep(Duration::from_millis(4_500)).await;
    reporter.stop().await;

    // ticks at 0s, 2s and 4s
    assert_eq!(positioning.requests(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_configured_zero_interval_rejected() {
    let reporter = LocationReporter::new(
        Arc::new(ScriptedPositioning::new(Vec::new())),
        Arc::new(RecordingSink::default()),
        idle_session(Arc::new(ManualClock::new(t0()))),
        ReporterConfig {
            interval: Duration::ZERO,
            ..config()
        },
    );
    assert_eq!(reporter.start(), Err(ReporterError::InvalidInterval));
}

#[tokio::test(start_paused = true)]
async fn test_double_start_rejected() {
    let reporter = LocationReporter::new(
        Arc::new(ScriptedPositioning::new(fixes_every_second(5))),
        Arc::new(RecordingSink::default()),
        idle_session(Arc::new(ManualClock::new(t0()))),
        config(),
    );

    reporter.start_with(Duration::from_secs(1)).unwrap();
    assert_eq!(reporter.start_with(Duration::from_secs(1)), Err(ReporterError::AlreadyRunning));
    reporter.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_zero_interval_rejected() {
    let reporter = LocationReporter::new(
        Arc::new(ScriptedPositioning::new(Vec::new())),
        Arc::new(RecordingSink::default()),
        idle_session(Arc::new(ManualClock::new(t0()))),
        config(),
    );
    assert_eq!(reporter.start_with(Duration::ZERO), Err(ReporterError::InvalidInterval));
    assert!(!reporter.is_running());
}

// ==================== Failures ====================

#[tokio::test(start_paused = true)]
async fn test_location_failures_do_not_stop_cycle() {
    let positioning = Arc::new(ScriptedPositioning::new(vec![
        Err(LocationUnavailable::PermissionDenied),
        Ok(fix(10.0, 10.0, at(1_000))),
        Err(LocationUnavailable::Timeout),
        Ok(fix(10.0, 10.0, at(3_000))),
    ]));
    let sink = Arc::new(RecordingSink::default());
    let reporter = LocationReporter::new(
        positioning.clone(),
        sink.clone(),
        idle_session(Arc::new(ManualClock::new(t0()))),
        config(),
    );

    reporter.start_with(Duration::from_secs(1)).unwrap();
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    reporter.stop().await;

    assert_eq!(positioning.requests(), 4);
    assert_eq!(sink.reports.lock().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_fix_times_out() {
    let positioning = Arc::new(SlowPositioning::new(Duration::from_secs(5)));
    let sink = Arc::new(RecordingSink::default());
    let mut cfg = config();
    cfg.position_options.timeout_ms = 1_000;

    let session = idle_session(Arc::new(ManualClock::new(t0())));
    let reporter = LocationReporter::new(positioning.clone(), sink.clone(), session.clone(), cfg);

    reporter.start_with(Duration::from_secs(2)).unwrap();
    tokio::time::sleep(Duration::from_millis(6_500)).await;
    reporter.stop().await;

    assert!(positioning.requests.load(Ordering::SeqCst) >= 3);
    assert!(sink.reports.lock().is_empty());
    assert!(!session.status().has_fix());
}

#[tokio::test(start_paused = true)]
async fn test_sink_failure_does_not_stop_tracking() {
    let clock = Arc::new(ManualClock::new(t0()));
    let session = idle_session(clock);
    session.load_assignment(assignment()).unwrap();

    let reporter = LocationReporter::new(
        Arc::new(ScriptedPositioning::new(fixes_every_second(10))),
        Arc::new(FailingSink),
        session.clone(),
        config(),
    );

    reporter.start_with(Duration::from_secs(1)).unwrap();
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    reporter.stop().await;

    // fixes at 0s, 1s and 2s all inside
    assert_eq!(session.status().state.total_inside_time_ms, 2_000);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_sink_is_bounded_by_timeout() {
    let positioning = Arc::new(ScriptedPositioning::new(fixes_every_second(10)));
    let reporter = LocationReporter::new(
        positioning.clone(),
        Arc::new(HangingSink),
        idle_session(Arc::new(ManualClock::new(t0()))),
        config(),
    );

    reporter.start_with(Duration::from_secs(1)).unwrap();
    tokio::time::sleep(Duration::from_secs(25)).await;
    reporter.stop().await;

    // each upload gives up after 10s, so sampling resumes
    assert!(positioning.requests() >= 3);
}

// ==================== Concurrency ====================

#[tokio::test(start_paused = true)]
async fn test_position_requests_never_overlap() {
    let positioning = Arc::new(SlowPositioning::new(Duration::from_millis(2_500)));
    let reporter = LocationReporter::new(
        positioning.clone(),
        Arc::new(RecordingSink::default()),
        idle_session(Arc::new(ManualClock::new(t0()))),
        config(),
    );

    reporter.start_with(Duration::from_secs(1)).unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    reporter.stop().await;

    assert_eq!(positioning.max_in_flight.load(Ordering::SeqCst), 1);
    let requests = positioning.requests.load(Ordering::SeqCst);
    // missed ticks are dropped, not queued
    assert!(requests >= 2 && requests <= 5, "got {} requests", requests);
}

#[tokio::test(start_paused = true)]
async fn test_stop_interrupts_outstanding_request() {
    let positioning = Arc::new(SlowPositioning::new(Duration::from_secs(20)));
    let session = idle_session(Arc::new(ManualClock::new(t0())));
    let reporter = LocationReporter::new(
        positioning.clone(),
        Arc::new(RecordingSink::default()),
        session.clone(),
        config(),
    );

    reporter.start_with(Duration::from_secs(1)).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    reporter.stop().await;

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(!session.status().has_fix());
    assert_eq!(positioning.requests.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sample_now_dropped_while_loop_tick_in_flight() {
    let positioning = Arc::new(SlowPositioning::new(Duration::from_secs(5)));
    let reporter = LocationReporter::new(
        positioning.clone(),
        Arc::new(RecordingSink::default()),
        idle_session(Arc::new(ManualClock::new(t0()))),
        config(),
    );

    reporter.start_with(Duration::from_secs(60)).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(!reporter.sample_now().await);
    assert_eq!(positioning.requests.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(6)).await;
    reporter.stop().await;
    assert_eq!(positioning.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_loop_ticks_dropped_while_manual_sample_in_flight() {
    let positioning = Arc::new(SlowPositioning::new(Duration::from_secs(5)));
    let reporter = Arc::new(LocationReporter::new(
        positioning.clone(),
        Arc::new(RecordingSink::default()),
        idle_session(Arc::new(ManualClock::new(t0()))),
        config(),
    ));

    let manual = tokio::spawn({
        let reporter = reporter.clone();
        async move { reporter.sample_now().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    reporter.start_with(Duration::from_secs(1)).unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(positioning.requests.load(Ordering::SeqCst), 1);
    assert!(manual.await.unwrap());

    reporter.stop().await;
    assert_eq!(positioning.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_waits_for_upload_of_accepted_fix() {
    let sink = Arc::new(SlowSink {
        delay: Duration::from_secs(2),
        reports: Mutex::new(Vec::new()),
    });
    let session = idle_session(Arc::new(ManualClock::new(t0())));
    let reporter = LocationReporter::new(
        Arc::new(ScriptedPositioning::new(fixes_every_second(5))),
        sink.clone(),
        session.clone(),
        config(),
    );

    reporter.start_with(Duration::from_secs(60)).unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    reporter.stop().await;

    assert!(session.status().has_fix());
    assert_eq!(sink.reports.lock().len(), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(sink.reports.lock().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_still_delivers_pending_violation() {
    let book = Arc::new(ComplaintBook::new());
    let session = Arc::new(ShiftSession::new(
        TrackerConfig::default(),
        Arc::new(SlowNotifier {
            delay: Duration::from_secs(2),
            inner: ComplaintNotifier::new(book.clone()),
        }),
        Arc::new(ManualClock::new(t0())),
        Duration::from_secs(10),
    ));
    session.load_assignment(assignment()).unwrap();

    let script: Vec<_> = (0..5)
        .map(|minute| Ok(fix(10.01, 10.0, at(minute * 60_000))))
        .collect();
    let reporter = LocationReporter::new(
        Arc::new(ScriptedPositioning::new(script)),
        Arc::new(RecordingSink::default()),
        session,
        config(),
    );

    reporter.start_with(Duration::from_secs(60)).unwrap();
    // the third fix, at 2 minutes, crosses the threshold
    tokio::time::sleep(Duration::from_millis(120_500)).await;
    reporter.stop().await;

    assert_eq!(book.for_guard("guard-7").len(), 1);
}

// ==================== Pipeline ====================

#[tokio::test(start_paused = true)]
async fn test_fixes_uploaded_without_active_shift() {
    let registry = Arc::new(LiveLocationRegistry::new());
    let session = idle_session(Arc::new(ManualClock::new(t0())));
    let reporter = LocationReporter::new(
        Arc::new(ScriptedPositioning::new(vec![Ok(fix(12.5, 77.25, t0()))])),
        Arc::new(LiveLocationSink::new("guard-7", registry.clone())),
        session.clone(),
        config(),
    );

    reporter.start_with(Duration::from_secs(60)).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    reporter.stop().await;

    let live = registry.get("guard-7").unwrap();
    assert_eq!((live.latitude, live.longitude), (12.5, 77.25));

    let status = session.status();
    assert_eq!(status.phase, TrackerPhase::Idle);
    assert!(status.has_fix());
}

#[tokio::test(start_paused = true)]
async fn test_out_of_zone_guard_gets_one_complaint() {
    let book = Arc::new(ComplaintBook::new());
    let session = Arc::new(ShiftSession::new(
        TrackerConfig::default(),
        Arc::new(ComplaintNotifier::new(book.clone())),
        Arc::new(ManualClock::new(t0())),
        Duration::from_secs(10),
    ));
    session.load_assignment(assignment()).unwrap();

    // one fix a minute, all about 1.1 km from the post
    let script: Vec<_> = (0..8)
        .map(|minute| Ok(fix(10.01, 10.0, at(minute * 60_000))))
        .collect();
    let reporter = LocationReporter::new(
        Arc::new(ScriptedPositioning::new(script)),
        Arc::new(RecordingSink::default()),
        session.clone(),
        ReporterConfig {
            interval: Duration::from_secs(60),
            ..config()
        },
    );

    reporter.start_with(Duration::from_secs(60)).unwrap();
    tokio::time::sleep(Duration::from_secs(8 * 60)).await;
    reporter.stop().await;

    assert_eq!(book.for_guard("guard-7").len(), 1);
    assert!(!session.status().state.inside_zone);
}

#[tokio::test(start_paused = true)]
async fn test_completion_check_runs_even_without_fixes() {
    let clock = Arc::new(ManualClock::new(t0()));
    let session = idle_session(clock.clone());
    session.load_assignment(assignment()).unwrap();

    let reporter = LocationReporter::new(
        Arc::new(ScriptedPositioning::new(Vec::new())),
        Arc::new(RecordingSink::default()),
        session.clone(),
        config(),
    );

    reporter.start_with(Duration::from_secs(1)).unwrap();
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(session.status().phase, TrackerPhase::Active);

    clock.set(at(HOUR_MS));
    tokio::time::sleep(Duration::from_secs(2)).await;
    reporter.stop().await;

    let status = session.status();
    assert_eq!(status.phase, TrackerPhase::Completed);
    assert_eq!(status.state.progress_percent, 100.0);
}

#[tokio::test(start_paused = true)]
async fn test_sample_now_runs_single_tick() {
    let positioning = Arc::new(ScriptedPositioning::new(fixes_every_second(2)));
    let sink = Arc::new(RecordingSink::default());
    let reporter = LocationReporter::new(
        positioning.clone(),
        sink.clone(),
        idle_session(Arc::new(ManualClock::new(t0()))),
        config(),
    );

    assert!(reporter.sample_now().await);
    assert_eq!(positioning.requests(), 1);
    assert_eq!(positioning.remaining(), 1);
    assert_eq!(sink.reports.lock().len(), 1);
    assert!(reporter.session().status().has_fix());
}
