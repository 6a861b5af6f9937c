// tests/session_driver.rs
//
// Drives the spawned session task under paused tokio time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use newsdesk::ingest::provider::parse_envelope;
use newsdesk::session::ViewState;
use newsdesk::{
    spawn_session, FilterCriteria, NewsProvider, NewsSession, RawNewsItem, RefreshCycle,
    SessionCommand, StatusFilter, Tone,
};

const FIXTURE: &str = include_str!("fixtures/news.json");
const TICK: Duration = Duration::from_secs(1);

/// Counts calls, records tones, fails while `failing` is set.
#[derive(Default)]
struct ScriptedProvider {
    calls: AtomicUsize,
    failing: std::sync::atomic::AtomicBool,
    tones: std::sync::Mutex<Vec<Tone>>,
    delay: Duration,
}

impl ScriptedProvider {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NewsProvider for ScriptedProvider {
    async fn fetch(&self, tone: Tone) -> Result<Vec<RawNewsItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tones.lock().unwrap().push(tone);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            bail!("connection refused");
        }
        parse_envelope(FIXTURE)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Panics on its first call, then serves the fixture.
#[derive(Default)]
struct PanicOnceProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl NewsProvider for PanicOnceProvider {
    async fn fetch(&self, _tone: Tone) -> Result<Vec<RawNewsItem>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("provider blew up");
        }
        parse_envelope(FIXTURE)
    }

    fn name(&self) -> &str {
        "panic-once"
    }
}

fn session(period: u32) -> NewsSession {
    NewsSession::new(RefreshCycle::new(period, 3), Tone::Neutral)
}

async fn settle() {
    // let spawned fetches and the session loop run
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn initial_load_then_scheduled_refresh() {
    let provider = Arc::new(ScriptedProvider::default());
    let (handle, task) = spawn_session(session(5), provider.clone(), TICK);

    let mut rx = handle.subscribe();
    rx.wait_for(|s| s.state == ViewState::Ready).await.unwrap();
    assert_eq!(provider.calls(), 1);
    assert!(!handle.snapshot().notification_visible);
    assert_eq!(handle.snapshot().items.len(), 4);

    tokio::time::sleep(Duration::from_millis(5_500)).await;
    settle().await;
    assert_eq!(provider.calls(), 2);
    assert!(handle.snapshot().notification_visible);

    handle.send(SessionCommand::Shutdown).await.unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn criteria_change_reshapes_view_without_refetch() {
    let provider = Arc::new(ScriptedProvider::default());
    let (handle, _task) = spawn_session(session(1_000), provider.clone(), TICK);
    handle
        .subscribe()
        .wait_for(|s| s.state == ViewState::Ready)
        .await
        .unwrap();

    let snap = handle
        .request(SessionCommand::SetCriteria(
            FilterCriteria::default().with_status(StatusFilter::Disputed),
        ))
        .await
        .unwrap();
    assert_eq!(snap.items.len(), 1);
    assert_eq!(snap.items[0].publisher, "Reuters");
    assert_eq!(snap.total, 4);

    let snap = handle.request(SessionCommand::ResetCriteria).await.unwrap();
    assert_eq!(snap.items.len(), 4);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn manual_refresh_during_slow_fetch_is_queued() {
    let provider = Arc::new(ScriptedProvider {
        delay: Duration::from_secs(3),
        ..Default::default()
    });
    let (handle, _task) = spawn_session(session(1_000), provider.clone(), TICK);
    settle().await;
    assert!(handle.snapshot().loading);

    let snap = handle.request(SessionCommand::Refresh).await.unwrap();
    assert!(snap.loading);
    let snap = handle
        .request(SessionCommand::SetTone(Tone::Satirical))
        .await
        .unwrap();
    assert_eq!(snap.tone, Tone::Satirical);
    assert_eq!(provider.calls(), 1, "only one fetch in flight");

    let mut rx = handle.subscribe();
    rx.wait_for(|s| !s.loading).await.unwrap();
    assert_eq!(provider.calls(), 2, "queued triggers coalesce into one follow-up");
    assert_eq!(
        *provider.tones.lock().unwrap(),
        vec![Tone::Neutral, Tone::Satirical]
    );
}

#[tokio::test(start_paused = true)]
async fn failure_surfaces_error_and_cycle_keeps_running() {
    let provider = Arc::new(ScriptedProvider::default());
    let (handle, _task) = spawn_session(session(2), provider.clone(), TICK);
    handle
        .subscribe()
        .wait_for(|s| s.state == ViewState::Ready)
        .await
        .unwrap();

    provider.failing.store(true, Ordering::SeqCst);
    let mut rx = handle.subscribe();
    let snap = rx
        .wait_for(|s| s.state == ViewState::Error)
        .await
        .unwrap()
        .clone();
    assert_eq!(snap.items.len(), 4, "previous collection kept");

    provider.failing.store(false, Ordering::SeqCst);
    let snap = rx
        .wait_for(|s| s.state == ViewState::Ready)
        .await
        .unwrap()
        .clone();
    assert_eq!(snap.error, None);
    assert!(provider.calls() >= 3);
}

#[tokio::test(start_paused = true)]
async fn panicking_fetch_counts_as_failure_and_cycle_resumes() {
    let provider = Arc::new(PanicOnceProvider::default());
    let (handle, _task) = spawn_session(session(2), provider.clone(), TICK);

    let mut rx = handle.subscribe();
    rx.wait_for(|s| s.state == ViewState::Error).await.unwrap();
    let snap = handle.snapshot();
    assert!(!snap.loading);
    assert!(snap.error.is_some());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    rx.wait_for(|s| s.state == ViewState::Ready).await.unwrap();
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    assert!(handle.snapshot().error.is_none());
}
