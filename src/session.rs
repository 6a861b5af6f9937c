//! # Session
//! Ties the [`ResultStore`] and the [`RefreshCycle`] to the fetch collaborator.
//!
//! [`NewsSession`] is the synchronous core: every event runs to completion and
//! returns the next fetch to start, if any. [`spawn_session`] runs it on a
//! single tokio task that serializes commands, ticks and fetch completions,
//! and publishes a [`ViewSnapshot`] after each one.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use metrics::counter;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::filter::FilterCriteria;
use crate::ingest::ingest_records;
use crate::ingest::types::{NewsProvider, NewsRecord, RawNewsItem, Tone};
use crate::refresh::{FetchOutcome, FetchTicket, RefreshCycle, Trigger};
use crate::store::ResultStore;

/// Message shown to the user when a fetch fails.
pub const FETCH_ERROR_MESSAGE: &str = "Failed to fetch news from the server.";

/// A fetch the caller must perform, bound to the tone current at issue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub tone: Tone,
}

/// Presentation-level state. "No results" is distinct from loading and error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewState {
    Loading,
    Error,
    Empty,
    Ready,
}

/// Everything the presentation layer consumes, taken at one consistent point.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub state: ViewState,
    pub items: Vec<NewsRecord>,
    pub total: usize,
    pub loading: bool,
    pub error: Option<String>,
    pub notification_visible: bool,
    pub tone: Tone,
    pub criteria: FilterCriteria,
    /// Ticks until the next scheduled fetch; absent while fetching.
    pub next_refresh_in: Option<u32>,
}

#[derive(Debug)]
pub struct NewsSession {
    store: ResultStore,
    cycle: RefreshCycle,
    tone: Tone,
    error: Option<String>,
}

impl NewsSession {
    pub fn new(cycle: RefreshCycle, tone: Tone) -> Self {
        Self {
            store: ResultStore::new(),
            cycle,
            tone,
            error: None,
        }
    }

    fn request(&self, ticket: Option<FetchTicket>) -> Option<FetchRequest> {
        ticket.map(|ticket| {
            counter!("news_fetch_total", "trigger" => ticket.trigger.as_str()).increment(1);
            FetchRequest {
                ticket,
                tone: self.tone,
            }
        })
    }

    pub fn start(&mut self) -> Option<FetchRequest> {
        let t = self.cycle.start();
        self.request(t)
    }

    pub fn tick(&mut self) -> Option<FetchRequest> {
        let t = self.cycle.tick();
        self.request(t)
    }

    pub fn refresh(&mut self) -> Option<FetchRequest> {
        let t = self.cycle.trigger(Trigger::Manual);
        self.request(t)
    }

    /// Changing the tone refetches; setting the same tone is a no-op.
    pub fn set_tone(&mut self, tone: Tone) -> Option<FetchRequest> {
        if tone == self.tone {
            return None;
        }
        tracing::info!(target: "session", from = %self.tone, to = %tone, "tone changed");
        self.tone = tone;
        let t = self.cycle.trigger(Trigger::ToneChanged);
        self.request(t)
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.store.set_criteria(criteria.normalized());
    }

    pub fn dismiss_notification(&mut self) {
        self.cycle.dismiss_notification();
    }

    /// Apply the result of `req`. Failures keep the previous collection.
    pub fn complete(
        &mut self,
        req: FetchRequest,
        result: Result<Vec<RawNewsItem>>,
    ) -> Option<FetchRequest> {
        let outcome = if result.is_ok() {
            FetchOutcome::Success
        } else {
            FetchOutcome::Failure
        };
        let done = self.cycle.complete(req.ticket, outcome);
        if !done.accepted {
            return None;
        }

        match result {
            Ok(raw) => {
                let records = ingest_records(raw);
                tracing::info!(
                    target: "session",
                    seq = req.ticket.seq,
                    tone = %req.tone,
                    records = records.len(),
                    "news updated"
                );
                self.store.set_collection(records);
                self.error = None;
            }
            Err(e) => {
                counter!("news_fetch_errors_total").increment(1);
                tracing::warn!(target: "session", seq = req.ticket.seq, error = ?e, "fetch failed");
                self.error = Some(FETCH_ERROR_MESSAGE.to_string());
            }
        }

        if done.notified {
            counter!("news_notifications_total").increment(1);
        }

        self.request(done.follow_up)
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn cycle(&self) -> &RefreshCycle {
        &self.cycle
    }

    pub fn tone(&self) -> Tone {
        self.tone
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let loading = self.cycle.is_fetching();
        let items = self.store.view().to_vec();
        let state = if loading {
            ViewState::Loading
        } else if self.error.is_some() {
            ViewState::Error
        } else if items.is_empty() {
            ViewState::Empty
        } else {
            ViewState::Ready
        };

        ViewSnapshot {
            state,
            items,
            total: self.store.collection().len(),
            loading,
            error: self.error.clone(),
            notification_visible: self.cycle.notification_visible(),
            tone: self.tone,
            criteria: self.store.criteria().clone(),
            next_refresh_in: self.cycle.remaining(),
        }
    }
}

/// Commands from the presentation layer.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    SetCriteria(FilterCriteria),
    ResetCriteria,
    Refresh,
    SetTone(Tone),
    DismissNotification,
    Shutdown,
}

#[derive(Debug)]
struct Envelope {
    cmd: SessionCommand,
    reply: Option<oneshot::Sender<ViewSnapshot>>,
}

/// Cloneable front for a running session task.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Envelope>,
    view: watch::Receiver<ViewSnapshot>,
}

impl SessionHandle {
    pub async fn send(&self, cmd: SessionCommand) -> Result<()> {
        self.tx
            .send(Envelope { cmd, reply: None })
            .await
            .map_err(|_| anyhow!("session task has stopped"))
    }

    /// Send `cmd` and wait for the snapshot taken right after it was handled.
    pub async fn request(&self, cmd: SessionCommand) -> Result<ViewSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                cmd,
                reply: Some(reply),
            })
            .await
            .map_err(|_| anyhow!("session task has stopped"))?;
        rx.await.map_err(|_| anyhow!("session task dropped the request"))
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> ViewSnapshot {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
        self.view.clone()
    }
}

type Done = (FetchRequest, Result<Vec<RawNewsItem>>);

fn spawn_fetch(provider: &Arc<dyn NewsProvider>, req: FetchRequest, done: &mpsc::UnboundedSender<Done>) {
    let provider = Arc::clone(provider);
    let done = done.clone();
    let tone = req.tone;
    tokio::spawn(async move {
        // a panicking provider still completes the cycle, as a failure
        let res = match tokio::spawn(async move { provider.fetch(tone).await }).await {
            Ok(res) => res,
            Err(e) => Err(anyhow!("fetch task failed: {e}")),
        };
        // receiver gone means the session shut down
        let _ = done.send((req, res));
    });
}

/// Run `session` on its own task, ticking every `tick`.
pub fn spawn_session(
    mut session: NewsSession,
    provider: Arc<dyn NewsProvider>,
    tick: Duration,
) -> (SessionHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Envelope>(64);
    let (view_tx, view_rx) = watch::channel(session.snapshot());

    let task = tokio::spawn(async move {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Done>();
        let mut ticker = time::interval_at(time::Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(target: "session", provider = provider.name(), tone = %session.tone(), "session started");
        if let Some(req) = session.start() {
            spawn_fetch(&provider, req, &done_tx);
        }
        view_tx.send_replace(session.snapshot());

        loop {
            let (next, reply) = tokio::select! {
                env = rx.recv() => {
                    let Some(Envelope { cmd, reply }) = env else { break };
                    let next = match cmd {
                        SessionCommand::Shutdown => break,
                        SessionCommand::SetCriteria(c) => {
                            session.set_criteria(c);
                            None
                        }
                        SessionCommand::ResetCriteria => {
                            session.set_criteria(FilterCriteria::default());
                            None
                        }
                        SessionCommand::Refresh => session.refresh(),
                        SessionCommand::SetTone(t) => session.set_tone(t),
                        SessionCommand::DismissNotification => {
                            session.dismiss_notification();
                            None
                        }
                    };
                    (next, reply)
                },
                _ = ticker.tick() => (session.tick(), None),
                Some((req, res)) = done_rx.recv() => (session.complete(req, res), None),
            };

            if let Some(req) = next {
                spawn_fetch(&provider, req, &done_tx);
            }
            let snap = session.snapshot();
            if let Some(reply) = reply {
                // caller may have given up waiting
                let _ = reply.send(snap.clone());
            }
            view_tx.send_replace(snap);
        }

        tracing::info!(target: "session", "session stopped");
    });

    (
        SessionHandle {
            tx,
            view: view_rx,
        },
        task,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::StatusFilter;

    fn item(title: &str, date: &str, status: Option<&str>) -> RawNewsItem {
        RawNewsItem {
            title: Some(title.into()),
            summary: Some(String::new()),
            url: None,
            publisher: Some("Reuters".into()),
            publish_date: Some(date.into()),
            status: status.map(str::to_string),
        }
    }

    #[test]
    fn failure_preserves_collection_and_success_clears_error() {
        let mut s = NewsSession::new(RefreshCycle::new(100, 10), Tone::Neutral);
        let req = s.start().unwrap();
        assert_eq!(s.snapshot().state, ViewState::Loading);
        s.complete(req, Ok(vec![item("a", "2025-01-01", None)]));
        assert_eq!(s.snapshot().state, ViewState::Ready);

        let req = s.refresh().unwrap();
        s.complete(req, Err(anyhow!("connection refused")));
        let snap = s.snapshot();
        assert_eq!(snap.state, ViewState::Error);
        assert_eq!(snap.error.as_deref(), Some(FETCH_ERROR_MESSAGE));
        assert_eq!(snap.items.len(), 1);
        assert_eq!(snap.next_refresh_in, Some(100));

        let req = s.refresh().unwrap();
        s.complete(
            req,
            Ok(vec![item("b", "2025-02-01", None), item("c", "2025-03-01", None)]),
        );
        let snap = s.snapshot();
        assert_eq!(snap.error, None);
        assert_eq!(snap.total, 2);
    }

    #[test]
    fn empty_view_is_its_own_state() {
        let mut s = NewsSession::new(RefreshCycle::new(100, 10), Tone::Neutral);
        let req = s.start().unwrap();
        s.complete(req, Ok(vec![item("a", "2025-01-01", Some("verified"))]));
        s.set_criteria(FilterCriteria::default().with_status(StatusFilter::Disputed));
        let snap = s.snapshot();
        assert_eq!(snap.state, ViewState::Empty);
        assert_eq!(snap.total, 1);
    }

    #[test]
    fn tone_change_uses_new_tone_and_same_tone_is_noop() {
        let mut s = NewsSession::new(RefreshCycle::new(100, 10), Tone::Neutral);
        let req = s.start().unwrap();
        assert_eq!(req.tone, Tone::Neutral);

        // In flight: queued, released with the new tone.
        assert_eq!(s.set_tone(Tone::Comedy), None);
        let next = s.complete(req, Ok(vec![])).unwrap();
        assert_eq!(next.tone, Tone::Comedy);
        assert_eq!(next.ticket.trigger, Trigger::ToneChanged);
        s.complete(next, Ok(vec![]));

        assert_eq!(s.set_tone(Tone::Comedy), None);
    }

    #[test]
    fn criteria_are_normalized_on_entry() {
        let mut s = NewsSession::new(RefreshCycle::default(), Tone::Neutral);
        let mut c = FilterCriteria::default();
        c.sources.insert(" BBC News ".into());
        s.set_criteria(c);
        assert!(s.store().criteria().sources.contains("bbcnews"));
    }
}
