// src/refresh.rs
//! Countdown-driven refresh cycle.
//!
//! A small, I/O-free state machine: the caller feeds it ticks, triggers and
//! fetch completions, and it answers with [`FetchTicket`]s telling the caller
//! when to start a fetch. At most one ticket is outstanding at any time.
//!
//! - `Idle { remaining }` counts down one per tick; reaching zero starts a fetch.
//! - A manual trigger or tone change starts a fetch immediately when idle.
//!   While a fetch is in flight it is queued instead, coalesced to a single
//!   follow-up that is released as soon as the current fetch completes.
//! - Every completion (success or failure) resets `remaining` to the period.
//! - Completions carry the ticket's sequence number; anything that does not
//!   match the in-flight ticket is rejected as stale.

/// 30 minutes at one tick per second.
pub const DEFAULT_PERIOD_TICKS: u32 = 30 * 60;
pub const DEFAULT_NOTIFICATION_TICKS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Initial,
    Scheduled,
    Manual,
    ToneChanged,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Initial => "initial",
            Trigger::Scheduled => "scheduled",
            Trigger::Manual => "manual",
            Trigger::ToneChanged => "tone_changed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub trigger: Trigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle { remaining: u32 },
    Fetching { ticket: FetchTicket },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Success,
    Failure,
}

/// What the caller should do after reporting a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Completion {
    /// False when the ticket was stale; the result must be discarded.
    pub accepted: bool,
    /// A "new data" notification was raised.
    pub notified: bool,
    /// Queued trigger released by this completion.
    pub follow_up: Option<FetchTicket>,
}

#[derive(Debug, Clone)]
pub struct RefreshCycle {
    period: u32,
    notification_ticks: u32,
    phase: CyclePhase,
    next_seq: u64,
    successes: u64,
    pending: Option<Trigger>,
    notification: Option<u32>,
}

impl Default for RefreshCycle {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD_TICKS, DEFAULT_NOTIFICATION_TICKS)
    }
}

impl RefreshCycle {
    /// A zero period is treated as one tick.
    pub fn new(period_ticks: u32, notification_ticks: u32) -> Self {
        let period = period_ticks.max(1);
        Self {
            period,
            notification_ticks,
            phase: CyclePhase::Idle { remaining: period },
            next_seq: 1,
            successes: 0,
            pending: None,
            notification: None,
        }
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self.phase, CyclePhase::Fetching { .. })
    }

    /// Ticks left before the next scheduled fetch; `None` while fetching.
    pub fn remaining(&self) -> Option<u32> {
        match self.phase {
            CyclePhase::Idle { remaining } => Some(remaining),
            CyclePhase::Fetching { .. } => None,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn notification_visible(&self) -> bool {
        self.notification.is_some()
    }

    fn begin(&mut self, trigger: Trigger) -> FetchTicket {
        let ticket = FetchTicket {
            seq: self.next_seq,
            trigger,
        };
        self.next_seq += 1;
        self.phase = CyclePhase::Fetching { ticket };
        tracing::debug!(target: "refresh", seq = ticket.seq, trigger = trigger.as_str(), "fetch started");
        ticket
    }

    /// Initial load. Same path as a manual trigger, tagged differently.
    pub fn start(&mut self) -> Option<FetchTicket> {
        self.trigger(Trigger::Initial)
    }

    /// Advance one tick.
    pub fn tick(&mut self) -> Option<FetchTicket> {
        if let Some(left) = self.notification {
            self.notification = left.checked_sub(1).filter(|n| *n > 0);
        }

        match &mut self.phase {
            CyclePhase::Idle { remaining } => {
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    Some(self.begin(Trigger::Scheduled))
                } else {
                    None
                }
            }
            CyclePhase::Fetching { .. } => None,
        }
    }

    /// Out-of-band fetch request. Queued (coalesced) if one is in flight.
    pub fn trigger(&mut self, trigger: Trigger) -> Option<FetchTicket> {
        match self.phase {
            CyclePhase::Idle { .. } => Some(self.begin(trigger)),
            CyclePhase::Fetching { ticket } => {
                tracing::debug!(
                    target: "refresh",
                    in_flight = ticket.seq,
                    trigger = trigger.as_str(),
                    "fetch in flight, queued"
                );
                self.pending = Some(trigger);
                None
            }
        }
    }

    /// Report the end of the fetch identified by `ticket`.
    pub fn complete(&mut self, ticket: FetchTicket, outcome: FetchOutcome) -> Completion {
        match self.phase {
            CyclePhase::Fetching { ticket: current } if current.seq == ticket.seq => {}
            _ => {
                tracing::warn!(target: "refresh", seq = ticket.seq, "stale fetch completion ignored");
                return Completion::default();
            }
        }

        self.phase = CyclePhase::Idle {
            remaining: self.period,
        };

        let mut notified = false;
        if outcome == FetchOutcome::Success {
            // The first successful load of the session never raises a banner.
            if self.successes > 0 && self.notification_ticks > 0 {
                self.notification = Some(self.notification_ticks);
                notified = true;
            }
            self.successes += 1;
        }

        let follow_up = self.pending.take().map(|t| self.begin(t));

        Completion {
            accepted: true,
            notified,
            follow_up,
        }
    }

    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }
}
