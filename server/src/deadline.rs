//! Delayed actions and the generation tokens that keep them honest.
//!
//! Scheduled timers are never cancelled. Each phase deadline captures the
//! match's [`Generation`] when it is armed; by the time it fires the match may
//! have moved on, in which case the captured generation no longer equals the
//! live one and the timer is dropped. The other delayed actions carry their
//! own stamps (round, reveal stage, reset token) and are checked the same way.

use log::error;
use shared::{MatchId, RoomId};
use std::time::Duration;
use tokio::sync::mpsc;

/// Token identifying one armed phase of one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Generation(u64);

impl Generation {
    fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

/// A phase deadline as captured at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deadline {
    pub room_id: RoomId,
    pub match_id: MatchId,
    pub round: u8,
    pub duration: Duration,
    pub generation: Generation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timer {
    PhaseDeadline(Deadline),
    /// End of the pause after a round summary.
    AdvanceRound {
        room_id: RoomId,
        match_id: MatchId,
        round: u8,
    },
    /// End of the pause after the 7th reveal of a strategy-4 phase.
    SettleReveal {
        room_id: RoomId,
        match_id: MatchId,
        round: u8,
        stage: u8,
    },
    RoomReset {
        room_id: RoomId,
        token: u64,
    },
}

impl Timer {
    pub fn room_id(&self) -> &str {
        match self {
            Timer::PhaseDeadline(deadline) => &deadline.room_id,
            Timer::AdvanceRound { room_id, .. }
            | Timer::SettleReveal { room_id, .. }
            | Timer::RoomReset { room_id, .. } => room_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTimer {
    pub delay: Duration,
    pub timer: Timer,
}

/// Live generation and absolute deadline of a match's current phase.
#[derive(Debug, Clone, Default)]
pub struct PhaseClock {
    generation: Generation,
    deadline_ms: u64,
}

impl PhaseClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new timed phase, invalidating every deadline armed before it.
    pub fn arm(
        &mut self,
        room_id: &str,
        match_id: &str,
        round: u8,
        duration: Duration,
        now: u64,
    ) -> ScheduledTimer {
        self.generation = self.generation.next();
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.deadline_ms = now.saturating_add(millis);
        ScheduledTimer {
            delay: duration,
            timer: Timer::PhaseDeadline(Deadline {
                room_id: room_id.to_string(),
                match_id: match_id.to_string(),
                round,
                duration,
                generation: self.generation,
            }),
        }
    }

    /// Ends the timed phase without starting another one.
    pub fn disarm(&mut self) {
        self.generation = self.generation.next();
        self.deadline_ms = 0;
    }

    pub fn is_live(&self, deadline: &Deadline) -> bool {
        deadline.generation == self.generation
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn deadline_ms(&self) -> u64 {
        self.deadline_ms
    }
}

/// Runs each scheduled timer on its own sleeping task and posts it back to the
/// server loop when it elapses.
#[derive(Clone)]
pub struct DeadlineScheduler {
    tx: mpsc::UnboundedSender<Timer>,
}

impl DeadlineScheduler {
    pub fn new(tx: mpsc::UnboundedSender<Timer>) -> Self {
        Self { tx }
    }

    pub fn schedule(&self, scheduled: ScheduledTimer) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(scheduled.delay).await;
            if let Err(e) = tx.send(scheduled.timer) {
                error!("Failed to deliver elapsed timer: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_sets_deadline_and_bumps_generation() {
        let mut clock = PhaseClock::new();
        let before = clock.generation();
        let scheduled = clock.arm("room", "m1", 1, Duration::from_secs(300), 1_000);

        assert_ne!(clock.generation(), before);
        assert_eq!(clock.deadline_ms(), 301_000);
        assert_eq!(scheduled.delay, Duration::from_secs(300));
        match scheduled.timer {
            Timer::PhaseDeadline(deadline) => {
                assert_eq!(deadline.round, 1);
                assert!(clock.is_live(&deadline));
            }
            _ => panic!("Unexpected timer type"),
        }
    }

    #[test]
    fn test_rearm_makes_previous_deadline_stale() {
        let mut clock = PhaseClock::new();
        let first = clock.arm("room", "m1", 1, Duration::from_secs(300), 0);
        let second = clock.arm("room", "m1", 1, Duration::from_secs(180), 10);

        let (Timer::PhaseDeadline(first), Timer::PhaseDeadline(second)) =
            (first.timer, second.timer)
        else {
            panic!("Unexpected timer type");
        };
        assert!(!clock.is_live(&first));
        assert!(clock.is_live(&second));

        clock.disarm();
        assert!(!clock.is_live(&second));
        assert_eq!(clock.deadline_ms(), 0);
    }

    #[test]
    fn test_huge_duration_saturates_deadline() {
        let mut clock = PhaseClock::new();
        clock.arm("room", "m1", 1, Duration::from_secs(u64::MAX), 1_000);
        assert_eq!(clock.deadline_ms(), u64::MAX);
    }

    #[tokio::test]
    async fn test_scheduler_delivers_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = DeadlineScheduler::new(tx);
        let timer = Timer::RoomReset {
            room_id: "room".to_string(),
            token: 7,
        };

        scheduler.schedule(ScheduledTimer {
            delay: Duration::from_millis(20),
            timer: timer.clone(),
        });

        assert!(rx.try_recv().is_err());
        let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timer should fire");
        assert_eq!(received, Some(timer));
    }
}
