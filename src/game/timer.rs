//! Scheduled-tick timers with mandatory cancellation.
//!
//! The machine never sleeps; sequencing (digit reveal, countdown,
//! post-feedback delay) is a chain of deadlines advanced by the game
//! loop's tick. A single pending slot makes the "exactly one live chain"
//! rule structural: scheduling replaces, and `cancel()` clears, whatever
//! was pending before. A stale timer from a previous level can therefore
//! never fire into the next one.

/// What a fire means to the machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKind {
    /// Reveal the next digit (sequential mode), or open input after the
    /// last one.
    RevealStep,
    /// The single-flash display window ended.
    DisplayDone,
    /// The post-feedback delay after scoring ended.
    FeedbackDone,
}

#[derive(Clone, Copy, Debug)]
struct Pending {
    kind: TimerKind,
    fires_at: u64,
    /// Total ticks this timer was scheduled for (countdown display).
    duration: u64,
}

#[derive(Debug)]
pub struct TimerChain {
    now: u64,
    pending: Option<Pending>,
    /// Bumped on every schedule/cancel; appears in trace output so a
    /// misbehaving chain can be followed in the logs.
    generation: u64,
}

impl TimerChain {
    pub fn new() -> Self {
        TimerChain { now: 0, pending: None, generation: 0 }
    }

    /// Schedule `kind` to fire `in_ticks` from now, superseding any
    /// pending timer.
    pub fn schedule(&mut self, kind: TimerKind, in_ticks: u64) {
        self.generation += 1;
        self.pending = Some(Pending {
            kind,
            fires_at: self.now + in_ticks.max(1),
            duration: in_ticks.max(1),
        });
        tracing::trace!(gen = self.generation, ?kind, in_ticks, "timer scheduled");
    }

    /// Drop any pending timer. Must be called before a new level or a
    /// restart reuses the chain.
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            self.generation += 1;
            tracing::trace!(gen = self.generation, "timer cancelled");
        }
    }

    /// Advance one tick; returns the timer that fired, if any.
    pub fn advance(&mut self) -> Option<TimerKind> {
        self.now += 1;
        match self.pending {
            Some(p) if self.now >= p.fires_at => {
                self.pending = None;
                Some(p.kind)
            }
            _ => None,
        }
    }

    /// Fraction of the pending timer still to run, 1.0 → 0.0.
    /// None when nothing is pending.
    pub fn remaining_fraction(&self) -> Option<f32> {
        self.pending.map(|p| {
            let left = p.fires_at.saturating_sub(self.now);
            left as f32 / p.duration as f32
        })
    }

    #[cfg(test)]
    pub fn pending_kind(&self) -> Option<TimerKind> {
        self.pending.map(|p| p.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_after_duration() {
        let mut t = TimerChain::new();
        t.schedule(TimerKind::DisplayDone, 3);
        assert_eq!(t.advance(), None);
        assert_eq!(t.advance(), None);
        assert_eq!(t.advance(), Some(TimerKind::DisplayDone));
        // One-shot: nothing left afterwards
        assert_eq!(t.advance(), None);
    }

    #[test]
    fn scheduling_supersedes_pending() {
        let mut t = TimerChain::new();
        t.schedule(TimerKind::RevealStep, 2);
        t.schedule(TimerKind::FeedbackDone, 5);
        assert_eq!(t.pending_kind(), Some(TimerKind::FeedbackDone));
        // The replaced RevealStep never fires
        assert_eq!(t.advance(), None);
        assert_eq!(t.advance(), None);
    }

    #[test]
    fn cancel_clears() {
        let mut t = TimerChain::new();
        t.schedule(TimerKind::FeedbackDone, 1);
        t.cancel();
        assert_eq!(t.advance(), None);
        assert_eq!(t.pending_kind(), None);
    }

    #[test]
    fn zero_ticks_rounds_up_to_one() {
        let mut t = TimerChain::new();
        t.schedule(TimerKind::RevealStep, 0);
        assert_eq!(t.advance(), Some(TimerKind::RevealStep));
    }

    #[test]
    fn remaining_fraction_counts_down() {
        let mut t = TimerChain::new();
        t.schedule(TimerKind::DisplayDone, 4);
        assert_eq!(t.remaining_fraction(), Some(1.0));
        t.advance();
        assert_eq!(t.remaining_fraction(), Some(0.75));
        t.advance();
        t.advance();
        assert_eq!(t.remaining_fraction(), Some(0.25));
    }
}
