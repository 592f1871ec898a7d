/// Consecutive unchanged content-height samples that mark a container as exhausted.
pub const DEFAULT_STABLE_SAMPLES: u32 = 3;
/// Upper bound on scroll rounds for one page, for containers that never stop growing.
pub const DEFAULT_MAX_SCROLL_ROUNDS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollVerdict {
    /// Content grew since the previous sample; the stable counter restarts.
    Grew,
    /// Height unchanged, but not yet for enough consecutive samples.
    Unchanged { stable: u32 },
    /// Height unchanged for the required number of samples.
    Exhausted,
    /// Round limit reached while content was still changing.
    RoundLimit,
}

impl ScrollVerdict {
    pub fn is_final(self) -> bool {
        matches!(self, ScrollVerdict::Exhausted | ScrollVerdict::RoundLimit)
    }
}

/// Tracks content-height samples of the scroll container for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollTracker {
    last_height: u64,
    stable: u32,
    rounds: u32,
    stable_required: u32,
    max_rounds: u32,
    finished: bool,
}

impl ScrollTracker {
    pub fn new(initial_height: u64, stable_required: u32, max_rounds: u32) -> Self {
        Self {
            last_height: initial_height,
            stable: 0,
            rounds: 0,
            stable_required: stable_required.max(1),
            max_rounds: max_rounds.max(1),
            finished: false,
        }
    }

    /// Record the content height sampled after one scroll attempt.
    pub fn observe(&mut self, height: u64) -> ScrollVerdict {
        self.rounds += 1;
        let verdict = if height == self.last_height {
            self.stable += 1;
            if self.stable >= self.stable_required {
                ScrollVerdict::Exhausted
            } else {
                ScrollVerdict::Unchanged {
                    stable: self.stable,
                }
            }
        } else {
            self.stable = 0;
            self.last_height = height;
            ScrollVerdict::Grew
        };

        let verdict = if !verdict.is_final() && self.rounds >= self.max_rounds {
            ScrollVerdict::RoundLimit
        } else {
            verdict
        };
        self.finished = verdict.is_final();
        verdict
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn last_height(&self) -> u64 {
        self.last_height
    }
}
