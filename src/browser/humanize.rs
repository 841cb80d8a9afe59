// src/browser/humanize.rs

//! Randomized pacing and interaction mechanics.

use std::thread;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use crate::models::{DelayConfig, DelayRange};

/// Functionally equivalent ways of performing a click or a text entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionMechanism {
    /// Native UI event through the driver
    Direct,
    /// Event dispatched from page script
    Script,
    /// Simulated pointer travel followed by a click at the target
    Pointer,
}

impl ActionMechanism {
    pub const ALL: [ActionMechanism; 3] = [Self::Direct, Self::Script, Self::Pointer];
}

/// Longest uninterrupted sleep; cancellation is observed between slices.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Source of every randomized delay and choice a Session makes.
///
/// Delays end early once the watched token is cancelled.
pub struct Pacer {
    delays: DelayConfig,
    rng: StdRng,
    cancel: CancellationToken,
}

impl Pacer {
    pub fn new(delays: DelayConfig) -> Self {
        Self {
            delays,
            rng: StdRng::from_os_rng(),
            cancel: CancellationToken::new(),
        }
    }

    /// Deterministic pacer for tests and replays.
    pub fn seeded(delays: DelayConfig, seed: u64) -> Self {
        Self {
            delays,
            rng: StdRng::seed_from_u64(seed),
            cancel: CancellationToken::new(),
        }
    }

    /// Cut every following delay short once `cancel` fires.
    pub fn watch(&mut self, cancel: CancellationToken) {
        self.cancel = cancel;
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Pause after an ordinary interaction.
    pub fn pause(&mut self) {
        let range = self.delays.baseline;
        self.sleep(range);
    }

    /// Pause after login, reload or another heavy operation.
    pub fn pause_heavy(&mut self) {
        let range = self.delays.heavy;
        self.sleep(range);
    }

    /// Wait for incremental content after a scroll.
    pub fn settle(&mut self) {
        let range = self.delays.settle;
        self.sleep(range);
    }

    pub fn keystroke(&mut self) {
        let range = self.delays.keystroke;
        self.sleep(range);
    }

    pub fn pointer_step(&mut self) {
        let range = self.delays.pointer_step;
        self.sleep(range);
    }

    /// Chance that a scroll step starts with a small reversal.
    pub fn reversal_probability(&self) -> f64 {
        self.delays.reversal_probability.clamp(0.0, 1.0)
    }

    /// Pick a mechanism uniformly at random.
    pub fn choose_mechanism(&mut self) -> ActionMechanism {
        *ActionMechanism::ALL
            .choose(&mut self.rng)
            .unwrap_or(&ActionMechanism::Direct)
    }

    fn sleep(&mut self, range: DelayRange) {
        let delay = range.sample(&mut self.rng);
        if delay.is_zero() {
            return;
        }
        let deadline = Instant::now() + delay;
        while !self.cancel.is_cancelled() {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                break;
            }
            thread::sleep(left.min(SLEEP_SLICE));
        }
    }
}

/// Points along a randomized cubic Bézier curve from `from` to `to`.
///
/// The path has between 25 and 50 points and always ends exactly at `to`.
pub fn pointer_path<R: Rng + ?Sized>(
    from: (f64, f64),
    to: (f64, f64),
    rng: &mut R,
) -> Vec<(f64, f64)> {
    let steps: usize = rng.random_range(25..=50);
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let spread = (dx.hypot(dy) * 0.3).max(20.0);

    let mut control = || {
        let t: f64 = rng.random_range(0.2..0.8);
        (
            from.0 + dx * t + rng.random_range(-spread..spread),
            from.1 + dy * t + rng.random_range(-spread..spread),
        )
    };
    let c1 = control();
    let c2 = control();

    (1..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            let u = 1.0 - t;
            let x = u.powi(3) * from.0
                + 3.0 * u.powi(2) * t * c1.0
                + 3.0 * u * t.powi(2) * c2.0
                + t.powi(3) * to.0;
            let y = u.powi(3) * from.1
                + 3.0 * u.powi(2) * t * c1.1
                + 3.0 * u * t.powi(2) * c2.1
                + t.powi(3) * to.1;
            (x, y)
        })
        .collect()
}
