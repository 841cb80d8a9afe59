// src/browser/scroll.rs

//! Scroll strategies rotated across extraction attempts.

use rand::Rng;

/// How a strategy moves the viewport in one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollMove {
    By(i64),
    ToBottom,
}

/// Pause taken after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPause {
    Baseline,
    Settle,
    Heavy,
}

/// One planned scroll step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollStep {
    /// Small backwards move and the forward correction that follows it
    pub reversal: Option<(i64, i64)>,
    pub moves: Vec<ScrollMove>,
    pub pause: StepPause,
}

/// Scroll strategies differ in distance, pause cadence and use of reversals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollStrategy {
    /// Short forward hops
    Shallow,
    /// Viewport-sized steps with a periodic long pause and nudge
    Progressive,
    /// Jump past the last loaded item and wait long
    Deep,
    /// Irregular distances with occasional reversals
    HumanLike,
}

const VIEWPORT_STEP: i64 = 640;

impl ScrollStrategy {
    pub const ROTATION: [ScrollStrategy; 4] =
        [Self::Shallow, Self::Progressive, Self::Deep, Self::HumanLike];

    /// Strategy for the zero-based attempt number.
    pub fn for_attempt(attempt: usize) -> Self {
        Self::ROTATION[attempt % Self::ROTATION.len()]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Shallow => "shallow",
            Self::Progressive => "progressive",
            Self::Deep => "deep",
            Self::HumanLike => "human-like",
        }
    }

    /// Plan `n` steps. `reverse` decides whether a step that may reverse does so.
    pub fn plan<R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
        mut reverse: impl FnMut(&mut R) -> bool,
    ) -> Vec<ScrollStep> {
        (0..n)
            .map(|i| match self {
                Self::Shallow => ScrollStep {
                    reversal: None,
                    moves: vec![ScrollMove::By(rng.random_range(300..=600))],
                    pause: StepPause::Settle,
                },
                Self::Progressive => {
                    let nudge = i % 5 == 4;
                    ScrollStep {
                        reversal: nudge.then_some((300, 350)),
                        moves: vec![ScrollMove::By(VIEWPORT_STEP)],
                        pause: if nudge { StepPause::Heavy } else { StepPause::Settle },
                    }
                }
                Self::Deep => ScrollStep {
                    reversal: None,
                    moves: vec![ScrollMove::ToBottom, ScrollMove::By(1000)],
                    pause: StepPause::Heavy,
                },
                Self::HumanLike => {
                    let reversal = reverse(rng).then(|| {
                        let back: i64 = rng.random_range(50..=100);
                        let forward = (back as f64 * rng.random_range(0.7..0.9)).round() as i64;
                        (back, forward)
                    });
                    ScrollStep {
                        reversal,
                        moves: vec![ScrollMove::By(rng.random_range(500..=900))],
                        pause: if i % 3 == 2 {
                            StepPause::Baseline
                        } else {
                            StepPause::Settle
                        },
                    }
                }
            })
            .collect()
    }
}
