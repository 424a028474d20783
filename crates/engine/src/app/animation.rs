use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub time: f32,
    pub frame: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum AnimationError {
    #[error("timeline has no breakpoints")]
    EmptyTimeline,
    #[error("first breakpoint must be at time 0, got {0}")]
    FirstBreakpointNotAtZero(f32),
    #[error("breakpoint times must be non-decreasing (index {index})")]
    UnorderedBreakpoints { index: usize },
    #[error("duration must be positive, got {0}")]
    NonPositiveDuration(f32),
}

/// Immutable, shareable breakpoint data. Many sequencers may hold the same
/// timeline; each keeps its own clock.
#[derive(Debug, Clone)]
pub struct FrameTimeline {
    duration: f32,
    breakpoints: Arc<[Breakpoint]>,
}

impl FrameTimeline {
    pub fn new(duration: f32, frames: &[(f32, u16)]) -> Result<Self, AnimationError> {
        if frames.is_empty() {
            return Err(AnimationError::EmptyTimeline);
        }
        if frames[0].0 != 0.0 {
            return Err(AnimationError::FirstBreakpointNotAtZero(frames[0].0));
        }
        for (index, window) in frames.windows(2).enumerate() {
            if window[1].0 < window[0].0 {
                return Err(AnimationError::UnorderedBreakpoints { index: index + 1 });
            }
        }
        if !(duration > 0.0) {
            return Err(AnimationError::NonPositiveDuration(duration));
        }

        Ok(Self {
            duration,
            breakpoints: frames
                .iter()
                .map(|&(time, frame)| Breakpoint { time, frame })
                .collect(),
        })
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }
}

/// A free-running looping clock over a timeline. Frame selection is a pure
/// function of `current_time`.
#[derive(Debug, Clone)]
pub struct FrameSequencer {
    timeline: FrameTimeline,
    current_time: f32,
}

impl FrameSequencer {
    pub fn new(timeline: FrameTimeline) -> Self {
        Self {
            timeline,
            current_time: 0.0,
        }
    }

    pub fn current_time(&self) -> f32 {
        self.current_time
    }

    pub fn set_current_time(&mut self, time: f32) {
        self.current_time = time.max(0.0);
    }

    pub fn step(&mut self, delta_ms: f32) {
        self.current_time += delta_ms;
        if self.current_time >= self.timeline.duration {
            self.current_time = 0.0;
        }
    }

    /// The last breakpoint whose time is <= the clock. The constructor
    /// guarantees a breakpoint at time 0 and the clock never goes negative,
    /// so the guard below is unreachable; it exists so a broken invariant
    /// fails loudly instead of returning an undefined frame.
    pub fn frame(&self) -> u16 {
        for breakpoint in self.timeline.breakpoints.iter().rev() {
            if self.current_time >= breakpoint.time {
                return breakpoint.frame;
            }
        }
        panic!(
            "animation clock {} precedes the first breakpoint",
            self.current_time
        );
    }
}

/// A named set of sequencers with one active at a time. Owned by exactly one
/// drawable entity; never shared.
#[derive(Debug, Clone)]
pub struct AnimationSet {
    sequences: Vec<(&'static str, FrameSequencer)>,
    active: usize,
}

impl AnimationSet {
    /// The first entry becomes the active sequence. An empty set is not a
    /// meaningful animation target.
    pub fn new(sequences: Vec<(&'static str, FrameTimeline)>) -> Result<Self, AnimationError> {
        if sequences.is_empty() {
            return Err(AnimationError::EmptyTimeline);
        }
        Ok(Self {
            sequences: sequences
                .into_iter()
                .map(|(key, timeline)| (key, FrameSequencer::new(timeline)))
                .collect(),
            active: 0,
        })
    }

    pub fn active_key(&self) -> &'static str {
        self.sequences[self.active].0
    }

    pub fn frame(&self) -> u16 {
        self.sequences[self.active].1.frame()
    }

    pub fn step(&mut self, delta_ms: f32) {
        self.sequences[self.active].1.step(delta_ms);
    }

    /// No-op when `key` is already active; otherwise switches and restarts
    /// the new sequence's clock at `start_at`, so re-entering an animation
    /// never resumes mid-cycle. Unknown keys are ignored.
    pub fn play(&mut self, key: &'static str, start_at: f32) {
        if self.active_key() == key {
            return;
        }
        let Some(index) = self.sequences.iter().position(|(name, _)| *name == key) else {
            return;
        };
        self.active = index;
        self.sequences[self.active].1.set_current_time(start_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk_timeline() -> FrameTimeline {
        FrameTimeline::new(400.0, &[(0.0, 1), (100.0, 0), (200.0, 1), (300.0, 2)])
            .expect("timeline")
    }

    #[test]
    fn timeline_requires_breakpoint_at_zero() {
        assert_eq!(
            FrameTimeline::new(400.0, &[(10.0, 0)]).unwrap_err(),
            AnimationError::FirstBreakpointNotAtZero(10.0)
        );
        assert_eq!(
            FrameTimeline::new(400.0, &[]).unwrap_err(),
            AnimationError::EmptyTimeline
        );
        assert_eq!(
            FrameTimeline::new(0.0, &[(0.0, 0)]).unwrap_err(),
            AnimationError::NonPositiveDuration(0.0)
        );
        assert_eq!(
            FrameTimeline::new(400.0, &[(0.0, 0), (200.0, 1), (100.0, 2)]).unwrap_err(),
            AnimationError::UnorderedBreakpoints { index: 2 }
        );
    }

    #[test]
    fn frame_selects_last_breakpoint_at_or_before_clock() {
        let mut sequencer = FrameSequencer::new(walk_timeline());
        assert_eq!(sequencer.frame(), 1);

        sequencer.step(99.0);
        assert_eq!(sequencer.frame(), 1);

        sequencer.step(1.0);
        assert_eq!(sequencer.frame(), 0);

        sequencer.step(250.0);
        assert_eq!(sequencer.frame(), 2);
    }

    #[test]
    fn clock_wraps_to_zero_at_duration() {
        let mut sequencer = FrameSequencer::new(walk_timeline());
        sequencer.step(399.0);
        assert_eq!(sequencer.current_time(), 399.0);

        sequencer.step(1.0);
        assert_eq!(sequencer.current_time(), 0.0);
        assert_eq!(sequencer.frame(), 1);
    }

    #[test]
    fn shared_timeline_keeps_independent_clocks() {
        let timeline = walk_timeline();
        let mut a = FrameSequencer::new(timeline.clone());
        let b = FrameSequencer::new(timeline);

        a.step(150.0);
        assert_eq!(a.frame(), 0);
        assert_eq!(b.frame(), 1);
        assert_eq!(b.current_time(), 0.0);
    }

    fn stand_timeline(frame: u16) -> FrameTimeline {
        FrameTimeline::new(400.0, &[(0.0, frame)]).expect("timeline")
    }

    #[test]
    fn play_is_idempotent_for_the_active_key() {
        let mut set = AnimationSet::new(vec![
            ("walk", walk_timeline()),
            ("stand", stand_timeline(7)),
        ])
        .expect("set");

        set.step(150.0);
        set.play("walk", 0.0);
        assert_eq!(set.frame(), 0, "replaying the active key must not reset");
    }

    #[test]
    fn play_switches_and_restarts_at_requested_time() {
        let mut set = AnimationSet::new(vec![
            ("walk", walk_timeline()),
            ("stand", stand_timeline(7)),
        ])
        .expect("set");

        set.step(250.0);
        set.play("stand", 0.0);
        assert_eq!(set.active_key(), "stand");
        assert_eq!(set.frame(), 7);

        set.play("walk", 300.0);
        assert_eq!(set.active_key(), "walk");
        assert_eq!(set.frame(), 2, "re-entering restarts at start_at");
    }

    #[test]
    fn play_ignores_unknown_keys() {
        let mut set = AnimationSet::new(vec![("walk", walk_timeline())]).expect("set");
        set.play("missing", 0.0);
        assert_eq!(set.active_key(), "walk");
    }
}
