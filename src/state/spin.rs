//! Tie-break wheel: a randomized rotation that settles on one of the pool's segments.
//!
//! The wheel is laid out with `360° / pool_size` segments in pool order starting at 0°, and the
//! pointer sits fixed at the top. Everything that decides the winner is pure: a [`SpinDraw`]
//! plus the starting rotation fully determine the [`SpinPlan`]. Timing only exists as a
//! timeline of legs that a presentation layer can replay however it likes.

use std::time::Duration;

use rand::{Rng, SeedableRng, rngs::StdRng};
use thiserror::Error;
use uuid::Uuid;

/// Degrees in a full turn.
pub const FULL_TURN: f64 = 360.0;

/// Tunables of the wheel animation and draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinConfig {
    /// Whole turns added by the forward leg.
    pub forward_turns: u32,
    /// Whole turns removed by the reverse leg of a long run.
    pub reverse_turns: u32,
    /// Duration of the forward leg.
    pub forward_duration: Duration,
    /// Duration of the reverse leg.
    pub reverse_duration: Duration,
    /// Probability that a spin turns into a long run.
    pub long_run_probability: f64,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            forward_turns: 5,
            reverse_turns: 15,
            forward_duration: Duration::from_secs(5),
            reverse_duration: Duration::from_secs(8),
            long_run_probability: 0.5,
        }
    }
}

/// Independent random values behind one spin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinDraw {
    /// Whether the wheel reverses after the forward leg.
    pub long_run: bool,
    /// Extra degrees in `[0, 360)` added to the forward leg.
    pub forward_offset: f64,
    /// Extra degrees in `[0, 360)` removed by the reverse leg.
    pub reverse_offset: f64,
}

impl SpinDraw {
    /// Sample the three values independently and uniformly.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R, config: &SpinConfig) -> Self {
        Self {
            long_run: rng.random_bool(config.long_run_probability.clamp(0.0, 1.0)),
            forward_offset: rng.random_range(0.0..FULL_TURN),
            reverse_offset: rng.random_range(0.0..FULL_TURN),
        }
    }
}

/// Phases of the wheel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpinPhase {
    /// Waiting for a spin to be triggered.
    Idle,
    /// Rotating forward.
    Spinning,
    /// Counter-rotating after a fake stop (long runs only).
    Reversing,
    /// Stopped on a winner.
    Settled {
        /// Pool index under the pointer.
        winner_index: usize,
    },
}

/// Events driving the wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinEvent {
    /// A user triggered a spin.
    Start,
    /// The running leg reached its end.
    LegElapsed,
}

/// Error returned when an event cannot be applied in the current phase.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// Phase the wheel was in.
    pub from: SpinPhase,
    /// Rejected event.
    pub event: SpinEvent,
}

/// Errors raised by the spin engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpinError {
    /// A draw needs at least two segments.
    #[error("a spin needs at least two candidates, got {0}")]
    PoolTooSmall(usize),
    /// The event is not valid in the current phase.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

/// One animated rotation between two angles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinLeg {
    /// Phase the wheel is in while the leg runs.
    pub phase: SpinPhase,
    /// Rotation at the start of the leg.
    pub from: f64,
    /// Rotation at the end of the leg.
    pub to: f64,
    /// Time the presentation layer should take to ease from `from` to `to`.
    pub duration: Duration,
}

/// Fully resolved outcome of a spin.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinPlan {
    /// Identifier of the draw, handy for correlating logs and clients.
    pub id: Uuid,
    /// Number of wheel segments.
    pub pool_size: usize,
    /// Rotation the wheel started from.
    pub start_rotation: f64,
    /// Random values the plan was derived from.
    pub draw: SpinDraw,
    /// Rotation reached at the end of the forward leg.
    pub forward_target: f64,
    /// Rotation the wheel settles on.
    pub final_rotation: f64,
    /// Pool index under the pointer once settled.
    pub winner_index: usize,
    /// Legs to animate, in order.
    pub timeline: Vec<SpinLeg>,
}

impl SpinPlan {
    /// Total animation time.
    pub fn total_duration(&self) -> Duration {
        self.timeline.iter().map(|leg| leg.duration).sum()
    }
}

/// Resolve a spin from an explicit draw.
pub fn plan_spin(
    draw: SpinDraw,
    pool_size: usize,
    start_rotation: f64,
    config: &SpinConfig,
) -> Result<SpinPlan, SpinError> {
    if pool_size < 2 {
        return Err(SpinError::PoolTooSmall(pool_size));
    }

    let forward_target =
        start_rotation + f64::from(config.forward_turns) * FULL_TURN + draw.forward_offset;
    let mut timeline = vec![SpinLeg {
        phase: SpinPhase::Spinning,
        from: start_rotation,
        to: forward_target,
        duration: config.forward_duration,
    }];

    let final_rotation = if draw.long_run {
        let reversed =
            forward_target - f64::from(config.reverse_turns) * FULL_TURN - draw.reverse_offset;
        timeline.push(SpinLeg {
            phase: SpinPhase::Reversing,
            from: forward_target,
            to: reversed,
            duration: config.reverse_duration,
        });
        reversed
    } else {
        forward_target
    };

    Ok(SpinPlan {
        id: Uuid::new_v4(),
        pool_size,
        start_rotation,
        draw,
        forward_target,
        final_rotation,
        winner_index: winning_index(final_rotation, pool_size),
        timeline,
    })
}

/// Resolve a spin from a seed, so the same seed always yields the same outcome.
pub fn plan_seeded(
    seed: u64,
    pool_size: usize,
    start_rotation: f64,
    config: &SpinConfig,
) -> Result<SpinPlan, SpinError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let draw = SpinDraw::sample(&mut rng, config);
    plan_spin(draw, pool_size, start_rotation, config)
}

/// Pool index of the segment under the fixed top pointer for a wheel rotated by `rotation`.
///
/// Rotating the wheel clockwise moves segments forward visually, so the segment under the
/// pointer is found at `360 - rotation`.
pub fn winning_index(rotation: f64, pool_size: usize) -> usize {
    if pool_size == 0 {
        return 0;
    }

    let segment = FULL_TURN / pool_size as f64;
    let normalized = rotation.rem_euclid(FULL_TURN);
    let position = (FULL_TURN - normalized).rem_euclid(FULL_TURN);
    ((position / segment).floor() as usize) % pool_size
}

/// Stateful wheel that remembers its rotation across draws.
#[derive(Debug, Clone)]
pub struct SpinWheel {
    pool_size: usize,
    rotation: f64,
    phase: SpinPhase,
    plan: Option<SpinPlan>,
    config: SpinConfig,
}

impl SpinWheel {
    /// Create an idle wheel at rotation 0.
    pub fn new(pool_size: usize, config: SpinConfig) -> Result<Self, SpinError> {
        if pool_size < 2 {
            return Err(SpinError::PoolTooSmall(pool_size));
        }

        Ok(Self {
            pool_size,
            rotation: 0.0,
            phase: SpinPhase::Idle,
            plan: None,
            config,
        })
    }

    /// Start from the rotation a previous wheel settled at.
    pub fn at_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    /// Current phase.
    pub fn phase(&self) -> SpinPhase {
        self.phase
    }

    /// Rotation the wheel is at, or heading to while a leg runs.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Plan of the current or last draw.
    pub fn plan(&self) -> Option<&SpinPlan> {
        self.plan.as_ref()
    }

    /// Winner of the last draw once settled.
    pub fn winner_index(&self) -> Option<usize> {
        match self.phase {
            SpinPhase::Settled { winner_index } => Some(winner_index),
            _ => None,
        }
    }

    /// Trigger a spin using fresh random values.
    pub fn start<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<SpinLeg, SpinError> {
        let draw = SpinDraw::sample(rng, &self.config);
        self.start_with(draw)
    }

    /// Trigger a spin with an explicit draw. Restarting after a settle keeps the rotation.
    pub fn start_with(&mut self, draw: SpinDraw) -> Result<SpinLeg, SpinError> {
        if !matches!(self.phase, SpinPhase::Idle | SpinPhase::Settled { .. }) {
            return Err(InvalidTransition {
                from: self.phase,
                event: SpinEvent::Start,
            }
            .into());
        }

        let plan = plan_spin(draw, self.pool_size, self.rotation, &self.config)?;
        let leg = plan.timeline[0];
        self.phase = leg.phase;
        self.rotation = leg.to;
        self.plan = Some(plan);
        Ok(leg)
    }

    /// Signal that the running leg finished. Returns the next leg, or `None` once settled.
    pub fn advance(&mut self) -> Result<Option<SpinLeg>, SpinError> {
        let invalid = InvalidTransition {
            from: self.phase,
            event: SpinEvent::LegElapsed,
        };
        let plan = match (&self.phase, &self.plan) {
            (SpinPhase::Spinning | SpinPhase::Reversing, Some(plan)) => plan,
            _ => return Err(invalid.into()),
        };

        let next = match self.phase {
            SpinPhase::Spinning => plan.timeline.get(1).copied(),
            _ => None,
        };

        match next {
            Some(leg) => {
                self.phase = leg.phase;
                self.rotation = leg.to;
            }
            None => {
                self.rotation = plan.final_rotation;
                self.phase = SpinPhase::Settled {
                    winner_index: plan.winner_index,
                };
            }
        }

        Ok(next)
    }
}

/// Presentation hooks fed by [`run_spin`].
pub trait SpinPresenter {
    /// A leg starts; animate from `leg.from` to `leg.to` over `leg.duration`.
    fn leg_started(&mut self, leg: &SpinLeg);
    /// The wheel stopped on `winner_index`.
    fn settled(&mut self, winner_index: usize, rotation: f64);
}

/// Drive a wheel through one draw in real time, notifying the presenter at each step.
pub async fn run_spin<R, P>(
    wheel: &mut SpinWheel,
    rng: &mut R,
    presenter: &mut P,
) -> Result<usize, SpinError>
where
    R: Rng + ?Sized,
    P: SpinPresenter + ?Sized,
{
    let mut leg = wheel.start(rng)?;
    loop {
        presenter.leg_started(&leg);
        tokio::time::sleep(leg.duration).await;
        match wheel.advance()? {
            Some(next) => leg = next,
            None => break,
        }
    }

    let winner = wheel.winner_index().ok_or(InvalidTransition {
        from: wheel.phase(),
        event: SpinEvent::LegElapsed,
    })?;
    presenter.settled(winner, wheel.rotation());
    Ok(winner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short(offset: f64) -> SpinDraw {
        SpinDraw {
            long_run: false,
            forward_offset: offset,
            reverse_offset: 0.0,
        }
    }

    fn long(forward: f64, reverse: f64) -> SpinDraw {
        SpinDraw {
            long_run: true,
            forward_offset: forward,
            reverse_offset: reverse,
        }
    }

    #[test]
    fn winner_mapping_inverts_the_rotation() {
        assert_eq!(winning_index(450.0, 4), 3);
        assert_eq!(winning_index(0.0, 4), 0);
        assert_eq!(winning_index(90.0, 4), 3);
        assert_eq!(winning_index(180.0, 4), 2);
        assert_eq!(winning_index(270.0, 4), 1);
        assert_eq!(winning_index(-90.0, 4), 1);
        assert_eq!(winning_index(-5400.0 - 10.0, 2), 0);
        assert_eq!(winning_index(359.999, 3), 0);
    }

    #[test]
    fn short_run_settles_on_forward_target() {
        let config = SpinConfig::default();
        let plan = plan_spin(short(90.0), 4, 0.0, &config).unwrap();
        assert_eq!(plan.forward_target, 5.0 * 360.0 + 90.0);
        assert_eq!(plan.final_rotation, plan.forward_target);
        assert_eq!(plan.winner_index, 3);
        assert_eq!(plan.timeline.len(), 1);
        assert_eq!(plan.total_duration(), Duration::from_secs(5));
    }

    #[test]
    fn long_run_reverses_far_past_the_fake_stop() {
        let config = SpinConfig::default();
        let plan = plan_spin(long(10.0, 200.0), 3, 45.0, &config).unwrap();
        assert_eq!(plan.forward_target, 45.0 + 1800.0 + 10.0);
        assert_eq!(plan.final_rotation, plan.forward_target - 5400.0 - 200.0);
        assert_eq!(plan.timeline.len(), 2);
        assert_eq!(plan.timeline[1].phase, SpinPhase::Reversing);
        assert_eq!(plan.total_duration(), Duration::from_secs(13));
        assert_eq!(plan.winner_index, winning_index(plan.final_rotation, 3));
    }

    #[test]
    fn long_runs_never_fake_a_reversal() {
        let config = SpinConfig::default();
        let mut long_runs = 0;
        for seed in 0..500 {
            let plan = plan_seeded(seed, 5, 0.0, &config).unwrap();
            if plan.draw.long_run {
                long_runs += 1;
                let travel = (plan.final_rotation - plan.forward_target).abs();
                assert!(travel >= 15.0 * 360.0 - 360.0, "seed {seed}: {travel}");
            }
            assert!(plan.winner_index < 5);
        }
        assert!(long_runs > 150 && long_runs < 350, "long runs: {long_runs}");
    }

    #[test]
    fn same_seed_yields_same_outcome() {
        let config = SpinConfig::default();
        let first = plan_seeded(42, 4, 120.0, &config).unwrap();
        let second = plan_seeded(42, 4, 120.0, &config).unwrap();
        assert_eq!(first.draw, second.draw);
        assert_eq!(first.final_rotation, second.final_rotation);
        assert_eq!(first.winner_index, second.winner_index);
    }

    #[test]
    fn every_segment_can_win() {
        let config = SpinConfig::default();
        let mut seen = [false; 4];
        for seed in 0..400 {
            seen[plan_seeded(seed, 4, 0.0, &config).unwrap().winner_index] = true;
        }
        assert!(seen.iter().all(|hit| *hit));
    }

    #[test]
    fn pool_must_hold_two_candidates() {
        let config = SpinConfig::default();
        assert_eq!(
            plan_spin(short(0.0), 1, 0.0, &config).unwrap_err(),
            SpinError::PoolTooSmall(1)
        );
        assert!(SpinWheel::new(0, config).is_err());
    }

    #[test]
    fn wheel_walks_short_run_to_settled() {
        let mut wheel = SpinWheel::new(4, SpinConfig::default()).unwrap();
        let leg = wheel.start_with(short(90.0)).unwrap();
        assert_eq!(wheel.phase(), SpinPhase::Spinning);
        assert_eq!(leg.to, 1890.0);

        assert_eq!(wheel.advance().unwrap(), None);
        assert_eq!(wheel.phase(), SpinPhase::Settled { winner_index: 3 });
        assert_eq!(wheel.winner_index(), Some(3));
    }

    #[test]
    fn wheel_walks_long_run_through_reversal() {
        let mut wheel = SpinWheel::new(2, SpinConfig::default()).unwrap();
        wheel.start_with(long(0.0, 90.0)).unwrap();

        let reverse = wheel.advance().unwrap().unwrap();
        assert_eq!(wheel.phase(), SpinPhase::Reversing);
        assert_eq!(reverse.from, 1800.0);
        assert_eq!(reverse.to, 1800.0 - 5400.0 - 90.0);

        assert_eq!(wheel.advance().unwrap(), None);
        assert_eq!(wheel.rotation(), -3690.0);
        assert_eq!(wheel.winner_index(), Some(winning_index(-3690.0, 2)));
    }

    #[test]
    fn restart_keeps_rotation_and_busy_wheel_rejects_start() {
        let mut wheel = SpinWheel::new(3, SpinConfig::default()).unwrap();
        wheel.start_with(short(30.0)).unwrap();

        let err = wheel.start_with(short(0.0)).unwrap_err();
        assert_eq!(
            err,
            SpinError::InvalidTransition(InvalidTransition {
                from: SpinPhase::Spinning,
                event: SpinEvent::Start,
            })
        );

        wheel.advance().unwrap();
        let settled_at = wheel.rotation();
        let leg = wheel.start_with(short(0.0)).unwrap();
        assert_eq!(leg.from, settled_at);
        assert_eq!(leg.to, settled_at + 1800.0);
    }

    #[test]
    fn idle_wheel_rejects_leg_elapsed() {
        let mut wheel = SpinWheel::new(2, SpinConfig::default()).unwrap();
        assert!(matches!(
            wheel.advance(),
            Err(SpinError::InvalidTransition(InvalidTransition {
                from: SpinPhase::Idle,
                event: SpinEvent::LegElapsed,
            }))
        ));
    }

    #[derive(Default)]
    struct Recorder {
        legs: Vec<SpinLeg>,
        settled: Option<(usize, f64)>,
    }

    impl SpinPresenter for Recorder {
        fn leg_started(&mut self, leg: &SpinLeg) {
            self.legs.push(*leg);
        }

        fn settled(&mut self, winner_index: usize, rotation: f64) {
            self.settled = Some((winner_index, rotation));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_spin_replays_the_timeline() {
        let mut wheel = SpinWheel::new(4, SpinConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut recorder = Recorder::default();

        let started = tokio::time::Instant::now();
        let winner = run_spin(&mut wheel, &mut rng, &mut recorder).await.unwrap();

        let plan = wheel.plan().unwrap().clone();
        assert_eq!(winner, plan.winner_index);
        assert_eq!(recorder.legs, plan.timeline);
        assert_eq!(recorder.settled, Some((winner, plan.final_rotation)));
        assert!(started.elapsed() >= plan.total_duration());
    }
}
