use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::state::{
    session::Game,
    spin::{SpinLeg, SpinPhase, SpinPlan},
    tiebreak::{NotApplicable, PoolTier, TieBreakPool},
};

/// Tier a tie-break pool was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum PoolTierDto {
    Top,
    RunnerUp,
}

impl From<PoolTier> for PoolTierDto {
    fn from(tier: PoolTier) -> Self {
        match tier {
            PoolTier::Top => PoolTierDto::Top,
            PoolTier::RunnerUp => PoolTierDto::RunnerUp,
        }
    }
}

/// Why no draw is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum NotApplicableReason {
    NoGames,
    NoVotes,
    ClearWinner,
    InsufficientTie,
}

/// Tie-break pool of a session, or the reason there is none.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TieBreakResponse {
    /// Whether a spin can be run.
    pub applicable: bool,
    pub tier: Option<PoolTierDto>,
    /// Vote count shared by the finalists.
    pub votes: Option<usize>,
    /// Finalists in wheel order; empty when not applicable.
    pub pool: Vec<Game>,
    /// Outright leader excluded from a runner-up draw.
    pub leader: Option<Game>,
    pub reason: Option<NotApplicableReason>,
    /// Game that wins without a draw.
    pub winner: Option<Game>,
    /// Human readable explanation when not applicable.
    pub message: Option<String>,
}

impl From<Result<TieBreakPool, NotApplicable>> for TieBreakResponse {
    fn from(selection: Result<TieBreakPool, NotApplicable>) -> Self {
        match selection {
            Ok(pool) => Self {
                applicable: true,
                tier: Some(pool.tier.into()),
                votes: Some(pool.votes),
                pool: pool.games,
                leader: pool.leader,
                reason: None,
                winner: None,
                message: None,
            },
            Err(reason) => {
                let message = reason.to_string();
                let (reason, winner) = match reason {
                    NotApplicable::NoGames => (NotApplicableReason::NoGames, None),
                    NotApplicable::NoVotes => (NotApplicableReason::NoVotes, None),
                    NotApplicable::ClearWinner(game) => {
                        (NotApplicableReason::ClearWinner, Some(game))
                    }
                    NotApplicable::InsufficientTie => (NotApplicableReason::InsufficientTie, None),
                };
                Self {
                    applicable: false,
                    tier: None,
                    votes: None,
                    pool: Vec::new(),
                    leader: None,
                    reason: Some(reason),
                    winner,
                    message: Some(message),
                }
            }
        }
    }
}

/// Options of a server-side draw.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SpinRequest {
    /// Seed making the draw reproducible; a random one is used when absent.
    pub seed: Option<u64>,
    /// Rotation the wheel currently shows, in degrees.
    #[validate(range(min = -1.0e9, max = 1.0e9))]
    pub start_rotation: Option<f64>,
}

/// Phase of an animated leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum SpinLegPhase {
    Spinning,
    Reversing,
}

/// One animated rotation of the wheel.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpinLegDto {
    pub phase: SpinLegPhase,
    pub from: f64,
    pub to: f64,
    pub duration_ms: u64,
}

impl From<SpinLeg> for SpinLegDto {
    fn from(leg: SpinLeg) -> Self {
        Self {
            phase: match leg.phase {
                SpinPhase::Reversing => SpinLegPhase::Reversing,
                _ => SpinLegPhase::Spinning,
            },
            from: leg.from,
            to: leg.to,
            duration_ms: u64::try_from(leg.duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Resolved draw: the winner plus the timeline to animate it.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpinResponse {
    pub spin_id: Uuid,
    pub tier: PoolTierDto,
    /// Finalists in wheel order.
    pub pool: Vec<Game>,
    pub winner_index: usize,
    pub winner: Game,
    /// Whether the wheel fakes a stop and reverses.
    pub long_run: bool,
    pub start_rotation: f64,
    pub forward_target: f64,
    pub final_rotation: f64,
    pub total_duration_ms: u64,
    pub timeline: Vec<SpinLegDto>,
}

impl SpinResponse {
    /// Combine a pool with the plan drawn over it. `None` when the plan does not fit the pool.
    pub fn new(pool: TieBreakPool, plan: SpinPlan) -> Option<Self> {
        let winner = pool.games.get(plan.winner_index)?.clone();
        Some(Self {
            spin_id: plan.id,
            tier: pool.tier.into(),
            pool: pool.games,
            winner_index: plan.winner_index,
            winner,
            long_run: plan.draw.long_run,
            start_rotation: plan.start_rotation,
            forward_target: plan.forward_target,
            final_rotation: plan.final_rotation,
            total_duration_ms: u64::try_from(plan.total_duration().as_millis())
                .unwrap_or(u64::MAX),
            timeline: plan.timeline.into_iter().map(Into::into).collect(),
        })
    }
}
