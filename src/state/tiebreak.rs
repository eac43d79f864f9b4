//! Selection of the games eligible for a randomized tie-break.
//!
//! A spin is only offered for a genuine tie. When the leader is alone at the top, the next
//! tier is considered instead (a runner-up draw); the leader is never part of that draw.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::state::session::Game;

/// Vote tier the pool was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolTier {
    /// Games tied for the highest vote count.
    Top,
    /// Games tied directly below an outright leader.
    RunnerUp,
}

/// Ordered set of tied finalists handed to the spin engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TieBreakPool {
    /// Which tier the finalists come from.
    pub tier: PoolTier,
    /// Vote count shared by every finalist.
    pub votes: usize,
    /// Finalists, in session list order. Always at least two entries.
    pub games: Vec<Game>,
    /// Outright leader excluded from a runner-up draw.
    pub leader: Option<Game>,
}

impl TieBreakPool {
    /// Number of wheel segments.
    pub fn size(&self) -> usize {
        self.games.len()
    }
}

/// Reason why no draw is needed or possible.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotApplicable {
    /// There are no active games.
    #[error("no games have been added yet")]
    NoGames,
    /// No active game has received a vote.
    #[error("no one has voted yet")]
    NoVotes,
    /// A single game wins without a draw.
    #[error("`{}` wins outright", .0.title)]
    ClearWinner(Game),
    /// The resolved tier does not hold a real tie.
    #[error("not enough tied games for a draw")]
    InsufficientTie,
}

/// Compute the tie-break pool from the session's games.
///
/// Played games are ignored. Finalists keep the order they have in `games`.
pub fn select_pool(games: &[Game]) -> Result<TieBreakPool, NotApplicable> {
    let active = games.iter().filter(|game| game.is_active()).collect::<Vec<_>>();
    if active.is_empty() {
        return Err(NotApplicable::NoGames);
    }

    let voted = active
        .into_iter()
        .filter(|game| game.vote_count() > 0)
        .collect::<Vec<_>>();
    match voted.as_slice() {
        [] => return Err(NotApplicable::NoVotes),
        [single] => return Err(NotApplicable::ClearWinner((*single).clone())),
        _ => {}
    }

    let mut tiers: BTreeMap<usize, Vec<&Game>> = BTreeMap::new();
    for game in voted {
        tiers.entry(game.vote_count()).or_default().push(game);
    }

    let mut descending = tiers.into_iter().rev();
    let Some((top_votes, top_group)) = descending.next() else {
        return Err(NotApplicable::NoVotes);
    };

    let (tier, votes, finalists, leader) = if top_group.len() == 1 {
        let leader = top_group[0].clone();
        match descending.next() {
            Some((runner_votes, runner_group)) if runner_group.len() >= 2 => {
                (PoolTier::RunnerUp, runner_votes, runner_group, Some(leader))
            }
            _ => return Err(NotApplicable::ClearWinner(leader)),
        }
    } else {
        (PoolTier::Top, top_votes, top_group, None)
    };

    if finalists.len() < 2 {
        return Err(NotApplicable::InsufficientTie);
    }

    Ok(TieBreakPool {
        tier,
        votes,
        games: finalists.into_iter().cloned().collect(),
        leader,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::session::GameStatus;

    fn game(id: &str, votes: usize) -> Game {
        Game {
            id: id.into(),
            title: format!("Game {id}"),
            cover: None,
            added_by: "Alice".into(),
            votes: (0..votes).map(|n| format!("u{n}")).collect(),
            status: GameStatus::Active,
        }
    }

    fn ids(pool: &TieBreakPool) -> Vec<&str> {
        pool.games.iter().map(|game| game.id.as_str()).collect()
    }

    #[test]
    fn top_tier_tie_forms_the_pool() {
        let pool = select_pool(&[game("A", 3), game("B", 3), game("C", 1)]).unwrap();
        assert_eq!(pool.tier, PoolTier::Top);
        assert_eq!(pool.votes, 3);
        assert_eq!(ids(&pool), vec!["A", "B"]);
        assert!(pool.leader.is_none());
    }

    #[test]
    fn runner_up_tier_is_used_when_leader_is_alone() {
        let pool = select_pool(&[game("A", 3), game("B", 1), game("C", 1)]).unwrap();
        assert_eq!(pool.tier, PoolTier::RunnerUp);
        assert_eq!(pool.votes, 1);
        assert_eq!(ids(&pool), vec!["B", "C"]);
        assert_eq!(pool.leader.unwrap().id, "A");
    }

    #[test]
    fn single_voted_game_is_a_clear_winner() {
        let err = select_pool(&[game("A", 2)]).unwrap_err();
        assert_eq!(err, NotApplicable::ClearWinner(game("A", 2)));

        let err = select_pool(&[game("A", 2), game("B", 0)]).unwrap_err();
        assert_eq!(err, NotApplicable::ClearWinner(game("A", 2)));
    }

    #[test]
    fn leader_with_lone_runner_up_is_a_clear_winner() {
        let err = select_pool(&[game("A", 4), game("B", 2), game("C", 1)]).unwrap_err();
        assert_eq!(err, NotApplicable::ClearWinner(game("A", 4)));
    }

    #[test]
    fn no_votes_and_no_games_are_reported() {
        assert_eq!(
            select_pool(&[game("A", 0), game("B", 0)]).unwrap_err(),
            NotApplicable::NoVotes
        );
        assert_eq!(select_pool(&[]).unwrap_err(), NotApplicable::NoGames);
    }

    #[test]
    fn played_games_are_excluded() {
        let mut played = game("A", 5);
        played.status = GameStatus::Played;
        let pool = select_pool(&[played.clone(), game("B", 2), game("C", 2)]).unwrap();
        assert_eq!(pool.tier, PoolTier::Top);
        assert_eq!(ids(&pool), vec!["B", "C"]);

        assert_eq!(select_pool(&[played]).unwrap_err(), NotApplicable::NoGames);
    }

    #[test]
    fn pool_preserves_list_order() {
        let pool = select_pool(&[game("C", 2), game("X", 1), game("A", 2), game("B", 2)]).unwrap();
        assert_eq!(ids(&pool), vec!["C", "A", "B"]);
    }
}
