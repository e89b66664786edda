use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

use crate::cache::TtlCache;
use crate::models::Snowflake;

pub const RPS_MATCH_DURATION: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RpsAttack {
    Rock,
    Paper,
    Scissor,
}

impl RpsAttack {
    pub fn can_beat(self, other: RpsAttack) -> bool {
        matches!(
            (self, other),
            (RpsAttack::Rock, RpsAttack::Scissor)
                | (RpsAttack::Scissor, RpsAttack::Paper)
                | (RpsAttack::Paper, RpsAttack::Rock)
        )
    }

    pub fn is_tie(self, other: RpsAttack) -> bool {
        self == other
    }
}

impl fmt::Display for RpsAttack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RpsAttack::Rock => "ROCK",
            RpsAttack::Paper => "PAPER",
            RpsAttack::Scissor => "SCISSOR",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpsRole {
    Challenger,
    Challengee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpsMatch {
    pub challenger: Snowflake,
    pub challengee: Snowflake,
}

impl RpsMatch {
    fn role_of(&self, user: Snowflake) -> Option<RpsRole> {
        if user == self.challenger {
            Some(RpsRole::Challenger)
        } else if user == self.challengee {
            Some(RpsRole::Challengee)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpsAttackMove {
    pub user: Snowflake,
    pub attack: RpsAttack,
}

/// Picks recorded so far for one match, at most one per role.
#[derive(Debug, Clone, Copy, Default)]
struct RpsMoves {
    challenger: Option<RpsAttackMove>,
    challengee: Option<RpsAttackMove>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpsWinner {
    Challenger(Snowflake),
    Challengee(Snowflake),
    Tie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpsResult {
    pub challenger: RpsAttackMove,
    pub challengee: RpsAttackMove,
    pub winner: RpsWinner,
}

impl RpsResult {
    fn decide(challenger: RpsAttackMove, challengee: RpsAttackMove) -> Self {
        let (a, b) = (challenger.attack, challengee.attack);
        let winner = if a.can_beat(b) {
            RpsWinner::Challenger(challenger.user)
        } else if a.is_tie(b) {
            RpsWinner::Tie
        } else {
            RpsWinner::Challengee(challengee.user)
        };
        Self {
            challenger,
            challengee,
            winner,
        }
    }

    pub fn describe(&self) -> String {
        let (a, b) = (self.challenger.attack, self.challengee.attack);
        match self.winner {
            RpsWinner::Challenger(user) => format!("{} beats {}! <@{}> wins.", a, b, user),
            RpsWinner::Challengee(user) => format!("{} beats {}! <@{}> wins.", b, a, user),
            RpsWinner::Tie => "It's a tie! No one wins.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    /// No live match for the message.
    NoMatch,
    NotParticipant,
    /// The user's role already picked; the first pick stands.
    AlreadyPicked,
    Waiting,
    Finished(RpsResult),
}

/// Tracks running matches keyed by the id of the challenge message.
pub struct RpsHandler {
    matches: TtlCache<Snowflake, RpsMatch>,
    moves: TtlCache<Snowflake, RpsMoves>,
}

impl Default for RpsHandler {
    fn default() -> Self {
        Self::new(RPS_MATCH_DURATION)
    }
}

impl RpsHandler {
    pub fn new(match_duration: Duration) -> Self {
        Self {
            matches: TtlCache::new(match_duration),
            moves: TtlCache::new(match_duration),
        }
    }

    pub fn register_match(&self, message: Snowflake, challenger: Snowflake, challengee: Snowflake) {
        self.register_match_at(message, challenger, challengee, Instant::now());
    }

    pub fn register_attack(&self, message: Snowflake, user: Snowflake, attack: RpsAttack) -> AttackOutcome {
        self.register_attack_at(message, user, attack, Instant::now())
    }

    pub fn end_match(&self, message: Snowflake) {
        self.matches.invalidate(&message);
        self.moves.invalidate(&message);
    }

    fn register_match_at(&self, message: Snowflake, challenger: Snowflake, challengee: Snowflake, now: Instant) {
        log::debug!("Registering rps match {} between {} and {}", message, challenger, challengee);
        self.matches.insert_at(
            message,
            RpsMatch {
                challenger,
                challengee,
            },
            now,
        );
    }

    fn register_attack_at(
        &self,
        message: Snowflake,
        user: Snowflake,
        attack: RpsAttack,
        now: Instant,
    ) -> AttackOutcome {
        let Some(rps_match) = self.matches.get_at(&message, now) else {
            return AttackOutcome::NoMatch;
        };
        let Some(role) = rps_match.role_of(user) else {
            return AttackOutcome::NotParticipant;
        };

        let pick = RpsAttackMove { user, attack };
        let outcome = self.moves.update_at(
            message,
            RpsMoves::default,
            |moves| {
                let slot = match role {
                    RpsRole::Challenger => &mut moves.challenger,
                    RpsRole::Challengee => &mut moves.challengee,
                };
                if slot.is_some() {
                    return AttackOutcome::AlreadyPicked;
                }
                *slot = Some(pick);

                match (moves.challenger, moves.challengee) {
                    (Some(a), Some(b)) => AttackOutcome::Finished(RpsResult::decide(a, b)),
                    _ => AttackOutcome::Waiting,
                }
            },
            now,
        );

        if let AttackOutcome::Finished(result) = outcome {
            log::info!("Rps match {} finished: {:?}", message, result.winner);
            self.end_match(message);
        }
        outcome
    }
}
