use std::fmt;

use derby_game::{HorseId, Player, Program, RaceHorseEntry};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;

/// Bet chosen by a [`PlayerPolicy`].
#[derive(Debug, Clone, PartialEq)]
pub struct BetDecision {
    pub horse_id: HorseId,
    pub rationale: String,
}

impl BetDecision {
    fn backing(entry: &RaceHorseEntry, why: &str) -> Self {
        Self {
            horse_id: entry.id(),
            rationale: format!("{why} {} at {:.2}", entry.horse.name, entry.coef),
        }
    }
}

/// Policy interface for automated bettors.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Pick a horse to back in `program`, or `None` to sit the race out.
    fn pick_horse(&mut self, player: &Player, program: &Program) -> Option<BetDecision>;
}

/// Built-in betting strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameplayStrategy {
    Abstain,
    Favorite,
    Longshot,
    Random,
}

impl GameplayStrategy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Abstain => "Abstain",
            Self::Favorite => "Favorite",
            Self::Longshot => "Longshot",
            Self::Random => "Random",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            Self::Abstain => Box::new(AbstainPolicy),
            Self::Favorite => Box::new(FavoritePolicy),
            Self::Longshot => Box::new(LongshotPolicy),
            Self::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct AbstainPolicy;
struct FavoritePolicy;
struct LongshotPolicy;

struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl PlayerPolicy for AbstainPolicy {
    fn name(&self) -> &'static str {
        "Abstain"
    }

    fn pick_horse(&mut self, _player: &Player, _program: &Program) -> Option<BetDecision> {
        None
    }
}

impl PlayerPolicy for FavoritePolicy {
    fn name(&self) -> &'static str {
        "Favorite"
    }

    fn pick_horse(&mut self, _player: &Player, program: &Program) -> Option<BetDecision> {
        // Ties go to the earliest entry in the field.
        program
            .horses
            .iter()
            .reduce(|best, entry| if entry.coef < best.coef { entry } else { best })
            .map(|entry| BetDecision::backing(entry, "shortest odds"))
    }
}

impl PlayerPolicy for LongshotPolicy {
    fn name(&self) -> &'static str {
        "Longshot"
    }

    fn pick_horse(&mut self, _player: &Player, program: &Program) -> Option<BetDecision> {
        program
            .horses
            .iter()
            .reduce(|best, entry| if entry.coef > best.coef { entry } else { best })
            .map(|entry| BetDecision::backing(entry, "longest odds"))
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn pick_horse(&mut self, _player: &Player, program: &Program) -> Option<BetDecision> {
        program
            .horses
            .choose(&mut self.rng)
            .map(|entry| BetDecision::backing(entry, "random pick"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use derby_game::Horse;

    fn program() -> Program {
        let coefs = [4.5, 1.9, 12.0, 1.9, 7.25];
        Program {
            lap: 1,
            distance: 1_200,
            horses: coefs
                .iter()
                .zip(1..)
                .map(|(coef, id)| {
                    RaceHorseEntry::new(Horse::new(id, format!("H{id}"), 50), *coef)
                })
                .collect(),
            race_started: false,
            race_finished: false,
        }
    }

    fn player() -> Player {
        Player::new("bot").unwrap()
    }

    #[test]
    fn favorite_backs_shortest_odds_first_on_ties() {
        let decision = GameplayStrategy::Favorite
            .create_policy(1)
            .pick_horse(&player(), &program())
            .unwrap();
        assert_eq!(decision.horse_id, 2);
        assert!(decision.rationale.contains("1.90"));
    }

    #[test]
    fn longshot_backs_longest_odds() {
        let decision = GameplayStrategy::Longshot
            .create_policy(1)
            .pick_horse(&player(), &program())
            .unwrap();
        assert_eq!(decision.horse_id, 3);
    }

    #[test]
    fn abstain_never_bets() {
        let mut policy = GameplayStrategy::Abstain.create_policy(1);
        assert!(policy.pick_horse(&player(), &program()).is_none());
        assert_eq!(policy.name(), "Abstain");
    }

    #[test]
    fn random_policy_is_reproducible_per_seed() {
        let picks = |seed: u64| {
            let mut policy = GameplayStrategy::Random.create_policy(seed);
            (0..8)
                .filter_map(|_| policy.pick_horse(&player(), &program()))
                .map(|d| d.horse_id)
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(7), picks(7));
        assert_eq!(picks(7).len(), 8);
        assert!(picks(7).iter().all(|id| (1..=5).contains(id)));
    }

    #[test]
    fn empty_field_yields_no_bet() {
        let mut empty = program();
        empty.horses.clear();
        for strategy in [
            GameplayStrategy::Abstain,
            GameplayStrategy::Favorite,
            GameplayStrategy::Longshot,
            GameplayStrategy::Random,
        ] {
            assert!(
                strategy
                    .create_policy(3)
                    .pick_horse(&player(), &empty)
                    .is_none()
            );
        }
    }
}
