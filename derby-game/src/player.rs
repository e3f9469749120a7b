//! Player wallet, bet placement and race settlement
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_BALANCE_CENTS, DEFAULT_BET_CENTS, LOG_TARGET_BET};
use crate::horse::HorseId;
use crate::numbers::{i64_to_f64, round_f64_to_i64};
use crate::program::Program;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlayerError {
    #[error("player name cannot be empty")]
    EmptyName,
}

/// Reasons a bet can be refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BetError {
    #[error("no program for lap {lap}")]
    UnknownLap { lap: u32 },
    #[error("lap {lap} has already started")]
    RaceStarted { lap: u32 },
    #[error("a bet is already placed on lap {lap}")]
    AlreadyBet { lap: u32 },
    #[error("horse {horse_id} is not running in lap {lap}")]
    UnknownHorse { lap: u32, horse_id: HorseId },
    #[error("balance of {balance_cents} cents cannot cover a {stake_cents} cent stake")]
    InsufficientBalance {
        balance_cents: i64,
        stake_cents: i64,
    },
}

/// The person betting, with a balance kept in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub balance_cents: i64,
}

impl Player {
    /// Create a player with the default starting balance.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::EmptyName`] if the trimmed name is empty.
    pub fn new(name: &str) -> Result<Self, PlayerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlayerError::EmptyName);
        }
        Ok(Self {
            name: name.to_string(),
            balance_cents: DEFAULT_BALANCE_CENTS,
        })
    }

    #[must_use]
    pub const fn can_afford(&self, stake_cents: i64) -> bool {
        self.balance_cents >= stake_cents
    }
}

/// Outcome of settling a finished program for the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub lap: u32,
    pub staked_cents: i64,
    pub payout_cents: i64,
}

impl Settlement {
    #[must_use]
    pub const fn won(&self) -> bool {
        self.payout_cents > 0
    }

    /// Payout minus stake.
    #[must_use]
    pub const fn net_cents(&self) -> i64 {
        self.payout_cents - self.staked_cents
    }
}

/// Wager the default stake on `horse_id` in `program`.
///
/// The stake leaves the balance immediately. Only one bet per program is
/// accepted, and only before the race starts.
///
/// # Errors
///
/// Returns a [`BetError`] describing the first precondition that fails.
pub fn place_bet(
    player: &mut Player,
    program: &mut Program,
    horse_id: HorseId,
) -> Result<i64, BetError> {
    let lap = program.lap;
    if program.race_started {
        return Err(BetError::RaceStarted { lap });
    }
    if program.has_bet() {
        return Err(BetError::AlreadyBet { lap });
    }
    if !player.can_afford(DEFAULT_BET_CENTS) {
        return Err(BetError::InsufficientBalance {
            balance_cents: player.balance_cents,
            stake_cents: DEFAULT_BET_CENTS,
        });
    }
    let entry = program
        .entry_mut(horse_id)
        .ok_or(BetError::UnknownHorse { lap, horse_id })?;

    entry.bet = Some(DEFAULT_BET_CENTS);
    player.balance_cents -= DEFAULT_BET_CENTS;
    log::info!(
        target: LOG_TARGET_BET,
        "{} bet {} cents on {} in lap {lap} at {:.2}",
        player.name,
        DEFAULT_BET_CENTS,
        entry.horse.name,
        entry.coef
    );
    Ok(DEFAULT_BET_CENTS)
}

/// Pay out the wagers of a finished program.
///
/// Each wager on the winner returns `stake * coef`, rounded to the cent.
/// Returns `None` while the race is running or when nothing was wagered.
/// Call once per program.
pub fn settle_program(player: &mut Player, program: &Program) -> Option<Settlement> {
    if !program.race_finished || !program.has_bet() {
        return None;
    }

    let mut settlement = Settlement {
        lap: program.lap,
        staked_cents: 0,
        payout_cents: 0,
    };
    for entry in program.bets() {
        let stake = entry.bet.unwrap_or(0);
        settlement.staked_cents += stake;
        if entry.place == Some(1) {
            settlement.payout_cents += round_f64_to_i64(i64_to_f64(stake) * entry.coef);
        }
    }

    player.balance_cents += settlement.payout_cents;
    log::info!(
        target: LOG_TARGET_BET,
        "lap {} settled for {}: staked {} paid {} balance {}",
        settlement.lap,
        player.name,
        settlement.staked_cents,
        settlement.payout_cents,
        player.balance_cents
    );
    Some(settlement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::horse::Horse;
    use crate::program::RaceHorseEntry;

    fn program() -> Program {
        Program {
            lap: 2,
            distance: 1_400,
            horses: vec![
                RaceHorseEntry::new(Horse::new(1, "Iron Hoof", 70), 1.85),
                RaceHorseEntry::new(Horse::new(2, "Rusty Spur", 30), 7.4),
            ],
            race_started: false,
            race_finished: false,
        }
    }

    #[test]
    fn player_names_are_trimmed_and_required() {
        let player = Player::new("  Ada ").unwrap();
        assert_eq!(player.name, "Ada");
        assert_eq!(player.balance_cents, DEFAULT_BALANCE_CENTS);
        assert_eq!(Player::new("   ").unwrap_err(), PlayerError::EmptyName);
    }

    #[test]
    fn bet_deducts_stake_and_marks_entry() {
        let mut player = Player::new("Ada").unwrap();
        let mut program = program();
        assert_eq!(place_bet(&mut player, &mut program, 2), Ok(DEFAULT_BET_CENTS));
        assert_eq!(player.balance_cents, DEFAULT_BALANCE_CENTS - DEFAULT_BET_CENTS);
        assert_eq!(program.entry(2).unwrap().bet, Some(DEFAULT_BET_CENTS));
    }

    #[test]
    fn bet_preconditions_are_enforced() {
        let mut player = Player::new("Ada").unwrap();
        let mut program = program();

        assert_eq!(
            place_bet(&mut player, &mut program, 9),
            Err(BetError::UnknownHorse {
                lap: 2,
                horse_id: 9
            })
        );

        place_bet(&mut player, &mut program, 1).unwrap();
        assert_eq!(
            place_bet(&mut player, &mut program, 2),
            Err(BetError::AlreadyBet { lap: 2 })
        );

        let mut started = self::program();
        started.race_started = true;
        assert_eq!(
            place_bet(&mut player, &mut started, 1),
            Err(BetError::RaceStarted { lap: 2 })
        );

        let mut broke = Player {
            name: "Broke".to_string(),
            balance_cents: 5_000,
        };
        assert_eq!(
            place_bet(&mut broke, &mut self::program(), 1),
            Err(BetError::InsufficientBalance {
                balance_cents: 5_000,
                stake_cents: DEFAULT_BET_CENTS
            })
        );
        assert_eq!(broke.balance_cents, 5_000);
    }

    #[test]
    fn winning_bet_pays_stake_times_coef() {
        let mut player = Player::new("Ada").unwrap();
        let mut program = program();
        place_bet(&mut player, &mut program, 2).unwrap();
        program.race_started = true;
        program.entry_mut(2).unwrap().place = Some(1);
        program.entry_mut(1).unwrap().place = Some(2);
        program.race_finished = true;

        let settlement = settle_program(&mut player, &program).unwrap();
        assert!(settlement.won());
        assert_eq!(settlement.payout_cents, 74_000);
        assert_eq!(settlement.net_cents(), 64_000);
        assert_eq!(player.balance_cents, DEFAULT_BALANCE_CENTS + 64_000);
    }

    #[test]
    fn losing_or_unfinished_races_pay_nothing() {
        let mut player = Player::new("Ada").unwrap();
        let mut program = program();
        place_bet(&mut player, &mut program, 1).unwrap();
        assert!(settle_program(&mut player, &program).is_none());

        program.entry_mut(2).unwrap().place = Some(1);
        program.entry_mut(1).unwrap().place = Some(2);
        program.race_finished = true;
        let settlement = settle_program(&mut player, &program).unwrap();
        assert!(!settlement.won());
        assert_eq!(settlement.net_cents(), -DEFAULT_BET_CENTS);
        assert_eq!(player.balance_cents, DEFAULT_BALANCE_CENTS - DEFAULT_BET_CENTS);
    }

    #[test]
    fn races_without_bets_are_not_settled() {
        let mut player = Player::new("Ada").unwrap();
        let mut program = program();
        program.race_finished = true;
        assert!(settle_program(&mut player, &program).is_none());
    }
}
