//! Session controller binding a roster, its programs and the player.
use serde::{Deserialize, Serialize};

use crate::constants::LOG_TARGET_SESSION;
use crate::horse::{HorseId, Roster, RosterError, RosterTemplate};
use crate::player::{BetError, Player, Settlement, place_bet, settle_program};
use crate::program::{Program, ProgramError, build_program_list};
use crate::race;
use crate::rng::RngBundle;

/// Result of one session tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickOutcome {
    /// Lap that was advanced.
    pub lap: u32,
    pub race_finished: bool,
    /// Present when the race finished with a wager on it.
    pub settlement: Option<Settlement>,
    /// True once the last lap has finished.
    pub session_complete: bool,
}

/// One game: roster, program list, current lap and the player's wallet.
///
/// The session is the single owner of program state. A tick replaces the
/// current program with the snapshot returned by [`race::tick`].
#[derive(Debug, Clone)]
pub struct RaceSession {
    seed: u64,
    roster: Roster,
    programs: Vec<Program>,
    current: usize,
    complete: bool,
    player: Player,
    rng: RngBundle,
}

impl RaceSession {
    /// Roll a roster from `template` and bind it to `player`.
    ///
    /// # Errors
    ///
    /// Returns an error if the template repeats a horse id.
    pub fn new(player: Player, template: &RosterTemplate, seed: u64) -> Result<Self, RosterError> {
        let mut rng = RngBundle::from_user_seed(seed);
        let roster = Roster::generate(template, rng.roster())?;
        Ok(Self::from_parts(player, roster, seed, rng))
    }

    /// Bind an existing roster to `player`.
    #[must_use]
    pub fn with_roster(player: Player, roster: Roster, seed: u64) -> Self {
        Self::from_parts(player, roster, seed, RngBundle::from_user_seed(seed))
    }

    fn from_parts(player: Player, roster: Roster, seed: u64, rng: RngBundle) -> Self {
        Self {
            seed,
            roster,
            programs: Vec::new(),
            current: 0,
            complete: false,
            player,
            rng,
        }
    }

    /// Replace the program list with freshly drawn programs and rewind to lap 1.
    ///
    /// # Errors
    ///
    /// Returns [`ProgramError::InsufficientRosterSize`] if the roster is too
    /// small to fill a field.
    pub fn generate_programs(&mut self) -> Result<&[Program], ProgramError> {
        let programs = build_program_list(self.roster.horses(), self.rng.draw())?;
        self.programs = programs;
        self.current = 0;
        self.complete = false;
        Ok(&self.programs)
    }

    /// Wager on a horse in a not-yet-started lap.
    ///
    /// # Errors
    ///
    /// Returns [`BetError::UnknownLap`] for a lap with no program, or the
    /// error from [`place_bet`].
    pub fn place_bet(&mut self, lap: u32, horse_id: HorseId) -> Result<i64, BetError> {
        let program = self
            .programs
            .iter_mut()
            .find(|program| program.lap == lap)
            .ok_or(BetError::UnknownLap { lap })?;
        place_bet(&mut self.player, program, horse_id)
    }

    /// Advance the current race by one tick.
    ///
    /// A finished race is settled and the session moves to the next lap; after
    /// the last lap the session is complete. Returns `None` when there is no
    /// race left to run.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        if self.complete {
            return None;
        }
        let next = race::tick(self.programs.get(self.current)?, self.rng.pace());
        let lap = next.lap;
        let race_finished = next.race_finished;
        let slot = self.programs.get_mut(self.current)?;
        *slot = next;

        let mut settlement = None;
        if race_finished {
            settlement = settle_program(&mut self.player, slot);
            if self.current + 1 < self.programs.len() {
                self.current += 1;
            } else {
                self.complete = true;
                log::info!(
                    target: LOG_TARGET_SESSION,
                    "session {:#x} complete, {} ends with {} cents",
                    self.seed,
                    self.player.name,
                    self.player.balance_cents
                );
            }
        }

        Some(TickOutcome {
            lap,
            race_finished,
            settlement,
            session_complete: self.complete,
        })
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    #[must_use]
    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    #[must_use]
    pub fn program(&self, lap: u32) -> Option<&Program> {
        self.programs.iter().find(|program| program.lap == lap)
    }

    /// Program currently on the track, if any.
    #[must_use]
    pub fn current_program(&self) -> Option<&Program> {
        self.programs.get(self.current)
    }

    #[must_use]
    pub const fn player(&self) -> &Player {
        &self.player
    }

    /// Apply a closure to the mutable player record.
    pub fn with_player_mut<R>(&mut self, f: impl FnOnce(&mut Player) -> R) -> R {
        f(&mut self.player)
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// Draws consumed across all RNG streams so far.
    #[must_use]
    pub const fn rng_draws(&self) -> u64 {
        self.rng.total_draws()
    }

    /// Consume the session, returning the player record.
    #[must_use]
    pub fn into_player(self) -> Player {
        self.player
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_BALANCE_CENTS, DEFAULT_BET_CENTS, LAPS};

    fn session(seed: u64) -> RaceSession {
        let player = Player::new("Ada").unwrap();
        RaceSession::new(player, &RosterTemplate::load_from_static(), seed).unwrap()
    }

    fn run_to_end(session: &mut RaceSession) -> Vec<TickOutcome> {
        let mut outcomes = Vec::new();
        for _ in 0..100_000 {
            match session.tick() {
                Some(outcome) => outcomes.push(outcome),
                None => break,
            }
        }
        outcomes
    }

    #[test]
    fn tick_without_programs_is_idle() {
        let mut session = session(1);
        assert!(session.tick().is_none());
        assert!(session.current_program().is_none());
        assert!(!session.is_complete());
    }

    #[test]
    fn generation_rewinds_to_first_lap() {
        let mut session = session(2);
        let laps: Vec<u32> = session
            .generate_programs()
            .unwrap()
            .iter()
            .map(|p| p.lap)
            .collect();
        assert_eq!(laps, (1..=LAPS).collect::<Vec<u32>>());
        assert_eq!(session.current_program().map(|p| p.lap), Some(1));
    }

    #[test]
    fn session_runs_every_lap_then_goes_idle() {
        let mut session = session(3);
        session.generate_programs().unwrap();
        let outcomes = run_to_end(&mut session);

        let finished: Vec<u32> = outcomes
            .iter()
            .filter(|o| o.race_finished)
            .map(|o| o.lap)
            .collect();
        assert_eq!(finished, (1..=LAPS).collect::<Vec<u32>>());
        assert!(outcomes.last().unwrap().session_complete);
        assert!(session.is_complete());
        assert!(session.programs().iter().all(|p| p.race_finished));
        assert!(session.tick().is_none());
    }

    #[test]
    fn bets_are_settled_when_their_lap_finishes() {
        let mut session = session(4);
        session.generate_programs().unwrap();
        let horse = session.program(3).unwrap().horses[0].id();
        session.place_bet(3, horse).unwrap();
        assert_eq!(
            session.player().balance_cents,
            DEFAULT_BALANCE_CENTS - DEFAULT_BET_CENTS
        );

        let outcomes = run_to_end(&mut session);
        let settled: Vec<&TickOutcome> =
            outcomes.iter().filter(|o| o.settlement.is_some()).collect();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].lap, 3);

        let settlement = settled[0].settlement.unwrap();
        assert_eq!(
            session.player().balance_cents,
            DEFAULT_BALANCE_CENTS - DEFAULT_BET_CENTS + settlement.payout_cents
        );
    }

    #[test]
    fn bets_on_unknown_or_running_laps_are_refused() {
        let mut session = session(5);
        session.generate_programs().unwrap();
        assert_eq!(
            session.place_bet(LAPS + 1, 1),
            Err(BetError::UnknownLap { lap: LAPS + 1 })
        );
        session.tick();
        let horse = session.program(1).unwrap().horses[0].id();
        assert_eq!(
            session.place_bet(1, horse),
            Err(BetError::RaceStarted { lap: 1 })
        );
    }

    #[test]
    fn same_seed_replays_identically() {
        let mut a = session(0x00C0_FFEE);
        let mut b = session(0x00C0_FFEE);
        a.generate_programs().unwrap();
        b.generate_programs().unwrap();
        run_to_end(&mut a);
        run_to_end(&mut b);
        assert_eq!(a.programs(), b.programs());
        assert_eq!(a.rng_draws(), b.rng_draws());
    }

    #[test]
    fn regeneration_draws_new_programs() {
        let mut session = session(6);
        let first = session.generate_programs().unwrap().to_vec();
        let second = session.generate_programs().unwrap().to_vec();
        assert_eq!(first.len(), second.len());
        assert_ne!(first, second);
    }
}
