//! Race programs: one lap, its distance and its drawn field.
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    BASE_DISTANCE_METERS, DISTANCE_STEP_METERS, LAPS, LOG_TARGET_PROGRAM, TRACK_LINES,
};
use crate::horse::{Horse, HorseId};
use crate::odds::win_odds;

/// Errors raised while assembling programs from a roster.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgramError {
    #[error("cannot draw {requested} distinct horses from a roster of {available}")]
    InsufficientRosterSize { requested: usize, available: usize },
}

/// A horse inside one program, with its race-scoped state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceHorseEntry {
    #[serde(flatten)]
    pub horse: Horse,
    /// Decimal odds, fixed when the program is generated.
    pub coef: f64,
    /// Stake in cents, if the player wagered on this horse.
    pub bet: Option<i64>,
    /// 1-based finishing rank once the horse crosses the line.
    pub place: Option<u32>,
    /// Simulated seconds run since the start.
    pub running_time: Option<u32>,
    /// Metres covered.
    pub current_distance: f64,
}

impl RaceHorseEntry {
    #[must_use]
    pub fn new(horse: Horse, coef: f64) -> Self {
        Self {
            horse,
            coef,
            bet: None,
            place: None,
            running_time: None,
            current_distance: 0.0,
        }
    }

    #[must_use]
    pub const fn id(&self) -> HorseId {
        self.horse.id
    }

    #[must_use]
    pub const fn is_placed(&self) -> bool {
        self.place.is_some()
    }
}

/// One race: lap number, distance and the ordered field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub lap: u32,
    /// Race length in metres.
    pub distance: u32,
    pub horses: Vec<RaceHorseEntry>,
    pub race_started: bool,
    pub race_finished: bool,
}

impl Program {
    #[must_use]
    pub fn entry(&self, id: HorseId) -> Option<&RaceHorseEntry> {
        self.horses.iter().find(|entry| entry.id() == id)
    }

    pub fn entry_mut(&mut self, id: HorseId) -> Option<&mut RaceHorseEntry> {
        self.horses.iter_mut().find(|entry| entry.id() == id)
    }

    /// Entries carrying a wager.
    pub fn bets(&self) -> impl Iterator<Item = &RaceHorseEntry> {
        self.horses.iter().filter(|entry| entry.bet.is_some())
    }

    #[must_use]
    pub fn has_bet(&self) -> bool {
        self.bets().next().is_some()
    }

    /// Placed entries ordered by finishing rank.
    #[must_use]
    pub fn placings(&self) -> Vec<&RaceHorseEntry> {
        let mut placed: Vec<&RaceHorseEntry> =
            self.horses.iter().filter(|e| e.is_placed()).collect();
        placed.sort_by_key(|entry| entry.place);
        placed
    }

    #[must_use]
    pub fn winner(&self) -> Option<&RaceHorseEntry> {
        self.horses.iter().find(|entry| entry.place == Some(1))
    }

    /// Highest place handed out so far, 0 before the first finisher.
    #[must_use]
    pub fn last_place_assigned(&self) -> u32 {
        self.horses
            .iter()
            .filter_map(|entry| entry.place)
            .max()
            .unwrap_or(0)
    }

    /// Track position of an entry as a fraction of the race distance.
    #[must_use]
    pub fn progress(&self, entry: &RaceHorseEntry) -> f64 {
        if self.distance == 0 {
            return 1.0;
        }
        (entry.current_distance / f64::from(self.distance)).min(1.0)
    }
}

/// Race length for a 1-based lap number.
#[must_use]
pub const fn distance_for_lap(lap: u32) -> u32 {
    BASE_DISTANCE_METERS
        .saturating_add(lap.saturating_sub(1).saturating_mul(DISTANCE_STEP_METERS))
}

/// Uniform sample of `count` distinct horses, in draw order.
///
/// The roster itself is left untouched; draws come out of a working copy.
///
/// # Errors
///
/// Returns [`ProgramError::InsufficientRosterSize`] when `count` exceeds the
/// roster length.
pub fn pick_horses<R: Rng + ?Sized>(
    roster: &[Horse],
    count: usize,
    rng: &mut R,
) -> Result<Vec<Horse>, ProgramError> {
    if count > roster.len() {
        return Err(ProgramError::InsufficientRosterSize {
            requested: count,
            available: roster.len(),
        });
    }

    let mut pool = roster.to_vec();
    let mut picked = Vec::with_capacity(count);
    for _ in 0..count {
        let idx = rng.gen_range(0..pool.len());
        picked.push(pool.remove(idx));
    }
    Ok(picked)
}

/// Draw a field for `lap` and price every horse against that field.
///
/// # Errors
///
/// Returns [`ProgramError::InsufficientRosterSize`] when the roster holds
/// fewer than `TRACK_LINES` horses.
pub fn build_program<R: Rng + ?Sized>(
    roster: &[Horse],
    lap: u32,
    rng: &mut R,
) -> Result<Program, ProgramError> {
    let field = pick_horses(roster, TRACK_LINES, rng)?;

    let horses = field
        .iter()
        .enumerate()
        .map(|(idx, horse)| {
            let others = field
                .iter()
                .enumerate()
                .filter(|(other_idx, _)| *other_idx != idx)
                .map(|(_, other)| other.condition);
            RaceHorseEntry::new(horse.clone(), win_odds(horse.condition, others))
        })
        .collect();

    Ok(Program {
        lap,
        distance: distance_for_lap(lap),
        horses,
        race_started: false,
        race_finished: false,
    })
}

/// One independently drawn program per lap, laps `1..=LAPS` in order.
///
/// # Errors
///
/// Propagates [`ProgramError::InsufficientRosterSize`] from the first lap.
pub fn build_program_list<R: Rng + ?Sized>(
    roster: &[Horse],
    rng: &mut R,
) -> Result<Vec<Program>, ProgramError> {
    let programs = (1..=LAPS)
        .map(|lap| build_program(roster, lap, rng))
        .collect::<Result<Vec<_>, _>>()?;
    log::debug!(
        target: LOG_TARGET_PROGRAM,
        "generated {} programs from a roster of {}",
        programs.len(),
        roster.len()
    );
    Ok(programs)
}
