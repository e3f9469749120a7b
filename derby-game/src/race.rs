//! Tick-driven race progression and finish ordering.
use rand::Rng;
use smallvec::SmallVec;

use crate::clock::SIM_SECONDS_PER_TICK;
use crate::constants::{KPH_PER_MPS, LOG_TARGET_RACE};
use crate::odds::sample_horse_speed_kph;
use crate::program::{Program, RaceHorseEntry};

/// Finishers crossing the line within one tick; rarely more than a few.
type FinisherSet = SmallVec<[(usize, f64); 4]>;

/// Advance `program` by one simulated second, returning the new snapshot.
///
/// Unfinished horses run for one second at a freshly sampled speed. Horses
/// that reach the distance during this tick are placed in order of how far
/// past the line they ended up, continuing from the last place already
/// handed out. Horses already past the line are left untouched.
#[must_use]
pub fn tick<R: Rng + ?Sized>(program: &Program, rng: &mut R) -> Program {
    let mut next = program.clone();
    let distance = f64::from(next.distance);
    next.race_started = true;

    for entry in next
        .horses
        .iter_mut()
        .filter(|entry| entry.current_distance < distance)
    {
        entry.running_time = Some(
            entry
                .running_time
                .unwrap_or(0)
                .saturating_add(SIM_SECONDS_PER_TICK),
        );
        let speed_kph = sample_horse_speed_kph(entry.horse.condition, rng);
        entry.current_distance += speed_kph / KPH_PER_MPS;
    }

    let mut finishers: FinisherSet = next
        .horses
        .iter()
        .enumerate()
        .filter(|(_, entry)| !entry.is_placed() && entry.current_distance >= distance)
        .map(|(idx, entry)| (idx, entry.current_distance))
        .collect();
    // Stable: equal overshoot keeps field order.
    finishers.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut place = next.last_place_assigned();
    for (idx, _) in finishers {
        if let Some(entry) = next.horses.get_mut(idx) {
            place += 1;
            entry.place = Some(place);
        }
    }

    next.race_finished = next.horses.iter().all(RaceHorseEntry::is_placed);
    if next.race_finished && !program.race_finished {
        log::debug!(
            target: LOG_TARGET_RACE,
            "lap {} finished, winner {:?}",
            next.lap,
            next.winner().map(|entry| entry.horse.name.as_str())
        );
    }
    next
}
