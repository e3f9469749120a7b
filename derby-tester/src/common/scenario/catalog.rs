use anyhow::{Result, ensure};
use std::collections::HashSet;

use crate::common::scenario::TestScenario;
use crate::logic::{GameplayStrategy, SessionRunner, SessionSummary, SimulationPlan};
use derby_game::constants::{
    BETTING_OUTPUT_MAX, BETTING_OUTPUT_MIN, DEFAULT_BET_CENTS, LAPS, TRACK_LINES,
};
use derby_game::numbers::{i64_to_f64, round_f64_to_i64};
use derby_game::{Horse, HorseId, Program, compute_win_odds, distance_for_lap};

pub fn catalog_scenarios() -> Vec<TestScenario> {
    vec![
        TestScenario::new(
            "smoke",
            "Smoke Test",
            SimulationPlan::new(GameplayStrategy::Favorite)
                .with_expectation(session_completed)
                .with_expectation(programs_well_formed)
                .with_expectation(places_gap_free),
        ),
        TestScenario::new(
            "program-structure",
            "Program Structure",
            SimulationPlan::new(GameplayStrategy::Abstain)
                .with_expectation(programs_well_formed)
                .with_expectation(session_completed),
        ),
        TestScenario::new(
            "odds-bounds",
            "Odds Within Betting Range",
            SimulationPlan::new(GameplayStrategy::Abstain).with_expectation(odds_bounds),
        ),
        TestScenario::new(
            "finish-order",
            "Finish Order Consistency",
            SimulationPlan::new(GameplayStrategy::Random)
                .with_expectation(session_completed)
                .with_expectation(places_gap_free),
        ),
        TestScenario::new(
            "favorite-ledger",
            "Favorite Bettor Ledger",
            SimulationPlan::new(GameplayStrategy::Favorite)
                .with_expectation(every_lap_backed)
                .with_expectation(ledger_balances),
        ),
        TestScenario::new(
            "longshot-ledger",
            "Longshot Bettor Ledger",
            SimulationPlan::new(GameplayStrategy::Longshot)
                .with_expectation(every_lap_backed)
                .with_expectation(ledger_balances),
        ),
        TestScenario::new(
            "random-ledger",
            "Random Bettor Ledger",
            SimulationPlan::new(GameplayStrategy::Random)
                .with_expectation(every_lap_backed)
                .with_expectation(ledger_balances),
        ),
        TestScenario::new(
            "abstain",
            "Abstaining Player Keeps Balance",
            SimulationPlan::new(GameplayStrategy::Abstain).with_expectation(untouched_balance),
        ),
        TestScenario::new(
            "deterministic",
            "Deterministic Replay",
            SimulationPlan::new(GameplayStrategy::Random).with_expectation(deterministic_replay),
        ),
    ]
}

fn session_completed(summary: &SessionSummary) -> Result<()> {
    ensure!(summary.completed, "Session should run every lap to completion");
    ensure!(
        summary.programs.iter().all(|p| p.race_started && p.race_finished),
        "Every program should be started and finished"
    );
    Ok(())
}

fn programs_well_formed(summary: &SessionSummary) -> Result<()> {
    ensure!(
        summary.programs.len() == LAPS as usize,
        "Expected {LAPS} programs, found {}",
        summary.programs.len()
    );
    for (program, lap) in summary.programs.iter().zip(1..) {
        ensure!(program.lap == lap, "Program {lap} is labelled lap {}", program.lap);
        ensure!(
            program.distance == distance_for_lap(lap),
            "Lap {lap} runs {}m instead of {}m",
            program.distance,
            distance_for_lap(lap)
        );
        ensure!(
            program.horses.len() == TRACK_LINES,
            "Lap {lap} fields {} horses",
            program.horses.len()
        );
        let ids: HashSet<HorseId> = program.horses.iter().map(|e| e.id()).collect();
        ensure!(ids.len() == TRACK_LINES, "Lap {lap} repeats a horse");
    }
    Ok(())
}

fn places_gap_free(summary: &SessionSummary) -> Result<()> {
    for program in summary.programs.iter().filter(|p| p.race_finished) {
        let lap = program.lap;
        let mut places: Vec<u32> = program.horses.iter().filter_map(|e| e.place).collect();
        places.sort_unstable();
        let expected: Vec<u32> = (1..).take(program.horses.len()).collect();
        ensure!(places == expected, "Lap {lap} places {places:?} are not 1..=N");

        let distance = f64::from(program.distance);
        ensure!(
            program.horses.iter().all(|e| e.current_distance >= distance),
            "Lap {lap} placed a horse short of the line"
        );

        let times: Vec<u32> = program
            .placings()
            .iter()
            .filter_map(|e| e.running_time)
            .collect();
        ensure!(
            times.windows(2).all(|pair| pair[0] <= pair[1]),
            "Lap {lap} ranks a slower horse ahead: {times:?}"
        );
    }
    Ok(())
}

fn odds_bounds(summary: &SessionSummary) -> Result<()> {
    for (initial, last) in summary.initial_programs.iter().zip(&summary.programs) {
        let lap = initial.lap;
        let field: Vec<Horse> = initial.horses.iter().map(|e| e.horse.clone()).collect();
        for (idx, entry) in initial.horses.iter().enumerate() {
            ensure!(
                (BETTING_OUTPUT_MIN..=BETTING_OUTPUT_MAX).contains(&entry.coef),
                "Lap {lap} horse {} priced at {}",
                entry.id(),
                entry.coef
            );
            let priced = compute_win_odds(&field, idx).unwrap_or(f64::NAN);
            ensure!(
                (priced - entry.coef).abs() < 1e-9,
                "Lap {lap} horse {} priced {} but the field gives {priced}",
                entry.id(),
                entry.coef
            );
        }
        let before: Vec<f64> = initial.horses.iter().map(|e| e.coef).collect();
        let after: Vec<f64> = last.horses.iter().map(|e| e.coef).collect();
        ensure!(before == after, "Lap {lap} odds changed during the race");
    }
    Ok(())
}

fn every_lap_backed(summary: &SessionSummary) -> Result<()> {
    ensure!(
        summary.rejected_bets.is_empty(),
        "Bets were refused: {:?}",
        summary.rejected_bets
    );
    ensure!(
        summary.bets.len() == summary.programs.len(),
        "Placed {} bets over {} laps",
        summary.bets.len(),
        summary.programs.len()
    );
    Ok(())
}

fn ledger_balances(summary: &SessionSummary) -> Result<()> {
    let mut staked = 0;
    let mut paid = 0;
    for bet in &summary.bets {
        ensure!(
            bet.stake_cents == DEFAULT_BET_CENTS,
            "Lap {} staked {} cents",
            bet.lap,
            bet.stake_cents
        );
        staked += bet.stake_cents;
        let won = summary
            .programs
            .iter()
            .find(|p| p.lap == bet.lap)
            .and_then(|p| p.entry(bet.horse_id))
            .is_some_and(|entry| entry.place == Some(1));
        if won {
            paid += round_f64_to_i64(i64_to_f64(bet.stake_cents) * bet.coef);
        }
    }

    let expected = summary.starting_balance_cents - staked + paid;
    ensure!(
        summary.final_balance_cents == expected,
        "Balance {} does not match ledger {expected} (staked {staked}, paid {paid})",
        summary.final_balance_cents
    );
    Ok(())
}

fn untouched_balance(summary: &SessionSummary) -> Result<()> {
    ensure!(summary.bets.is_empty(), "Abstaining player placed bets");
    ensure!(
        summary.net_cents() == 0,
        "Balance moved by {} cents without a bet",
        summary.net_cents()
    );
    Ok(())
}

fn deterministic_replay(summary: &SessionSummary) -> Result<()> {
    let replay = SessionRunner::ephemeral()
        .run_logic(&SimulationPlan::new(summary.strategy), summary.seed)?;
    ensure!(
        race_results(&summary.programs) == race_results(&replay.programs),
        "Seed {} produced different races on replay",
        summary.seed
    );
    ensure!(
        summary.rng_draws == replay.rng_draws,
        "Seed {} drew {} numbers, replay drew {}",
        summary.seed,
        summary.rng_draws,
        replay.rng_draws
    );
    ensure!(
        summary.final_balance_cents == replay.final_balance_cents,
        "Seed {} ended at {} cents, replay at {}",
        summary.seed,
        summary.final_balance_cents,
        replay.final_balance_cents
    );
    Ok(())
}

/// Programs with wagers stripped, so replays compare race outcomes only.
fn race_results(programs: &[Program]) -> Vec<Program> {
    programs
        .iter()
        .cloned()
        .map(|mut program| {
            for entry in &mut program.horses {
                entry.bet = None;
            }
            program
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(strategy: GameplayStrategy, seed: u64) -> SessionSummary {
        SessionRunner::ephemeral()
            .run_logic(&SimulationPlan::new(strategy), seed)
            .unwrap()
    }

    #[test]
    fn catalog_passes_for_sample_seeds() {
        for scenario in catalog_scenarios() {
            for seed in [1, 1337] {
                let summary = run(scenario.plan.strategy, seed);
                for expectation in &scenario.plan.expectations {
                    expectation
                        .evaluate(&summary)
                        .unwrap_or_else(|err| panic!("{} seed {seed}: {err}", scenario.key));
                }
            }
        }
    }

    #[test]
    fn ledger_check_catches_missing_payout() {
        let mut summary = run(GameplayStrategy::Favorite, 4);
        summary.final_balance_cents += 1;
        assert!(ledger_balances(&summary).is_err());
    }

    #[test]
    fn place_check_catches_duplicates() {
        let mut summary = run(GameplayStrategy::Abstain, 8);
        summary.programs[0].horses[0].place = Some(2);
        summary.programs[0].horses[1].place = Some(2);
        assert!(places_gap_free(&summary).is_err());
    }

    #[test]
    fn odds_check_catches_tampered_coef() {
        let mut summary = run(GameplayStrategy::Abstain, 2);
        summary.programs[1].horses[0].coef += 0.5;
        assert!(odds_bounds(&summary).is_err());
    }

    #[test]
    fn incomplete_session_is_flagged() {
        let mut summary = run(GameplayStrategy::Abstain, 3);
        summary.completed = false;
        assert!(session_completed(&summary).is_err());
    }
}
