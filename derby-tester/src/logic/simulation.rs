use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use derby_game::{GameEngine, HorseId, Program, RaceScheduler, RaceSession, StaticRosterLoader};
use tokio::sync::Mutex;

use crate::common::JsonPlayerStorage;
use crate::logic::policy::{GameplayStrategy, PlayerPolicy};

/// Upper bound on ticks for one session before the run is declared stuck.
pub const MAX_SESSION_TICKS: u32 = 200_000;

/// How a plan is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// Tight synchronous tick loop; bets are placed lap by lap.
    Logic,
    /// Ticks fired by the async scheduler; bets are placed before the start.
    Realtime { period: Duration },
}

impl Execution {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Logic => "logic",
            Self::Realtime { .. } => "realtime",
        }
    }
}

/// Declarative plan for running one session.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: GameplayStrategy,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(strategy: GameplayStrategy) -> Self {
        Self {
            strategy,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a session completes.
type SimulationExpectationFn = Arc<dyn Fn(&SessionSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    /// Run the assertion against a summary.
    ///
    /// # Errors
    ///
    /// Returns the assertion failure.
    pub fn evaluate(&self, summary: &SessionSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SessionSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// A wager the runner placed on behalf of a policy.
#[derive(Debug, Clone, PartialEq)]
pub struct BetRecord {
    pub lap: u32,
    pub horse_id: HorseId,
    pub stake_cents: i64,
    pub coef: f64,
    pub rationale: String,
}

/// Complete record of a session run.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub execution: Execution,
    pub player_name: String,
    pub starting_balance_cents: i64,
    pub final_balance_cents: i64,
    /// Programs as generated, before any bet or tick.
    pub initial_programs: Vec<Program>,
    /// Programs at the end of the run.
    pub programs: Vec<Program>,
    pub bets: Vec<BetRecord>,
    pub rejected_bets: Vec<String>,
    pub completed: bool,
    pub rng_draws: u64,
}

impl SessionSummary {
    /// Ticks the session ran, derived from the slowest horse of each lap.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.programs
            .iter()
            .map(|program| {
                program
                    .horses
                    .iter()
                    .filter_map(|entry| entry.running_time)
                    .max()
                    .map_or(0, u64::from)
            })
            .sum()
    }

    #[must_use]
    pub const fn net_cents(&self) -> i64 {
        self.final_balance_cents - self.starting_balance_cents
    }
}

/// Per-run bookkeeping kept beside the session.
struct RunLedger {
    player_name: String,
    starting_balance_cents: i64,
    initial_programs: Vec<Program>,
    bets: Vec<BetRecord>,
    rejected_bets: Vec<String>,
}

/// Drives sessions for a plan through the game engine.
pub struct SessionRunner {
    engine: GameEngine<StaticRosterLoader, JsonPlayerStorage>,
}

impl SessionRunner {
    #[must_use]
    pub const fn new(storage: JsonPlayerStorage) -> Self {
        Self {
            engine: GameEngine::new(StaticRosterLoader, storage),
        }
    }

    /// Runner that persists nothing.
    #[must_use]
    pub const fn ephemeral() -> Self {
        Self::new(JsonPlayerStorage::disabled())
    }

    /// Run `plan` for `seed` in the requested execution mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be created or the player record
    /// cannot be stored.
    pub async fn run(
        &self,
        plan: &SimulationPlan,
        seed: u64,
        execution: Execution,
    ) -> Result<SessionSummary> {
        match execution {
            Execution::Logic => self.run_logic(plan, seed),
            Execution::Realtime { period } => self.run_realtime(plan, seed, period).await,
        }
    }

    /// Run a session in a synchronous tick loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be created or the player record
    /// cannot be stored.
    pub fn run_logic(&self, plan: &SimulationPlan, seed: u64) -> Result<SessionSummary> {
        let (mut session, mut ledger) = self.start(plan, seed)?;
        let mut policy = plan.strategy.create_policy(seed);

        let mut ticks = 0;
        while ticks < MAX_SESSION_TICKS {
            if let Some(program) = session.current_program()
                && !program.race_started
            {
                let lap = program.lap;
                place_policy_bet(&mut session, &mut ledger, policy.as_mut(), lap);
            }
            if session.tick().is_none() {
                break;
            }
            ticks += 1;
        }

        self.finish(plan, seed, Execution::Logic, session, ledger)
    }

    /// Run a session through [`RaceScheduler`] at `period` per tick.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be created, is still shared when
    /// the scheduler ends, or the player record cannot be stored.
    pub async fn run_realtime(
        &self,
        plan: &SimulationPlan,
        seed: u64,
        period: Duration,
    ) -> Result<SessionSummary> {
        let (mut session, mut ledger) = self.start(plan, seed)?;
        let mut policy = plan.strategy.create_policy(seed);
        let laps: Vec<u32> = session.programs().iter().map(|p| p.lap).collect();
        for lap in laps {
            place_policy_bet(&mut session, &mut ledger, policy.as_mut(), lap);
        }

        let shared = Arc::new(Mutex::new(session));
        let mut scheduler = RaceScheduler::with_period(Arc::clone(&shared), period);
        let limit = scheduler.period().saturating_mul(MAX_SESSION_TICKS);
        scheduler.start();
        if tokio::time::timeout(limit, scheduler.join()).await.is_err() {
            log::warn!("session {seed} did not finish within {limit:?}");
            scheduler.stop().await;
        }
        drop(scheduler);

        let session = Arc::try_unwrap(shared)
            .map_err(|_| anyhow!("session {seed} is still shared after the scheduler stopped"))?
            .into_inner();
        self.finish(plan, seed, Execution::Realtime { period }, session, ledger)
    }

    fn start(&self, plan: &SimulationPlan, seed: u64) -> Result<(RaceSession, RunLedger)> {
        let player_name = format!("{}-{seed}", plan.strategy.label().to_lowercase());
        // Every run starts from the default balance.
        self.engine
            .delete_player(&player_name)
            .with_context(|| format!("clearing stored record for {player_name}"))?;
        let session = self.engine.create_session(&player_name, seed)?;

        let ledger = RunLedger {
            player_name,
            starting_balance_cents: session.player().balance_cents,
            initial_programs: session.programs().to_vec(),
            bets: Vec::new(),
            rejected_bets: Vec::new(),
        };
        Ok((session, ledger))
    }

    fn finish(
        &self,
        plan: &SimulationPlan,
        seed: u64,
        execution: Execution,
        session: RaceSession,
        ledger: RunLedger,
    ) -> Result<SessionSummary> {
        self.engine
            .save_player(session.player())
            .with_context(|| format!("saving player {}", ledger.player_name))?;

        Ok(SessionSummary {
            seed,
            strategy: plan.strategy,
            execution,
            player_name: ledger.player_name,
            starting_balance_cents: ledger.starting_balance_cents,
            final_balance_cents: session.player().balance_cents,
            initial_programs: ledger.initial_programs,
            programs: session.programs().to_vec(),
            bets: ledger.bets,
            rejected_bets: ledger.rejected_bets,
            completed: session.is_complete(),
            rng_draws: session.rng_draws(),
        })
    }
}

fn place_policy_bet(
    session: &mut RaceSession,
    ledger: &mut RunLedger,
    policy: &mut dyn PlayerPolicy,
    lap: u32,
) {
    let Some(program) = session.program(lap) else {
        return;
    };
    if program.has_bet() {
        return;
    }
    let Some(decision) = policy.pick_horse(session.player(), program) else {
        return;
    };
    let coef = program
        .entry(decision.horse_id)
        .map_or(0.0, |entry| entry.coef);

    match session.place_bet(lap, decision.horse_id) {
        Ok(stake_cents) => ledger.bets.push(BetRecord {
            lap,
            horse_id: decision.horse_id,
            stake_cents,
            coef,
            rationale: decision.rationale,
        }),
        Err(err) => {
            log::warn!("{} bet refused on lap {lap}: {err}", policy.name());
            ledger.rejected_bets.push(format!("lap {lap}: {err}"));
        }
    }
}
