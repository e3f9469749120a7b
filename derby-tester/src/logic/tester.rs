use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::common::scenario::TestScenario;
use crate::logic::simulation::{Execution, SessionRunner, SessionSummary, SimulationPlan};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub mode: String,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    /// Mean final balance over the iterations that produced a session.
    pub mean_final_balance_cents: i64,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

pub struct LogicTester {
    runner: SessionRunner,
    verbose: bool,
}

impl LogicTester {
    pub const fn new(runner: SessionRunner, verbose: bool) -> Self {
        Self { runner, verbose }
    }

    pub async fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
        execution: Execution,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (strategy: {} mode: {} seed: {})",
                    scenario.name.bright_white(),
                    scenario.plan.strategy,
                    execution.label(),
                    seed
                );
            }

            let result = self
                .run_single_scenario(scenario, seed, iterations, execution)
                .await;
            results.push(result);
        }

        results
    }

    async fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
        execution: Execution,
    ) -> ScenarioResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();
        let mut balances = Vec::new();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            let summary = match self
                .runner
                .run(&scenario.plan, iteration_seed, execution)
                .await
            {
                Ok(summary) => summary,
                Err(err) => {
                    let detail = format!("{err:#}");
                    self.record_failure(&mut failures, i, iterations, iteration_seed, &detail);
                    continue;
                }
            };
            balances.push(summary.final_balance_cents);

            if let Some(err) = evaluate_expectations(&scenario.plan, &summary) {
                let detail = format!("{err} | {}", summarize_session(&summary));
                self.record_failure(&mut failures, i, iterations, iteration_seed, &detail);
            } else {
                successes += 1;
                let duration = start_time.elapsed();
                performance_data.push(duration);

                if self.verbose {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) ticks:{} bets:{} balance:{}",
                        i + 1,
                        iterations,
                        summary.ticks(),
                        summary.bets.len(),
                        summary.final_balance_cents
                    );
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.clone(),
            seed,
            mode: execution.label().to_string(),
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            mean_final_balance_cents: mean(&balances),
            average_duration,
            performance_data,
        }
    }

    fn record_failure(
        &self,
        failures: &mut Vec<String>,
        index: usize,
        iterations: usize,
        seed: u64,
        detail: &str,
    ) {
        failures.push(format!("Iteration {} (seed {seed}): {detail}", index + 1));
        if self.verbose {
            println!(
                "  ❌ Iteration {}/{} failed: {}",
                index + 1,
                iterations,
                detail.red()
            );
        }
    }
}

fn evaluate_expectations(plan: &SimulationPlan, summary: &SessionSummary) -> Option<String> {
    plan.expectations
        .iter()
        .find_map(|expectation| expectation.evaluate(summary).err())
        .map(|err| err.to_string())
}

fn summarize_session(summary: &SessionSummary) -> String {
    let status = if summary.completed {
        "complete"
    } else {
        "halted"
    };
    let last_bets = summary
        .bets
        .iter()
        .rev()
        .take(3)
        .map(|bet| format!("lap {} -> #{} ({})", bet.lap, bet.horse_id, bet.rationale))
        .collect::<Vec<_>>();
    let bets = if last_bets.is_empty() {
        "no bets placed".to_string()
    } else {
        last_bets.join(" | ")
    };
    format!(
        "{} as {} ({}) {status}, ticks {}, balance {} -> {} | {bets}",
        summary.strategy,
        summary.player_name,
        summary.execution.label(),
        summary.ticks(),
        summary.starting_balance_cents,
        summary.final_balance_cents
    )
}

fn mean(values: &[i64]) -> i64 {
    let Ok(count) = i64::try_from(values.len()) else {
        return 0;
    };
    if count == 0 {
        return 0;
    }
    values.iter().sum::<i64>() / count
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}
