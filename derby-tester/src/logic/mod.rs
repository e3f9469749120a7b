pub mod policy;
pub mod reports;
pub mod seeds;
pub mod simulation;
pub mod tester;

pub use policy::GameplayStrategy;
pub use seeds::resolve_seed_inputs;
pub use simulation::{Execution, SessionRunner, SessionSummary, SimulationPlan};
pub use tester::{LogicTester, ScenarioResult};
