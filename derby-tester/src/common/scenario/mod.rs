pub mod catalog;

use crate::logic::SimulationPlan;

/// A named plan the runner can execute.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub key: &'static str,
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn new(key: &'static str, name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            key,
            name: name.into(),
            plan,
        }
    }
}

/// Look up a scenario by key or alias.
pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let key = match name.to_lowercase().as_str() {
        "smoke" => "smoke",
        "program-structure" | "programs" => "program-structure",
        "odds-bounds" | "odds" => "odds-bounds",
        "finish-order" | "finish" => "finish-order",
        "favorite-ledger" | "favorite" => "favorite-ledger",
        "longshot-ledger" | "longshot" => "longshot-ledger",
        "random-ledger" | "random" => "random-ledger",
        "abstain" | "abstainer" => "abstain",
        "deterministic" | "determinism" => "deterministic",
        _ => return None,
    };
    catalog::catalog_scenarios()
        .into_iter()
        .find(|scenario| scenario.key == key)
}

/// Every scenario key with its display name.
pub fn list_scenarios() -> Vec<(&'static str, String)> {
    catalog::catalog_scenarios()
        .into_iter()
        .map(|scenario| (scenario.key, scenario.name))
        .collect()
}

/// Expand `all` into every catalog key, keeping other names in order.
pub fn expand_scenarios(names: Vec<String>) -> Vec<String> {
    if !names.iter().any(|name| name.eq_ignore_ascii_case("all")) {
        return names;
    }
    let mut expanded: Vec<String> = names
        .into_iter()
        .filter(|name| !name.eq_ignore_ascii_case("all"))
        .collect();
    for (key, _) in list_scenarios() {
        if !expanded.iter().any(|name| name == key) {
            expanded.push(key.to_string());
        }
    }
    expanded
}
