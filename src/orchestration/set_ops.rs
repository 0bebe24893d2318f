use crate::engine::ScenarioRef;
use crate::shared::ScenarioName;
use std::collections::HashSet;

/// Scenarios of `b` whose name also occurs in `a`. The returned objects are
/// always taken from `b`.
pub fn intersect_by_name(a: &[ScenarioRef], b: &[ScenarioRef]) -> Vec<ScenarioRef> {
    let names: HashSet<&ScenarioName> = a.iter().map(|s| &s.name).collect();
    b.iter()
        .filter(|scenario| names.contains(&scenario.name))
        .cloned()
        .collect()
}

/// Comma-joined scenario names for log lines.
pub fn describe_by_name(scenarios: &[ScenarioRef]) -> String {
    scenarios
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
