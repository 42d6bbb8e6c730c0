//! Built-in scenario catalog
//!
//! The catalog ships inside the binary as YAML suites, one per API area,
//! and runs in the order listed here.

use std::collections::HashSet;

use crate::common::{Error, Result};
use crate::testing::{Scenario, ScenarioSuite};

/// (file name, YAML text) for every bundled suite
const SUITES: &[(&str, &str)] = &[
    ("users.yaml", include_str!("../../scenarios/users.yaml")),
    ("wishlist.yaml", include_str!("../../scenarios/wishlist.yaml")),
    ("games.yaml", include_str!("../../scenarios/games.yaml")),
    ("categories.yaml", include_str!("../../scenarios/categories.yaml")),
    ("avatar.yaml", include_str!("../../scenarios/avatar.yaml")),
    ("cart.yaml", include_str!("../../scenarios/cart.yaml")),
    ("orders.yaml", include_str!("../../scenarios/orders.yaml")),
    ("payments.yaml", include_str!("../../scenarios/payments.yaml")),
];

/// Every built-in scenario, in catalog order
pub fn scenarios() -> Result<Vec<Scenario>> {
    let mut all = Vec::new();
    let mut tags = HashSet::new();

    for (file, text) in SUITES {
        let suite = ScenarioSuite::parse(text)
            .map_err(|e| Error::Scenario(format!("built-in suite {}: {}", file, e)))?;
        for scenario in suite.into_scenarios() {
            if !tags.insert(scenario.tag.clone()) {
                return Err(Error::Scenario(format!(
                    "built-in tag '{}' is defined more than once",
                    scenario.tag
                )));
            }
            all.push(scenario);
        }
    }

    Ok(all)
}

/// Names of the catalog groups, in catalog order
pub fn groups() -> Result<Vec<String>> {
    let mut seen = Vec::new();
    for scenario in scenarios()? {
        let group = scenario.group_name().to_string();
        if !seen.contains(&group) {
            seen.push(group);
        }
    }
    Ok(seen)
}

/// Select scenarios by tag and group
///
/// Empty filters select everything. A scenario is kept when it matches any
/// given tag or any given group. Unknown tags and groups are errors so a
/// typo never silently runs nothing.
pub fn select(tags: &[String], groups: &[String]) -> Result<Vec<Scenario>> {
    let all = scenarios()?;
    if tags.is_empty() && groups.is_empty() {
        return Ok(all);
    }

    for tag in tags {
        if !all.iter().any(|s| &s.tag == tag) {
            return Err(Error::Config(format!("Unknown scenario tag '{}'", tag)));
        }
    }
    for group in groups {
        if !all.iter().any(|s| s.group_name() == group) {
            return Err(Error::Config(format!(
                "Unknown scenario group '{}' (available: {})",
                group,
                self::groups()?.join(", ")
            )));
        }
    }

    Ok(all
        .into_iter()
        .filter(|s| tags.contains(&s.tag) || groups.iter().any(|g| g == s.group_name()))
        .collect())
}
