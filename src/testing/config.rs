//! Scenario configuration types
//!
//! Defines the data structures for deserializing YAML scenario suites.

use serde::Deserialize;
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use super::template;
use crate::common::{Error, Result};
use crate::probe::{Method, MultipartFile};

/// A named group of scenarios loaded from one YAML document
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ScenarioSuite {
    /// Group name applied to scenarios that do not set their own
    pub group: Option<String>,
    /// Optional description of what the suite covers
    pub description: Option<String>,
    /// Scenarios in execution order
    pub scenarios: Vec<Scenario>,
}

/// One self-contained differential test case
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Catalog identifier sent in the task header (e.g. "api-7")
    pub tag: String,
    /// Human readable name
    pub name: String,
    /// Group the scenario belongs to (users, cart, ...)
    pub group: Option<String>,
    /// Optional description of what the scenario verifies
    pub description: Option<String>,
    /// Requests issued in order, each to every environment
    pub steps: Vec<Step>,
}

/// A single request sent to every environment plus its expectations
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Step {
    /// HTTP method
    pub method: Method,
    /// Path relative to the base URL; may contain placeholders
    pub path: String,
    /// Query parameters in the order written; values may contain placeholders
    #[serde(default)]
    pub query: IndexMap<String, String>,
    /// JSON body; string values may contain placeholders
    pub json: Option<serde_json::Value>,
    /// Multipart file parts
    pub multipart: Option<Vec<MultipartFile>>,
    /// Expectations checked against the responses
    #[serde(default)]
    pub expect: Expectation,
    /// Fields to extract from each environment's response: name -> field
    #[serde(default)]
    pub capture: BTreeMap<String, String>,
}

/// Expectations for one step's responses
#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Expectation {
    /// Status code every environment must return
    pub status: Option<u16>,
    /// Every environment must return the same status
    pub agree_status: bool,
    /// Decoded bodies must be deeply equal across environments
    pub body_equal: bool,
    /// Every decoded body must be non-empty
    pub non_empty: bool,
    /// Every decoded body must be a JSON array
    pub is_list: bool,
    /// Top-level fields that must be present and non-empty in every body
    pub require_fields: Vec<String>,
    /// Top-level fields that must have the same value in every body
    pub fields_equal: Vec<String>,
    /// Fields every element of a list body must carry
    pub each_has: Vec<String>,
    /// Field whose value must be unique across the elements of a list body
    pub unique_by: Option<String>,
    /// Message prefixed to any failure raised by this step
    pub message: Option<String>,
}

impl Default for Expectation {
    fn default() -> Self {
        Self {
            status: None,
            agree_status: true,
            body_equal: false,
            non_empty: false,
            is_list: false,
            require_fields: Vec::new(),
            fields_equal: Vec::new(),
            each_has: Vec::new(),
            unique_by: None,
            message: None,
        }
    }
}

impl Expectation {
    /// Whether any check needs the decoded response bodies
    pub fn needs_body(&self) -> bool {
        self.body_equal
            || self.non_empty
            || self.is_list
            || !self.require_fields.is_empty()
            || !self.fields_equal.is_empty()
            || !self.each_has.is_empty()
            || self.unique_by.is_some()
    }
}

impl ScenarioSuite {
    /// Load a suite from a YAML file
    ///
    /// A file holding a single scenario (no `scenarios` key) is accepted
    /// and wrapped in a suite of one.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content).map_err(|e| match e {
            Error::Scenario(msg) => {
                Error::Scenario(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parse a suite (or single scenario) from YAML text
    pub fn parse(content: &str) -> Result<Self> {
        let raw: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| Error::Scenario(format!("Failed to parse YAML: {}", e)))?;

        let is_suite = raw
            .as_mapping()
            .map(|m| m.contains_key("scenarios"))
            .unwrap_or(false);

        let suite = if is_suite {
            serde_yaml::from_value::<ScenarioSuite>(raw)
                .map_err(|e| Error::Scenario(format!("Failed to parse scenario suite: {}", e)))?
        } else {
            let scenario = serde_yaml::from_value::<Scenario>(raw)
                .map_err(|e| Error::Scenario(format!("Failed to parse scenario: {}", e)))?;
            ScenarioSuite {
                group: None,
                description: None,
                scenarios: vec![scenario],
            }
        };

        suite.validate()?;
        Ok(suite)
    }

    /// Check every scenario and reject duplicate tags
    pub fn validate(&self) -> Result<()> {
        let mut tags = HashSet::new();
        for scenario in &self.scenarios {
            scenario.validate()?;
            if !tags.insert(scenario.tag.as_str()) {
                return Err(Error::Scenario(format!(
                    "Tag '{}' appears more than once",
                    scenario.tag
                )));
            }
        }
        Ok(())
    }

    /// Consume the suite, filling in the group of each scenario
    pub fn into_scenarios(self) -> Vec<Scenario> {
        let group = self.group;
        self.scenarios
            .into_iter()
            .map(|mut s| {
                if s.group.is_none() {
                    s.group = group.clone();
                }
                s
            })
            .collect()
    }
}

impl Scenario {
    /// Check the scenario is well formed before any request is sent
    pub fn validate(&self) -> Result<()> {
        if self.tag.trim().is_empty() {
            return Err(Error::Scenario(format!("Scenario '{}' has an empty tag", self.name)));
        }
        if self.steps.is_empty() {
            return Err(Error::Scenario(format!("Scenario '{}' has no steps", self.tag)));
        }

        let mut captured: HashSet<&str> = HashSet::new();
        for (i, step) in self.steps.iter().enumerate() {
            let step_num = i + 1;
            if step.json.is_some() && step.multipart.is_some() {
                return Err(Error::Scenario(format!(
                    "Scenario '{}' step {}: 'json' and 'multipart' are mutually exclusive",
                    self.tag, step_num
                )));
            }
            if step.multipart.as_ref().is_some_and(|files| files.is_empty()) {
                return Err(Error::Scenario(format!(
                    "Scenario '{}' step {}: 'multipart' needs at least one file",
                    self.tag, step_num
                )));
            }

            // Captures from this step only become visible to later steps
            let referenced = template::capture_names(&step.path)
                .into_iter()
                .chain(step.query.values().flat_map(|v| template::capture_names(v)))
                .chain(step.json.iter().flat_map(template::value_capture_names));
            for name in referenced {
                if !captured.contains(name) {
                    return Err(Error::Scenario(format!(
                        "Scenario '{}' step {}: '{{capture.{}}}' is used before it is captured",
                        self.tag, step_num, name
                    )));
                }
            }
            for (name, field) in &step.capture {
                if name.is_empty() || field.is_empty() {
                    return Err(Error::Scenario(format!(
                        "Scenario '{}' step {}: capture entries need a name and a field",
                        self.tag, step_num
                    )));
                }
            }
            captured.extend(step.capture.keys().map(String::as_str));
        }

        Ok(())
    }

    /// Group name or a placeholder for display
    pub fn group_name(&self) -> &str {
        self.group.as_deref().unwrap_or("custom")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUITE: &str = r#"
group: wishlist
scenarios:
  - tag: api-8
    name: Remove from wishlist
    steps:
      - method: POST
        path: /users/{uuid.user}/wishlist
        json: { item_name: "Test Item" }
        expect: { status: 201 }
        capture: { item: item_id }
      - method: DELETE
        path: /users/{uuid.user}/wishlist/{capture.item}
        expect: { status: 200 }
"#;

    #[test]
    fn test_parse_suite() {
        let suite = ScenarioSuite::parse(SUITE).unwrap();
        let scenarios = suite.into_scenarios();
        assert_eq!(scenarios.len(), 1);
        let s = &scenarios[0];
        assert_eq!(s.group_name(), "wishlist");
        assert_eq!(s.steps.len(), 2);
        assert_eq!(s.steps[0].method, Method::Post);
        assert_eq!(s.steps[0].capture.get("item").unwrap(), "item_id");
        assert_eq!(s.steps[1].expect.status, Some(200));
        assert!(!s.steps[1].expect.needs_body());
    }

    #[test]
    fn test_status_agreement_defaults_on() {
        let suite = ScenarioSuite::parse(
            r#"
tag: api-9
name: Game
steps:
  - method: POST
    path: /games
    expect: { agree_status: false }
  - method: GET
    path: /games/x
"#,
        )
        .unwrap();
        let steps = &suite.scenarios[0].steps;
        assert!(!steps[0].expect.agree_status);
        assert!(steps[1].expect.agree_status);
        assert!(Expectation::default().agree_status);
    }

    #[test]
    fn test_query_keeps_written_order() {
        let suite = ScenarioSuite::parse(
            "tag: q\nname: q\nsteps:\n  - method: GET\n    path: /users\n    query: { zeta: '1', alpha: '2', mid: '3' }\n",
        )
        .unwrap();
        let keys: Vec<&str> = suite.scenarios[0].steps[0]
            .query
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_parse_single_scenario_file() {
        let suite = ScenarioSuite::parse(
            "tag: api-1\nname: Delete\nsteps:\n  - method: DELETE\n    path: /users/{uuid.u}\n",
        )
        .unwrap();
        let scenarios = suite.into_scenarios();
        assert_eq!(scenarios[0].group_name(), "custom");
    }

    #[test]
    fn test_unknown_expectation_field_is_rejected() {
        let err = ScenarioSuite::parse(
            "tag: a\nname: b\nsteps:\n  - method: GET\n    path: /x\n    expect: { stauts: 200 }\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Scenario(_)));
    }

    #[test]
    fn test_capture_used_before_defined() {
        let err = ScenarioSuite::parse(
            "tag: a\nname: b\nsteps:\n  - method: GET\n    path: /x/{capture.id}\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("used before it is captured"));
    }

    #[test]
    fn test_json_and_multipart_are_exclusive() {
        let err = ScenarioSuite::parse(
            r#"
tag: a
name: b
steps:
  - method: POST
    path: /x
    json: {}
    multipart:
      - { field: f, file_name: n, content: c }
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_duplicate_tags_rejected() {
        let err = ScenarioSuite::parse(
            r#"
scenarios:
  - { tag: t, name: one, steps: [ { method: GET, path: /a } ] }
  - { tag: t, name: two, steps: [ { method: GET, path: /b } ] }
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_empty_steps_rejected() {
        assert!(ScenarioSuite::parse("tag: a\nname: b\nsteps: []\n").is_err());
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "tag: a\nname: b\nsteps: []\n").unwrap();
        let err = ScenarioSuite::load(&path).unwrap_err();
        assert!(err.to_string().contains("bad.yaml"));
    }
}
