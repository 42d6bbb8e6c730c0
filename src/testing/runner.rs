//! Scenario runner implementation
//!
//! Executes scenarios step by step against every environment and turns
//! the first failing check into the scenario's result. Scenarios never
//! share state: each run gets fresh bindings.

use colored::Colorize;
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::common::{Error, Result};
use crate::probe::{decode_all, ProbeClient, ProbeRequest, ProbeResponse, RequestBody};

use super::assertions::{self, is_truthy};
use super::config::{Scenario, Step};
use super::template::{capture_text, Bindings};

/// Category of a scenario failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The environments disagreed or missed an expectation
    Assertion,
    /// A request never produced a usable response
    Transport,
    /// The scenario itself could not be executed as written
    Scenario,
}

impl FailureKind {
    fn of(error: &Error) -> Self {
        if error.is_assertion() {
            FailureKind::Assertion
        } else if error.is_transport() {
            FailureKind::Transport
        } else {
            FailureKind::Scenario
        }
    }
}

/// Why a scenario failed
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    /// 1-based index of the failing step
    pub step: usize,
    pub message: String,
}

/// Result of one scenario run
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub tag: String,
    pub name: String,
    pub group: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub duration_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

/// Results of a batch of scenarios
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<ScenarioResult>,
}

impl RunReport {
    fn push(&mut self, result: ScenarioResult) {
        if result.passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Print a one-line-per-failure summary
    pub fn print_summary(&self) {
        println!("\n{}", "Summary:".cyan().bold());
        for result in self.results.iter().filter(|r| !r.passed) {
            if let Some(failure) = &result.failure {
                println!(
                    "  {} {} {} (step {}, {:?}): {}",
                    "✗".red(),
                    result.tag.white().bold(),
                    result.name.dimmed(),
                    failure.step,
                    failure.kind,
                    failure.message
                );
            }
        }

        let line = format!(
            "{} passed, {} failed, {} total",
            self.passed,
            self.failed,
            self.total()
        );
        if self.all_passed() {
            println!("  {} {}\n", "✓".green().bold(), line.green().bold());
        } else {
            println!("  {} {}\n", "✗".red().bold(), line.red().bold());
        }
    }
}

/// Output options for a run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Print per-environment statuses for every step
    pub verbose: bool,
    /// Suppress console output (for machine-readable reports)
    pub quiet: bool,
}

/// Run scenarios one after another
///
/// A failing scenario never stops the batch.
pub async fn run_scenarios(
    client: &ProbeClient,
    scenarios: &[Scenario],
    options: RunOptions,
) -> RunReport {
    let mut report = RunReport::default();
    for scenario in scenarios {
        report.push(run_scenario(client, scenario, options).await);
    }
    report
}

/// Run one scenario against every environment
pub async fn run_scenario(
    client: &ProbeClient,
    scenario: &Scenario,
    options: RunOptions,
) -> ScenarioResult {
    let steps_total = scenario.steps.len();
    let started = Instant::now();

    if !options.quiet {
        println!(
            "\n{} {} {}",
            "Running Scenario:".blue().bold(),
            scenario.tag.white().bold(),
            scenario.name.white()
        );
        if let Some(desc) = &scenario.description {
            println!("  {}", desc.dimmed());
        }
    }
    tracing::info!(tag = %scenario.tag, steps = steps_total, "scenario started");

    let mut bindings = Bindings::new();

    for (i, step) in scenario.steps.iter().enumerate() {
        let step_num = i + 1;

        if let Err(e) = execute_step(client, scenario, step, &mut bindings, step_num, options).await
        {
            let kind = FailureKind::of(&e);
            tracing::warn!(tag = %scenario.tag, step = step_num, kind = ?kind, error = %e, "scenario failed");
            if !options.quiet {
                println!("  {} Step {}: {}", "✗".red(), step_num, e);
            }
            return ScenarioResult {
                tag: scenario.tag.clone(),
                name: scenario.name.clone(),
                group: scenario.group_name().to_string(),
                passed: false,
                steps_run: step_num,
                steps_total,
                duration_ms: elapsed_ms(started.elapsed()),
                failure: Some(Failure {
                    kind,
                    step: step_num,
                    message: e.to_string(),
                }),
            };
        }
    }

    tracing::info!(tag = %scenario.tag, "scenario passed");
    if !options.quiet {
        println!("  {} {}", "✓".green().bold(), "Passed".green().bold());
    }

    ScenarioResult {
        tag: scenario.tag.clone(),
        name: scenario.name.clone(),
        group: scenario.group_name().to_string(),
        passed: true,
        steps_run: steps_total,
        steps_total,
        duration_ms: elapsed_ms(started.elapsed()),
        failure: None,
    }
}

fn elapsed_ms(d: Duration) -> u128 {
    d.as_millis()
}

/// Resolve a step's placeholders for one environment
fn build_request(step: &Step, bindings: &mut Bindings, environment: &str) -> Result<ProbeRequest> {
    let mut request = ProbeRequest::new(step.method, bindings.resolve_str(environment, &step.path)?);

    for (key, value) in &step.query {
        request = request.query(key.clone(), bindings.resolve_str(environment, value)?);
    }

    request.body = match (&step.json, &step.multipart) {
        (Some(json), _) => RequestBody::Json(bindings.resolve_value(environment, json)?),
        (None, Some(files)) => RequestBody::Multipart(files.clone()),
        (None, None) => RequestBody::Empty,
    };

    Ok(request)
}

/// Store each environment's value of every captured field
fn capture_fields(
    step: &Step,
    bindings: &mut Bindings,
    responses: &[ProbeResponse],
    bodies: &[serde_json::Value],
) -> Result<()> {
    let context = step.expect.message.as_deref();
    for (name, field) in &step.capture {
        for (response, body) in responses.iter().zip(bodies) {
            let value = body.get(field).filter(|v| is_truthy(v)).ok_or_else(|| {
                Error::assertion(
                    context,
                    format!(
                        "response from '{}' has no usable '{}' field to capture",
                        response.environment, field
                    ),
                )
            })?;
            bindings.capture(&response.environment, name, capture_text(value));
        }
    }
    Ok(())
}

/// Execute a single step
async fn execute_step(
    client: &ProbeClient,
    scenario: &Scenario,
    step: &Step,
    bindings: &mut Bindings,
    step_num: usize,
    options: RunOptions,
) -> Result<()> {
    let responses = client
        .send_each(&scenario.tag, |env| build_request(step, bindings, &env.name))
        .await?;

    let decoded = assertions::evaluate(&step.expect, &responses)?;

    if !step.capture.is_empty() {
        let bodies = match decoded {
            Some(bodies) => bodies,
            None => decode_all(&responses)?,
        };
        capture_fields(step, bindings, &responses, &bodies)?;
    }

    if !options.quiet {
        let statuses = responses
            .iter()
            .map(|r| format!("{}={}", r.environment, r.status))
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "  {} Step {}: {} {} ({})",
            "✓".green(),
            step_num,
            step.method.to_string().dimmed(),
            step.path.dimmed(),
            statuses
        );
        if options.verbose {
            for r in &responses {
                println!("      {} {}", format!("{}:", r.environment).dimmed(), r.preview(200));
            }
        }
    }

    Ok(())
}
