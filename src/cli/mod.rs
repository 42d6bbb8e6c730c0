//! CLI command handling
//!
//! Loads configuration, dispatches commands and formats output.

use colored::Colorize;
use std::path::PathBuf;

use crate::catalog;
use crate::commands::Commands;
use crate::common::config::{describe_source, Overrides};
use crate::common::{Config, Error, Result};
use crate::probe::{decode_all, Method, ProbeClient, ProbeRequest};
use crate::testing::assertions::first_difference;
use crate::testing::template::Bindings;
use crate::testing::{run_scenarios, RunOptions, RunReport, Scenario, ScenarioSuite};

/// Settings shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Explicit configuration file
    pub config: Option<PathBuf>,
    /// Command-line overrides applied on top of file and environment
    pub overrides: Overrides,
}

impl GlobalOptions {
    /// Resolve the effective configuration: file, then env vars, then flags
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        config.apply_env();
        config.apply_overrides(self.overrides.clone());
        Ok(config)
    }
}

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, global: GlobalOptions) -> Result<()> {
    match command {
        Commands::Run {
            tags,
            groups,
            verbose,
            json,
        } => {
            let scenarios = catalog::select(&tags, &groups)?;
            let client = ProbeClient::from_config(&global.load_config()?)?;
            run_and_report(&client, &scenarios, verbose, json).await
        }

        Commands::Test {
            path,
            verbose,
            json,
        } => {
            let scenarios = ScenarioSuite::load(&path)?.into_scenarios();
            let client = ProbeClient::from_config(&global.load_config()?)?;
            run_and_report(&client, &scenarios, verbose, json).await
        }

        Commands::List { group, json } => {
            let groups: Vec<String> = group.into_iter().collect();
            let scenarios = catalog::select(&[], &groups)?;
            print_catalog(&scenarios, json)
        }

        Commands::Probe {
            method,
            path,
            json_body,
            query,
            tag,
        } => {
            let client = ProbeClient::from_config(&global.load_config()?)?;
            let request = adhoc_request(&method, &path, json_body.as_deref(), &query)?;
            probe(&client, &tag, &request).await
        }

        Commands::Config => {
            let config = global.load_config()?;
            println!("# Source: {}", describe_source(global.config.as_deref()));
            print!("{}", config.redacted().to_toml()?);
            if let Err(e) = config.validate() {
                println!("# Warning: {}", e);
            }
            Ok(())
        }
    }
}

/// Run scenarios and print the report; fails when any scenario failed
async fn run_and_report(
    client: &ProbeClient,
    scenarios: &[Scenario],
    verbose: bool,
    json: bool,
) -> Result<()> {
    if !json {
        let envs: Vec<String> = client
            .environments()
            .iter()
            .map(|e| format!("{} ({})", e.name, e.base_url))
            .collect();
        println!("{} {}", "Comparing:".cyan().bold(), envs.join(" vs "));
    }

    let report = run_scenarios(
        client,
        scenarios,
        RunOptions {
            verbose,
            quiet: json,
        },
    )
    .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print_summary();
    }

    check_report(&report)
}

fn check_report(report: &RunReport) -> Result<()> {
    if report.all_passed() {
        Ok(())
    } else {
        Err(Error::ScenariosFailed {
            failed: report.failed,
            total: report.total(),
        })
    }
}

/// Print the catalog
fn print_catalog(scenarios: &[Scenario], json: bool) -> Result<()> {
    if json {
        let items: Vec<_> = scenarios
            .iter()
            .map(|s| {
                serde_json::json!({
                    "tag": s.tag,
                    "group": s.group_name(),
                    "name": s.name,
                    "steps": s.steps.len(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    let mut current_group = "";
    for s in scenarios {
        if s.group_name() != current_group {
            current_group = s.group_name();
            println!("\n{}", current_group.cyan().bold());
        }
        let steps = if s.steps.len() == 1 {
            String::new()
        } else {
            format!(" ({} steps)", s.steps.len())
        };
        println!("  {:8} {}{}", s.tag, s.name, steps.dimmed());
    }
    println!();
    Ok(())
}

/// Parse a `key=value` query argument
fn parse_query_arg(arg: &str) -> Result<(String, String)> {
    arg.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| Error::Config(format!("Invalid query '{}', expected key=value", arg)))
}

/// Build the request for the `probe` command
fn adhoc_request(
    method: &str,
    path: &str,
    json_body: Option<&str>,
    query: &[String],
) -> Result<ProbeRequest> {
    let method: Method = method.parse()?;
    let mut bindings = Bindings::new();

    // Placeholders resolve once; every environment gets the same request
    let mut request = ProbeRequest::new(method, bindings.resolve_str("adhoc", path)?);
    for arg in query {
        let (key, value) = parse_query_arg(arg)?;
        request = request.query(key, bindings.resolve_str("adhoc", &value)?);
    }
    if let Some(text) = json_body {
        let body: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| Error::Config(format!("Invalid --json-body: {}", e)))?;
        request = request.json(bindings.resolve_value("adhoc", &body)?);
    }
    Ok(request)
}

/// Send one request to every environment and print how they compare
async fn probe(client: &ProbeClient, tag: &str, request: &ProbeRequest) -> Result<()> {
    println!(
        "{} {} {}",
        "Probing:".cyan().bold(),
        request.method,
        request.path
    );

    let responses = client.send_all(tag, request).await?;
    for r in &responses {
        println!("  {:10} {}  {}", r.environment, r.status, r.preview(120).dimmed());
    }

    let statuses_match = responses.windows(2).all(|w| w[0].status == w[1].status);
    println!(
        "  status: {}",
        if statuses_match {
            "match".green()
        } else {
            "differ".red()
        }
    );

    match decode_all(&responses) {
        Ok(bodies) => {
            let diff = bodies
                .windows(2)
                .find_map(|w| first_difference(&w[0], &w[1]));
            match diff {
                None => println!("  body:   {}", "match".green()),
                Some(d) => println!("  body:   {} ({})", "differ".red(), d),
            }
        }
        Err(_) => println!("  body:   {}", "not JSON, not compared".dimmed()),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::RequestBody;

    #[test]
    fn test_parse_query_arg() {
        assert_eq!(
            parse_query_arg("email=a@b.c").unwrap(),
            ("email".to_string(), "a@b.c".to_string())
        );
        assert_eq!(
            parse_query_arg("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert!(parse_query_arg("novalue").is_err());
        assert!(parse_query_arg("=x").is_err());
    }

    #[test]
    fn test_adhoc_request_resolves_placeholders() {
        let req = adhoc_request(
            "delete",
            "/users/{uuid.u}",
            Some(r#"{"item_uuid": "{uuid.u}"}"#),
            &["x=1".to_string()],
        )
        .unwrap();
        assert_eq!(req.method, Method::Delete);
        assert!(!req.path.contains('{'));
        let id = req.path.trim_start_matches("/users/");
        match &req.body {
            RequestBody::Json(v) => assert_eq!(v["item_uuid"], id),
            other => panic!("Expected JSON body, got {:?}", other),
        }
        assert_eq!(req.query, vec![("x".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_adhoc_request_rejects_bad_input() {
        assert!(adhoc_request("FETCH", "/x", None, &[]).is_err());
        assert!(adhoc_request("GET", "/x", Some("{not json"), &[]).is_err());
        assert!(adhoc_request("GET", "/x/{capture.id}", None, &[]).is_err());
    }

    #[test]
    fn test_check_report() {
        let report = RunReport::default();
        assert!(check_report(&report).is_ok());
    }
}
