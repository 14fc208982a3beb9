//! Command-line interface: serve the API or run one-shot analyses against
//! the local pipeline.

use std::path::PathBuf;
use std::process::ExitCode;

use base64::Engine as _;
use clap::{Parser, Subcommand};

use crate::api::Application;
use crate::config::Settings;
use crate::domain::{CheckRequest, Environment, IacType, PolicyEvalStatus};

/// Exit code when the user interrupts a command.
pub const EXIT_INTERRUPTED: u8 = 130;

#[derive(Debug, Parser)]
#[command(name = "finopsguard", version, about = "Cost-aware guardrails for IaC changes")]
pub struct Cli {
    /// Settings file; the environment is used when absent.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server.
    Serve,

    /// Analyze an IaC file and print the cost and policy verdict.
    Check {
        /// Path to the Terraform or Ansible document.
        file: PathBuf,

        /// IaC format of the file.
        #[arg(long, value_enum, default_value = "terraform")]
        iac_type: CliIacType,

        /// Environment the change targets.
        #[arg(long, value_enum, default_value = "dev")]
        environment: CliEnvironment,

        /// Optional monthly budget to evaluate against.
        #[arg(long)]
        budget: Option<f64>,

        /// Emit the raw JSON response.
        #[arg(long)]
        json: bool,
    },

    /// Inspect stored policies.
    Policies {
        #[command(subcommand)]
        command: PoliciesCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum PoliciesCommand {
    /// List every policy.
    List,
    /// Show one policy as JSON.
    Get { policy_id: String },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliIacType {
    Terraform,
    Ansible,
}

impl From<CliIacType> for IacType {
    fn from(value: CliIacType) -> Self {
        match value {
            CliIacType::Terraform => IacType::Terraform,
            CliIacType::Ansible => IacType::Ansible,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliEnvironment {
    Dev,
    Staging,
    Prod,
}

impl From<CliEnvironment> for Environment {
    fn from(value: CliEnvironment) -> Self {
        match value {
            CliEnvironment::Dev => Environment::Dev,
            CliEnvironment::Staging => Environment::Staging,
            CliEnvironment::Prod => Environment::Prod,
        }
    }
}

/// Run the parsed command to completion.
pub async fn run(cli: Cli, settings: Settings) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Serve => {
            let application = Application::build(settings).await?;
            application.serve().await?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Check {
            file,
            iac_type,
            environment,
            budget,
            json,
        } => {
            let contents = std::fs::read_to_string(&file)
                .map_err(|err| anyhow::anyhow!("cannot read {}: {err}", file.display()))?;
            let request = CheckRequest {
                iac_type: iac_type.into(),
                iac_payload: base64::engine::general_purpose::STANDARD.encode(contents),
                environment: environment.into(),
                budget_rules: budget
                    .map(|b| std::collections::HashMap::from([("monthly_budget".to_string(), b)])),
                options: None,
            };

            let application = Application::build(settings).await?;
            let response = application
                .state
                .orchestrator
                .check_cost_impact(&request)
                .await?;

            let blocked = response
                .policy_eval
                .as_ref()
                .map(|policy_eval| policy_eval.status == PolicyEvalStatus::Fail)
                .unwrap_or(false);

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("Estimated monthly cost: ${:.2}", response.estimated_monthly_cost);
                println!("Estimated first week:   ${:.2}", response.estimated_first_week_cost);
                println!("Pricing confidence:     {}", response.pricing_confidence);
                for item in &response.breakdown_by_resource {
                    let notes = if item.notes.is_empty() {
                        String::new()
                    } else {
                        format!("  ({})", item.notes.join("; "))
                    };
                    println!("  {:<48} ${:>10.2}{notes}", item.resource_id, item.monthly_cost);
                }
                if !response.risk_flags.is_empty() {
                    println!("Risk flags: {}", response.risk_flags.join(", "));
                }
                if let Some(policy_eval) = &response.policy_eval {
                    println!(
                        "Policy verdict: {} ({})",
                        match policy_eval.status {
                            PolicyEvalStatus::Pass => "pass",
                            PolicyEvalStatus::Fail => "BLOCKED",
                        },
                        policy_eval.reason.as_deref().unwrap_or("no reason")
                    );
                }
            }

            Ok(if blocked {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            })
        }

        Command::Policies { command } => {
            let application = Application::build(settings).await?;
            let store = application.state.orchestrator.policy_engine().store().clone();
            match command {
                PoliciesCommand::List => {
                    for policy in store.list_policies().await {
                        let kind = if policy.budget.is_some() { "budget" } else { "expression" };
                        println!(
                            "{:<32} {:<10} {:?}  enabled={}",
                            policy.id, kind, policy.on_violation, policy.enabled
                        );
                    }
                }
                PoliciesCommand::Get { policy_id } => match store.get_policy(&policy_id).await {
                    Some(policy) => println!("{}", serde_json::to_string_pretty(&policy)?),
                    None => {
                        eprintln!("Policy {policy_id} not found");
                        return Ok(ExitCode::from(1));
                    }
                },
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_check_command() {
        let cli = Cli::parse_from([
            "finopsguard",
            "check",
            "main.tf",
            "--environment",
            "prod",
            "--budget",
            "500",
        ]);
        match cli.command {
            Command::Check {
                file,
                budget,
                json,
                ..
            } => {
                assert_eq!(file, PathBuf::from("main.tf"));
                assert_eq!(budget, Some(500.0));
                assert!(!json);
            }
            _ => panic!("expected check command"),
        }
    }

    #[test]
    fn test_cli_parses_policies_get() {
        let cli = Cli::parse_from(["finopsguard", "policies", "get", "no_gpu_in_dev"]);
        match cli.command {
            Command::Policies {
                command: PoliciesCommand::Get { policy_id },
            } => assert_eq!(policy_id, "no_gpu_in_dev"),
            _ => panic!("expected policies get"),
        }
    }
}
