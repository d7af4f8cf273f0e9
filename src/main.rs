//! avago-operator entry point.
//!
//! Loads configuration from the environment, installs logging and runs the
//! AvalancheCluster controller until a shutdown signal arrives.

mod cli_parser;

use std::process::ExitCode;

use kube::CustomResourceExt;

use avago_operator::config::OperatorConfig;
use avago_operator::k8s::AvalancheCluster;
use avago_operator::reconcile::controller;
use avago_operator::telemetry;

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("run");

    match command {
        "run" | "" => run_controller().await,
        "crd" => print_crd(),
        "config" => run_config_cmd(&args),
        "help" | "--help" | "-h" => {
            if let Some(sub) = args.get(2) {
                cli_parser::print_command_help(sub);
            } else {
                cli_parser::print_usage();
            }
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("avago-operator {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            cli_parser::print_usage();
            ExitCode::FAILURE
        }
    }
}

async fn run_controller() -> ExitCode {
    let config = match OperatorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(2u8);
        }
    };
    telemetry::init(config.log_format);

    match controller::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "controller failed to start");
            ExitCode::from(3u8)
        }
    }
}

fn print_crd() -> ExitCode {
    match serde_yaml::to_string(&AvalancheCluster::crd()) {
        Ok(yaml) => {
            print!("{}", yaml);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to render CRD: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_config_cmd(args: &[String]) -> ExitCode {
    let sub = args.get(2).map(|s| s.as_str()).unwrap_or("show");
    match sub {
        "show" => match OperatorConfig::from_env() {
            Ok(config) => {
                print!("{}", config.describe());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                ExitCode::from(2u8)
            }
        },
        "defaults" => {
            print!("{}", OperatorConfig::default().describe());
            ExitCode::SUCCESS
        }
        "validate" => match OperatorConfig::from_env() {
            Ok(_) => {
                println!("Configuration is valid");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                ExitCode::from(2u8)
            }
        },
        _ => {
            eprintln!("Unknown config subcommand: {}", sub);
            cli_parser::print_command_help("config");
            ExitCode::FAILURE
        }
    }
}
