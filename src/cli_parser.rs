//! Help text for avago-operator.

/// Print general usage information.
pub fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "avago-operator - AvalancheCluster controller v{}

USAGE:
    avago-operator [COMMAND] [OPTIONS]

COMMANDS:
    run          Run the controller (default when no command given)
    crd          Print the AvalancheCluster CustomResourceDefinition as YAML
    config       Inspect configuration (show, defaults, validate)
    version      Show version information
    help         Show this help message

OPTIONS:
    -h, --help     Show help for command
    -V, --version  Show version information

EXAMPLES:
    avago-operator                     # Run the controller (default)
    avago-operator crd | kubectl apply -f -
    avago-operator config validate     # Check environment settings

ENVIRONMENT:
    AVAGO_OPERATOR_ROLLOUT_TIMEOUT_SECS  Per-node rollout wait (default 30)
    AVAGO_OPERATOR_REQUEUE_SECS          Retry delay after a failed pass (default 5)
    AVAGO_OPERATOR_INVALID_REQUEUE_SECS  Retry delay after an invalid request (default 300)
    AVAGO_OPERATOR_WATCH_NAMESPACE       Only watch this namespace (default all)
    AVAGO_OPERATOR_LOG_FORMAT            json or pretty (default json)
    RUST_LOG                             Log filter (default info)

EXIT CODES:
    0  Success
    1  Failure
    2  Configuration error
    3  Cluster connection error
",
        version
    );
}

/// Print detailed help for a specific command.
pub fn print_command_help(command: &str) {
    match command {
        "run" => print_run_help(),
        "crd" => print_crd_help(),
        "config" => print_config_help(),
        _ => {
            eprintln!(
                "No detailed help available for '{}'. Use 'avago-operator help' for general usage.",
                command
            );
        }
    }
}

fn print_run_help() {
    eprintln!(
        "avago-operator run - Run the controller

USAGE:
    avago-operator run

DESCRIPTION:
    Connects using the in-cluster service account or the local kubeconfig
    and reconciles AvalancheCluster resources until SIGINT or SIGTERM.
    Default command when none is specified.

EXIT CODES:
    0  Stopped on signal
    2  Configuration error
    3  Could not connect to the cluster
"
    );
}

fn print_crd_help() {
    eprintln!(
        "avago-operator crd - Print the CRD manifest

USAGE:
    avago-operator crd

EXAMPLES:
    avago-operator crd > avalanchecluster.yaml
"
    );
}

fn print_config_help() {
    eprintln!(
        "avago-operator config - Inspect configuration

USAGE:
    avago-operator config <SUBCOMMAND>

SUBCOMMANDS:
    show      Print the effective configuration (default)
    defaults  Print the built-in defaults
    validate  Check the environment and exit 2 on errors
"
    );
}
