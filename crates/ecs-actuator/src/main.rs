//! ecs-actuator: offline tooling for machine provider specs
//!
//! Validates provider specs and renders the RunInstances request the
//! actuator would submit, without contacting the provider.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ecs_actuator::machine::{ResolvedResources, build_run_instances_request};
use ecs_actuator::{Machine, MachineProviderConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ecs-actuator")]
#[command(about = "Alibaba Cloud ECS machine actuator tooling")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and validate a provider spec
    Validate {
        /// Path to the provider spec JSON
        #[arg(long, env = "ECS_ACTUATOR_SPEC")]
        spec: PathBuf,
    },

    /// Print the generated tags and RunInstances request for a machine
    Render {
        /// Path to the provider spec JSON
        #[arg(long, env = "ECS_ACTUATOR_SPEC")]
        spec: PathBuf,

        /// Machine name
        #[arg(long)]
        machine: String,

        /// Machine namespace
        #[arg(long, default_value = "openshift-machine-api")]
        namespace: String,

        /// Cluster ID used in the ownership tags
        #[arg(long, env = "ECS_ACTUATOR_CLUSTER_ID")]
        cluster_id: String,

        /// File with instance user data
        #[arg(long)]
        user_data_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Validate { spec } => {
            let config = MachineProviderConfig::load(&spec)?;
            config
                .check()
                .with_context(|| format!("Invalid provider spec {}", spec.display()))?;
            info!(
                spec = %spec.display(),
                region = %config.region_id,
                instance_type = %config.instance_type,
                "Provider spec is valid"
            );
        }

        Command::Render {
            spec,
            machine,
            namespace,
            cluster_id,
            user_data_file,
        } => {
            let config = MachineProviderConfig::load(&spec)?;
            config
                .check()
                .with_context(|| format!("Invalid provider spec {}", spec.display()))?;

            let user_data = match user_data_file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read user data {}", path.display()))?,
                None => String::new(),
            };

            let machine = Machine::new(machine, namespace).with_cluster_id(cluster_id.as_str());
            let resources = ResolvedResources::placeholders(&config);
            let request =
                build_run_instances_request(&machine, &config, &resources, &cluster_id, &user_data)?;

            let rendered = serde_json::json!({
                "tags": &request.tags,
                "runInstances": &request,
            });
            println!("{}", serde_json::to_string_pretty(&rendered)?);
        }
    }

    Ok(())
}
