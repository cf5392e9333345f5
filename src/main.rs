use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use dotenv::dotenv;
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use tracing::info;
use tracing_subscriber::EnvFilter;

use devcrate::cli::CreateWizard;
use devcrate::config::Settings;
use devcrate::descriptor::{DependencySource, EnvironmentDescriptor, Framework};
use devcrate::docker::DockerClient;
use devcrate::features::Feature;
use devcrate::orchestrator::{ContainerOrchestrator, LaunchReport};
use devcrate::{buildspec, entrypoint, runtime};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new dev container interactively
    Create {
        /// Name of the dev environment
        name: String,
        /// Build context directory
        #[arg(short, long, default_value = ".")]
        context: PathBuf,
    },
    /// Compile a descriptor and print the Dockerfile and entrypoint without
    /// touching the Docker engine
    Plan(PlanArgs),
    /// Check Docker availability
    DockerCheck,
}

#[derive(Args)]
struct PlanArgs {
    /// Name of the dev environment
    name: String,
    /// Framework (python, static-html, general-purpose)
    #[arg(short, long)]
    framework: String,
    /// Python version, required when the framework is python
    #[arg(short, long)]
    python_version: Option<String>,
    /// Space-separated packages or a requirements file path
    #[arg(short, long)]
    requirements: Option<String>,
    /// Directory to copy into the container
    #[arg(short, long)]
    import: Option<PathBuf>,
    /// Features to include (ssh, tailscale, code-server, git)
    #[arg(long = "feature")]
    features: Vec<String>,
    /// Tailscale auth key
    #[arg(long, env = "TS_AUTHKEY", hide_env_values = true)]
    tailscale_auth_key: Option<String>,
    /// Emit the compiled artifacts as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("Failed to load settings")?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Create { name, context } => {
            let descriptor = CreateWizard::run(&name)?;
            info!("Descriptor for '{}' validated", name);

            let orchestrator = ContainerOrchestrator::new(settings)?;

            let spinner = build_spinner("Building and starting container...");
            let report = orchestrator.launch(&descriptor, &context).await;
            spinner.finish_and_clear();

            let report = report?;
            print_report(&name, &report);
            offer_ssh_session(&report)?;
        }
        Commands::Plan(args) => {
            let descriptor = descriptor_from_flags(&args)?;

            let build_spec = buildspec::compile(&descriptor)?;
            let (command, warnings) = entrypoint::compose(
                &descriptor.features,
                descriptor.tailscale_auth_key.as_ref(),
            );
            let runtime_spec = runtime::build(&descriptor, command);

            for warning in &warnings {
                eprintln!("{} {}", style("warning:").yellow().bold(), warning);
            }

            if args.json {
                let plan = serde_json::json!({
                    "dockerfile": build_spec.render(),
                    "runtime": runtime_spec,
                });
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!("# Dockerfile");
                print!("{}", build_spec.render());
                println!();
                println!("# Entrypoint");
                println!("{}", runtime_spec.entrypoint);
                if !runtime_spec.port_map.is_empty() {
                    println!();
                    println!("# Published ports");
                    for port in runtime_spec.port_map.keys() {
                        println!("{}/tcp -> engine-assigned", port);
                    }
                }
            }
        }
        Commands::DockerCheck => {
            let is_available = DockerClient::is_docker_available();
            println!(
                "Docker is {}",
                if is_available { "available" } else { "not available" }
            );
        }
    }

    Ok(())
}

fn build_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}

fn print_report(name: &str, report: &LaunchReport) {
    println!(
        "{} Container '{}' created successfully.",
        style("✔").green(),
        name
    );

    if report.ssh_port.is_none() && report.code_server_port.is_none() && report.tailscale_ip.is_none() {
        return;
    }

    println!("\nTo access the container:");
    if let Some(port) = report.ssh_port {
        println!("  ssh root@localhost -p {}", port);
    }
    if let Some(port) = report.code_server_port {
        println!("  Open your browser at http://localhost:{}", port);
    }
    if let Some(ip) = &report.tailscale_ip {
        println!("  Tailscale IP: {}", ip);
    }
}

/// After the report, offer to drop the user straight into the container
/// over the freshly published SSH port.
fn offer_ssh_session(report: &LaunchReport) -> Result<()> {
    let Some(port) = report.ssh_port else {
        return Ok(());
    };

    let connect = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Do you want to SSH into the container?")
        .default(false)
        .interact()?;
    if connect {
        let (program, args) = ssh_command(port);
        std::process::Command::new(program)
            .args(args)
            .status()
            .context("Failed to launch ssh")?;
    }

    Ok(())
}

fn ssh_command(port: u16) -> (&'static str, [String; 3]) {
    (
        "ssh",
        [
            "root@localhost".to_string(),
            "-p".to_string(),
            port.to_string(),
        ],
    )
}

fn descriptor_from_flags(args: &PlanArgs) -> Result<EnvironmentDescriptor> {
    let framework = match args.framework.to_lowercase().as_str() {
        "python" => Framework::Python,
        "static-html" | "html" => Framework::StaticHtml,
        "general-purpose" | "general" => Framework::GeneralPurpose,
        other => return Err(anyhow!("Unknown framework: {}", other)),
    };

    let mut builder = EnvironmentDescriptor::builder(args.name.as_str()).framework(framework);

    if let Some(version) = &args.python_version {
        builder = builder.python_version(version.as_str());
    }
    if let Some(requirements) = &args.requirements {
        builder = builder.dependency_source(DependencySource::resolve(requirements));
    }
    if let Some(import) = &args.import {
        builder = builder.import_path(import);
    }
    for feature in &args.features {
        builder = builder.feature(parse_feature(feature)?);
    }
    if let Some(key) = &args.tailscale_auth_key {
        builder = builder.tailscale_auth_key(SecretString::new(key.clone()));
    }

    Ok(builder.build()?)
}

fn parse_feature(raw: &str) -> Result<Feature> {
    match raw.to_lowercase().as_str() {
        "ssh" => Ok(Feature::Ssh),
        "tailscale" => Ok(Feature::Tailscale),
        "code-server" | "openvscode-server" => Ok(Feature::OpenVscodeServer),
        "git" => Ok(Feature::Git),
        other => Err(anyhow!("Unknown feature: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ssh_command_targets_published_port() {
        let (program, args) = ssh_command(32768);
        assert_eq!(program, "ssh");
        assert_eq!(args, ["root@localhost", "-p", "32768"]);
    }

    #[test]
    fn test_parse_feature_aliases() {
        assert_eq!(parse_feature("SSH").unwrap(), Feature::Ssh);
        assert_eq!(
            parse_feature("openvscode-server").unwrap(),
            Feature::OpenVscodeServer
        );
        assert!(parse_feature("vpn").is_err());
    }
}
