use std::process::ExitCode;
use std::sync::mpsc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use zerotier_client::{
    ApiToken, ClientConfig, Controller, Endpoint, MemberAuthorizer, Result, ZtError, start_daemon,
};

#[derive(Parser)]
#[command(name = "ztjoin")]
#[command(about = "Join ZeroTier networks, authorize members and wait for an address")]
struct Cli {
    /// ZeroTier Central API token (falls back to ZEROTIER_API_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the local node status
    Status,
    /// List networks known to the daemon
    Networks,
    /// Launch the daemon if it is not answering
    StartDaemon,
    /// Join a network
    Join {
        network_id: String,
        /// Authorize this node with the controller after joining
        #[arg(long)]
        authorize: bool,
        /// Member description used with --authorize
        #[arg(long, default_value = "")]
        description: String,
        /// Block until an IPv4 address is assigned
        #[arg(long)]
        wait: bool,
    },
    /// Leave a network
    Leave { network_id: String },
    /// Authorize a member on a network
    Authorize {
        network_id: String,
        member_address: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Block until the network has an IPv4 address (Ctrl-C to abort)
    Wait { network_id: String },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = ClientConfig::from_env()?;

    match cli.command {
        Command::StartDaemon => {
            let runner = zerotier_client::ZeroTierCli::new(config.cli_program.clone());
            start_daemon(&runner, &config)?;
            println!("zerotier daemon is running");
        }
        Command::Status => {
            let endpoint = Endpoint::new(config)?;
            let status = endpoint.status();
            println!("address:      {}", status.address);
            println!("online:       {}", status.online);
            println!("tcp fallback: {}", status.tcp_fallback_active);
            if let Some(version) = &status.version {
                println!("version:      {}", version);
            }
        }
        Command::Networks => {
            let endpoint = Endpoint::new(config)?;
            let mut networks: Vec<_> = endpoint.list_networks()?.into_values().collect();
            networks.sort_by(|a, b| a.id.cmp(&b.id));
            for nw in networks {
                println!(
                    "{}  {:<20} {:<26} {:<6} {}",
                    nw.id,
                    nw.name,
                    nw.status,
                    nw.port_device_name,
                    nw.assigned_addresses.join(",")
                );
            }
        }
        Command::Join {
            network_id,
            authorize,
            description,
            wait,
        } => {
            let controller = if authorize {
                Some(Controller::new(api_token(cli.token)?, &config)?)
            } else {
                None
            };
            let endpoint = Endpoint::new(config)?;
            endpoint.join(&network_id)?;
            println!("joined {}", network_id);

            if let Some(controller) = controller {
                controller.authorize_endpoint(&endpoint, &network_id, &description)?;
                println!("authorized {} on {}", endpoint.device_address(), network_id);
            }
            if wait {
                wait_and_print(&endpoint, &network_id)?;
            } else {
                println!("state: {}", endpoint.membership(&network_id)?);
            }
        }
        Command::Leave { network_id } => {
            Endpoint::new(config)?.leave(&network_id)?;
            println!("left {}", network_id);
        }
        Command::Authorize {
            network_id,
            member_address,
            description,
        } => {
            let controller = Controller::new(api_token(cli.token)?, &config)?;
            controller.authorize_member(&network_id, &member_address, &description)?;
            println!("authorized {} on {}", member_address, network_id);
        }
        Command::Wait { network_id } => {
            let endpoint = Endpoint::new(config)?;
            wait_and_print(&endpoint, &network_id)?;
        }
    }

    Ok(())
}

fn wait_and_print(endpoint: &Endpoint, network_id: &str) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = tx.send(());
    }) {
        // Ctrl-C falls back to terminating the process.
        tracing::warn!(error = %e, "cannot install Ctrl-C handler");
    }

    let ip = endpoint.wait_for_ip(network_id, &rx)?;
    println!("{}", ip);
    Ok(())
}

fn api_token(flag: Option<String>) -> Result<ApiToken> {
    flag.or_else(|| std::env::var("ZEROTIER_API_TOKEN").ok())
        .filter(|t| !t.is_empty())
        .map(ApiToken::new)
        .ok_or(ZtError::Config {
            key: "ZEROTIER_API_TOKEN",
            value: String::new(),
        })
}
