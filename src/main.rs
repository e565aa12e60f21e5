use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use env_logger::Env;
use lanparty::config::Layout;
use lanparty::ip::AddressPoolExhausted;
use lanparty::orchestrator::{self, AddressAction, StartOptions, StopOptions};
use log::{error, info};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit status when fewer free addresses exist than were requested
const EXIT_PARTIAL_ALLOCATION: u8 = 2;

/// Start LAN party services on free addresses of the local subnet
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Project directory containing etc/ and var/
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Allocate addresses, update netplan and write service configuration
    Start {
        /// Path to the netplan YAML file to change
        #[arg(short = 'f', long)]
        netplanfile: PathBuf,

        /// Interface to bind to
        #[arg(short, long)]
        interface: String,

        /// Services to start (default: all configured services)
        #[arg(short, long, num_args = 1..)]
        services: Vec<String>,

        /// Do not run 'netplan apply'
        #[arg(long)]
        no_apply: bool,
    },
    /// Release the addresses allocated by the last start
    Stop {
        /// Path to the netplan YAML file (default: the one used by start)
        #[arg(short = 'f', long)]
        netplanfile: Option<PathBuf>,

        /// Interface (default: the one used by start)
        #[arg(short, long)]
        interface: Option<String>,

        /// Do not run 'netplan apply'
        #[arg(long)]
        no_apply: bool,
    },
    /// Add or remove addresses in a netplan file
    Addresses {
        /// Path to the netplan YAML file
        #[arg(short = 'f', long)]
        netplanfile: PathBuf,

        /// Interface to bind to
        #[arg(short, long)]
        interface: String,

        /// Add or remove the addresses
        #[arg(short, long, value_enum, default_value_t = Action::Add)]
        action: Action,

        /// Addresses in a.b.c.d/nn form
        #[arg(required = true)]
        addresses: Vec<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Add,
    Remove,
}

impl From<Action> for AddressAction {
    fn from(action: Action) -> Self {
        match action {
            Action::Add => AddressAction::Add,
            Action::Remove => AddressAction::Remove,
        }
    }
}

fn run(args: Args) -> Result<()> {
    let layout = Layout::new(&args.root);

    match args.command {
        Command::Start { netplanfile, interface, services, no_apply } => {
            fs::create_dir_all(layout.var_dir())?;
            let options = StartOptions {
                interface,
                netplan_file: netplanfile,
                services,
                apply: !no_apply,
            };
            let allocation = orchestrator::start(&layout, &options)?;
            for record in allocation.records() {
                info!("{} -> {}", record.variable, record.cidr);
            }
        }
        Command::Stop { netplanfile, interface, no_apply } => {
            let options = StopOptions {
                interface,
                netplan_file: netplanfile,
                apply: !no_apply,
            };
            let released = orchestrator::stop(&layout, &options)?;
            info!("Released {} address(es)", released.len());
        }
        Command::Addresses { netplanfile, interface, action, addresses } => {
            let changed = orchestrator::update_addresses(&netplanfile, &interface, action.into(), &addresses)?;
            info!("{} address(es) changed", changed.len());
        }
    }
    Ok(())
}

fn main() -> Result<ExitCode> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match run(args) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(report) => match report.downcast_ref::<AddressPoolExhausted>() {
            Some(shortfall) => {
                error!("{}", shortfall);
                error!("Widen start_host/end_host in the settings or free some addresses");
                Ok(ExitCode::from(EXIT_PARTIAL_ALLOCATION))
            }
            None => Err(report),
        },
    }
}
