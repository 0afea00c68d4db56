use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use mintforest::clock::{date_timestamp, Clock, SystemClock};
use mintforest::eip712::key_address;
use mintforest::{
    default_config_file_path, default_network_chain_id, expand_tilde, get_config_value,
    load_config_with_overrides, load_signing_key, read_request_file, read_state_file,
    save_default_config, save_state_file, set_config_value, write_config_file,
    write_state_file, ActionRequest, Address, ForestConfig, MintForest, MintForestError,
    RewardParams, SignedAction, SigninParams, StealParams, TurntableParams,
};

#[derive(Debug, Parser)]
#[command(name = "mintforest", version, about = "MintForest points ledger CLI")]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print the address of the configured signing key
    Address(KeyArgs),
    /// Sign an action for a user with the configured key
    Sign(SignCmd),
    /// Print the address that signed an action request
    Recover(RecoverCmd),
    /// Operate on the local ledger state
    Ledger(LedgerCmd),
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Generate a configuration file (TOML)
    Init(ConfigInitCmd),
    /// Get current config settings
    Get(ConfigGetCmd),
    /// Set a config setting
    Set(ConfigSetCmd),
}

#[derive(Debug, Args)]
struct ConfigInitCmd {
    /// Output path for the config file. Defaults to XDG config dir.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
    /// Overwrite existing file if present
    #[arg(long = "force")]
    force: bool,
    /// Network shortcut: localhost|mint-mainnet|mint-sepolia
    #[arg(long = "network")]
    network: Option<String>,
    /// Chain id (overrides network default)
    #[arg(long = "chain-id")]
    chain_id: Option<u64>,
    /// Address of the verifying contract bound into signatures
    #[arg(long = "contract")]
    verifying_contract: Option<Address>,
    /// Path to the hex signing key file
    #[arg(long = "key")]
    key_path: Option<PathBuf>,
    /// Path to the ledger state file
    #[arg(long = "state")]
    state_path: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ConfigGetCmd {
    /// Optional config key to read (network|chain_id|verifying_contract|domain_name|domain_version|key_path|state_path). If omitted, prints full config.
    key: Option<String>,
}

#[derive(Debug, Args)]
struct ConfigSetCmd {
    /// Config key to set
    key: String,
    /// Value to set
    value: String,
}

#[derive(Debug, Args)]
struct KeyArgs {
    /// Path to the hex signing key (overrides config; PRIVATE_KEY wins over both)
    #[arg(long = "key", global = true)]
    key_path: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct SignCmd {
    #[command(subcommand)]
    action: SignAction,
    #[command(flatten)]
    key: KeyArgs,
    /// Write the request to a file instead of stdout
    #[arg(short = 'o', long = "output", global = true)]
    output: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum SignAction {
    /// Daily check-in
    Signin {
        #[arg(long)]
        user: Address,
        /// Day: `today`, YYYY-MM-DD or a unix timestamp
        #[arg(long, default_value = "today", value_parser = parse_day)]
        time: u64,
        #[arg(long)]
        point: u128,
    },
    /// Take unclaimed points from a target
    Steal {
        #[arg(long)]
        user: Address,
        #[arg(long)]
        target: Address,
        #[arg(long, default_value = "today", value_parser = parse_day)]
        time: u64,
        #[arg(long)]
        point: u128,
    },
    /// Redeem a reward id
    Reward {
        #[arg(long)]
        user: Address,
        #[arg(long = "reward-id")]
        reward_id: u128,
        #[arg(long)]
        point: u128,
    },
    /// Turntable draw
    Turntable {
        #[arg(long)]
        user: Address,
        #[arg(long, default_value = "today", value_parser = parse_day)]
        time: u64,
        /// Draw index within the day
        #[arg(long)]
        count: u16,
        #[arg(long)]
        point: u128,
    },
}

#[derive(Debug, Args)]
struct RecoverCmd {
    /// Action request JSON file (`-` for stdin)
    request: PathBuf,
}

#[derive(Debug, Args)]
struct LedgerCmd {
    #[command(subcommand)]
    command: LedgerCommand,
    /// Ledger state file (overrides config and MINTFOREST_STATE)
    #[arg(long = "state", global = true)]
    state_path: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum LedgerCommand {
    /// Create a fresh ledger owned by `--owner`
    Init {
        #[arg(long)]
        owner: Address,
        /// Replace an existing ledger
        #[arg(long = "force")]
        force: bool,
    },
    /// Rotate the authorized signer (owner only)
    SetSigner {
        /// Acting address. Defaults to the configured key's address.
        #[arg(long)]
        caller: Option<Address>,
        #[arg(long)]
        signer: Address,
    },
    /// Hand ownership to a new address (owner only)
    TransferOwnership {
        #[arg(long)]
        caller: Option<Address>,
        #[arg(long = "new-owner")]
        new_owner: Address,
    },
    /// Apply a signed action request
    Submit {
        /// Action request JSON file (`-` for stdin)
        request: PathBuf,
    },
    /// Read a stored record
    #[command(subcommand)]
    Query(QueryCommand),
    /// Print owner, signer, record counts and state root
    Status,
    /// Print the event log as JSON lines
    Events,
}

#[derive(Debug, Subcommand)]
enum QueryCommand {
    Signin {
        user: Address,
        #[arg(value_parser = parse_day)]
        time: u64,
    },
    Steal {
        target: Address,
        #[arg(value_parser = parse_day)]
        time: u64,
    },
    Reward {
        user: Address,
        reward_id: u128,
    },
    Turntable {
        user: Address,
        #[arg(value_parser = parse_day)]
        time: u64,
        count: u16,
    },
}

fn parse_day(raw: &str) -> Result<u64, String> {
    let ts = if raw == "today" {
        SystemClock.today()
    } else if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        date_timestamp(date)
    } else {
        raw.parse::<i64>()
            .map_err(|_| format!("expected `today`, YYYY-MM-DD or a unix timestamp, got {raw}"))?
    };
    u64::try_from(ts).map_err(|_| format!("timestamp before 1970: {raw}"))
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Config(cmd) => run_config(cmd),
        Commands::Address(args) => {
            let cfg = load_config_with_overrides(args.key_path, None)?;
            let key = load_signing_key(&cfg)?;
            println!("{}", key_address(&key));
            Ok(())
        }
        Commands::Sign(cmd) => run_sign(cmd),
        Commands::Recover(cmd) => {
            let cfg = load_config_with_overrides(None, None)?;
            let request = read_request_file(&cmd.request)?;
            let signer = request
                .recover(&cfg.domain())
                .with_context(|| format!("recover signer of {} request", request.kind()))?;
            println!("{}", signer);
            Ok(())
        }
        Commands::Ledger(cmd) => run_ledger(cmd),
    }
}

fn run_config(cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Init(cmd) => {
            let mut cfg = ForestConfig::default();
            if let Some(network) = cmd.network.as_deref() {
                cfg.network = network.to_string();
                cfg.chain_id = match (default_network_chain_id(network), cmd.chain_id) {
                    (_, Some(chain_id)) => chain_id,
                    (Some(chain_id), None) => chain_id,
                    (None, None) => {
                        return Err(MintForestError::UnknownNetwork(network.to_string()).into())
                    }
                };
            } else if let Some(chain_id) = cmd.chain_id {
                cfg.chain_id = chain_id;
            }
            if let Some(contract) = cmd.verifying_contract {
                cfg.verifying_contract = contract;
            }
            if let Some(path) = cmd.key_path.as_deref() {
                cfg.key_path = expand_tilde(path);
            }
            if let Some(path) = cmd.state_path.as_deref() {
                cfg.state_path = expand_tilde(path);
            }

            let output_path = cmd
                .output
                .as_deref()
                .map(expand_tilde)
                .unwrap_or_else(default_config_file_path);

            write_config_file(&output_path, &cfg, cmd.force)?;
            println!(
                "Wrote config to {}\nnetwork={}\nchain_id={}\nverifying_contract={}\nkey_path={}\nstate_path={}",
                output_path.display(),
                cfg.network,
                cfg.chain_id,
                cfg.verifying_contract,
                cfg.key_path.display(),
                cfg.state_path.display()
            );
            Ok(())
        }
        ConfigCommand::Get(cmd) => {
            let cfg = mintforest::read_config_file().or_else(|_| {
                let cfg = ForestConfig::default();
                save_default_config(&cfg).ok();
                Ok::<ForestConfig, anyhow::Error>(cfg)
            })?;
            if let Some(key) = cmd.key.as_deref() {
                let value = get_config_value(&cfg, key)?;
                println!("{}", value);
            } else {
                let toml_string = toml::to_string_pretty(&cfg)?;
                println!("{}", toml_string);
            }
            Ok(())
        }
        ConfigCommand::Set(cmd) => {
            let mut cfg = mintforest::read_config_file().unwrap_or_default();
            set_config_value(&mut cfg, &cmd.key, &cmd.value)?;
            save_default_config(&cfg)?;
            println!("updated {}", cmd.key);
            Ok(())
        }
    }
}

fn run_sign(cmd: SignCmd) -> Result<()> {
    let cfg = load_config_with_overrides(cmd.key.key_path, None)?;
    let key = load_signing_key(&cfg)?;
    let domain = cfg.domain();

    let request: ActionRequest = match cmd.action {
        SignAction::Signin { user, time, point } => {
            SignedAction::sign(&domain, &key, user, SigninParams { time, point })?.into()
        }
        SignAction::Steal {
            user,
            target,
            time,
            point,
        } => SignedAction::sign(&domain, &key, user, StealParams { target, time, point })?.into(),
        SignAction::Reward {
            user,
            reward_id,
            point,
        } => SignedAction::sign(&domain, &key, user, RewardParams { reward_id, point })?.into(),
        SignAction::Turntable {
            user,
            time,
            count,
            point,
        } => SignedAction::sign(
            &domain,
            &key,
            user,
            TurntableParams { time, count, point },
        )?
        .into(),
    };
    info!(action = %request.kind(), user = %request.user(), signer = %key_address(&key), "action signed");

    let json = serde_json::to_string_pretty(&request)?;
    match cmd.output {
        Some(path) => {
            let path = expand_tilde(&path);
            std::fs::write(&path, json.as_bytes())
                .with_context(|| format!("write {}", path.display()))?;
            println!("Wrote {} request to {}", request.kind(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn run_ledger(cmd: LedgerCmd) -> Result<()> {
    let cfg = load_config_with_overrides(None, cmd.state_path)?;
    let state_path = cfg.state_path.clone();

    match cmd.command {
        LedgerCommand::Init { owner, force } => {
            let forest = MintForest::initialize(cfg.domain(), owner)?;
            write_state_file(&state_path, &forest, force)?;
            println!(
                "Initialized ledger at {}\nowner={}\nchain_id={}\nverifying_contract={}",
                state_path.display(),
                owner,
                cfg.chain_id,
                cfg.verifying_contract
            );
            Ok(())
        }
        LedgerCommand::SetSigner { caller, signer } => {
            let mut forest = read_state_file(&state_path)?;
            let caller = resolve_caller(&cfg, caller)?;
            forest
                .set_signer(caller, signer)
                .context("set_signer rejected")?;
            save_state_file(&state_path, &forest)?;
            println!("signer={}", signer);
            Ok(())
        }
        LedgerCommand::TransferOwnership { caller, new_owner } => {
            let mut forest = read_state_file(&state_path)?;
            let caller = resolve_caller(&cfg, caller)?;
            forest
                .transfer_ownership(caller, new_owner)
                .context("transfer_ownership rejected")?;
            save_state_file(&state_path, &forest)?;
            println!("owner={}", new_owner);
            Ok(())
        }
        LedgerCommand::Submit { request } => {
            let mut forest = read_state_file(&state_path)?;
            let request = read_request_file(&request)?;
            request
                .apply(&mut forest, &SystemClock)
                .with_context(|| format!("{} rejected", request.kind()))?;
            save_state_file(&state_path, &forest)?;
            if let Some(event) = forest.events().last() {
                println!("{}", serde_json::to_string(event)?);
            }
            Ok(())
        }
        LedgerCommand::Query(query) => {
            let forest = read_state_file(&state_path)?;
            let points = match query {
                QueryCommand::Signin { user, time } => forest.signin_record(user, time),
                QueryCommand::Steal { target, time } => forest.steal_record(target, time),
                QueryCommand::Reward { user, reward_id } => forest.reward_record(user, reward_id),
                QueryCommand::Turntable { user, time, count } => {
                    forest.turntable_record(user, time, count)
                }
            };
            println!("{}", points);
            Ok(())
        }
        LedgerCommand::Status => {
            let forest = read_state_file(&state_path)?;
            let ledger = forest.ledger();
            println!("owner={}", forest.owner());
            println!(
                "signer={}",
                forest
                    .signer()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "<unset>".to_string())
            );
            println!("chain_id={}", forest.domain().chain_id);
            println!("verifying_contract={}", forest.domain().verifying_contract);
            println!(
                "signin_records={} points={}",
                ledger.signins().len(),
                ledger.signins().total_points()
            );
            println!(
                "steal_records={} points={}",
                ledger.steals().len(),
                ledger.steals().total_points()
            );
            println!(
                "reward_records={} points={}",
                ledger.rewards().len(),
                ledger.rewards().total_points()
            );
            println!(
                "turntable_records={} points={}",
                ledger.turntables().len(),
                ledger.turntables().total_points()
            );
            println!("events={}", forest.events().len());
            println!("state_root=0x{}", hex::encode(forest.state_root()));
            Ok(())
        }
        LedgerCommand::Events => {
            let forest = read_state_file(&state_path)?;
            for event in forest.events() {
                println!("{}", serde_json::to_string(event)?);
            }
            Ok(())
        }
    }
}

fn resolve_caller(cfg: &ForestConfig, caller: Option<Address>) -> Result<Address> {
    match caller {
        Some(caller) => Ok(caller),
        None => Ok(key_address(&load_signing_key(cfg)?)),
    }
}
