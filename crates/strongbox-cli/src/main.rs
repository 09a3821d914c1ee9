mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "strongbox")]
#[command(about = "Encrypted snapshot archive")]
#[command(version)]
struct Cli {
    /// Path to the Strongbox config directory (default: ~/.strongbox)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Passphrase for the keyfile (or set STRONGBOX_PASSPHRASE env var).
    /// If not provided, will prompt interactively when needed.
    #[arg(long, global = true, env = "STRONGBOX_PASSPHRASE")]
    passphrase: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Strongbox configuration and keyfile
    Init,

    /// Back up the JSON document in a file
    Backup {
        /// JSON file holding the snapshot
        path: PathBuf,
        /// Free-text label stored with the backup
        #[arg(long)]
        description: Option<String>,
    },

    /// Restore a backup as JSON
    Restore {
        /// Backup ID to restore
        backup_id: String,
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Do not compare the plaintext checksum
        #[arg(long)]
        skip_checksum: bool,
        /// Restore only these top-level fields (repeatable)
        #[arg(long = "field")]
        fields: Vec<String>,
        /// Hex key to decrypt with instead of the configured key
        #[arg(long, env = "STRONGBOX_DECRYPTION_KEY", hide_env_values = true)]
        decryption_key: Option<String>,
    },

    /// List all backups, newest first
    List,

    /// Verify integrity of one backup, or all of them
    Verify {
        /// Backup ID to verify
        backup_id: Option<String>,
        /// Verify every backup
        #[arg(long, conflicts_with = "backup_id")]
        all: bool,
    },

    /// Delete a backup
    Delete {
        backup_id: String,
    },

    /// Delete backups older than the retention period
    Cleanup {
        /// Override the configured retention in days
        #[arg(long)]
        retention_days: Option<u32>,
        /// Only show what would be deleted
        #[arg(long)]
        dry_run: bool,
    },

    /// Show catalogue statistics
    Stats,

    /// Export a backup to the portable format
    Export {
        backup_id: String,
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Import a previously exported backup
    Import {
        path: PathBuf,
    },

    /// Back up a JSON file on a fixed interval until interrupted
    Schedule {
        path: PathBuf,
        /// Minutes between backups (default: archive.auto_backup_interval)
        #[arg(long)]
        interval_minutes: Option<u64>,
    },

    /// Show current configuration
    Config,
}

/// Get passphrase from CLI arg, env var, or interactive prompt.
pub fn get_passphrase(cli_passphrase: &Option<String>) -> anyhow::Result<String> {
    if let Some(p) = cli_passphrase {
        return Ok(p.clone());
    }
    // Interactive prompt
    use std::io::{self, Write};
    eprint!("Enter passphrase: ");
    io::stderr().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("strongbox=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let base_dir = match cli.config_dir {
        Some(ref dir) => dir.clone(),
        None => strongbox_core::config::StrongboxConfig::default_base_dir()?,
    };

    tracing::debug!(base_dir = %base_dir.display(), "using config directory");

    let rt = tokio::runtime::Runtime::new()?;
    let pass = &cli.passphrase;

    match cli.command {
        Commands::Init => commands::init::run(&base_dir, pass),
        Commands::Backup {
            ref path,
            ref description,
        } => rt.block_on(commands::backup::run(
            path,
            description.as_deref(),
            &base_dir,
            pass,
        )),
        Commands::Restore {
            ref backup_id,
            ref out,
            skip_checksum,
            ref fields,
            ref decryption_key,
        } => rt.block_on(commands::restore::run(
            commands::restore::Args {
                backup_id,
                out: out.as_deref(),
                skip_checksum,
                fields,
                decryption_key: decryption_key.as_deref(),
            },
            &base_dir,
            pass,
        )),
        Commands::List => rt.block_on(commands::list::run(&base_dir, pass)),
        Commands::Verify {
            ref backup_id,
            all,
        } => rt.block_on(commands::verify::run(
            backup_id.as_deref(),
            all,
            &base_dir,
            pass,
        )),
        Commands::Delete { ref backup_id } => {
            rt.block_on(commands::delete::run(backup_id, &base_dir, pass))
        }
        Commands::Cleanup {
            retention_days,
            dry_run,
        } => rt.block_on(commands::cleanup::run(
            retention_days,
            dry_run,
            &base_dir,
            pass,
        )),
        Commands::Stats => rt.block_on(commands::stats::run(&base_dir, pass)),
        Commands::Export {
            ref backup_id,
            ref out,
        } => rt.block_on(commands::export::run(
            backup_id,
            out.as_deref(),
            &base_dir,
            pass,
        )),
        Commands::Import { ref path } => {
            rt.block_on(commands::import::run(path, &base_dir, pass))
        }
        Commands::Schedule {
            ref path,
            interval_minutes,
        } => rt.block_on(commands::schedule::run(
            path,
            interval_minutes,
            &base_dir,
            pass,
        )),
        Commands::Config => commands::config::run(&base_dir),
    }
}
