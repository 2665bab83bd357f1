//! Graphload CLI
//!
//! Command-line front end for:
//! - importing whitespace-delimited triple files (optionally gzip'd) as
//!   vertices and edges,
//! - piping a stream of commands into one deduplicated batch request,
//! - ad hoc queries, commands, documents and server information against an
//!   OrientDB-style REST endpoint.
//!
//! Connection settings come from flags or `ORIENTDB_*` environment
//! variables. Logs go to stderr (`-v`, `-vv`, or `RUST_LOG`); results go to
//! stdout.

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use graphload_client::config::{
    DEFAULT_ADDRESS, DEFAULT_LANGUAGE, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS, DEFAULT_USER,
    ENV_ADDRESS, ENV_DATABASE, ENV_LANGUAGE, ENV_PASSWORD, ENV_PORT, ENV_USER,
};
use graphload_client::{ConnectionConfig, OrientClient};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod batch;
mod import;
mod rest;

#[derive(Parser)]
#[command(name = "graphload")]
#[command(author, version, about = "Graphload: triple files into an OrientDB-style graph")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct ConnectionArgs {
    /// Server scheme and host
    #[arg(long, env = ENV_ADDRESS, default_value = DEFAULT_ADDRESS, global = true)]
    address: String,

    #[arg(long, env = ENV_PORT, default_value_t = DEFAULT_PORT, global = true)]
    port: u16,

    #[arg(short, long, env = ENV_DATABASE, global = true)]
    database: Option<String>,

    #[arg(short, long, env = ENV_USER, default_value = DEFAULT_USER, global = true)]
    user: String,

    #[arg(long, env = ENV_PASSWORD, default_value = "", hide_env_values = true, global = true)]
    password: String,

    /// Send the password base64-encoded
    #[arg(long, global = true)]
    password_base64: bool,

    /// Default query/command language
    #[arg(long, env = ENV_LANGUAGE, default_value = DEFAULT_LANGUAGE, global = true)]
    language: String,

    /// Per-request timeout
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    timeout_secs: u64,
}

impl ConnectionArgs {
    fn config(&self) -> Result<ConnectionConfig> {
        let mut config = ConnectionConfig::new(self.database.as_deref().unwrap_or_default())
            .with_address(&self.address, self.port)
            .with_credentials(&self.user, &self.password);
        config.password_base64 = self.password_base64;
        config.language = self.language.clone();
        config.timeout_secs = self.timeout_secs;
        config.validate()?;
        Ok(config)
    }

    fn connect(&self) -> Result<OrientClient> {
        let config = self.config()?;
        info!(server = %config.server_address(), database = %config.database, user = %config.user, "connecting");
        OrientClient::connect(&config)
            .with_context(|| format!("connecting to {} database `{}`", config.server_address(), config.database))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Import a triple file: schema, vertices, then edges.
    Import(import::ImportArgs),

    /// Read commands from stdin (or a file) and submit the unique ones as
    /// batch requests.
    ///
    /// Reading stops at end of input or at the first blank line.
    Batch {
        /// Read commands from this file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,
        /// Submit a batch every N commands instead of once at the end
        #[arg(long)]
        auto_flush: Option<usize>,
        /// Submit without a transaction
        #[arg(long)]
        no_transaction: bool,
    },

    /// Run a read-only query and print every row (paged by SKIP).
    Query {
        text: String,
        /// Stop after this many rows
        #[arg(long)]
        max: Option<usize>,
    },

    /// Select rows from a class by field equality.
    Select {
        #[arg(long)]
        from: String,
        /// `field=value`, repeatable; all must match
        #[arg(long = "where", value_name = "FIELD=VALUE")]
        conditions: Vec<String>,
        #[arg(long)]
        max: Option<usize>,
    },

    /// Run a mutating command and print the response.
    Command { text: String },

    /// List databases on the server.
    Databases,

    /// Show database information (classes, clusters).
    Info,

    /// Show one class's schema.
    Class { name: String },

    /// Read, create or update documents.
    Document {
        #[command(subcommand)]
        command: rest::DocumentCommands,
    },

    /// Download a database export (`.json.gz` kept compressed, `.json`
    /// inflated).
    Export { out: PathBuf },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Import(args) => {
            let report = import::cmd_import(&cli.connection, &args)?;
            if report.has_failures() {
                std::process::exit(2);
            }
        }
        Commands::Batch {
            input,
            auto_flush,
            no_transaction,
        } => {
            batch::cmd_batch(&cli.connection, input.as_ref(), auto_flush, !no_transaction)?;
        }
        Commands::Query { text, max } => {
            rest::cmd_query(&cli.connection.connect()?, &text, &cli.connection.language, max)?;
        }
        Commands::Select {
            from,
            conditions,
            max,
        } => {
            rest::cmd_select(&cli.connection.connect()?, &from, &conditions, max)?;
        }
        Commands::Command { text } => {
            rest::cmd_command(&cli.connection.connect()?, &text, &cli.connection.language)?;
        }
        Commands::Databases => rest::cmd_databases(&cli.connection.connect()?)?,
        Commands::Info => rest::cmd_info(&cli.connection.connect()?)?,
        Commands::Class { name } => rest::cmd_class(&cli.connection.connect()?, &name)?,
        Commands::Document { command } => {
            rest::cmd_document(&cli.connection.connect()?, command)?;
        }
        Commands::Export { out } => rest::cmd_export(&cli.connection.connect()?, &out)?,
    }
    Ok(())
}

/// Split `key=value`.
fn parse_pair(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected FIELD=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!("empty field name in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}
