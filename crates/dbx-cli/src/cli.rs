use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use dbx_types::Address;

#[derive(Parser)]
#[command(
    name = "dbx",
    about = "Driftbox: reconcile local files with a content-addressed store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Agent configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Add a file or directory to the store
    Upload(UploadArgs),
    /// Reconcile a batch of file descriptors (JSON array)
    Sync(SyncArgs),
    /// Unpin an address, optionally deleting the local copy
    Remove(RemoveArgs),
    /// Write stored content to a local path
    Get(GetArgs),
    /// Bind this account's published name to an address
    Publish(PublishArgs),
    /// Resolve a published name
    Resolve(ResolveArgs),
    /// Anchor a name to an address in the ledger
    Anchor(AnchorArgs),
    /// Show the address a name is anchored to
    Lookup(LookupArgs),
    /// Verify the anchor ledger
    Verify(VerifyArgs),
    /// Connect to a control process and serve its requests
    Connect(ConnectArgs),
}

#[derive(Args)]
pub struct UploadArgs {
    pub path: PathBuf,
    #[arg(short, long)]
    pub recursive: bool,
    #[arg(long)]
    pub publish: bool,
    /// Name to anchor under (implies --publish)
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args)]
pub struct SyncArgs {
    /// Descriptor file; reads stdin when absent or `-`
    pub input: Option<PathBuf>,
    #[arg(long)]
    pub serial: bool,
    #[arg(long, conflicts_with = "serial")]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct RemoveArgs {
    pub path: PathBuf,
    pub address: Address,
    #[arg(long)]
    pub local: bool,
}

#[derive(Args)]
pub struct GetArgs {
    pub address: Address,
    pub path: PathBuf,
}

#[derive(Args)]
pub struct PublishArgs {
    pub address: Address,
}

#[derive(Args)]
pub struct ResolveArgs {
    pub name: String,
}

#[derive(Args)]
pub struct AnchorArgs {
    pub name: String,
    pub address: Address,
}

#[derive(Args)]
pub struct LookupArgs {
    pub name: String,
}

#[derive(Args)]
pub struct VerifyArgs {}

#[derive(Args)]
pub struct ConnectArgs {
    /// Overrides `control_addr` from the configuration
    #[arg(long)]
    pub addr: Option<String>,
    /// Keep the connection open after a failed batch
    #[arg(long)]
    pub no_teardown: bool,
}
