use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use vellum_core::EntityKind;

#[derive(Parser, Debug)]
#[command(
    name = "vellum-inspect",
    version,
    about = "Read-only inspector for vellum tables: key layout, versions and listings"
)]
pub struct Cli {
    /// Config file (.toml, .json or .yaml). Falls back to VELLUM_* environment variables.
    #[arg(long, short, global = true, env = "VELLUM_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the physical keys of every stored version of an entity
    Keys(EntityArgs),
    /// Print the current record, or one archived version
    Get(GetArgs),
    /// Summarize an entity's version family
    History(EntityArgs),
    /// List current records of a kind
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct EntityArgs {
    /// Entity kind, e.g. user or financial_disclosure
    #[arg(value_parser = parse_kind)]
    pub kind: EntityKind,
    /// Entity id
    pub id: String,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(flatten)]
    pub entity: EntityArgs,
    /// Archived version number (1 is the oldest); omit for the current record
    #[arg(long)]
    pub version: Option<u32>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(value_parser = parse_kind)]
    pub kind: EntityKind,
    /// Maximum records to print (defaults to the configured page size)
    #[arg(long)]
    pub limit: Option<usize>,
    /// Resume from a token printed by an earlier listing
    #[arg(long)]
    pub page_token: Option<String>,
}

fn parse_kind(s: &str) -> Result<EntityKind, String> {
    s.parse().map_err(|_| {
        format!(
            "unknown entity kind '{}' (expected one of: {})",
            s,
            EntityKind::all_names().join(", ")
        )
    })
}
