//! shelf command-line front-end
//!
//! Non-interactive access to the library stores. Results are printed as
//! JSON on stdout; logs go to stderr (`RUST_LOG=debug` for slot-level
//! detail).

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use shelf::{CatalogItemPatch, Library, LibraryConfig, MemberPatch, NewCatalogItem, NewMember};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "shelf")]
#[command(about = "Catalog, member and lending stores for a small library")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory (overrides the configuration file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a catalog item
    AddItem {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long, default_value = "")]
        creator: String,
        #[arg(long, default_value = "")]
        publisher: String,
        #[arg(long, default_value = "")]
        year: String,
        #[arg(long, default_value_t = 1)]
        copies: u32,
    },

    /// Change fields of a catalog item
    UpdateItem {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        creator: Option<String>,
        #[arg(long)]
        publisher: Option<String>,
        #[arg(long)]
        year: Option<String>,
        #[arg(long)]
        copies: Option<u32>,
    },

    /// Soft-delete a catalog item
    DeleteItem { id: String },

    /// Add a member
    AddMember {
        #[arg(long)]
        name: String,
        /// YYYY-MM-DD
        #[arg(long, default_value = "")]
        birth_date: String,
        #[arg(long)]
        max_loans: Option<u32>,
    },

    /// Change fields of a member
    UpdateMember {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        birth_date: Option<String>,
        #[arg(long)]
        max_loans: Option<u32>,
    },

    /// Soft-delete a member
    DeleteMember { id: String },

    /// List every record of one store, deleted ones included
    List {
        #[arg(value_enum)]
        store: StoreKind,
    },

    /// Lend items to a member
    Lend {
        #[arg(short, long)]
        member: String,
        #[arg(required = true)]
        items: Vec<String>,
    },

    /// Return loans
    Return {
        #[arg(required = true)]
        loans: Vec<String>,
    },

    /// Catalog and lending totals
    Summary,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StoreKind {
    Items,
    Members,
    Loans,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<LibraryConfig> {
    let mut config = match &args.config {
        Some(path) => LibraryConfig::from_file(path)
            .with_context(|| format!("loading configuration from {:?}", path))?,
        None => LibraryConfig::default(),
    };
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let library = Library::open(config).context("opening library")?;

    if let Some(intent) = library.recovered() {
        info!("Completed interrupted operation: {:?}", intent);
    }

    match args.command {
        Command::AddItem {
            title,
            category,
            creator,
            publisher,
            year,
            copies,
        } => print_json(&library.add_item(NewCatalogItem {
            title,
            category,
            creator,
            publisher,
            year,
            copies_available: copies,
        })?),
        Command::UpdateItem {
            id,
            title,
            category,
            creator,
            publisher,
            year,
            copies,
        } => print_json(&library.update_item(
            &id,
            CatalogItemPatch {
                title,
                category,
                creator,
                publisher,
                year,
                copies_available: copies,
            },
        )?),
        Command::DeleteItem { id } => print_json(&library.delete_item(&id)?),
        Command::AddMember {
            name,
            birth_date,
            max_loans,
        } => print_json(&library.add_member(NewMember {
            name,
            birth_date,
            max_loans,
        })?),
        Command::UpdateMember {
            id,
            name,
            birth_date,
            max_loans,
        } => print_json(&library.update_member(
            &id,
            MemberPatch {
                name,
                birth_date,
                max_loans,
            },
        )?),
        Command::DeleteMember { id } => print_json(&library.delete_member(&id)?),
        Command::List { store } => match store {
            StoreKind::Items => print_json(&library.items()?),
            StoreKind::Members => print_json(&library.members()?),
            StoreKind::Loans => print_json(&library.loans()?),
        },
        Command::Lend { member, items } => print_json(&library.lend(&member, &items)?),
        Command::Return { loans } => print_json(&library.return_loans(&loans)?),
        Command::Summary => print_json(&library.summary()?),
    }
}
