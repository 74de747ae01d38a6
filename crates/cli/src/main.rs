//! Fluffy Bites CLI - Order inspection and catalog checks.
//!
//! # Usage
//!
//! ```bash
//! # List stored orders, newest first
//! fb-cli orders list
//!
//! # Show one order in full
//! fb-cli orders show cs_live_abc123
//!
//! # Validate the catalog file
//! fb-cli catalog validate
//!
//! # Against a non-default data directory
//! fb-cli orders list --data-dir /srv/cafe/data
//! ```
//!
//! # Commands
//!
//! - `orders list` - Summarize stored orders
//! - `orders show` - Print one order as JSON
//! - `catalog validate` - Parse the catalog and report problems

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "fb-cli")]
#[command(author, version, about = "Fluffy Bites CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect stored orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Check the product catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List stored orders, newest first
    List {
        /// Data directory containing the orders/ folder
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// Print one order as JSON
    Show {
        /// Checkout session id of the order
        id: String,

        /// Data directory containing the orders/ folder
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Parse the catalog file and report problems
    Validate {
        /// Path of the catalog file
        #[arg(long, default_value = "data/products.json")]
        file: PathBuf,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli);

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Orders { action } => match action {
            OrdersAction::List { data_dir } => commands::orders::list(&data_dir)?,
            OrdersAction::Show { id, data_dir } => commands::orders::show(&data_dir, &id)?,
        },
        Commands::Catalog { action } => match action {
            CatalogAction::Validate { file } => commands::catalog::validate(&file)?,
        },
    }
    Ok(())
}
