#![forbid(unsafe_code)]
//! Command-line access to the configured report ledger.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

use reportchain::blockchain::validate_chain;
use reportchain::config::{load_config, load_config_from, Config};
use reportchain::node::{init_tracing, Node};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a config.toml (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a report and seal it into a new block
    Push {
        #[arg(long)]
        sender: String,
        /// The report payload
        report: String,
    },
    /// Seal an empty block
    Mine,
    /// Print every block in the chain
    Chain,
    /// List the transaction IDs a sender has on chain
    History { sender: String },
    /// Show the report stored under a transaction ID
    Report { transaction_id: String },
    /// Check hash linkage and proofs across the whole chain
    Validate,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing("warn");

    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    // validate straight from storage; Node::init would refuse a broken chain
    if let Commands::Validate = cli.command {
        return validate_store(&config);
    }

    let node = Node::init(config)?;

    match cli.command {
        Commands::Push { sender, report } => {
            let (transaction_id, block) = node.push_report(sender, report)?;
            println!("{}", "Report recorded".bright_green());
            println!("  transactionID: {}", transaction_id.bright_yellow());
            println!("  block:         #{} (proof {})", block.index, block.proof);
        }
        Commands::Mine => {
            let block = node.mine()?;
            println!(
                "{} #{} proof={} previous_hash={}",
                "Sealed block".bright_green(),
                block.index,
                block.proof,
                block.previous_hash
            );
        }
        Commands::Chain => {
            for block in node.ledger.blocks() {
                println!(
                    "{} #{}  proof={}  previous_hash={}  timestamp={}",
                    "■".bright_cyan(),
                    block.index,
                    block.proof,
                    block.previous_hash,
                    block.timestamp
                );
                for tx in &block.transactions {
                    println!(
                        "    {} {} from {}",
                        "•".bright_yellow(),
                        tx.transaction_id,
                        tx.sender.bright_green()
                    );
                }
            }
            println!("{} blocks", node.ledger.len());
        }
        Commands::History { sender } => {
            let ids = node.ledger.transactions_by_sender(&sender);
            if ids.is_empty() {
                println!("{}", format!("No transactions from {}", sender).yellow());
            }
            for id in ids {
                println!("{}", id);
            }
        }
        Commands::Report { transaction_id } => {
            match node.ledger.find_transaction(&transaction_id) {
                Some((index, tx)) => {
                    println!("{} (block #{}, sender {})", "Report".bright_cyan(), index, tx.sender);
                    println!("{}", tx.report);
                }
                None => {
                    eprintln!("{}", "Report not found".red());
                    std::process::exit(1);
                }
            }
        }
        Commands::Validate => validate_store(&node.config)?,
    }

    Ok(())
}

fn validate_store(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let Some(blocks) = config.storage.open()?.load_chain()? else {
        println!("{}", "No chain stored yet".yellow());
        return Ok(());
    };
    match validate_chain(&blocks) {
        Ok(()) => {
            println!("{} ({} blocks)", "Chain is valid".bright_green(), blocks.len());
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "Chain is invalid:".red().bold(), e);
            std::process::exit(1);
        }
    }
}
