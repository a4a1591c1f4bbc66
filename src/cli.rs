use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use uuid::Uuid;

use crate::domain::ItemSeed;
use crate::error::{GavelError, Result};

#[derive(Parser)]
#[command(name = "gavel")]
#[command(version = "0.1.0")]
#[command(about = "Live auction engine for league asset sales", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config directory path
    #[arg(short, long, default_value = "config")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the auction engine
    Run {
        /// Seed file with items and team balances
        #[arg(long)]
        seed_file: Option<String>,
    },
    /// Validate a seed file and print the resulting plan
    Seed {
        /// Seed file path
        file: String,
    },
    /// Load and validate configuration, then exit
    CheckConfig,
}

/// Team balance to preload into the in-memory ledger
#[derive(Debug, Clone, Deserialize)]
pub struct TeamSeed {
    pub id: Uuid,
    pub name: String,
    pub balance: Decimal,
}

/// Operator seed file: catalog items plus team balances
#[derive(Debug, Clone, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub teams: Vec<TeamSeed>,
    pub items: Vec<ItemSeed>,
}

impl SeedFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let file: SeedFile = serde_json::from_str(&raw)?;
        file.validate()?;
        Ok(file)
    }

    fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(GavelError::Validation(
                "seed file contains no items".to_string(),
            ));
        }
        for item in &self.items {
            if item.starting_price <= Decimal::ZERO {
                return Err(GavelError::Validation(format!(
                    "item '{}' has a non-positive starting price",
                    item.asset.name
                )));
            }
        }
        for team in &self.teams {
            if team.balance < Decimal::ZERO {
                return Err(GavelError::Validation(format!(
                    "team '{}' has a negative balance",
                    team.name
                )));
            }
        }
        Ok(())
    }
}

/// Print the plan a seed file would produce
pub fn print_seed_plan(file: &SeedFile) {
    println!("Teams ({}):", file.teams.len());
    for team in &file.teams {
        println!("  {}  {}  balance {}", team.id, team.name, team.balance);
    }
    println!("Items ({}), in promotion order:", file.items.len());
    for (i, item) in file.items.iter().enumerate() {
        println!(
            "  {:>3}. {} [{} q{}] starting at {}",
            i + 1,
            item.asset.name,
            item.asset.category,
            item.asset.quality,
            item.starting_price
        );
    }
}
