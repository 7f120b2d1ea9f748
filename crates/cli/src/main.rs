//! `tradedoc`: run the sales computation core over a JSON scenario file.

mod commands;
mod scenario;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use tradedoc_core::{OrderId, PackId, PriceListId, TeamId};
use tradedoc_sales::SalesConfig;

use crate::commands::{ComputeOptions, MergeRequest};
use crate::scenario::Scenario;

#[derive(Debug, Parser)]
#[command(name = "tradedoc", version, about = "Compute and merge sales orders")]
struct Cli {
    /// Scenario file: catalog records and orders, as JSON.
    #[arg(long, short, env = "TRADEDOC_SCENARIO")]
    scenario: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Recompute every order of the scenario.
    Compute {
        /// Re-resolve product, price and tax of every line from the catalog first.
        #[arg(long)]
        resolve: bool,
        /// Fill END_OF_PACK subtotals.
        #[arg(long)]
        pack_totals: bool,
        /// Report lines whose discount exceeds their category ceiling.
        #[arg(long)]
        check_discounts: bool,
    },
    /// Expand a catalog pack into one order and print the recomputed order.
    Pack {
        #[arg(long)]
        order: OrderId,
        #[arg(long)]
        pack: PackId,
        #[arg(long, default_value = "1")]
        multiplier: Decimal,
    },
    /// Merge orders into a new one.
    Merge {
        /// Orders to merge (repeatable); defaults to every scenario order.
        #[arg(long = "order")]
        orders: Vec<OrderId>,
        /// Take the contact of this source order.
        #[arg(long, conflicts_with = "clear_contact")]
        contact_from: Option<OrderId>,
        #[arg(long)]
        clear_contact: bool,
        #[arg(long, conflicts_with = "clear_price_list")]
        price_list: Option<PriceListId>,
        #[arg(long)]
        clear_price_list: bool,
        #[arg(long, conflicts_with = "clear_team")]
        team: Option<TeamId>,
        #[arg(long)]
        clear_team: bool,
        /// Creation date of the merged order (defaults to today).
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

fn main() -> anyhow::Result<()> {
    tradedoc_observability::init();

    let cli = Cli::parse();
    let config = SalesConfig::from_env();
    let scenario = Scenario::load(&cli.scenario)?;

    let output = match cli.command {
        Command::Compute {
            resolve,
            pack_totals,
            check_discounts,
        } => commands::compute(
            scenario,
            &config,
            ComputeOptions {
                resolve,
                pack_totals,
                check_discounts,
            },
        )?,
        Command::Pack {
            order,
            pack,
            multiplier,
        } => commands::add_pack(scenario, &config, order, pack, multiplier)?,
        Command::Merge {
            orders,
            contact_from,
            clear_contact,
            price_list,
            clear_price_list,
            team,
            clear_team,
            date,
        } => {
            let request = MergeRequest {
                orders,
                contact_from,
                clear_contact,
                price_list,
                clear_price_list,
                team,
                clear_team,
                date: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
            };
            commands::merge(scenario, &config, &request)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
