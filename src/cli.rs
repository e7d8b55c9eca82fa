mod bask;
mod battery;
mod burrow;
mod contract;
mod forage;
mod household;
mod projection;
mod pv;
mod scenario;

use clap::{Parser, Subcommand};

use crate::cli::{bask::BaskArgs, burrow::BurrowArgs, forage::ForageArgs};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: simulate one installation and settle it against the tariff.
    #[clap(name = "bask")]
    Bask(Box<BaskArgs>),

    /// Sweep the installation sizes and rank them by the payback.
    #[clap(name = "forage")]
    Forage(Box<ForageArgs>),

    /// Development tools.
    #[clap(name = "burrow")]
    Burrow(Box<BurrowArgs>),
}
