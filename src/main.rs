#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod api;
mod cli;
mod core;
mod input;
mod prelude;
mod quantity;
mod tables;

use clap::{Parser, crate_version};

use crate::{
    cli::{Args, Command},
    prelude::*,
};

fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().with_writer(std::io::stderr).init();
    info!(version = crate_version!(), "starting…");

    let args = Args::parse();

    match args.command {
        Command::Bask(args) => args.run()?,
        Command::Forage(args) => args.run()?,
        Command::Burrow(args) => args.run()?,
    }

    info!("done!");
    Ok(())
}
