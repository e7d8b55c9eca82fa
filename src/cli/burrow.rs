use chrono::TimeDelta;
use clap::{Parser, Subcommand};

use crate::{
    cli::{contract::ConstantsArgs, pv::PvArgs},
    core::period::is_summer_time,
    input::parse_timestamp,
    prelude::*,
    quantity::power::Kilowatts,
    tables::{build_calendar_table, build_constants_table, build_notes_table, build_profile_table},
};

#[derive(Parser)]
pub struct BurrowArgs {
    #[command(subcommand)]
    command: BurrowCommand,
}

impl BurrowArgs {
    pub fn run(self) -> Result {
        match self.command {
            BurrowCommand::Production(args) => args.run(),
            BurrowCommand::Calendar(args) => args.run(),
            BurrowCommand::Constants(args) => args.run(),
        }
    }
}

#[derive(Subcommand)]
pub enum BurrowCommand {
    /// Print the monthly production profile.
    Production(Box<BurrowProductionArgs>),

    /// Classify the timestamp under every time-of-use option.
    Calendar(BurrowCalendarArgs),

    /// Print the regulatory constants.
    Constants(BurrowConstantsArgs),
}

#[derive(Parser)]
pub struct BurrowProductionArgs {
    #[clap(flatten)]
    pv: PvArgs,

    #[clap(long = "peak-power", env = "PEAK_POWER", default_value = "1")]
    peak_power: Kilowatts,

    #[clap(long = "cadence-minutes", env = "CADENCE_MINUTES", default_value = "60")]
    cadence_minutes: i64,

    /// Print JSON instead of the table.
    #[clap(long = "json", env = "JSON")]
    json: bool,
}

impl BurrowProductionArgs {
    #[instrument(skip_all)]
    fn run(self) -> Result {
        let mut generator = self.pv.service.generator()?;
        let profile =
            generator.resolve(&self.pv.geometry(), TimeDelta::minutes(self.cadence_minutes));
        self.pv.service.save(&generator);
        info!(source = ?profile.source, "resolved the profile");
        if self.json {
            println!("{}", serde_json::to_string_pretty(&profile)?);
        } else {
            println!("{}", build_profile_table(&profile, self.peak_power, self.pv.shading));
            println!("{}", build_notes_table(profile.source, profile.warning.as_deref(), []));
        }
        Ok(())
    }
}

#[derive(Parser)]
pub struct BurrowCalendarArgs {
    /// Interval start, `YYYY-MM-DD HH:MM`.
    at: String,
}

impl BurrowCalendarArgs {
    fn run(self) -> Result {
        let timestamp = parse_timestamp(&self.at)?;
        info!(%timestamp, is_summer_time = is_summer_time(timestamp), "classifying");
        println!("{}", build_calendar_table(timestamp));
        Ok(())
    }
}

#[derive(Parser)]
pub struct BurrowConstantsArgs {
    #[clap(flatten)]
    constants: ConstantsArgs,
}

impl BurrowConstantsArgs {
    fn run(self) -> Result {
        println!("{}", build_constants_table(&self.constants.load()?));
        Ok(())
    }
}
