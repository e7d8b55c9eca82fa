use std::collections::BTreeSet;

use clap::Parser;
use serde::Serialize;

use crate::{
    cli::scenario::ScenarioArgs,
    core::{
        production::ProfileSource,
        sweep::{Candidate, SweepGrid, sweep},
    },
    prelude::*,
    quantity::{energy::KilowattHours, power::Kilowatts},
    tables::{build_candidates_table, build_notes_table},
};

#[derive(Parser)]
pub struct ForageArgs {
    #[clap(flatten)]
    scenario: ScenarioArgs,

    /// Installed PV powers to try.
    #[clap(
        long = "peak-powers",
        env = "PEAK_POWERS",
        value_delimiter = ',',
        default_value = "1,2,3,4,5,6"
    )]
    peak_powers: Vec<Kilowatts>,

    /// Battery capacities to try, zero for no battery.
    #[clap(
        long = "battery-capacities",
        env = "BATTERY_CAPACITIES",
        value_delimiter = ',',
        default_value = "0,5,10"
    )]
    battery_capacities: Vec<KilowattHours>,

    /// Worker threads, zero for one per CPU.
    #[clap(long = "threads", env = "THREADS", default_value = "0")]
    threads: usize,

    /// Show only this many best candidates.
    #[clap(long = "top", env = "TOP", default_value = "10")]
    top: usize,
}

#[derive(Serialize)]
struct Report<'a> {
    production_source: ProfileSource,

    #[serde(skip_serializing_if = "Option::is_none")]
    production_warning: Option<&'a str>,

    candidates: &'a [Candidate],
}

impl ForageArgs {
    #[instrument(skip_all)]
    pub fn run(self) -> Result {
        ensure!(!self.peak_powers.is_empty(), "at least one peak power is required");
        ensure!(!self.battery_capacities.is_empty(), "at least one battery capacity is required");
        let loaded = self.scenario.load()?;

        let mut generator = self.scenario.pv.service.generator()?;
        let profile =
            generator.resolve(&self.scenario.pv.geometry(), loaded.household.consumption.cadence());
        self.scenario.pv.service.save(&generator);

        let grid = SweepGrid {
            peak_powers: self.peak_powers,
            battery_capacities: self.battery_capacities,
            battery: self.scenario.battery.template(),
            shading: self.scenario.pv.shading,
            costs: self.scenario.projection.costs(),
            terms: self.scenario.projection.terms(),
        };
        let mut candidates =
            sweep(&loaded.household, &loaded.settlement(), &profile, &grid, self.threads)?;
        candidates.truncate(self.top);

        if self.scenario.json {
            let report = Report {
                production_source: profile.source,
                production_warning: profile.warning.as_deref(),
                candidates: &candidates,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            let warnings: BTreeSet<&str> = candidates
                .iter()
                .flat_map(|candidate| candidate.warnings.iter().map(String::as_str))
                .collect();
            println!("{}", build_candidates_table(&candidates));
            println!("{}", build_notes_table(profile.source, profile.warning.as_deref(), warnings));
        }
        Ok(())
    }
}
