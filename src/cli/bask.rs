use clap::Parser;
use serde::Serialize;

use crate::{
    cli::scenario::ScenarioArgs,
    core::{
        production::{ProductionRequest, ProfileSource},
        projection::Projection,
        scenario::{Evaluation, evaluate},
    },
    prelude::*,
    quantity::{energy::KilowattHours, money::Euros, power::Kilowatts},
    tables::{
        build_breakdown_table,
        build_notes_table,
        build_periods_table,
        build_projection_table,
        build_savings_table,
        build_totals_table,
    },
};

#[derive(Parser)]
pub struct BaskArgs {
    #[clap(flatten)]
    scenario: ScenarioArgs,

    /// Installed PV power.
    #[clap(long = "peak-power", env = "PEAK_POWER", default_value = "3")]
    peak_power: Kilowatts,

    /// Nominal battery capacity, zero for no battery.
    #[clap(long = "battery-capacity", env = "BATTERY_CAPACITY", default_value = "0")]
    battery_capacity: KilowattHours,
}

#[derive(Serialize)]
struct Report<'a> {
    peak_power: Kilowatts,
    battery_capacity: KilowattHours,
    production_source: ProfileSource,

    #[serde(skip_serializing_if = "Option::is_none")]
    production_warning: Option<&'a str>,

    install_cost: Euros,
    evaluation: &'a Evaluation,
    projection: &'a Projection,
}

impl BaskArgs {
    #[instrument(skip_all, fields(peak_power = %self.peak_power, battery_capacity = %self.battery_capacity))]
    pub fn run(self) -> Result {
        let loaded = self.scenario.load()?;

        let mut generator = self.scenario.pv.service.generator()?;
        let request = ProductionRequest {
            geometry: self.scenario.pv.geometry(),
            peak_power: self.peak_power,
            shading: self.scenario.pv.shading,
        };
        let production = generator.generate(&request, &loaded.household.consumption);
        self.scenario.pv.service.save(&generator);

        let battery = self.scenario.battery.template().with_capacity(self.battery_capacity)?;
        let evaluation =
            evaluate(&loaded.household, &loaded.settlement(), &production.series, battery.as_ref())?;
        let install_cost =
            self.scenario.projection.costs().total(self.peak_power, self.battery_capacity);
        let projection = evaluation.project(install_cost, &self.scenario.projection.terms())?;
        info!(payback = %projection.payback, annual_saving = %evaluation.savings.annual, "evaluated");

        if self.scenario.json {
            let report = Report {
                peak_power: self.peak_power,
                battery_capacity: self.battery_capacity,
                production_source: production.source,
                production_warning: production.warning.as_deref(),
                install_cost,
                evaluation: &evaluation,
                projection: &projection,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("{}", build_totals_table(&evaluation.totals));
            println!("{}", build_breakdown_table(&evaluation.as_is, &evaluation.simulated));
            println!("{}", build_periods_table(&evaluation.simulated));
            println!("{}", build_savings_table(&evaluation.savings, evaluation.baseline.as_ref()));
            println!("{}", build_projection_table(&projection, install_cost));
            println!(
                "{}",
                build_notes_table(production.source, production.warning.as_deref(), evaluation.warnings()),
            );
        }
        Ok(())
    }
}
