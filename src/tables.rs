use chrono::{Month, NaiveDateTime, NaiveTime};
use clap::ValueEnum;
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    core::{
        period::TimeOfUse,
        production::{ProfileSource, ResolvedProfile},
        projection::Projection,
        scenario::{Baseline, EnergyTotals, Savings},
        sweep::Candidate,
        tariff::{CostBreakdown, constants::Constants},
    },
    quantity::{energy::KilowattHours, money::Euros, power::Kilowatts, ratios::Percentage},
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

fn right(content: impl ToString) -> Cell {
    Cell::new(content).set_alignment(CellAlignment::Right)
}

fn money(amount: Euros) -> Cell {
    right(amount).fg(if amount < Euros::ZERO { Color::Red } else { Color::Reset })
}

/// Saving or gain, green when positive.
fn gain(amount: Euros) -> Cell {
    right(amount).fg(if amount > Euros::ZERO {
        Color::Green
    } else if amount < Euros::ZERO {
        Color::Red
    } else {
        Color::Reset
    })
}

pub fn build_totals_table(totals: &EnergyTotals) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "Consumption",
        "Production",
        "Self-consumed",
        "Grid draw",
        "Injected",
        "Charged",
        "Delivered",
        "Self-sufficiency",
    ]);
    table.add_row(vec![
        right(totals.consumption),
        right(totals.production).fg(Color::Yellow),
        right(totals.self_consumed).fg(Color::Green),
        right(totals.grid.import).fg(Color::Red),
        right(totals.grid.export),
        right(totals.battery.import).add_attribute(Attribute::Dim),
        right(totals.battery.export).add_attribute(Attribute::Dim),
        right(totals.self_sufficiency),
    ]);
    table
}

pub fn build_breakdown_table(as_is: &CostBreakdown, simulated: &CostBreakdown) -> Table {
    let mut table = new_table();
    table.set_header(vec!["", "As is", "Simulated"]);
    let rows: [(&str, fn(&CostBreakdown) -> Cell); 11] = [
        ("Grid draw", |breakdown| right(breakdown.grid_draw())),
        ("Energy", |breakdown| money(breakdown.energy.gross())),
        ("Power", |breakdown| money(breakdown.power.gross())),
        ("Levies", |breakdown| money(breakdown.levies.total().gross())),
        ("Adjustments", |breakdown| money(breakdown.adjustments.total())),
        ("VAT", |breakdown| right(breakdown.vat().vat()).add_attribute(Attribute::Dim)),
        ("Purchase", |breakdown| money(breakdown.purchase).add_attribute(Attribute::Bold)),
        ("Average price", |breakdown| right(breakdown.average_purchase_price())),
        ("Injected", |breakdown| right(breakdown.sale.injected)),
        ("Sale revenue", |breakdown| gain(breakdown.sale.revenue)),
        ("Net balance", |breakdown| money(breakdown.net_balance).add_attribute(Attribute::Bold)),
    ];
    for (title, cell) in rows {
        table.add_row(vec![Cell::new(title), cell(as_is), cell(simulated)]);
    }
    table
}

/// Billed periods of the breakdown with their final unit prices.
pub fn build_periods_table(breakdown: &CostBreakdown) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Period", "", "Grid draw", "Unit price"]);
    for (period, cost) in &breakdown.energy_by_period {
        table.add_row(vec![
            Cell::new(period),
            Cell::new(period.code()).add_attribute(Attribute::Dim),
            right(cost.energy),
            right(cost.unit_price),
        ]);
    }
    table
}

pub fn build_savings_table(savings: &Savings, baseline: Option<&Baseline>) -> Table {
    let mut table = new_table();
    table.set_header(vec!["", "Saving"]);
    table.add_row(vec![Cell::new("Analysed period"), gain(savings.period)]);
    table.add_row(vec![Cell::new("Per year"), gain(savings.annual).add_attribute(Attribute::Bold)]);
    table.add_row(vec![Cell::new("Purchase per year"), gain(savings.self_consumption_annual)]);
    table.add_row(vec![Cell::new("Sale per year"), gain(savings.sale_annual)]);
    if let Some(baseline) = baseline {
        table.add_row(vec![
            Cell::new("Existing installation").add_attribute(Attribute::Dim),
            gain(baseline.savings),
        ]);
        table.add_row(vec![
            Cell::new(format!("Existing self-consumption, {}", baseline.self_consumption))
                .add_attribute(Attribute::Dim),
            gain(baseline.self_consumption_value),
        ]);
    }
    table
}

pub fn build_projection_table(projection: &Projection, install_cost: Euros) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Year", "Saving", "Cumulative", "Net"]);
    for flow in &projection.flows {
        let net = flow.cumulative - install_cost;
        table.add_row(vec![
            right(flow.year).add_attribute(Attribute::Dim),
            right(flow.saving),
            right(flow.cumulative),
            gain(net),
        ]);
    }
    table.add_row(vec![
        Cell::new("Payback").add_attribute(Attribute::Bold),
        right(projection.payback).add_attribute(Attribute::Bold),
        right(projection.total_saving),
        right(projection.roi),
    ]);
    table
}

pub fn build_candidates_table(candidates: &[Candidate]) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "PV", "Battery", "Cost", "Production", "Self-sufficiency", "Saving/year", "Payback", "ROI",
    ]);
    for candidate in candidates {
        table.add_row(vec![
            right(candidate.peak_power),
            right(candidate.battery_capacity),
            right(candidate.install_cost).add_attribute(Attribute::Dim),
            right(candidate.totals.production),
            right(candidate.totals.self_sufficiency),
            gain(candidate.savings.annual),
            right(candidate.projection.payback).fg(match candidate.projection.payback.years() {
                Some(years) if years <= 8.0 => Color::Green,
                Some(_) => Color::DarkYellow,
                None => Color::Red,
            }),
            right(candidate.projection.roi),
        ]);
    }
    table
}

/// Monthly production of the profile at the installation size.
pub fn build_profile_table(
    profile: &ResolvedProfile,
    peak_power: Kilowatts,
    shading: Percentage,
) -> Table {
    let scale = peak_power.0.max(0.0) * shading.complement().max(0.0);
    let slot = profile.profile.cadence();
    let mut table = new_table();
    table.set_header(vec!["Month", "Production", "Best slot", "Share"]);
    for (month, total) in profile.profile.monthly_totals() {
        let average_day = profile.profile.average_day(month);
        let day_total: f64 = average_day.iter().sum();
        let best = average_day
            .iter()
            .enumerate()
            .max_by(|(_, lhs), (_, rhs)| lhs.total_cmp(rhs))
            .filter(|(_, energy)| **energy > 0.0);
        let (best_slot, share) = match best {
            Some((index, energy)) => {
                let start = NaiveTime::MIN + slot * i32::try_from(index).unwrap_or_default();
                (start.format("%H:%M").to_string(), Percentage(energy / day_total * 100.0))
            }
            None => ("-".to_owned(), Percentage::ZERO),
        };
        table.add_row(vec![
            Cell::new(
                u8::try_from(month)
                    .ok()
                    .and_then(|month| Month::try_from(month).ok())
                    .map_or("?", |month| month.name()),
            ),
            right(KilowattHours(total * scale)),
            right(best_slot).add_attribute(Attribute::Dim),
            right(share).add_attribute(Attribute::Dim),
        ]);
    }
    table
}

/// Where the production figures come from, and the warnings met along the way.
pub fn build_notes_table<'a>(
    source: ProfileSource,
    production_warning: Option<&'a str>,
    warnings: impl IntoIterator<Item = &'a str>,
) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Note", ""]);
    table.add_row(vec![
        Cell::new("Production data"),
        match source {
            ProfileSource::Service => Cell::new("live service").fg(Color::Green),
            ProfileSource::Fallback => Cell::new("regional fallback").fg(Color::DarkYellow),
        },
    ]);
    for warning in production_warning.into_iter().chain(warnings) {
        table.add_row(vec![Cell::new("Warning").fg(Color::DarkYellow), Cell::new(warning)]);
    }
    table
}

/// Period of the interval under every time-of-use option.
pub fn build_calendar_table(timestamp: NaiveDateTime) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Option", "Period", ""]);
    for option in TimeOfUse::value_variants() {
        let period = option.classify(timestamp);
        table.add_row(vec![
            Cell::new(
                option
                    .to_possible_value()
                    .map_or_else(String::new, |value| value.get_name().to_owned()),
            ),
            Cell::new(period),
            Cell::new(period.code()).add_attribute(Attribute::Dim),
        ]);
    }
    table
}

pub fn build_constants_table(constants: &Constants) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Key", "Value"]);
    for (key, value) in constants.iter() {
        table.add_row(vec![Cell::new(key), right(format!("{value:.6}"))]);
    }
    table
}
