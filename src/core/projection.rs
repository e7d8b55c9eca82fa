//! Multi-year cash flows and the payback of an installation.

use std::fmt;

use bon::bon;
use serde::Serialize;

use crate::{
    prelude::*,
    quantity::{money::Euros, ratios::Percentage},
};

#[must_use]
#[derive(Copy, Clone, Debug, Serialize)]
pub struct ProjectionInputs {
    pub install_cost: Euros,

    /// First-year saving on the purchased energy.
    pub self_consumption_saving: Euros,

    /// First-year additional sale revenue.
    pub sale_revenue: Euros,

    pub years: u32,

    /// Annual production degradation.
    pub degradation: Percentage,

    /// Annual purchase price growth.
    pub inflation: Percentage,

    /// Annual sale price change.
    pub sale_price_drift: Percentage,
}

#[bon]
impl ProjectionInputs {
    #[builder]
    pub fn new(
        install_cost: Euros,
        self_consumption_saving: Euros,
        sale_revenue: Euros,
        #[builder(default = 25)] years: u32,
        #[builder(default)] degradation: Percentage,
        #[builder(default)] inflation: Percentage,
        #[builder(default)] sale_price_drift: Percentage,
    ) -> Result<Self> {
        for (name, value) in [
            ("install cost", install_cost.0),
            ("self-consumption saving", self_consumption_saving.0),
            ("sale revenue", sale_revenue.0),
            ("inflation", inflation.0),
            ("sale price drift", sale_price_drift.0),
        ] {
            ensure!(value.is_finite(), "{name} must be finite");
        }
        ensure!(
            degradation >= Percentage::ZERO && degradation <= Percentage::HUNDRED,
            "degradation must be within 0-100%, got {degradation}",
        );
        Ok(Self {
            install_cost,
            self_consumption_saving,
            sale_revenue,
            years,
            degradation,
            inflation,
            sale_price_drift,
        })
    }
}

/// Horizon and the annual rates of a projection.
#[derive(Copy, Clone, Debug, Serialize)]
pub struct ProjectionTerms {
    pub years: u32,
    pub degradation: Percentage,
    pub inflation: Percentage,
    pub sale_price_drift: Percentage,
}

impl ProjectionTerms {
    pub fn inputs(
        &self,
        install_cost: Euros,
        self_consumption_saving: Euros,
        sale_revenue: Euros,
    ) -> Result<ProjectionInputs> {
        ProjectionInputs::builder()
            .install_cost(install_cost)
            .self_consumption_saving(self_consumption_saving)
            .sale_revenue(sale_revenue)
            .years(self.years)
            .degradation(self.degradation)
            .inflation(self.inflation)
            .sale_price_drift(self.sale_price_drift)
            .build()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Payback {
    Years(f64),

    /// Not reached within the horizon.
    Never,
}

impl Payback {
    pub const fn years(self) -> Option<f64> {
        match self {
            Self::Years(years) => Some(years),
            Self::Never => None,
        }
    }

    /// Sorting key, with the unreachable payback last.
    pub fn sort_key(self) -> ordered_float::OrderedFloat<f64> {
        ordered_float::OrderedFloat(self.years().unwrap_or(f64::INFINITY))
    }
}

impl fmt::Display for Payback {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Years(years) => write!(formatter, "{years:.1} years"),
            Self::Never => formatter.write_str("never"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct YearFlow {
    pub year: u32,
    pub saving: Euros,
    pub cumulative: Euros,
}

#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Projection {
    pub payback: Payback,
    pub flows: Vec<YearFlow>,
    pub total_saving: Euros,
    pub roi: Percentage,
}

impl ProjectionInputs {
    /// Saving in the year, counting from 1.
    pub fn saving_in(&self, year: u32) -> Euros {
        let exponent = f64::from(year.saturating_sub(1));
        let production = self.degradation.complement().powf(exponent);
        let purchase_growth = (1.0 + self.inflation.to_ratio()).powf(exponent);
        let sale_growth = (1.0 + self.sale_price_drift.to_ratio()).powf(exponent);
        self.self_consumption_saving * (production * purchase_growth)
            + self.sale_revenue * (production * sale_growth)
    }

    #[instrument(skip_all, fields(install_cost = %self.install_cost, years = self.years))]
    pub fn project(&self) -> Projection {
        let mut cumulative = Euros::ZERO;
        let mut payback = None;
        let flows: Vec<YearFlow> = (1..=self.years)
            .map(|year| {
                let saving = self.saving_in(year);
                if payback.is_none()
                    && saving > Euros::ZERO
                    && cumulative + saving >= self.install_cost
                {
                    let shortfall = (self.install_cost - cumulative).0.max(0.0);
                    payback = Some(f64::from(year - 1) + shortfall / saving.0);
                }
                cumulative += saving;
                YearFlow { year, saving, cumulative }
            })
            .collect();
        let payback = if self.install_cost <= Euros::ZERO {
            Payback::Years(0.0)
        } else {
            payback.map_or(Payback::Never, Payback::Years)
        };
        let first_year = self.saving_in(1);
        let roi = if self.install_cost > Euros::ZERO && first_year > Euros::ZERO {
            Percentage(first_year / self.install_cost * 100.0)
        } else {
            Percentage::ZERO
        };
        debug!(%payback, %roi, total_saving = %cumulative, "projected");
        Projection { payback, flows, total_saving: cumulative, roi }
    }
}
