//! Regulated access prices and social-tariff discounts.

use std::{collections::BTreeMap, fmt, path::Path, str::FromStr};

use ordered_float::OrderedFloat;
use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};

use crate::{core::period::Period, prelude::*, quantity::power::KiloVoltAmperes};

const BUILTIN: &str = include_str!("../../../data/constants.toml");

/// Which set of energy access prices applies to the contract.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessTier {
    Simple,
    Bi,
    Tri,

    /// Tri-period access above 20.7 kVA.
    TriHigh,
}

impl AccessTier {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Bi => "bi",
            Self::Tri => "tri",
            Self::TriHigh => "tri-high",
        }
    }
}

impl FromStr for AccessTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "simple" => Ok(Self::Simple),
            "bi" => Ok(Self::Bi),
            "tri" => Ok(Self::Tri),
            "tri-high" => Ok(Self::TriHigh),
            _ => bail!("unknown access tier: `{s}`"),
        }
    }
}

/// Contracted power tier, keyed by the exact contracted power.
pub type PowerTier = OrderedFloat<f64>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstantKey {
    /// Energy access price, €/kWh.
    EnergyAccess(AccessTier, Period),

    /// Power access price, €/day.
    PowerAccess(PowerTier),

    /// Social-tariff discount on the energy access price, €/kWh.
    SocialEnergyDiscount,

    /// Social-tariff discount on the power access price, €/day.
    SocialPowerDiscount(PowerTier),

    /// Social-tariff financing surcharge, €/kWh.
    Financing,
}

impl ConstantKey {
    pub fn power_access(power: KiloVoltAmperes) -> Self {
        Self::PowerAccess(OrderedFloat(power.0))
    }

    pub fn social_power_discount(power: KiloVoltAmperes) -> Self {
        Self::SocialPowerDiscount(OrderedFloat(power.0))
    }
}

impl fmt::Display for ConstantKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnergyAccess(tier, period) => {
                write!(formatter, "energy-access:{}:{period}", tier.as_str())
            }
            Self::PowerAccess(power) => write!(formatter, "power-access:{power}"),
            Self::SocialEnergyDiscount => write!(formatter, "social-discount:energy"),
            Self::SocialPowerDiscount(power) => write!(formatter, "social-discount:power:{power}"),
            Self::Financing => write!(formatter, "financing"),
        }
    }
}

impl FromStr for ConstantKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        let key = match parts.as_slice() {
            ["energy-access", tier, period] => Self::EnergyAccess(tier.parse()?, period.parse()?),
            ["power-access", power] => Self::PowerAccess(parse_power(power)?),
            ["social-discount", "energy"] => Self::SocialEnergyDiscount,
            ["social-discount", "power", power] => Self::SocialPowerDiscount(parse_power(power)?),
            ["financing"] => Self::Financing,
            _ => bail!("unknown constant key: `{s}`"),
        };
        Ok(key)
    }
}

fn parse_power(power: &str) -> Result<PowerTier> {
    let power: f64 = power.parse().with_context(|| format!("invalid power tier: `{power}`"))?;
    Ok(OrderedFloat(power))
}

/// Typed constant lookup, built once at load time.
#[serde_as]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Constants {
    #[serde_as(as = "BTreeMap<DisplayFromStr, _>")]
    values: BTreeMap<ConstantKey, f64>,
}

impl Constants {
    pub fn builtin() -> Result<Self> {
        toml::from_str(BUILTIN).context("failed to parse the built-in constants")
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()))?;
        let constants: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse `{}`", path.display()))?;
        info!(n_constants = constants.values.len(), "loaded the constants");
        Ok(constants)
    }

    pub fn get(&self, key: ConstantKey) -> Option<f64> {
        self.values.get(&key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConstantKey, f64)> {
        self.values.iter().map(|(key, value)| (*key, *value))
    }

    #[cfg(test)]
    pub fn with(mut self, key: ConstantKey, value: f64) -> Self {
        self.values.insert(key, value);
        self
    }

    #[cfg(test)]
    pub fn without(mut self, key: ConstantKey) -> Self {
        self.values.remove(&key);
        self
    }
}
