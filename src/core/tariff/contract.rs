use serde::Serialize;

use crate::{
    core::{period::TimeOfUse, tariff::constants::AccessTier},
    quantity::power::KiloVoltAmperes,
};

/// Highest contracted power at which the single and bi-period options are offered.
pub const MAX_LOW_VOLTAGE_OPTIONS_POWER: KiloVoltAmperes = KiloVoltAmperes(20.7);

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    #[error("contracted power must be positive, got {0}")]
    NonPositivePower(KiloVoltAmperes),

    #[error("the {option:?} option is not available at {power}")]
    UnsupportedTimeOfUse { option: TimeOfUse, power: KiloVoltAmperes },
}

/// Supply contract parameters for one billing period.
#[must_use]
#[derive(Copy, Clone, Debug, Serialize)]
pub struct Contract {
    pub power: KiloVoltAmperes,
    pub time_of_use: TimeOfUse,
    pub days: u32,
    pub social_tariff: bool,
    pub large_family: bool,
}

impl Contract {
    /// Validate the option against the power and pick the access price set.
    pub fn access_tier(&self) -> Result<AccessTier, ContractError> {
        if !(self.power > KiloVoltAmperes::ZERO) || !self.power.0.is_finite() {
            return Err(ContractError::NonPositivePower(self.power));
        }
        let is_high_power = self.power > MAX_LOW_VOLTAGE_OPTIONS_POWER;
        match self.time_of_use {
            TimeOfUse::Simple if !is_high_power => Ok(AccessTier::Simple),
            TimeOfUse::BiDaily | TimeOfUse::BiWeekly if !is_high_power => Ok(AccessTier::Bi),
            TimeOfUse::TriDaily | TimeOfUse::TriWeekly if is_high_power => Ok(AccessTier::TriHigh),
            TimeOfUse::TriDaily | TimeOfUse::TriWeekly => Ok(AccessTier::Tri),
            option => Err(ContractError::UnsupportedTimeOfUse { option, power: self.power }),
        }
    }

    /// Whether the period is a full billing month, to which monthly amounts apply in full.
    pub const fn is_billing_month(&self) -> bool {
        matches!(self.days, 28..=31)
    }

    /// Pro-rate a monthly amount to the period using 30-day months, unless it is a billing month.
    pub fn pro_rate_monthly(&self, monthly: f64) -> f64 {
        if self.is_billing_month() { monthly } else { monthly / 30.0 * f64::from(self.days) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(power: f64, time_of_use: TimeOfUse) -> Contract {
        Contract {
            power: KiloVoltAmperes(power),
            time_of_use,
            days: 30,
            social_tariff: false,
            large_family: false,
        }
    }

    #[test]
    fn access_tiers() {
        assert_eq!(contract(6.9, TimeOfUse::Simple).access_tier(), Ok(AccessTier::Simple));
        assert_eq!(contract(20.7, TimeOfUse::BiWeekly).access_tier(), Ok(AccessTier::Bi));
        assert_eq!(contract(10.35, TimeOfUse::TriDaily).access_tier(), Ok(AccessTier::Tri));
        assert_eq!(contract(27.6, TimeOfUse::TriWeekly).access_tier(), Ok(AccessTier::TriHigh));
    }

    #[test]
    fn unsupported_options() {
        assert_eq!(
            contract(27.6, TimeOfUse::Simple).access_tier(),
            Err(ContractError::UnsupportedTimeOfUse {
                option: TimeOfUse::Simple,
                power: KiloVoltAmperes(27.6),
            }),
        );
        assert_eq!(
            contract(0.0, TimeOfUse::Simple).access_tier(),
            Err(ContractError::NonPositivePower(KiloVoltAmperes(0.0))),
        );
    }

    #[test]
    fn pro_rating() {
        let mut contract = contract(6.9, TimeOfUse::Simple);
        assert!((contract.pro_rate_monthly(3.0) - 3.0).abs() < 1e-12);
        contract.days = 15;
        assert!((contract.pro_rate_monthly(3.0) - 1.5).abs() < 1e-12);
    }
}
