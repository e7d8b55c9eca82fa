use std::{collections::BTreeMap, io};

use serde::Deserialize;

use crate::{
    core::tariff::sale::MarketPrices,
    input::parse_timestamp,
    prelude::*,
    quantity::money::MegawattHourPrice,
};

#[derive(Deserialize)]
struct Row {
    timestamp: String,

    /// €/MWh.
    price: f64,
}

/// Read the reference market prices, keyed by the interval start.
#[instrument(skip_all)]
pub fn read_market_prices<R: io::Read>(reader: R) -> Result<MarketPrices> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut prices = BTreeMap::new();
    for row in reader.deserialize::<Row>() {
        let row = row.context("failed to read a market price")?;
        let timestamp = parse_timestamp(&row.timestamp)?;
        ensure!(row.price.is_finite(), "invalid market price at {timestamp}");
        if prices.insert(timestamp, MegawattHourPrice(row.price)).is_some() {
            bail!("duplicate market price at {timestamp}");
        }
    }
    info!(n_prices = prices.len(), "read the market prices");
    Ok(MarketPrices(prices))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn reads_prices() -> Result {
        let csv = "timestamp,price\n2025-03-01 00:00,85.5\n2025-03-01 01:00:00,-3.0\n";
        let prices = read_market_prices(csv.as_bytes())?;
        assert_eq!(prices.len(), 2);
        let at = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap().and_hms_opt(1, 30, 0).unwrap();
        assert_eq!(prices.price_at(at), Some(MegawattHourPrice(-3.0)));
        Ok(())
    }

    #[test]
    fn rejects_duplicates() {
        let csv = "timestamp,price\n2025-03-01 00:00,85.5\n2025-03-01 00:00,86.0\n";
        assert!(read_market_prices(csv.as_bytes()).is_err());
    }
}
