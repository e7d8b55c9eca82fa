pub mod balance;
pub mod battery;
pub mod flow;
pub mod period;
pub mod production;
pub mod projection;
pub mod record;
pub mod scenario;
pub mod series;
pub mod sweep;
pub mod tariff;
