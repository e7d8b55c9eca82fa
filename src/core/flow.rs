use derive_more::{Add, AddAssign, Sub};
use serde::Serialize;

/// Generic bidirectional energy flow.
#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Add, Sub, AddAssign, Serialize)]
pub struct Flow<T> {
    /// Drawing from the grid or charging the battery.
    pub import: T,

    /// Injecting into the grid or discharging the battery.
    pub export: T,
}
