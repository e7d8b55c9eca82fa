quantity!(KilowattHours, via: f64, suffix: "kWh", precision: 3);

impl KilowattHours {
    /// Clamp negative values to zero.
    pub fn non_negative(self) -> Self {
        self.max(Self::ZERO)
    }
}
