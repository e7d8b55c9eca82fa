quantity!(Percentage, via: f64, suffix: "%", precision: 1);

impl Percentage {
    pub const HUNDRED: Self = Self(100.0);

    /// Convert the percentage into a ratio, so that 100% becomes `1.0`.
    pub const fn to_ratio(self) -> f64 {
        0.01 * self.0
    }

    /// The remaining share, for example, `1 - loss`.
    pub const fn complement(self) -> f64 {
        1.0 - self.to_ratio()
    }
}
