macro_rules! quantity {
    ($(#[$attribute:meta])* $name:ident, via: f64, suffix: $suffix:literal, precision: $precision:literal) => {
        $(#[$attribute])*
        #[repr(transparent)]
        #[derive(
            ::derive_more::Add,
            ::derive_more::AddAssign,
            ::derive_more::FromStr,
            ::derive_more::Sub,
            ::derive_more::SubAssign,
            ::derive_more::Sum,
            ::serde::Deserialize,
            ::serde::Serialize,
            ::std::clone::Clone,
            ::std::marker::Copy,
            ::std::default::Default,
        )]
        pub struct $name(pub f64);

        impl $name {
            pub const ZERO: Self = Self(0.0);
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(formatter, "{:.*} {}", $precision, self.0, $suffix)
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Debug::fmt(&self.0, formatter)?;
                write!(formatter, "{}", $suffix)
            }
        }

        impl ::std::ops::Neg for $name {
            type Output = Self;

            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl ::std::ops::Mul<f64> for $name {
            type Output = Self;

            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl ::std::ops::Div<f64> for $name {
            type Output = Self;

            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl ::std::ops::Div<Self> for $name {
            type Output = f64;

            fn div(self, rhs: Self) -> Self::Output {
                self.0 / rhs.0
            }
        }

        impl ::std::cmp::PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<::std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl ::std::cmp::Ord for $name {
            fn cmp(&self, other: &Self) -> ::std::cmp::Ordering {
                ::ordered_float::OrderedFloat(self.0).cmp(&::ordered_float::OrderedFloat(other.0))
            }
        }

        impl ::std::cmp::PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                ::ordered_float::OrderedFloat(self.0).eq(&::ordered_float::OrderedFloat(other.0))
            }
        }

        impl ::std::cmp::Eq for $name {}

        #[cfg(test)]
        impl ::approx::AbsDiffEq for $name {
            type Epsilon = f64;

            fn default_epsilon() -> Self::Epsilon {
                <f64 as ::approx::AbsDiffEq>::default_epsilon()
            }

            fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
                ::approx::AbsDiffEq::abs_diff_eq(&self.0, &other.0, epsilon)
            }
        }
    };
}

/// Implement `lhs × rhs = output` in both directions.
macro_rules! implement_mul {
    ($lhs:ty, $rhs:ty, $output:ident) => {
        impl ::std::ops::Mul<$rhs> for $lhs {
            type Output = $output;

            fn mul(self, rhs: $rhs) -> Self::Output {
                $output(self.0 * rhs.0)
            }
        }

        impl ::std::ops::Mul<$lhs> for $rhs {
            type Output = $output;

            fn mul(self, rhs: $lhs) -> Self::Output {
                $output(self.0 * rhs.0)
            }
        }
    };
}
