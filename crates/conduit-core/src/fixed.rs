use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// An amount of energy held in a node pool, assigned to an edge, or carried
/// by a packet.
pub type Energy = Fixed64;

/// Simulation time in seconds. Supplied by the caller as each tick's delta.
pub type Seconds = Fixed64;

/// Ticks count executed simulation steps.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Checked multiplication for Fixed64 that returns None on overflow.
#[inline]
pub fn checked_mul_64(a: Fixed64, b: Fixed64) -> Option<Fixed64> {
    a.checked_mul(b)
}

/// Checked division for Fixed64 that returns None on zero divisor.
#[inline]
pub fn checked_div_64(a: Fixed64, b: Fixed64) -> Option<Fixed64> {
    a.checked_div(b)
}

/// Serde adapter that reads and writes Fixed64 values as plain decimal
/// numbers, so data files can say `attack_interval: 1.5`.
pub mod as_f64 {
    use super::Fixed64;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Fixed64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(v.to_num::<f64>())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Fixed64, D::Error> {
        let raw = f64::deserialize(d)?;
        Fixed64::checked_from_num(raw)
            .ok_or_else(|| serde::de::Error::custom(format!("{raw} is out of fixed-point range")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed64_basic_arithmetic() {
        let a = f64_to_fixed64(1.5);
        let b = f64_to_fixed64(2.0);
        assert_eq!(fixed64_to_f64(a + b), 3.5);
    }

    #[test]
    fn fixed64_checked_mul_overflow() {
        let big = Fixed64::MAX;
        let two = f64_to_fixed64(2.0);
        assert!(checked_mul_64(big, two).is_none());
    }

    #[test]
    fn fixed64_checked_div_by_zero() {
        let a = f64_to_fixed64(1.0);
        assert!(checked_div_64(a, Fixed64::ZERO).is_none());
    }

    #[test]
    fn fixed64_determinism() {
        let a = f64_to_fixed64(1.0 / 3.0);
        let b = f64_to_fixed64(1.0 / 3.0);
        assert_eq!(a, b);
        assert_eq!(a * f64_to_fixed64(3.0), b * f64_to_fixed64(3.0));
    }

    #[test]
    fn integer_energy_is_exact() {
        let forty = Energy::from_num(40);
        let thirty = Energy::from_num(30);
        assert_eq!(forty - thirty, Energy::from_num(10));
        assert_eq!(forty * Fixed64::from_num(0.75), thirty);
    }

    #[cfg(feature = "json")]
    #[test]
    fn as_f64_round_trips_through_json() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "as_f64")]
            value: Fixed64,
        }

        let parsed: Wrapper = serde_json::from_str(r#"{"value": 1.5}"#).unwrap();
        assert_eq!(parsed.value, f64_to_fixed64(1.5));
        let text = serde_json::to_string(&parsed).unwrap();
        assert_eq!(text, r#"{"value":1.5}"#);
    }
}
