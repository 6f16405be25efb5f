//! Levelized cost of energy derived from suitability scores.
//!
//! Both models are fixed linear fits in USD/kWh. They are evaluated only
//! when the underlying score is present; a missing score yields a missing
//! cost, never an error.

use serde::{Deserialize, Serialize};

/// Solar LCOE intercept.
const SOLAR_BASE: f64 = 0.15;
/// Solar LCOE reduction per score point.
const SOLAR_SLOPE: f64 = 0.005;
/// Wind LCOE intercept.
const WIND_BASE: f64 = 0.12;
/// Wind LCOE reduction per score point.
const WIND_SLOPE: f64 = 0.004;

/// Derived cost estimates attached to sampled or aggregated scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Lcoe {
    /// Solar LCOE, present exactly when the solar score is.
    pub lcoe_solar: Option<f64>,
    /// Wind LCOE, present exactly when the wind score is.
    pub lcoe_wind: Option<f64>,
}

impl Lcoe {
    /// Computes both estimates from optional mean scores.
    #[must_use]
    pub fn from_scores(solar_mean_score: Option<f64>, wind_mean_score: Option<f64>) -> Self {
        Self {
            lcoe_solar: solar_mean_score.and_then(solar),
            lcoe_wind: wind_mean_score.and_then(wind),
        }
    }
}

/// `0.15 - 0.005 * score`, rounded to three decimals.
///
/// Returns `None` for a non-finite score.
#[must_use]
pub fn solar(score: f64) -> Option<f64> {
    linear(SOLAR_BASE, SOLAR_SLOPE, score)
}

/// `0.12 - 0.004 * score`, rounded to three decimals.
///
/// Returns `None` for a non-finite score.
#[must_use]
pub fn wind(score: f64) -> Option<f64> {
    linear(WIND_BASE, WIND_SLOPE, score)
}

fn linear(base: f64, slope: f64, score: f64) -> Option<f64> {
    score
        .is_finite()
        .then(|| round3(slope.mul_add(-score, base)))
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solar_follows_linear_model() {
        assert_eq!(solar(10.0), Some(0.1));
        assert_eq!(solar(4.0), Some(0.13));
    }

    #[test]
    fn wind_follows_linear_model() {
        assert_eq!(wind(10.0), Some(0.08));
        assert_eq!(wind(2.5), Some(0.11));
    }

    #[test]
    fn zero_score_is_present() {
        let lcoe = Lcoe::from_scores(Some(0.0), Some(0.0));
        assert_eq!(lcoe.lcoe_solar, Some(0.15));
        assert_eq!(lcoe.lcoe_wind, Some(0.12));
    }

    #[test]
    fn missing_score_yields_missing_cost() {
        let lcoe = Lcoe::from_scores(None, Some(5.0));
        assert_eq!(lcoe.lcoe_solar, None);
        assert_eq!(lcoe.lcoe_wind, Some(0.1));
    }

    #[test]
    fn non_finite_score_yields_missing_cost() {
        assert_eq!(solar(f64::NAN), None);
        assert_eq!(wind(f64::INFINITY), None);
    }

    #[test]
    fn rounds_to_three_decimals() {
        let value = solar(7.77).unwrap();
        assert!((value - 0.111).abs() < 1e-12);
    }
}
