use super::thermo_api::{SpeciesThermoCalculator, ThermoError};
use crate::Thermodynamics::R_G;
use serde::{Deserialize, Serialize};

pub fn Cp(t: f64, a: f64, b: f64, c: f64, d: f64, e: f64) -> f64 {
    R_G * (a + b * t + c * t.powi(2) + d * t.powi(3) + e * t.powi(4))
}
pub fn dh(t: f64, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> f64 {
    R_G * t
        * (a + b * t / 2.0
            + c * t.powi(2) / 3.0
            + d * t.powi(3) / 4.0
            + e * t.powi(4) / 5.0
            + f / t)
}

/// CHEMKIN (NASA 7-coefficient) polynomials.
///
/// `T_ranges` holds the breakpoints in ascending order, `coeffs[k]` the seven coefficients
/// valid on `[T_ranges[k], T_ranges[k+1]]`. The usual two-range CHEMKIN record is
/// `T_ranges = [T_low, T_common, T_high]` with `coeffs = [low, high]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NASA7data {
    pub T_ranges: Vec<f64>,
    pub coeffs: Vec<[f64; 7]>,
}

impl NASA7data {
    pub fn new(T_ranges: Vec<f64>, coeffs: Vec<[f64; 7]>) -> Result<Self, ThermoError> {
        let data = Self { T_ranges, coeffs };
        data.validate()?;
        Ok(data)
    }

    /// two-range CHEMKIN record, high-temperature coefficients first as in the THERMO file
    pub fn from_chemkin(
        T_low: f64,
        T_common: f64,
        T_high: f64,
        high: [f64; 7],
        low: [f64; 7],
    ) -> Result<Self, ThermoError> {
        Self::new(vec![T_low, T_common, T_high], vec![low, high])
    }

    fn range_str(&self) -> String {
        self.T_ranges
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" - ")
    }

    /// get the 7 constants valid at temperature t
    pub fn extract_coefficients(&self, t: f64) -> Result<&[f64; 7], ThermoError> {
        let n = self.coeffs.len();
        for k in 0..n {
            let (t1, t2) = (self.T_ranges[k], self.T_ranges[k + 1]);
            let inside = if k == 0 {
                t1 <= t && t <= t2
            } else {
                t1 < t && t <= t2
            };
            if inside {
                return Ok(&self.coeffs[k]);
            }
        }
        Err(ThermoError::NoCoefficientsFound {
            temperature: t,
            range: self.range_str(),
        })
    }
}

impl SpeciesThermoCalculator for NASA7data {
    fn Cp(&self, T: f64) -> Result<f64, ThermoError> {
        let a = self.extract_coefficients(T)?;
        Ok(Cp(T, a[0], a[1], a[2], a[3], a[4]))
    }

    fn dh(&self, T: f64) -> Result<f64, ThermoError> {
        let a = self.extract_coefficients(T)?;
        Ok(dh(T, a[0], a[1], a[2], a[3], a[4], a[5]))
    }

    fn T_range(&self) -> (f64, f64) {
        match (self.T_ranges.first(), self.T_ranges.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => (f64::NAN, f64::NAN),
        }
    }

    fn validate(&self) -> Result<(), ThermoError> {
        if self.coeffs.is_empty() || self.T_ranges.len() != self.coeffs.len() + 1 {
            return Err(ThermoError::InvalidTemperatureRange(format!(
                "{} breakpoints for {} coefficient sets",
                self.T_ranges.len(),
                self.coeffs.len()
            )));
        }
        let ascending = self.T_ranges.windows(2).all(|w| w[0] < w[1]);
        if !ascending || !(self.T_ranges[0] > 0.0) {
            return Err(ThermoError::InvalidTemperatureRange(self.range_str()));
        }
        if self
            .coeffs
            .iter()
            .any(|set| set.iter().any(|a| !a.is_finite()))
        {
            return Err(ThermoError::InvalidData(
                "non-finite NASA7 coefficient".to_string(),
            ));
        }
        Ok(())
    }
}
