use super::thermo_api::{SpeciesThermoCalculator, ThermoError};
use serde::{Deserialize, Serialize};

fn default_T_ref() -> f64 {
    298.15
}
fn default_T_min() -> f64 {
    100.0
}
fn default_T_max() -> f64 {
    10000.0
}

/// Species with temperature-independent heat capacity:
///
/// h(T) = dh_ref + Cp·(T - T_ref)
///
/// The enthalpy is linear in T, so the mixture temperature-from-enthalpy inversion has a
/// closed-form answer. Handy for synthetic mechanisms and for checking the inversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstCpdata {
    /// enthalpy at T_ref, J/kmol
    pub dh_ref: f64,
    /// heat capacity, J/(kmol·K)
    pub Cp: f64,
    #[serde(default = "default_T_ref")]
    pub T_ref: f64,
    #[serde(default = "default_T_min")]
    pub T_min: f64,
    #[serde(default = "default_T_max")]
    pub T_max: f64,
}

impl ConstCpdata {
    pub fn new(dh_ref: f64, Cp: f64) -> Self {
        Self {
            dh_ref,
            Cp,
            T_ref: default_T_ref(),
            T_min: default_T_min(),
            T_max: default_T_max(),
        }
    }
}

impl SpeciesThermoCalculator for ConstCpdata {
    fn Cp(&self, _T: f64) -> Result<f64, ThermoError> {
        Ok(self.Cp)
    }

    fn dh(&self, T: f64) -> Result<f64, ThermoError> {
        Ok(self.dh_ref + self.Cp * (T - self.T_ref))
    }

    fn T_range(&self) -> (f64, f64) {
        (self.T_min, self.T_max)
    }

    fn validate(&self) -> Result<(), ThermoError> {
        if !(self.Cp > 0.0) || !self.Cp.is_finite() {
            return Err(ThermoError::InvalidData(format!(
                "Cp must be positive, got {}",
                self.Cp
            )));
        }
        if !self.dh_ref.is_finite() || !self.T_ref.is_finite() {
            return Err(ThermoError::InvalidData(
                "dh_ref and T_ref must be finite".to_string(),
            ));
        }
        if !(self.T_min > 0.0) || !(self.T_max > self.T_min) {
            return Err(ThermoError::InvalidTemperatureRange(format!(
                "{} - {}",
                self.T_min, self.T_max
            )));
        }
        Ok(())
    }
}
