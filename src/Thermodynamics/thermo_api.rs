//! # Species thermodynamics API
//!
//! Every species of a mechanism carries one thermodynamic model. The models are gathered in
//! the [`SpeciesThermo`] enum and share the [`SpeciesThermoCalculator`] interface through
//! `enum_dispatch`, so a mixture can hold a plain `Vec<SpeciesThermo>` and still call the
//! models without dynamic dispatch.
//!
//! All quantities are molar and SI-kmol based:
//! - heat capacity `Cp` in J/(kmol·K)
//! - enthalpy `dh` in J/kmol (absolute enthalpy, formation enthalpy included)
//!
//! The enum is (de)serialized with an internal `"model"` tag:
//! ```json
//! {"model": "ConstantCp", "dh_ref": -1.0e8, "Cp": 3.0e4}
//! {"model": "NASA7", "T_ranges": [300.0, 1000.0, 5000.0], "coeffs": [[...], [...]]}
//! ```
use super::ConstCpdata::ConstCpdata;
use super::NASA7data::NASA7data;
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ThermoError {
    #[error("No coefficients found for temperature {temperature} K. Valid range: {range}")]
    NoCoefficientsFound { temperature: f64, range: String },
    #[error("Invalid temperature range in coefficient data: {0}")]
    InvalidTemperatureRange(String),
    #[error("Invalid thermodynamic data: {0}")]
    InvalidData(String),
    #[error("Invalid composition: {0}")]
    InvalidComposition(String),
    #[error("Enthalpy {H} J/kmol is not reachable inside [{T_min}, {T_max}] K")]
    EnthalpyOutOfBounds { H: f64, T_min: f64, T_max: f64 },
    #[error(
        "Temperature from enthalpy did not converge in {iterations} iterations (last T = {T} K, residual = {residual} J/kmol)"
    )]
    NotConverged {
        iterations: usize,
        T: f64,
        residual: f64,
    },
}

#[enum_dispatch]
pub trait SpeciesThermoCalculator {
    /// molar heat capacity, J/(kmol·K)
    fn Cp(&self, T: f64) -> Result<f64, ThermoError>;
    /// molar enthalpy, J/kmol
    fn dh(&self, T: f64) -> Result<f64, ThermoError>;
    /// temperature interval where the model is valid
    fn T_range(&self) -> (f64, f64);
    fn validate(&self) -> Result<(), ThermoError>;
}

#[enum_dispatch(SpeciesThermoCalculator)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model")]
pub enum SpeciesThermo {
    ConstantCp(ConstCpdata),
    NASA7(NASA7data),
}

impl SpeciesThermo {
    pub fn model_name(&self) -> &'static str {
        match self {
            SpeciesThermo::ConstantCp(_) => "ConstantCp",
            SpeciesThermo::NASA7(_) => "NASA7",
        }
    }
}
