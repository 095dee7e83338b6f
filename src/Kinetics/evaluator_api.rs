//! # Thermodynamics + kinetics evaluator contract
//!
//! The batch reactor kernel does not evaluate rate laws itself. It drives an evaluator
//! through the interface below, in a fixed order at every right-hand-side or Jacobian
//! evaluation:
//!
//! 1. `molecular_weight_from_mole_fractions(x)`
//! 2. (adiabatic only) `temperature_from_enthalpy_and_mole_fractions(H, P, x, T_guess)`
//! 3. `set_temperature(T)`, `set_pressure(P)`
//! 4. `reaction_rates(c)` then `formation_rates()`, or `derivatives_of_formation_rates(c)`
//!
//! Evaluators keep the current temperature and pressure as mutable internal state, hence
//! every mutating method takes `&mut self`. An evaluator is not meant to be shared between
//! reactors: a reactor either owns it or holds the only `&mut` borrow (see the forwarding
//! impls at the bottom of this file).
//!
//! Units: concentrations kmol/m³, temperature K, pressure Pa, molar enthalpy J/kmol,
//! molecular weight kg/kmol, formation rates kmol/(m³·s).
use crate::Thermodynamics::thermo_api::ThermoError;
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum KineticsError {
    #[error("Thermodynamics error: {0}")]
    Thermo(#[from] ThermoError),
    #[error("Failed to parse reaction equation '{equation}': {reason}")]
    ParseError { equation: String, reason: String },
    #[error("Unknown species '{0}'")]
    UnknownSpecies(String),
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
    #[error("Invalid kinetic parameters: {0}")]
    InvalidParameters(String),
    #[error("Evaluator state is not set: {0}")]
    StateNotSet(String),
    #[error("Non-finite values in {0}")]
    NonFinite(String),
    #[error("Temperature inversion returned an unusable value: {0} K")]
    InvalidTemperature(f64),
}

pub trait ThermoKineticsEvaluator {
    fn number_of_species(&self) -> usize;

    fn set_temperature(&mut self, T: f64);
    fn set_pressure(&mut self, P: f64);
    fn temperature(&self) -> f64;
    fn pressure(&self) -> f64;

    /// kg/kmol
    fn molecular_weight_from_mole_fractions(&self, x: &DVector<f64>) -> f64;

    /// J/kmol
    fn mixture_molar_enthalpy(&self, T: f64, P: f64, x: &DVector<f64>)
    -> Result<f64, KineticsError>;

    /// solves h(T, P, x) = H for T, H in J/kmol
    fn temperature_from_enthalpy_and_mole_fractions(
        &mut self,
        H: f64,
        P: f64,
        x: &DVector<f64>,
        T_guess: f64,
    ) -> Result<f64, KineticsError>;

    /// evaluates the reaction rates at the current T, P; results are kept by the evaluator
    fn reaction_rates(&mut self, c: &DVector<f64>) -> Result<(), KineticsError>;

    /// net formation rates from the last `reaction_rates` call, kmol/(m³·s)
    fn formation_rates(&self) -> DVector<f64>;

    /// ∂Rᵢ/∂cⱼ at the current T, P, 1/s
    fn derivatives_of_formation_rates(
        &mut self,
        c: &DVector<f64>,
    ) -> Result<DMatrix<f64>, KineticsError>;
}

impl<E: ThermoKineticsEvaluator + ?Sized> ThermoKineticsEvaluator for &mut E {
    fn number_of_species(&self) -> usize {
        (**self).number_of_species()
    }
    fn set_temperature(&mut self, T: f64) {
        (**self).set_temperature(T)
    }
    fn set_pressure(&mut self, P: f64) {
        (**self).set_pressure(P)
    }
    fn temperature(&self) -> f64 {
        (**self).temperature()
    }
    fn pressure(&self) -> f64 {
        (**self).pressure()
    }
    fn molecular_weight_from_mole_fractions(&self, x: &DVector<f64>) -> f64 {
        (**self).molecular_weight_from_mole_fractions(x)
    }
    fn mixture_molar_enthalpy(
        &self,
        T: f64,
        P: f64,
        x: &DVector<f64>,
    ) -> Result<f64, KineticsError> {
        (**self).mixture_molar_enthalpy(T, P, x)
    }
    fn temperature_from_enthalpy_and_mole_fractions(
        &mut self,
        H: f64,
        P: f64,
        x: &DVector<f64>,
        T_guess: f64,
    ) -> Result<f64, KineticsError> {
        (**self).temperature_from_enthalpy_and_mole_fractions(H, P, x, T_guess)
    }
    fn reaction_rates(&mut self, c: &DVector<f64>) -> Result<(), KineticsError> {
        (**self).reaction_rates(c)
    }
    fn formation_rates(&self) -> DVector<f64> {
        (**self).formation_rates()
    }
    fn derivatives_of_formation_rates(
        &mut self,
        c: &DVector<f64>,
    ) -> Result<DMatrix<f64>, KineticsError> {
        (**self).derivatives_of_formation_rates(c)
    }
}

impl<E: ThermoKineticsEvaluator + ?Sized> ThermoKineticsEvaluator for Box<E> {
    fn number_of_species(&self) -> usize {
        (**self).number_of_species()
    }
    fn set_temperature(&mut self, T: f64) {
        (**self).set_temperature(T)
    }
    fn set_pressure(&mut self, P: f64) {
        (**self).set_pressure(P)
    }
    fn temperature(&self) -> f64 {
        (**self).temperature()
    }
    fn pressure(&self) -> f64 {
        (**self).pressure()
    }
    fn molecular_weight_from_mole_fractions(&self, x: &DVector<f64>) -> f64 {
        (**self).molecular_weight_from_mole_fractions(x)
    }
    fn mixture_molar_enthalpy(
        &self,
        T: f64,
        P: f64,
        x: &DVector<f64>,
    ) -> Result<f64, KineticsError> {
        (**self).mixture_molar_enthalpy(T, P, x)
    }
    fn temperature_from_enthalpy_and_mole_fractions(
        &mut self,
        H: f64,
        P: f64,
        x: &DVector<f64>,
        T_guess: f64,
    ) -> Result<f64, KineticsError> {
        (**self).temperature_from_enthalpy_and_mole_fractions(H, P, x, T_guess)
    }
    fn reaction_rates(&mut self, c: &DVector<f64>) -> Result<(), KineticsError> {
        (**self).reaction_rates(c)
    }
    fn formation_rates(&self) -> DVector<f64> {
        (**self).formation_rates()
    }
    fn derivatives_of_formation_rates(
        &mut self,
        c: &DVector<f64>,
    ) -> Result<DMatrix<f64>, KineticsError> {
        (**self).derivatives_of_formation_rates(c)
    }
}
