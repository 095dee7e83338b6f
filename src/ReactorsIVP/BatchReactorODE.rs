//! # Batch reactor ODE system
//!
//! Right-hand side and analytic Jacobian of a spatially homogeneous reactor, written for
//! consumption by a stiff ODE integrator through the [`OdeSystem`] interface.
//!
//! The unknowns are the species concentrations c (kmol/m³); the system is autonomous:
//!
//! dcᵢ/dt = Rᵢ(T, P, c)
//!
//! Every evaluation rebuilds the thermodynamic state from the incoming vector:
//!
//! 1. c = max(y, 0) componentwise, exact zero floor
//! 2. c_tot = ∑c, x = c/c_tot, mw = ∑xᵢMᵢ
//! 3. temperature and pressure
//!    - adiabatic, isobaric: T solves h(T, P, x) = H·mw, warm-started from the last resolved T
//!    - isothermal: P = c_tot·R·T
//! 4. evaluator T and P are set, then rates (or their derivatives) are queried from c
//!
//! `derivatives` and `jacobian` run steps 1-4 independently; nothing is cached between them
//! except the warm-start temperature.
use crate::Kinetics::evaluator_api::{KineticsError, ThermoKineticsEvaluator};
use crate::Thermodynamics::R_G;
use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReactorError {
    #[error("Degenerate state: {0}")]
    DegenerateState(String),
    #[error("Non-finite state: {0}")]
    NonFiniteState(String),
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("Kinetics evaluator failure: {0}")]
    EvaluatorFailure(#[from] KineticsError),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Missing data: {0}")]
    MissingData(String),
    #[error("Solver error: {0}")]
    SolverError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// How temperature and pressure are obtained from the state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReactorMode {
    /// constant pressure P (Pa) and mass-specific enthalpy H (J/kg)
    Adiabatic { P: f64, H: f64 },
    /// fixed temperature T (K); pressure follows from the ideal gas law
    Isothermal { T: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactorParameters {
    pub mode: ReactorMode,
    /// initial guess for the temperature inversion, K
    pub T_start: f64,
    /// resolved temperatures outside these bounds are rejected
    pub T_bounds: (f64, f64),
}

impl ReactorParameters {
    pub fn new(mode: ReactorMode, T_start: f64) -> Self {
        Self {
            mode,
            T_start,
            T_bounds: (1.0, 1.0e5),
        }
    }

    pub fn validate(&self) -> Result<(), ReactorError> {
        if !(self.T_start > 0.0) || !self.T_start.is_finite() {
            return Err(ReactorError::InvalidConfiguration(format!(
                "start temperature must be positive, got {}",
                self.T_start
            )));
        }
        let (T_min, T_max) = self.T_bounds;
        if !(T_min > 0.0) || !(T_max > T_min) || !T_max.is_finite() {
            return Err(ReactorError::InvalidConfiguration(format!(
                "invalid temperature bounds ({}, {})",
                T_min, T_max
            )));
        }
        match self.mode {
            ReactorMode::Adiabatic { P, H } => {
                if !(P > 0.0) || !P.is_finite() {
                    return Err(ReactorError::InvalidConfiguration(format!(
                        "pressure must be positive, got {}",
                        P
                    )));
                }
                if !H.is_finite() {
                    return Err(ReactorError::InvalidConfiguration(format!(
                        "enthalpy must be finite, got {}",
                        H
                    )));
                }
            }
            ReactorMode::Isothermal { T } => {
                if !(T > 0.0) || !T.is_finite() {
                    return Err(ReactorError::InvalidConfiguration(format!(
                        "temperature must be positive, got {}",
                        T
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Interface expected by the stiff integrators in this crate
pub trait OdeSystem {
    fn n_eqns(&self) -> usize;
    /// dy/dt at (t, y)
    fn derivatives(&mut self, t: f64, y: &DVector<f64>) -> Result<DVector<f64>, ReactorError>;
    /// (∂f/∂t, ∂f/∂y) at (t, y)
    fn jacobian(
        &mut self,
        t: f64,
        y: &DVector<f64>,
    ) -> Result<(DVector<f64>, DMatrix<f64>), ReactorError>;
}

/// Thermodynamic state rebuilt from a state vector
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedState {
    pub T: f64,
    pub P: f64,
    pub c_tot: f64,
    pub mw: f64,
    /// clamped concentrations
    pub c: DVector<f64>,
    pub x: DVector<f64>,
}

/// Floors every component at exactly zero
pub fn clamp_concentrations(y: &DVector<f64>) -> DVector<f64> {
    y.map(|ci| if ci < 0.0 { 0.0 } else { ci })
}

pub struct BatchReactorODE<E: ThermoKineticsEvaluator> {
    evaluator: E,
    params: ReactorParameters,
    n: usize,
    /// warm start of the temperature inversion
    T_guess: f64,
    last: Option<ResolvedState>,
}

impl<E: ThermoKineticsEvaluator> BatchReactorODE<E> {
    pub fn new(evaluator: E, params: ReactorParameters) -> Result<Self, ReactorError> {
        params.validate()?;
        let n = evaluator.number_of_species();
        if n == 0 {
            return Err(ReactorError::InvalidConfiguration(
                "evaluator has no species".to_string(),
            ));
        }
        info!(
            "batch reactor created: {} species, mode {:?}",
            n, params.mode
        );
        Ok(Self {
            evaluator,
            T_guess: params.T_start,
            params,
            n,
            last: None,
        })
    }

    pub fn isothermal(evaluator: E, T: f64) -> Result<Self, ReactorError> {
        Self::new(evaluator, ReactorParameters::new(ReactorMode::Isothermal { T }, T))
    }

    /// H in J/kg
    pub fn adiabatic(evaluator: E, T_start: f64, P: f64, H: f64) -> Result<Self, ReactorError> {
        Self::new(
            evaluator,
            ReactorParameters::new(ReactorMode::Adiabatic { P, H }, T_start),
        )
    }

    /// Adiabatic reactor whose enthalpy is that of the initial state: H = h(T0, P0, x0)/mw0
    pub fn adiabatic_from_initial_state(
        evaluator: E,
        T0: f64,
        P0: f64,
        c0: &DVector<f64>,
    ) -> Result<Self, ReactorError> {
        let n = evaluator.number_of_species();
        let (c_tot, x) = mole_fractions(c0, n)?;
        let mw = evaluator.molecular_weight_from_mole_fractions(&x);
        check_molecular_weight(mw)?;
        let h = evaluator.mixture_molar_enthalpy(T0, P0, &x)?;
        let H = h / mw;
        debug!(
            "initial state: c_tot = {:.6e}, mw = {:.4}, H = {:.6e} J/kg",
            c_tot, mw, H
        );
        Self::adiabatic(evaluator, T0, P0, H)
    }

    pub fn params(&self) -> &ReactorParameters {
        &self.params
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn evaluator_mut(&mut self) -> &mut E {
        &mut self.evaluator
    }

    pub fn into_evaluator(self) -> E {
        self.evaluator
    }

    /// state rebuilt by the most recent evaluation
    pub fn last_resolved(&self) -> Option<&ResolvedState> {
        self.last.as_ref()
    }

    pub fn warm_start_temperature(&self) -> f64 {
        self.T_guess
    }

    ///////////////////////////////////////////SETTERS////////////////////////////////////////////////
    /// resets the warm start too
    pub fn set_start_temperature(&mut self, T: f64) -> Result<(), ReactorError> {
        let mut params = self.params.clone();
        params.T_start = T;
        params.validate()?;
        self.params = params;
        self.T_guess = T;
        Ok(())
    }

    pub fn set_temperature_bounds(&mut self, T_min: f64, T_max: f64) -> Result<(), ReactorError> {
        let mut params = self.params.clone();
        params.T_bounds = (T_min, T_max);
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn set_pressure(&mut self, P_new: f64) -> Result<(), ReactorError> {
        match self.params.mode {
            ReactorMode::Adiabatic { H, .. } => {
                self.set_mode(ReactorMode::Adiabatic { P: P_new, H })
            }
            ReactorMode::Isothermal { .. } => Err(ReactorError::InvalidConfiguration(
                "pressure of an isothermal reactor follows from the state".to_string(),
            )),
        }
    }

    /// H in J/kg
    pub fn set_enthalpy(&mut self, H_new: f64) -> Result<(), ReactorError> {
        match self.params.mode {
            ReactorMode::Adiabatic { P, .. } => {
                self.set_mode(ReactorMode::Adiabatic { P, H: H_new })
            }
            ReactorMode::Isothermal { .. } => Err(ReactorError::InvalidConfiguration(
                "enthalpy is not a parameter of an isothermal reactor".to_string(),
            )),
        }
    }

    pub fn set_fixed_temperature(&mut self, T_new: f64) -> Result<(), ReactorError> {
        match self.params.mode {
            ReactorMode::Isothermal { .. } => self.set_mode(ReactorMode::Isothermal { T: T_new }),
            ReactorMode::Adiabatic { .. } => Err(ReactorError::InvalidConfiguration(
                "temperature of an adiabatic reactor follows from the enthalpy".to_string(),
            )),
        }
    }

    fn set_mode(&mut self, mode: ReactorMode) -> Result<(), ReactorError> {
        let mut params = self.params.clone();
        params.mode = mode;
        params.validate()?;
        self.params = params;
        Ok(())
    }

    ///////////////////////////////////////////STATE////////////////////////////////////////////////
    /// Clamps the state, resolves T and P and pushes them into the evaluator
    pub fn resolve_state(&mut self, y: &DVector<f64>) -> Result<ResolvedState, ReactorError> {
        let (c_tot, x) = mole_fractions(y, self.n)?;
        let c = clamp_concentrations(y);
        let mw = self.evaluator.molecular_weight_from_mole_fractions(&x);
        check_molecular_weight(mw)?;

        let (T, P) = match self.params.mode {
            ReactorMode::Adiabatic { P, H } => {
                let T = self
                    .evaluator
                    .temperature_from_enthalpy_and_mole_fractions(H * mw, P, &x, self.T_guess)?;
                let (T_min, T_max) = self.params.T_bounds;
                if !T.is_finite() || !(T > 0.0) || T < T_min || T > T_max {
                    return Err(KineticsError::InvalidTemperature(T).into());
                }
                self.T_guess = T;
                (T, P)
            }
            ReactorMode::Isothermal { T } => (T, c_tot * R_G * T),
        };
        self.evaluator.set_temperature(T);
        self.evaluator.set_pressure(P);
        debug!(
            "resolved state: T = {:.4} K, P = {:.6e} Pa, c_tot = {:.6e}, mw = {:.4}",
            T, P, c_tot, mw
        );
        let state = ResolvedState {
            T,
            P,
            c_tot,
            mw,
            c,
            x,
        };
        self.last = Some(state.clone());
        Ok(state)
    }
}

/// Validates the raw state and returns (c_tot, x) of its clamped copy
fn mole_fractions(y: &DVector<f64>, n: usize) -> Result<(f64, DVector<f64>), ReactorError> {
    if y.len() != n {
        return Err(ReactorError::DimensionMismatch {
            expected: n,
            got: y.len(),
        });
    }
    if let Some(i) = y.iter().position(|ci| !ci.is_finite()) {
        return Err(ReactorError::NonFiniteState(format!(
            "component {} is {}",
            i, y[i]
        )));
    }
    let c = clamp_concentrations(y);
    let c_tot = c.sum();
    if !(c_tot > 0.0) {
        return Err(ReactorError::DegenerateState(
            "total concentration is zero after clamping".to_string(),
        ));
    }
    if !c_tot.is_finite() {
        return Err(ReactorError::NonFiniteState(
            "total concentration overflows".to_string(),
        ));
    }
    Ok((c_tot, c / c_tot))
}

fn check_molecular_weight(mw: f64) -> Result<(), ReactorError> {
    if !mw.is_finite() || !(mw > 0.0) {
        return Err(KineticsError::NonFinite(format!("molecular weight {}", mw)).into());
    }
    Ok(())
}

impl<E: ThermoKineticsEvaluator> OdeSystem for BatchReactorODE<E> {
    fn n_eqns(&self) -> usize {
        self.n
    }

    fn derivatives(&mut self, _t: f64, y: &DVector<f64>) -> Result<DVector<f64>, ReactorError> {
        let state = self.resolve_state(y)?;
        self.evaluator.reaction_rates(&state.c)?;
        let R = self.evaluator.formation_rates();
        if R.len() != self.n {
            return Err(ReactorError::DimensionMismatch {
                expected: self.n,
                got: R.len(),
            });
        }
        if R.iter().any(|r| !r.is_finite()) {
            return Err(KineticsError::NonFinite("formation rates".to_string()).into());
        }
        Ok(R)
    }

    fn jacobian(
        &mut self,
        _t: f64,
        y: &DVector<f64>,
    ) -> Result<(DVector<f64>, DMatrix<f64>), ReactorError> {
        let state = self.resolve_state(y)?;
        let J = self.evaluator.derivatives_of_formation_rates(&state.c)?;
        if J.nrows() != self.n || J.ncols() != self.n {
            return Err(ReactorError::DimensionMismatch {
                expected: self.n,
                got: if J.nrows() != self.n {
                    J.nrows()
                } else {
                    J.ncols()
                },
            });
        }
        if J.iter().any(|v| !v.is_finite()) {
            return Err(KineticsError::NonFinite("Jacobian of formation rates".to_string()).into());
        }
        Ok((DVector::zeros(self.n), J))
    }
}
