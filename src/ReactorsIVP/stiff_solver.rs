//! # Stiff integrator
//!
//! Backward (implicit) Euler for `OdeSystem`s, with Newton iterations on
//!
//! G(y) = y - yₙ - h·f(tₙ + h, y) = 0,   (I - h·J)·Δ = -G
//!
//! and step-doubling error control: every step is taken once with h and twice with h/2,
//! the difference of the two results estimates the local error. The finer result is kept.
//!
//! A failed Newton iteration, a singular iteration matrix or an error returned by the system
//! rejects the step and retries it with a smaller h; below `h_min` the integration stops
//! with `ReactorError::SolverError`.
use super::BatchReactorODE::{OdeSystem, ReactorError};
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    pub rtol: f64,
    pub atol: f64,
    /// initial step
    pub h0: f64,
    pub h_min: f64,
    pub h_max: Option<f64>,
    pub max_steps: usize,
    pub max_newton_iterations: usize,
    /// Newton convergence threshold on the weighted RMS norm of the update
    pub newton_tol: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            rtol: 1e-6,
            atol: 1e-12,
            h0: 1e-6,
            h_min: 1e-14,
            h_max: None,
            max_steps: 100_000,
            max_newton_iterations: 10,
            newton_tol: 1e-3,
        }
    }
}

impl SolverParams {
    pub fn validate(&self) -> Result<(), ReactorError> {
        let positive = [
            ("rtol", self.rtol),
            ("atol", self.atol),
            ("h0", self.h0),
            ("h_min", self.h_min),
            ("newton_tol", self.newton_tol),
        ];
        for (name, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(ReactorError::InvalidConfiguration(format!(
                    "solver parameter {} must be positive, got {}",
                    name, value
                )));
            }
        }
        if let Some(h_max) = self.h_max {
            if !(h_max >= self.h_min) {
                return Err(ReactorError::InvalidConfiguration(format!(
                    "h_max = {} is smaller than h_min = {}",
                    h_max, self.h_min
                )));
            }
        }
        if self.max_steps == 0 || self.max_newton_iterations == 0 {
            return Err(ReactorError::InvalidConfiguration(
                "max_steps and max_newton_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub rhs_evaluations: usize,
    pub jacobian_evaluations: usize,
    pub newton_iterations: usize,
}

#[derive(Debug, Clone)]
pub struct OdeSolution {
    pub t: Vec<f64>,
    pub y: Vec<DVector<f64>>,
    pub stats: SolverStats,
}

/// Why a single implicit step did not produce a result
enum StepFailure {
    /// recoverable: retry with a smaller step
    Retry(String),
    Fatal(ReactorError),
}

pub struct BackwardEulerSolver {
    pub params: SolverParams,
    stats: SolverStats,
}

impl BackwardEulerSolver {
    pub fn new(params: SolverParams) -> Result<Self, ReactorError> {
        params.validate()?;
        Ok(Self {
            params,
            stats: SolverStats::default(),
        })
    }

    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    pub fn solve<S: OdeSystem>(
        &mut self,
        system: &mut S,
        t0: f64,
        t_end: f64,
        y0: &DVector<f64>,
    ) -> Result<OdeSolution, ReactorError> {
        self.solve_with_callback(system, t0, t_end, y0, |_, _| {})
    }

    /// `callback` sees every accepted (t, y), the initial point included
    pub fn solve_with_callback<S, F>(
        &mut self,
        system: &mut S,
        t0: f64,
        t_end: f64,
        y0: &DVector<f64>,
        mut callback: F,
    ) -> Result<OdeSolution, ReactorError>
    where
        S: OdeSystem,
        F: FnMut(f64, &DVector<f64>),
    {
        let n = system.n_eqns();
        if y0.len() != n {
            return Err(ReactorError::DimensionMismatch {
                expected: n,
                got: y0.len(),
            });
        }
        if !t0.is_finite() || !t_end.is_finite() || t_end < t0 {
            return Err(ReactorError::InvalidConfiguration(format!(
                "invalid time span [{}, {}]",
                t0, t_end
            )));
        }
        self.stats = SolverStats::default();
        let h_max = self.params.h_max.unwrap_or(t_end - t0);
        info!(
            "backward Euler: {} equations, t in [{}, {}], rtol = {:e}, atol = {:e}",
            n, t0, t_end, self.params.rtol, self.params.atol
        );

        let mut t = t0;
        let mut y = y0.clone();
        let mut ts = vec![t0];
        let mut ys = vec![y0.clone()];
        callback(t, &y);
        let mut h = self.params.h0.min(h_max);

        while t < t_end {
            if self.stats.accepted_steps + self.stats.rejected_steps >= self.params.max_steps {
                return Err(ReactorError::SolverError(format!(
                    "maximum number of steps ({}) reached at t = {}",
                    self.params.max_steps, t
                )));
            }
            let last_step = t + h >= t_end;
            let h_step = if last_step { t_end - t } else { h };

            match self.doubled_step(system, t, &y, h_step) {
                Ok((y_new, err)) if err <= 1.0 => {
                    t = if last_step { t_end } else { t + h_step };
                    y = y_new;
                    self.stats.accepted_steps += 1;
                    ts.push(t);
                    ys.push(y.clone());
                    callback(t, &y);
                    let factor = if err == 0.0 {
                        5.0
                    } else {
                        (0.9 * err.powf(-0.5)).clamp(0.2, 5.0)
                    };
                    h = (h_step * factor).min(h_max);
                    debug!("accepted t = {:.6e}, err = {:.3e}, next h = {:.3e}", t, err, h);
                }
                Ok((_, err)) => {
                    self.stats.rejected_steps += 1;
                    h = h_step * (0.9 * err.powf(-0.5)).clamp(0.2, 1.0);
                    debug!("rejected t = {:.6e}, err = {:.3e}, retry h = {:.3e}", t, err, h);
                }
                Err(StepFailure::Retry(reason)) => {
                    self.stats.rejected_steps += 1;
                    h = h_step * 0.25;
                    warn!("step from t = {:.6e} failed ({}), retry h = {:.3e}", t, reason, h);
                    if h < self.params.h_min {
                        return Err(ReactorError::SolverError(format!(
                            "step size {:e} below h_min at t = {}: {}",
                            h, t, reason
                        )));
                    }
                    continue;
                }
                Err(StepFailure::Fatal(e)) => return Err(e),
            }
            if h < self.params.h_min && t < t_end {
                return Err(ReactorError::SolverError(format!(
                    "step size {:e} below h_min at t = {}",
                    h, t
                )));
            }
        }
        info!(
            "integration finished: {} accepted, {} rejected steps",
            self.stats.accepted_steps, self.stats.rejected_steps
        );
        Ok(OdeSolution {
            t: ts,
            y: ys,
            stats: self.stats.clone(),
        })
    }

    /// (fine solution, scaled error estimate)
    fn doubled_step<S: OdeSystem>(
        &mut self,
        system: &mut S,
        t: f64,
        y: &DVector<f64>,
        h: f64,
    ) -> Result<(DVector<f64>, f64), StepFailure> {
        let y_big = self.implicit_step(system, t, y, h)?;
        let y_half = self.implicit_step(system, t, y, 0.5 * h)?;
        let y_small = self.implicit_step(system, t + 0.5 * h, &y_half, 0.5 * h)?;
        let err = self.weighted_rms(&(&y_small - &y_big), y, &y_small);
        if !err.is_finite() {
            return Err(StepFailure::Retry("non-finite error estimate".to_string()));
        }
        Ok((y_small, err))
    }

    /// one backward Euler step from (t, y) with step h
    fn implicit_step<S: OdeSystem>(
        &mut self,
        system: &mut S,
        t: f64,
        y: &DVector<f64>,
        h: f64,
    ) -> Result<DVector<f64>, StepFailure> {
        let n = y.len();
        let t_new = t + h;
        let mut y_new = y.clone();
        for _ in 0..self.params.max_newton_iterations {
            self.stats.newton_iterations += 1;
            let f = system.derivatives(t_new, &y_new).map_err(classify)?;
            self.stats.rhs_evaluations += 1;
            let (_, J) = system.jacobian(t_new, &y_new).map_err(classify)?;
            self.stats.jacobian_evaluations += 1;

            let G = &y_new - y - &f * h;
            let M = DMatrix::<f64>::identity(n, n) - J * h;
            let delta = M
                .lu()
                .solve(&(-G))
                .ok_or_else(|| StepFailure::Retry("singular iteration matrix".to_string()))?;
            y_new += &delta;
            if self.weighted_rms(&delta, y, &y_new) <= self.params.newton_tol {
                return Ok(y_new);
            }
        }
        Err(StepFailure::Retry(format!(
            "Newton did not converge in {} iterations",
            self.params.max_newton_iterations
        )))
    }

    fn weighted_rms(&self, v: &DVector<f64>, y_old: &DVector<f64>, y_new: &DVector<f64>) -> f64 {
        let n = v.len().max(1) as f64;
        let sum: f64 = v
            .iter()
            .zip(y_old.iter().zip(y_new.iter()))
            .map(|(vi, (a, b))| {
                let scale = self.params.atol + self.params.rtol * a.abs().max(b.abs());
                (vi / scale).powi(2)
            })
            .sum();
        (sum / n).sqrt()
    }
}

fn classify(e: ReactorError) -> StepFailure {
    match e {
        ReactorError::DimensionMismatch { .. } | ReactorError::InvalidConfiguration(_) => {
            StepFailure::Fatal(e)
        }
        other => StepFailure::Retry(other.to_string()),
    }
}
