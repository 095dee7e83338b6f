//! # Batch reactor task
//!
//! A complete batch reactor problem read from JSON: species with their thermodynamic models,
//! reactions, reactor mode, initial state, time span and integrator settings.
//!
//! ```json
//! {
//!   "problem_name": "A => B, adiabatic",
//!   "species": [
//!     {"name": "A", "molar_mass": 30.0, "thermo": {"model": "ConstantCp", "dh_ref": 0.0, "Cp": 3.0e4}},
//!     {"name": "B", "molar_mass": 30.0, "thermo": {"model": "ConstantCp", "dh_ref": -5.0e7, "Cp": 3.0e4}}
//!   ],
//!   "reactions": [{"eq": "A=>B", "forward": {"A": 1.0e6, "n": 0.0, "E": 1.0e8}}],
//!   "mode": "adiabatic",
//!   "initial": {"T": 1000.0, "P": 1.0e5, "mole_fractions": {"A": 1.0}},
//!   "time": {"t0": 0.0, "t_end": 1.0},
//!   "solver": {"rtol": 1e-5}
//! }
//! ```
//!
//! Instead of `reactions`, `symbolic_reactions` may be given: `{"eq": "A=>B", "rate": "2*C0"}`
//! where the rate law is an expression of the concentrations `C0..C{N-1}` (species order of
//! the task) and of the temperature `T`.
//!
//! For adiabatic runs the mass-specific enthalpy is that of the initial state.
use super::BatchReactorODE::{BatchReactorODE, ReactorError};
use super::stiff_solver::{BackwardEulerSolver, SolverParams, SolverStats};
use crate::Kinetics::evaluator_api::ThermoKineticsEvaluator;
use crate::Kinetics::mass_action_mechanism::{MassActionMechanism, ReactionInput};
use crate::Kinetics::symbolic_mechanism::SymbolicMechanism;
use crate::Thermodynamics::R_G;
use crate::Thermodynamics::mixture_thermo::MixtureThermo;
use crate::Thermodynamics::thermo_api::SpeciesThermo;
use RustedSciThe::symbolic::symbolic_engine::Expr;
use log::info;
use nalgebra::DVector;
use prettytable::{Table, row};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub type BoxedEvaluator = Box<dyn ThermoKineticsEvaluator>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesInput {
    pub name: String,
    /// kg/kmol
    pub molar_mass: f64,
    pub thermo: SpeciesThermo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolicReactionInput {
    pub eq: String,
    pub rate: String,
}

impl SymbolicReactionInput {
    pub fn rate_expr(&self) -> Result<Expr, ReactorError> {
        Expr::try_parse_expression(&self.rate).map_err(|e| {
            ReactorError::InvalidConfiguration(format!(
                "rate of '{}' is not a valid expression '{}': {}",
                self.eq, self.rate, e
            ))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeInput {
    Isothermal,
    Adiabatic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialState {
    pub T: f64,
    #[serde(default)]
    pub P: Option<f64>,
    #[serde(default)]
    pub mole_fractions: Option<HashMap<String, f64>>,
    /// kmol/m³
    #[serde(default)]
    pub concentrations: Option<HashMap<String, f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    #[serde(default)]
    pub t0: f64,
    pub t_end: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReactorTask {
    #[serde(default)]
    pub problem_name: Option<String>,
    pub species: Vec<SpeciesInput>,
    #[serde(default)]
    pub reactions: Vec<ReactionInput>,
    #[serde(default)]
    pub symbolic_reactions: Vec<SymbolicReactionInput>,
    pub mode: ModeInput,
    pub initial: InitialState,
    pub time: TimeSpan,
    #[serde(default)]
    pub solver: SolverParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReactorSolution {
    pub problem_name: Option<String>,
    pub species: Vec<String>,
    pub t: Vec<f64>,
    /// concentrations at every accepted time, kmol/m³
    pub c: Vec<Vec<f64>>,
    /// resolved temperature, K
    pub T: Vec<f64>,
    /// resolved pressure, Pa
    pub P: Vec<f64>,
    pub stats: SolverStats,
}

impl BatchReactorTask {
    pub fn from_json_str(json: &str) -> Result<Self, ReactorError> {
        let task: BatchReactorTask = serde_json::from_str(json)?;
        Ok(task)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ReactorError> {
        let content = fs::read_to_string(path.as_ref())?;
        info!("task file {} loaded", path.as_ref().display());
        Self::from_json_str(&content)
    }

    pub fn substances(&self) -> Vec<String> {
        self.species.iter().map(|s| s.name.clone()).collect()
    }

    ///////////////////////////////////////////VALIDATION////////////////////////////////////////////////
    pub fn validate(&self) -> Result<(), ReactorError> {
        if self.species.is_empty() {
            return Err(ReactorError::MissingData("no species given".to_string()));
        }
        let names = self.substances();
        for (i, s) in self.species.iter().enumerate() {
            if names[..i].contains(&s.name) {
                return Err(ReactorError::InvalidConfiguration(format!(
                    "species {} listed twice",
                    s.name
                )));
            }
            if !(s.molar_mass > 0.0) || !s.molar_mass.is_finite() {
                return Err(ReactorError::InvalidConfiguration(format!(
                    "molar mass of {} must be positive, got {}",
                    s.name, s.molar_mass
                )));
            }
        }
        match (self.reactions.is_empty(), self.symbolic_reactions.is_empty()) {
            (true, true) => {
                return Err(ReactorError::MissingData("no reactions given".to_string()));
            }
            (false, false) => {
                return Err(ReactorError::InvalidConfiguration(
                    "give either reactions or symbolic_reactions, not both".to_string(),
                ));
            }
            _ => {}
        }
        for r in &self.symbolic_reactions {
            r.rate_expr()?;
        }

        let init = &self.initial;
        if !(init.T > 0.0) || !init.T.is_finite() {
            return Err(ReactorError::InvalidConfiguration(format!(
                "initial temperature must be positive, got {}",
                init.T
            )));
        }
        if let Some(P) = init.P {
            if !(P > 0.0) || !P.is_finite() {
                return Err(ReactorError::InvalidConfiguration(format!(
                    "pressure must be positive, got {}",
                    P
                )));
            }
        }
        match (&init.mole_fractions, &init.concentrations) {
            (Some(_), Some(_)) => {
                return Err(ReactorError::InvalidConfiguration(
                    "give either mole_fractions or concentrations, not both".to_string(),
                ));
            }
            (None, None) => {
                return Err(ReactorError::MissingData(
                    "initial mole_fractions or concentrations".to_string(),
                ));
            }
            (Some(x), None) => {
                check_composition(x, &names, "mole fraction")?;
                if init.P.is_none() {
                    return Err(ReactorError::MissingData(
                        "pressure is needed to convert mole fractions".to_string(),
                    ));
                }
            }
            (None, Some(c)) => check_composition(c, &names, "concentration")?,
        }
        if self.mode == ModeInput::Adiabatic && init.P.is_none() {
            return Err(ReactorError::MissingData(
                "adiabatic reactor needs a pressure".to_string(),
            ));
        }
        if !self.time.t0.is_finite() || !(self.time.t_end > self.time.t0) {
            return Err(ReactorError::InvalidConfiguration(format!(
                "t_end = {} must be greater than t0 = {}",
                self.time.t_end, self.time.t0
            )));
        }
        self.solver.validate()?;
        info!("task checked!");
        Ok(())
    }

    ///////////////////////////////////////////SETUP////////////////////////////////////////////////
    pub fn mixture_thermo(&self) -> Result<MixtureThermo, ReactorError> {
        let thermo = MixtureThermo::new(
            self.substances(),
            self.species.iter().map(|s| s.molar_mass).collect(),
            self.species.iter().map(|s| s.thermo.clone()).collect(),
        )
        .map_err(|e| ReactorError::InvalidConfiguration(e.to_string()))?;
        Ok(thermo)
    }

    pub fn build_mechanism(&self) -> Result<BoxedEvaluator, ReactorError> {
        let thermo = self.mixture_thermo()?;
        if !self.reactions.is_empty() {
            let mechanism = MassActionMechanism::new(thermo, &self.reactions)?;
            return Ok(Box::new(mechanism));
        }
        let reactions = self
            .symbolic_reactions
            .iter()
            .map(|r| Ok((r.eq.clone(), r.rate_expr()?)))
            .collect::<Result<Vec<(String, Expr)>, ReactorError>>()?;
        let mechanism = SymbolicMechanism::new(thermo, reactions)?;
        Ok(Box::new(mechanism))
    }

    /// kmol/m³ in species order; mole fractions are normalized and converted with c_tot = P/(R·T)
    pub fn initial_concentrations(&self) -> Result<DVector<f64>, ReactorError> {
        let names = self.substances();
        let pick = |map: &HashMap<String, f64>| {
            DVector::from_iterator(
                names.len(),
                names.iter().map(|n| map.get(n).copied().unwrap_or(0.0)),
            )
        };
        match (&self.initial.mole_fractions, &self.initial.concentrations) {
            (None, Some(c)) => Ok(pick(c)),
            (Some(x), None) => {
                let x = pick(x);
                let sum = x.sum();
                if !(sum > 0.0) {
                    return Err(ReactorError::DegenerateState(
                        "initial mole fractions sum to zero".to_string(),
                    ));
                }
                let P = self.initial.P.ok_or_else(|| {
                    ReactorError::MissingData("pressure is needed to convert mole fractions".to_string())
                })?;
                let c_tot = P / (R_G * self.initial.T);
                Ok(x * (c_tot / sum))
            }
            _ => Err(ReactorError::InvalidConfiguration(
                "give exactly one of mole_fractions or concentrations".to_string(),
            )),
        }
    }

    pub fn setup(&self) -> Result<(BatchReactorODE<BoxedEvaluator>, DVector<f64>), ReactorError> {
        self.validate()?;
        let mechanism = self.build_mechanism()?;
        info!("kinetics processed!");
        let c0 = self.initial_concentrations()?;
        let T0 = self.initial.T;
        let reactor = match self.mode {
            ModeInput::Isothermal => BatchReactorODE::isothermal(mechanism, T0)?,
            ModeInput::Adiabatic => {
                let P = self.initial.P.ok_or_else(|| {
                    ReactorError::MissingData("adiabatic reactor needs a pressure".to_string())
                })?;
                BatchReactorODE::adiabatic_from_initial_state(mechanism, T0, P, &c0)?
            }
        };
        info!("reactor setup completed!");
        Ok((reactor, c0))
    }

    pub fn solve(&self) -> Result<BatchReactorSolution, ReactorError> {
        let (mut reactor, c0) = self.setup()?;
        let mut solver = BackwardEulerSolver::new(self.solver.clone())?;
        let ode = solver.solve(&mut reactor, self.time.t0, self.time.t_end, &c0)?;

        let mut T = Vec::with_capacity(ode.y.len());
        let mut P = Vec::with_capacity(ode.y.len());
        for y in &ode.y {
            let state = reactor.resolve_state(y)?;
            T.push(state.T);
            P.push(state.P);
        }
        Ok(BatchReactorSolution {
            problem_name: self.problem_name.clone(),
            species: self.substances(),
            t: ode.t,
            c: ode.y.iter().map(|y| y.iter().copied().collect()).collect(),
            T,
            P,
            stats: ode.stats,
        })
    }

    pub fn pretty_print_task(&self) {
        let mut table = Table::new();
        table.add_row(row!["Parameter", "Value", "Units"]);
        if let Some(name) = &self.problem_name {
            table.add_row(row!["Problem", name, "-"]);
        }
        table.add_row(row!["Mode", format!("{:?}", self.mode), "-"]);
        table.add_row(row!["Temperature (T0)", format!("{:.2}", self.initial.T), "K"]);
        if let Some(P) = self.initial.P {
            table.add_row(row!["Pressure (P)", format!("{:.2}", P), "Pa"]);
        }
        table.add_row(row![
            "Time span",
            format!("[{}, {}]", self.time.t0, self.time.t_end),
            "s"
        ]);
        table.printstd();

        let mut species = Table::new();
        species.add_row(row!["Species", "Molar mass", "Thermo model"]);
        for s in &self.species {
            species.add_row(row![s.name, format!("{:.4}", s.molar_mass), s.thermo.model_name()]);
        }
        species.printstd();

        let mut reactions = Table::new();
        reactions.add_row(row!["Reaction", "Rate law"]);
        for r in &self.reactions {
            let law = match &r.reverse {
                Some(rev) => format!(
                    "kf: A={:.3e}, n={}, E={:.3e}; kr: A={:.3e}, n={}, E={:.3e}",
                    r.forward.A, r.forward.n, r.forward.E, rev.A, rev.n, rev.E
                ),
                None => format!(
                    "kf: A={:.3e}, n={}, E={:.3e}",
                    r.forward.A, r.forward.n, r.forward.E
                ),
            };
            reactions.add_row(row![r.eq, law]);
        }
        for r in &self.symbolic_reactions {
            reactions.add_row(row![r.eq, r.rate]);
        }
        reactions.printstd();
    }
}

fn check_composition(
    values: &HashMap<String, f64>,
    names: &[String],
    what: &str,
) -> Result<(), ReactorError> {
    for (name, value) in values {
        if !names.contains(name) {
            return Err(ReactorError::InvalidConfiguration(format!(
                "{} given for unknown species {}",
                what, name
            )));
        }
        if !(*value >= 0.0) || !value.is_finite() {
            return Err(ReactorError::InvalidConfiguration(format!(
                "{} of {} must be non-negative, got {}",
                what, name, value
            )));
        }
    }
    if !(values.values().sum::<f64>() > 0.0) {
        return Err(ReactorError::DegenerateState(format!(
            "every initial {} is zero",
            what
        )));
    }
    Ok(())
}

impl BatchReactorSolution {
    pub fn final_concentrations(&self) -> Option<&Vec<f64>> {
        self.c.last()
    }

    pub fn final_temperature(&self) -> Option<f64> {
        self.T.last().copied()
    }

    /// concentration history of one species
    pub fn species_history(&self, name: &str) -> Option<Vec<f64>> {
        let i = self.species.iter().position(|s| s == name)?;
        Some(self.c.iter().map(|row| row[i]).collect())
    }

    /// table of at most `max_rows` evenly spaced time points, the last one included
    pub fn pretty_print(&self, max_rows: usize) {
        let mut table = Table::new();
        let mut header = row!["t, s", "T, K", "P, Pa"];
        for s in &self.species {
            header.add_cell(prettytable::Cell::new(s));
        }
        table.add_row(header);
        let n = self.t.len();
        let stride = if max_rows == 0 || n <= max_rows {
            1
        } else {
            n.div_ceil(max_rows)
        };
        for i in (0..n).filter(|i| i % stride == 0 || *i == n - 1) {
            let mut r = row![
                format!("{:.4e}", self.t[i]),
                format!("{:.2}", self.T[i]),
                format!("{:.2}", self.P[i])
            ];
            for ci in &self.c[i] {
                r.add_cell(prettytable::Cell::new(&format!("{:.4e}", ci)));
            }
            table.add_row(r);
        }
        table.printstd();
        println!(
            "accepted steps: {}, rejected steps: {}, Jacobian evaluations: {}",
            self.stats.accepted_steps, self.stats.rejected_steps, self.stats.jacobian_evaluations
        );
    }

    pub fn to_json_string(&self) -> Result<String, ReactorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), ReactorError> {
        fs::write(path.as_ref(), self.to_json_string()?)?;
        info!("solution saved to {}", path.as_ref().display());
        Ok(())
    }
}
