//! # Reactor Initial Value Problem (IVP) Module
//!
//! Spatially homogeneous (batch) reactors integrated in time as stiff ODE systems.
//!
//! ## Mathematical Model
//!
//! ### Nomenclature
//!
//! | Symbol | Description | Units |
//! |--------|-------------|-------|
//! | `cᵢ` | Concentration of species i | kmol/m³ |
//! | `c_tot` | Total concentration `∑cᵢ` | kmol/m³ |
//! | `xᵢ` | Mole fraction `cᵢ/c_tot` | - |
//! | `Mᵢ`, `mw` | Molar mass of species i, mean molecular weight | kg/kmol |
//! | `Rᵢ` | Net formation rate of species i | kmol/(m³·s) |
//! | `H` | Mass-specific enthalpy of the mixture | J/kg |
//! | `h(T, x)` | Molar enthalpy of the mixture | J/kmol |
//! | `R` | Universal gas constant, 8314.462618 | J/(kmol·K) |
//!
//! ### Governing Equations
//!
//! ```text
//! dcᵢ/dt = Rᵢ(T, P, c)
//! adiabatic, isobaric:  h(T, x) = H·mw,  P = const
//! isothermal:           T = const,       P = c_tot·R·T
//! ```
//!
//! ### Model Assumptions
//!
//! - Ideal gas mixture, no transport terms
//! - Negative concentrations produced by the integrator are floored at zero before any
//!   property or rate evaluation
//! - The Jacobian `∂Rᵢ/∂cⱼ` is taken at fixed temperature; the system is autonomous so
//!   `∂f/∂t = 0`

/// ODE right-hand side and Jacobian of the batch reactor, reactor modes, `OdeSystem` trait
/// and the error type of the reactor layer
#[allow(non_snake_case)]
pub mod BatchReactorODE;
mod batch_reactor_tests;
/// implicit Euler integrator with Newton iterations and step-doubling error control
pub mod stiff_solver;
/// reactor problem from a JSON task: validation, setup, solution and reporting
pub mod reactor_task;
