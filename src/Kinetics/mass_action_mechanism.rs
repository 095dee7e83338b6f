//! # Mass-action ideal-gas mechanism
//!
//! A compact [`ThermoKineticsEvaluator`] for gas-phase mechanisms made of elementary (or
//! empirical power-law) reactions with modified Arrhenius rate constants
//!
//! k(T) = A·T^n·exp(-E/(R·T)),   E in J/kmol
//!
//! Reaction rate of reaction j and net formation rate of species i:
//!
//! rⱼ = k_fⱼ·∏ᵢ cᵢ^oᵢⱼ - k_rⱼ·∏ᵢ cᵢ^ν''ᵢⱼ
//! Rᵢ = ∑ⱼ (ν''ᵢⱼ - ν'ᵢⱼ)·rⱼ
//!
//! where the forward orders oᵢⱼ default to the reactant coefficients ν'ᵢⱼ and may be
//! overridden per reaction. The reverse branch exists only for reversible ("<=>")
//! reactions with explicit reverse Arrhenius parameters.
//!
//! The Jacobian ∂Rᵢ/∂cₗ is analytic and evaluated at fixed temperature. The derivative of
//! a concentration product is built as oₗ·cₗ^(oₗ-1)·∏_{i≠l} cᵢ^oᵢ, never by dividing the
//! product by cₗ, so it stays exact for depleted species. Fractional orders 0 < oₗ < 1 are
//! the exception: there cₗ^(oₗ-1) is evaluated at max(cₗ, [`FRACTIONAL_ORDER_FLOOR`]).
use super::evaluator_api::{KineticsError, ThermoKineticsEvaluator};
use super::reaction_parser::parse_equation;
use crate::Thermodynamics::R_G;
use crate::Thermodynamics::mixture_thermo::MixtureThermo;
use log::info;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Modified Arrhenius parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arrhenius {
    /// pre-exponential factor, units depend on the reaction order
    pub A: f64,
    /// temperature exponent
    #[serde(default)]
    pub n: f64,
    /// activation energy, J/kmol
    #[serde(default)]
    pub E: f64,
}

impl Arrhenius {
    pub fn new(A: f64, n: f64, E: f64) -> Self {
        Self { A, n, E }
    }

    pub fn K_const(&self, T: f64) -> f64 {
        self.A * T.powf(self.n) * f64::exp(-self.E / (R_G * T))
    }

    fn validate(&self, equation: &str) -> Result<(), KineticsError> {
        if !self.A.is_finite() || self.A < 0.0 || !self.n.is_finite() || !self.E.is_finite() {
            return Err(KineticsError::InvalidParameters(format!(
                "Arrhenius parameters of '{}': A = {}, n = {}, E = {}",
                equation, self.A, self.n, self.E
            )));
        }
        Ok(())
    }
}

/// Reaction as it comes from a task file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionInput {
    pub eq: String,
    pub forward: Arrhenius,
    #[serde(default)]
    pub reverse: Option<Arrhenius>,
    /// forward reaction orders overriding the reactant coefficients
    #[serde(default)]
    pub orders: Option<HashMap<String, f64>>,
}

impl ReactionInput {
    pub fn irreversible(eq: &str, A: f64, n: f64, E: f64) -> Self {
        Self {
            eq: eq.to_string(),
            forward: Arrhenius::new(A, n, E),
            reverse: None,
            orders: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MassActionReaction {
    pub equation: String,
    /// ν' (reactant coefficients)
    pub nu_reactants: DVector<f64>,
    /// ν'' (product coefficients)
    pub nu_products: DVector<f64>,
    pub forward_orders: DVector<f64>,
    pub forward: Arrhenius,
    pub reverse: Option<Arrhenius>,
}

impl MassActionReaction {
    pub fn from_input(input: &ReactionInput, substances: &[String]) -> Result<Self, KineticsError> {
        let parsed = parse_equation(&input.eq)?;
        let (nu_reactants, nu_products) = parsed.stoichiometry(substances)?;
        input.forward.validate(&input.eq)?;
        match (&input.reverse, parsed.reversible) {
            (Some(reverse), true) => reverse.validate(&input.eq)?,
            (None, true) => {
                return Err(KineticsError::InvalidParameters(format!(
                    "reversible reaction '{}' needs reverse Arrhenius parameters",
                    input.eq
                )));
            }
            (Some(_), false) => {
                return Err(KineticsError::InvalidParameters(format!(
                    "reverse parameters given for irreversible reaction '{}'",
                    input.eq
                )));
            }
            (None, false) => {}
        }
        let mut forward_orders = nu_reactants.clone();
        if let Some(orders) = &input.orders {
            for (name, order) in orders {
                let i = substances
                    .iter()
                    .position(|s| s == name)
                    .ok_or_else(|| KineticsError::UnknownSpecies(name.clone()))?;
                if !order.is_finite() || *order < 0.0 {
                    return Err(KineticsError::InvalidParameters(format!(
                        "order of {} in '{}' must be non-negative, got {}",
                        name, input.eq, order
                    )));
                }
                forward_orders[i] = *order;
            }
        }
        Ok(Self {
            equation: input.eq.clone(),
            nu_reactants,
            nu_products,
            forward_orders,
            forward: input.forward,
            reverse: input.reverse,
        })
    }
}

/// ∏ cᵢ^oᵢ, optionally skipping one index
fn concentration_product(c: &DVector<f64>, orders: &DVector<f64>, skip: Option<usize>) -> f64 {
    let mut product = 1.0;
    for (i, (ci, oi)) in c.iter().zip(orders.iter()).enumerate() {
        if *oi == 0.0 || Some(i) == skip {
            continue;
        }
        product *= ci.powf(*oi);
    }
    product
}

/// Lower bound on cₗ inside oₗ·cₗ^(oₗ-1) when 0 < oₗ < 1, kmol/m³. The exact derivative is
/// unbounded at a depleted species; above the floor the Jacobian is exact.
pub const FRACTIONAL_ORDER_FLOOR: f64 = 1e-12;

/// ∂(∏ cᵢ^oᵢ)/∂cₗ
fn concentration_product_derivative(c: &DVector<f64>, orders: &DVector<f64>, l: usize) -> f64 {
    let o = orders[l];
    if o == 0.0 {
        return 0.0;
    }
    let own = if o == 1.0 {
        1.0
    } else if o < 1.0 {
        o * c[l].max(FRACTIONAL_ORDER_FLOOR).powf(o - 1.0)
    } else {
        o * c[l].powf(o - 1.0)
    };
    own * concentration_product(c, orders, Some(l))
}

#[derive(Debug, Clone)]
pub struct MassActionMechanism {
    pub thermo: MixtureThermo,
    pub reactions: Vec<MassActionReaction>,
    /// net stoichiometric matrix ν = ν'' - ν', species × reactions
    pub stoich_matrix: DMatrix<f64>,
    T: f64,
    P: f64,
    rates: DVector<f64>,
    formation: DVector<f64>,
}

impl MassActionMechanism {
    pub fn new(thermo: MixtureThermo, reactions: &[ReactionInput]) -> Result<Self, KineticsError> {
        if reactions.is_empty() {
            return Err(KineticsError::InvalidParameters(
                "mechanism without reactions".to_string(),
            ));
        }
        let n = thermo.number_of_species();
        let m = reactions.len();
        let parsed: Result<Vec<MassActionReaction>, KineticsError> = reactions
            .iter()
            .map(|r| MassActionReaction::from_input(r, &thermo.substances))
            .collect();
        let parsed = parsed?;
        let mut stoich_matrix = DMatrix::zeros(n, m);
        for (j, reaction) in parsed.iter().enumerate() {
            let nu = &reaction.nu_products - &reaction.nu_reactants;
            stoich_matrix.set_column(j, &nu);
        }
        info!("mass-action mechanism: {} species, {} reactions", n, m);
        Ok(Self {
            thermo,
            reactions: parsed,
            stoich_matrix,
            T: f64::NAN,
            P: f64::NAN,
            rates: DVector::zeros(m),
            formation: DVector::zeros(n),
        })
    }

    pub fn number_of_reactions(&self) -> usize {
        self.reactions.len()
    }

    /// rates of the last `reaction_rates` call, kmol/(m³·s)
    pub fn rates(&self) -> &DVector<f64> {
        &self.rates
    }

    fn check_ready(&self, c: &DVector<f64>) -> Result<(), KineticsError> {
        if !(self.T > 0.0) || !self.T.is_finite() {
            return Err(KineticsError::StateNotSet(format!(
                "temperature is {}",
                self.T
            )));
        }
        if c.len() != self.thermo.number_of_species() {
            return Err(KineticsError::DimensionMismatch(format!(
                "expected {} concentrations, got {}",
                self.thermo.number_of_species(),
                c.len()
            )));
        }
        Ok(())
    }

    /// (k_f, k_r) at the current temperature
    fn rate_constants(&self, reaction: &MassActionReaction) -> (f64, f64) {
        let kf = reaction.forward.K_const(self.T);
        let kr = reaction.reverse.map(|a| a.K_const(self.T)).unwrap_or(0.0);
        (kf, kr)
    }
}

impl ThermoKineticsEvaluator for MassActionMechanism {
    fn number_of_species(&self) -> usize {
        self.thermo.number_of_species()
    }

    fn set_temperature(&mut self, T: f64) {
        self.T = T;
    }

    fn set_pressure(&mut self, P: f64) {
        self.P = P;
    }

    fn temperature(&self) -> f64 {
        self.T
    }

    fn pressure(&self) -> f64 {
        self.P
    }

    fn molecular_weight_from_mole_fractions(&self, x: &DVector<f64>) -> f64 {
        self.thermo.molecular_weight_from_mole_fractions(x)
    }

    fn mixture_molar_enthalpy(
        &self,
        T: f64,
        _P: f64,
        x: &DVector<f64>,
    ) -> Result<f64, KineticsError> {
        Ok(self.thermo.mixture_molar_enthalpy(T, x)?)
    }

    fn temperature_from_enthalpy_and_mole_fractions(
        &mut self,
        H: f64,
        _P: f64,
        x: &DVector<f64>,
        T_guess: f64,
    ) -> Result<f64, KineticsError> {
        Ok(self.thermo.temperature_from_enthalpy(H, x, T_guess)?)
    }

    fn reaction_rates(&mut self, c: &DVector<f64>) -> Result<(), KineticsError> {
        self.check_ready(c)?;
        let mut rates = DVector::zeros(self.reactions.len());
        for (j, reaction) in self.reactions.iter().enumerate() {
            let (kf, kr) = self.rate_constants(reaction);
            let mut r = kf * concentration_product(c, &reaction.forward_orders, None);
            if kr != 0.0 {
                r -= kr * concentration_product(c, &reaction.nu_products, None);
            }
            rates[j] = r;
        }
        self.formation = &self.stoich_matrix * &rates;
        self.rates = rates;
        Ok(())
    }

    fn formation_rates(&self) -> DVector<f64> {
        self.formation.clone()
    }

    fn derivatives_of_formation_rates(
        &mut self,
        c: &DVector<f64>,
    ) -> Result<DMatrix<f64>, KineticsError> {
        self.check_ready(c)?;
        let n = self.thermo.number_of_species();
        let m = self.reactions.len();
        // ∂rⱼ/∂cₗ, reactions × species
        let mut drdc = DMatrix::zeros(m, n);
        for (j, reaction) in self.reactions.iter().enumerate() {
            let (kf, kr) = self.rate_constants(reaction);
            for l in 0..n {
                let mut d = kf * concentration_product_derivative(c, &reaction.forward_orders, l);
                if kr != 0.0 {
                    d -= kr * concentration_product_derivative(c, &reaction.nu_products, l);
                }
                drdc[(j, l)] = d;
            }
        }
        Ok(&self.stoich_matrix * drdc)
    }
}
