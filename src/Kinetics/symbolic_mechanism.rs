//! # Symbolic mechanism
//!
//! Evaluator whose reaction rates are arbitrary symbolic expressions (RustedSciThe `Expr`)
//! of the concentrations `C0, C1, ..., C{N-1}` and the temperature `T`. Useful for empirical
//! or fractional-order rate laws that do not fit the mass-action form.
//!
//! Formation rates are `Rᵢ = ∑ⱼ νᵢⱼ·rⱼ` with ν taken from the reaction equations. The Jacobian
//! is exact: every `∂rⱼ/∂Cₗ` is obtained by symbolic differentiation once, at construction,
//! and then lambdified, so the evaluation cost during integration is that of plain closures.
//!
//! ```rust, ignore
//! let T = SymbolicMechanism::T_var();
//! let c0 = SymbolicMechanism::conc_var(0);
//! // A => B with r = k(T)·C0^1.5
//! let rate = SymbolicMechanism::arrhenius_expr(1.0e3, 0.0, 5.0e7, T) * c0.pow(Expr::Const(1.5));
//! let mech = SymbolicMechanism::new(thermo, vec![("A=>B".to_string(), rate)])?;
//! ```
use super::evaluator_api::{KineticsError, ThermoKineticsEvaluator};
use super::reaction_parser::parse_equation;
use crate::Thermodynamics::R_G;
use crate::Thermodynamics::mixture_thermo::MixtureThermo;
use RustedSciThe::symbolic::symbolic_engine::Expr;
use log::info;
use nalgebra::{DMatrix, DVector};

type RateFn = Box<dyn Fn(&[f64]) -> f64 + Send + Sync>;

pub struct SymbolicReaction {
    pub equation: String,
    pub rate: Expr,
    rate_fn: RateFn,
    /// (species index, ∂r/∂C_l)
    derivatives: Vec<(usize, RateFn)>,
}

pub struct SymbolicMechanism {
    pub thermo: MixtureThermo,
    pub reactions: Vec<SymbolicReaction>,
    /// ν = ν'' - ν', species × reactions
    pub stoich_matrix: DMatrix<f64>,
    T: f64,
    P: f64,
    rates: DVector<f64>,
    formation: DVector<f64>,
}

fn lambdify(expr: &Expr, vars: &[String]) -> RateFn {
    let vars: Vec<&str> = vars.iter().map(|s| s.as_str()).collect();
    expr.lambdify_borrowed_thread_safe(&vars)
}

impl SymbolicMechanism {
    pub fn conc_name(i: usize) -> String {
        format!("C{}", i)
    }

    pub fn conc_var(i: usize) -> Expr {
        Expr::Var(Self::conc_name(i))
    }

    pub fn T_var() -> Expr {
        Expr::Var("T".to_owned())
    }

    /// A·T^n·exp(-E/(R·T))
    pub fn arrhenius_expr(A: f64, n: f64, E: f64, T: Expr) -> Expr {
        let k0 = Expr::Const(A) * T.clone().pow(Expr::Const(n));
        k0 * (Expr::Const(-E) / (Expr::Const(R_G) * T)).exp()
    }

    pub fn new(
        thermo: MixtureThermo,
        reactions: Vec<(String, Expr)>,
    ) -> Result<Self, KineticsError> {
        if reactions.is_empty() {
            return Err(KineticsError::InvalidParameters(
                "mechanism without reactions".to_string(),
            ));
        }
        let n = thermo.number_of_species();
        let m = reactions.len();
        // argument order of every lambdified closure: T, C0, ..., C{N-1}
        let mut vars = vec!["T".to_string()];
        vars.extend((0..n).map(Self::conc_name));

        let mut stoich_matrix = DMatrix::zeros(n, m);
        let mut symbolic = Vec::with_capacity(m);
        for (j, (equation, rate)) in reactions.into_iter().enumerate() {
            let parsed = parse_equation(&equation)?;
            let (nu_reactants, nu_products) = parsed.stoichiometry(&thermo.substances)?;
            stoich_matrix.set_column(j, &(nu_products - nu_reactants));

            let arguments: Vec<String> = rate
                .all_arguments_are_variables()
                .iter()
                .map(|v| v.trim().to_string())
                .collect();
            if let Some(unknown) = arguments.iter().find(|v| !vars.contains(*v)) {
                return Err(KineticsError::InvalidParameters(format!(
                    "rate of '{}' depends on unknown variable '{}'",
                    equation, unknown
                )));
            }
            let mut derivatives = Vec::new();
            for l in 0..n {
                let name = Self::conc_name(l);
                if arguments.contains(&name) {
                    let d = rate.diff(&name);
                    derivatives.push((l, lambdify(&d, &vars)));
                }
            }
            let rate_fn = lambdify(&rate, &vars);
            symbolic.push(SymbolicReaction {
                equation,
                rate,
                rate_fn,
                derivatives,
            });
        }
        info!("symbolic mechanism: {} species, {} reactions", n, m);
        Ok(Self {
            thermo,
            reactions: symbolic,
            stoich_matrix,
            T: f64::NAN,
            P: f64::NAN,
            rates: DVector::zeros(m),
            formation: DVector::zeros(n),
        })
    }

    fn arguments(&self, c: &DVector<f64>) -> Result<Vec<f64>, KineticsError> {
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
        let mut args = Vec::with_capacity(c.len() + 1);
        args.push(self.T);
        args.extend(c.iter().copied());
        Ok(args)
    }

    pub fn rates(&self) -> &DVector<f64> {
        &self.rates
    }
}

impl ThermoKineticsEvaluator for SymbolicMechanism {
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
        let args = self.arguments(c)?;
        let rates = DVector::from_iterator(
            self.reactions.len(),
            self.reactions.iter().map(|r| (r.rate_fn)(&args)),
        );
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
        let args = self.arguments(c)?;
        let n = self.thermo.number_of_species();
        let mut drdc = DMatrix::zeros(self.reactions.len(), n);
        for (j, reaction) in self.reactions.iter().enumerate() {
            for (l, derivative) in &reaction.derivatives {
                drdc[(j, *l)] = derivative(&args);
            }
        }
        Ok(&self.stoich_matrix * drdc)
    }
}
