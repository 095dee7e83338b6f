//! # Ideal-gas mixture thermodynamics
//!
//! [`MixtureThermo`] aggregates the species thermodynamic models of a mechanism and provides
//! the mixture-level quantities needed by a homogeneous reactor:
//! - mean molecular weight from mole fractions, `mw = Σ xᵢ·Mᵢ` (kg/kmol)
//! - mixture molar enthalpy and heat capacity, `h = Σ xᵢ·hᵢ(T)`, `cp = Σ xᵢ·cpᵢ(T)`
//! - temperature from enthalpy and mole fractions: solution of `h(T, x) = H`
//!
//! ## Temperature from enthalpy
//! The inversion is a safeguarded Newton iteration. `cp(T)` is the exact derivative of the
//! residual `h(T) - H`, and a bracket `[lo, hi]` is kept from the admissible temperature
//! bounds; any Newton step leaving the bracket is replaced by bisection. The result is
//! therefore always inside the bounds, and for species with positive heat capacity the
//! iteration converges for any warm start. An enthalpy that cannot be reached inside the
//! bounds is reported as [`ThermoError::EnthalpyOutOfBounds`].
use super::thermo_api::{SpeciesThermo, SpeciesThermoCalculator, ThermoError};
use log::debug;
use nalgebra::DVector;

#[derive(Debug, Clone)]
pub struct MixtureThermo {
    /// species names, define the ordering of every vector
    pub substances: Vec<String>,
    /// molar masses, kg/kmol
    pub molar_masses: DVector<f64>,
    pub species: Vec<SpeciesThermo>,
    /// admissible temperature interval of the inversion
    pub T_min: f64,
    pub T_max: f64,
    /// relative tolerance on temperature
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl MixtureThermo {
    pub fn new(
        substances: Vec<String>,
        molar_masses: Vec<f64>,
        species: Vec<SpeciesThermo>,
    ) -> Result<Self, ThermoError> {
        let n = substances.len();
        if n == 0 {
            return Err(ThermoError::InvalidData("no substances".to_string()));
        }
        if molar_masses.len() != n || species.len() != n {
            return Err(ThermoError::InvalidData(format!(
                "{} substances, {} molar masses, {} thermo models",
                n,
                molar_masses.len(),
                species.len()
            )));
        }
        for (name, M) in substances.iter().zip(molar_masses.iter()) {
            if !(*M > 0.0) || !M.is_finite() {
                return Err(ThermoError::InvalidData(format!(
                    "molar mass of {} must be positive, got {}",
                    name, M
                )));
            }
        }
        // models valid on a common interval only
        let mut T_min = 0.0_f64;
        let mut T_max = f64::INFINITY;
        for (name, model) in substances.iter().zip(species.iter()) {
            model.validate().map_err(|e| {
                ThermoError::InvalidData(format!("{} ({}): {}", name, model.model_name(), e))
            })?;
            let (lo, hi) = model.T_range();
            T_min = T_min.max(lo);
            T_max = T_max.min(hi);
        }
        if !(T_max > T_min) {
            return Err(ThermoError::InvalidTemperatureRange(format!(
                "species thermo ranges do not overlap: {} - {}",
                T_min, T_max
            )));
        }
        Ok(Self {
            substances,
            molar_masses: DVector::from_vec(molar_masses),
            species,
            T_min,
            T_max,
            tolerance: 1e-10,
            max_iterations: 100,
        })
    }

    pub fn number_of_species(&self) -> usize {
        self.substances.len()
    }

    /// narrow the admissible interval of the temperature inversion
    pub fn set_temperature_bounds(&mut self, T_min: f64, T_max: f64) -> Result<(), ThermoError> {
        let (lo, hi) = self
            .species
            .iter()
            .map(|s| s.T_range())
            .fold((0.0_f64, f64::INFINITY), |(lo, hi), (a, b)| {
                (lo.max(a), hi.min(b))
            });
        if !(T_max > T_min) || T_min < lo || T_max > hi {
            return Err(ThermoError::InvalidTemperatureRange(format!(
                "requested {} - {}, models valid on {} - {}",
                T_min, T_max, lo, hi
            )));
        }
        self.T_min = T_min;
        self.T_max = T_max;
        Ok(())
    }

    fn check_composition(&self, x: &DVector<f64>) -> Result<(), ThermoError> {
        if x.len() != self.number_of_species() {
            return Err(ThermoError::InvalidComposition(format!(
                "expected {} mole fractions, got {}",
                self.number_of_species(),
                x.len()
            )));
        }
        Ok(())
    }

    /// mw = Σ xᵢ·Mᵢ, kg/kmol
    pub fn molecular_weight_from_mole_fractions(&self, x: &DVector<f64>) -> f64 {
        x.dot(&self.molar_masses)
    }

    /// xᵢ = (ωᵢ/Mᵢ) / Σ(ωⱼ/Mⱼ)
    pub fn mole_fractions_from_mass_fractions(
        &self,
        w: &DVector<f64>,
    ) -> Result<DVector<f64>, ThermoError> {
        self.check_composition(w)?;
        let moles = w.component_div(&self.molar_masses);
        let total = moles.sum();
        if !(total > 0.0) {
            return Err(ThermoError::InvalidComposition(
                "mass fractions sum to zero".to_string(),
            ));
        }
        Ok(moles / total)
    }

    pub fn species_molar_enthalpies(&self, T: f64) -> Result<DVector<f64>, ThermoError> {
        let h: Result<Vec<f64>, ThermoError> = self.species.iter().map(|s| s.dh(T)).collect();
        Ok(DVector::from_vec(h?))
    }

    pub fn species_molar_heat_capacities(&self, T: f64) -> Result<DVector<f64>, ThermoError> {
        let cp: Result<Vec<f64>, ThermoError> = self.species.iter().map(|s| s.Cp(T)).collect();
        Ok(DVector::from_vec(cp?))
    }

    /// h = Σ xᵢ·hᵢ(T), J/kmol
    pub fn mixture_molar_enthalpy(&self, T: f64, x: &DVector<f64>) -> Result<f64, ThermoError> {
        self.check_composition(x)?;
        Ok(x.dot(&self.species_molar_enthalpies(T)?))
    }

    /// cp = Σ xᵢ·cpᵢ(T), J/(kmol·K)
    pub fn mixture_molar_cp(&self, T: f64, x: &DVector<f64>) -> Result<f64, ThermoError> {
        self.check_composition(x)?;
        Ok(x.dot(&self.species_molar_heat_capacities(T)?))
    }

    /// Solves h(T, x) = H for T, H in J/kmol, starting from `T_guess`.
    pub fn temperature_from_enthalpy(
        &self,
        H: f64,
        x: &DVector<f64>,
        T_guess: f64,
    ) -> Result<f64, ThermoError> {
        self.check_composition(x)?;
        if !H.is_finite() {
            return Err(ThermoError::InvalidData(format!(
                "enthalpy must be finite, got {}",
                H
            )));
        }
        let residual = |T: f64| -> Result<f64, ThermoError> {
            Ok(self.mixture_molar_enthalpy(T, x)? - H)
        };

        let (mut lo, mut hi) = (self.T_min, self.T_max);
        let r_lo = residual(lo)?;
        let r_hi = residual(hi)?;
        if r_lo > 0.0 || r_hi < 0.0 {
            return Err(ThermoError::EnthalpyOutOfBounds {
                H,
                T_min: lo,
                T_max: hi,
            });
        }
        if r_lo == 0.0 {
            return Ok(lo);
        }
        if r_hi == 0.0 {
            return Ok(hi);
        }

        let mut T = if T_guess.is_finite() && T_guess > lo && T_guess < hi {
            T_guess
        } else {
            0.5 * (lo + hi)
        };
        let mut r = residual(T)?;
        for iteration in 0..self.max_iterations {
            if r == 0.0 {
                return Ok(T);
            }
            if r > 0.0 {
                hi = T;
            } else {
                lo = T;
            }
            let cp = self.mixture_molar_cp(T, x)?;
            let newton = T - r / cp;
            let T_new = if cp > 0.0 && newton.is_finite() && newton > lo && newton < hi {
                newton
            } else {
                0.5 * (lo + hi)
            };
            let step = (T_new - T).abs();
            T = T_new;
            r = residual(T)?;
            if step <= self.tolerance * T || (hi - lo) <= self.tolerance * T {
                debug!(
                    "temperature from enthalpy: T = {} K after {} iterations",
                    T,
                    iteration + 1
                );
                return Ok(T);
            }
        }
        Err(ThermoError::NotConverged {
            iterations: self.max_iterations,
            T,
            residual: r,
        })
    }
}
