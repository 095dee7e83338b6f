/// Universal gas constant, J/(kmol·K)
pub const R_G: f64 = 8314.462618;

/// per-species thermodynamic models: common interface, error type and the dispatch enum
/// # Examples
/// ```
/// use ReactorODE::Thermodynamics::ConstCpdata::ConstCpdata;
/// use ReactorODE::Thermodynamics::thermo_api::{SpeciesThermo, SpeciesThermoCalculator};
/// let model = SpeciesThermo::ConstantCp(ConstCpdata::new(-1.0e8, 3.0e4));
/// let h = model.dh(298.15).unwrap();
/// assert_eq!(h, -1.0e8);
/// ```
pub mod thermo_api;
/// temperature-independent heat capacity
pub mod ConstCpdata;
/// CHEMKIN (NASA 7-coefficient) polynomials
pub mod NASA7data;
/// ideal-gas mixture: molecular weight, enthalpy, temperature from enthalpy
/// # Examples
/// ```
/// use ReactorODE::Thermodynamics::ConstCpdata::ConstCpdata;
/// use ReactorODE::Thermodynamics::mixture_thermo::MixtureThermo;
/// use ReactorODE::Thermodynamics::thermo_api::SpeciesThermo;
/// use nalgebra::DVector;
/// let mixture = MixtureThermo::new(
///     vec!["A".to_string(), "B".to_string()],
///     vec![28.0, 32.0],
///     vec![
///         SpeciesThermo::ConstantCp(ConstCpdata::new(0.0, 2.9e4)),
///         SpeciesThermo::ConstantCp(ConstCpdata::new(0.0, 2.9e4)),
///     ],
/// )
/// .unwrap();
/// let x = DVector::from_vec(vec![0.5, 0.5]);
/// let H = mixture.mixture_molar_enthalpy(1200.0, &x).unwrap();
/// let T = mixture.temperature_from_enthalpy(H, &x, 300.0).unwrap();
/// assert!((T - 1200.0).abs() < 1e-6);
/// ```
pub mod mixture_thermo;
mod mixture_thermo_tests;
