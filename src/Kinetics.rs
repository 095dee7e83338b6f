/// eng
/// Thermodynamics + kinetics evaluator contract used by the reactor kernel, together with the
/// error type shared by all kinetic models. Any type implementing `ThermoKineticsEvaluator`
/// can drive a `BatchReactorODE`.
pub mod evaluator_api;
/// eng
/// The module takes as input a reaction equation specified as String, e.g. "2H2 + O2 => 2H2O",
/// and produces the lists of reactants and products with their stoichiometric coefficients,
/// the reversibility flag and, for a given species ordering, the vectors ν' and ν''.
pub mod reaction_parser;
/// eng
/// Ideal-gas mechanism of Arrhenius-type reactions with mass-action (or user-defined order)
/// rate laws and an analytic Jacobian of the formation rates.
/// # Examples
/// ```
/// use ReactorODE::Kinetics::evaluator_api::ThermoKineticsEvaluator;
/// use ReactorODE::Kinetics::mass_action_mechanism::{MassActionMechanism, ReactionInput};
/// use ReactorODE::Thermodynamics::ConstCpdata::ConstCpdata;
/// use ReactorODE::Thermodynamics::mixture_thermo::MixtureThermo;
/// use ReactorODE::Thermodynamics::thermo_api::SpeciesThermo;
/// use nalgebra::DVector;
/// let thermo = MixtureThermo::new(
///     vec!["A".to_string(), "B".to_string()],
///     vec![30.0, 30.0],
///     vec![
///         SpeciesThermo::ConstantCp(ConstCpdata::new(0.0, 3.0e4)),
///         SpeciesThermo::ConstantCp(ConstCpdata::new(0.0, 3.0e4)),
///     ],
/// )
/// .unwrap();
/// let mut mech =
///     MassActionMechanism::new(thermo, &[ReactionInput::irreversible("A=>B", 2.0, 0.0, 0.0)]).unwrap();
/// mech.set_temperature(1000.0);
/// mech.reaction_rates(&DVector::from_vec(vec![1.0, 0.0])).unwrap();
/// assert_eq!(mech.formation_rates().as_slice(), &[-2.0, 2.0]);
/// ```
pub mod mass_action_mechanism;
/// eng
/// Mechanism whose rate laws are symbolic expressions of concentrations and temperature;
/// the Jacobian is obtained by symbolic differentiation (RustedSciThe)
pub mod symbolic_mechanism;
