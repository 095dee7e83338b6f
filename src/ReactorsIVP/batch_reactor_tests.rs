#[cfg(test)]
mod tests {
    use crate::Kinetics::evaluator_api::{KineticsError, ThermoKineticsEvaluator};
    use crate::Kinetics::mass_action_mechanism::{Arrhenius, MassActionMechanism, ReactionInput};
    use crate::ReactorsIVP::BatchReactorODE::{
        BatchReactorODE, OdeSystem, ReactorError, ReactorMode, ReactorParameters,
        clamp_concentrations,
    };
    use crate::ReactorsIVP::stiff_solver::{BackwardEulerSolver, SolverParams};
    use crate::Thermodynamics::ConstCpdata::ConstCpdata;
    use crate::Thermodynamics::R_G;
    use crate::Thermodynamics::mixture_thermo::MixtureThermo;
    use crate::Thermodynamics::thermo_api::SpeciesThermo;
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};
    use std::collections::HashMap;

    const CP: f64 = 3.0e4;
    const T_REF: f64 = 298.15;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Inversion {
        Exact,
        Fails,
        ReturnsNaN,
    }

    /// Linear kinetics R = K·c, constant-cp thermo with closed-form inversion,
    /// records every call it receives
    struct RecordingStub {
        calls: Vec<&'static str>,
        guesses: Vec<f64>,
        T: f64,
        P: f64,
        molar_masses: DVector<f64>,
        h_ref: DVector<f64>,
        K: DMatrix<f64>,
        inversion: Inversion,
        formation: DVector<f64>,
    }

    impl RecordingStub {
        fn new(K: DMatrix<f64>, h_ref: Vec<f64>) -> Self {
            let n = K.nrows();
            Self {
                calls: Vec::new(),
                guesses: Vec::new(),
                T: f64::NAN,
                P: f64::NAN,
                molar_masses: DVector::from_element(n, 30.0),
                h_ref: DVector::from_vec(h_ref),
                K,
                inversion: Inversion::Exact,
                formation: DVector::zeros(n),
            }
        }

        fn decay() -> Self {
            // A -> B with k = 1
            Self::new(
                DMatrix::from_row_slice(2, 2, &[-1.0, 0.0, 1.0, 0.0]),
                vec![0.0, -5.0e7],
            )
        }
    }

    impl ThermoKineticsEvaluator for RecordingStub {
        fn number_of_species(&self) -> usize {
            self.K.nrows()
        }
        fn set_temperature(&mut self, T: f64) {
            self.calls.push("set_temperature");
            self.T = T;
        }
        fn set_pressure(&mut self, P: f64) {
            self.calls.push("set_pressure");
            self.P = P;
        }
        fn temperature(&self) -> f64 {
            self.T
        }
        fn pressure(&self) -> f64 {
            self.P
        }
        fn molecular_weight_from_mole_fractions(&self, x: &DVector<f64>) -> f64 {
            x.dot(&self.molar_masses)
        }
        fn mixture_molar_enthalpy(
            &self,
            T: f64,
            _P: f64,
            x: &DVector<f64>,
        ) -> Result<f64, KineticsError> {
            Ok(x.dot(&self.h_ref) + CP * (T - T_REF))
        }
        fn temperature_from_enthalpy_and_mole_fractions(
            &mut self,
            H: f64,
            _P: f64,
            x: &DVector<f64>,
            T_guess: f64,
        ) -> Result<f64, KineticsError> {
            self.calls.push("temperature_from_enthalpy");
            self.guesses.push(T_guess);
            match self.inversion {
                Inversion::Exact => Ok(T_REF + (H - x.dot(&self.h_ref)) / CP),
                Inversion::Fails => Err(KineticsError::InvalidParameters(
                    "inversion diverged".to_string(),
                )),
                Inversion::ReturnsNaN => Ok(f64::NAN),
            }
        }
        fn reaction_rates(&mut self, c: &DVector<f64>) -> Result<(), KineticsError> {
            self.calls.push("reaction_rates");
            self.formation = &self.K * c;
            Ok(())
        }
        fn formation_rates(&self) -> DVector<f64> {
            self.formation.clone()
        }
        fn derivatives_of_formation_rates(
            &mut self,
            _c: &DVector<f64>,
        ) -> Result<DMatrix<f64>, KineticsError> {
            self.calls.push("derivatives_of_formation_rates");
            Ok(self.K.clone())
        }
    }

    fn const_cp_thermo(names: &[&str], h_ref: &[f64]) -> MixtureThermo {
        MixtureThermo::new(
            names.iter().map(|s| s.to_string()).collect(),
            vec![30.0; names.len()],
            h_ref
                .iter()
                .map(|h| SpeciesThermo::ConstantCp(ConstCpdata::new(*h, CP)))
                .collect(),
        )
        .unwrap()
    }

    fn decay_mechanism() -> MassActionMechanism {
        MassActionMechanism::new(
            const_cp_thermo(&["A", "B"], &[0.0, -5.0e7]),
            &[ReactionInput::irreversible("A=>B", 1.0, 0.0, 0.0)],
        )
        .unwrap()
    }

    fn three_species_mechanism() -> MassActionMechanism {
        MassActionMechanism::new(
            const_cp_thermo(&["A", "B", "C"], &[0.0, -1.0e7, -3.0e7]),
            &[
                ReactionInput::irreversible("A + B => C", 4.0, 0.0, 0.0),
                ReactionInput::irreversible("C => A", 0.3, 0.0, 0.0),
                ReactionInput {
                    eq: "2A <=> B".to_string(),
                    forward: Arrhenius::new(1.5, 0.0, 0.0),
                    reverse: Some(Arrhenius::new(0.2, 0.0, 0.0)),
                    orders: None,
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_first_order_decay_end_to_end() {
        let mut reactor = BatchReactorODE::isothermal(decay_mechanism(), 1000.0).unwrap();
        assert_eq!(reactor.n_eqns(), 2);
        let y = DVector::from_vec(vec![1.0, 0.0]);
        let dcdt = reactor.derivatives(0.0, &y).unwrap();
        assert_relative_eq!(dcdt[0], -1.0, epsilon = 1e-14);
        assert_relative_eq!(dcdt[1], 1.0, epsilon = 1e-14);

        let (dfdt, J) = reactor.jacobian(0.0, &y).unwrap();
        assert_eq!(dfdt, DVector::zeros(2));
        let expected = DMatrix::from_row_slice(2, 2, &[-1.0, 0.0, 1.0, 0.0]);
        for (a, b) in J.iter().zip(expected.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_output_finite_for_any_positive_state() {
        let mut reactor = BatchReactorODE::isothermal(three_species_mechanism(), 900.0).unwrap();
        let states = [
            vec![1.0, 0.0, 0.0],
            vec![0.0, 0.0, 1e-30],
            vec![-1e-12, 2.0, 0.0],
            vec![1e3, 1e-8, 5.0],
        ];
        for s in states {
            let y = DVector::from_vec(s);
            let dcdt = reactor.derivatives(0.0, &y).unwrap();
            assert_eq!(dcdt.len(), 3);
            assert!(dcdt.iter().all(|v| v.is_finite()));
            let (_, J) = reactor.jacobian(0.0, &y).unwrap();
            assert!(J.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_clamping_is_exact_and_idempotent() {
        let noisy = DVector::from_vec(vec![0.5, -1.0e-3, 0.2]);
        let clean = DVector::from_vec(vec![0.5, 0.0, 0.2]);
        assert_eq!(clamp_concentrations(&noisy), clean);

        let mut reactor = BatchReactorODE::isothermal(three_species_mechanism(), 1100.0).unwrap();
        let noisy_copy = noisy.clone();
        let d_noisy = reactor.derivatives(0.0, &noisy).unwrap();
        let (_, J_noisy) = reactor.jacobian(0.0, &noisy).unwrap();
        let d_clean = reactor.derivatives(0.0, &clean).unwrap();
        let (_, J_clean) = reactor.jacobian(0.0, &clean).unwrap();
        assert_eq!(d_noisy, d_clean);
        assert_eq!(J_noisy, J_clean);
        // the caller's vector is left alone
        assert_eq!(noisy, noisy_copy);

        // adiabatic: same composition after clamping, same temperature
        let mech = three_species_mechanism();
        let mut reactor = BatchReactorODE::adiabatic(mech, 1000.0, 1.0e5, 1.0e6).unwrap();
        let d_noisy = reactor.derivatives(0.0, &noisy).unwrap();
        let T_noisy = reactor.last_resolved().unwrap().T;
        let d_clean = reactor.derivatives(0.0, &clean).unwrap();
        let T_clean = reactor.last_resolved().unwrap().T;
        assert_relative_eq!(T_noisy, T_clean, max_relative = 1e-9);
        for (a, b) in d_noisy.iter().zip(d_clean.iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_half_order_decay_integrates_past_depletion() {
        // dc_A/dt = -sqrt(c_A) runs out at t = 2
        let mut orders = HashMap::new();
        orders.insert("A".to_string(), 0.5);
        let mechanism = MassActionMechanism::new(
            const_cp_thermo(&["A", "B"], &[0.0, -5.0e7]),
            &[ReactionInput {
                orders: Some(orders),
                ..ReactionInput::irreversible("A=>B", 1.0, 0.0, 0.0)
            }],
        )
        .unwrap();
        let mut reactor = BatchReactorODE::isothermal(mechanism, 1000.0).unwrap();

        let depleted = DVector::from_vec(vec![0.0, 1.0]);
        assert!(reactor.derivatives(0.0, &depleted).is_ok());
        let (_, J) = reactor.jacobian(0.0, &depleted).unwrap();
        assert!(J.iter().all(|v| v.is_finite()));

        let params = SolverParams {
            rtol: 1e-4,
            atol: 1e-8,
            ..SolverParams::default()
        };
        let mut solver = BackwardEulerSolver::new(params).unwrap();
        let y0 = DVector::from_vec(vec![1.0, 0.0]);
        let sol = solver.solve(&mut reactor, 0.0, 3.0, &y0).unwrap();
        assert_eq!(*sol.t.last().unwrap(), 3.0);
        let y_end = sol.y.last().unwrap();
        assert!(y_end[0].abs() < 1e-8);
        assert_relative_eq!(y_end[1], 1.0, epsilon = 1e-8);
        for y in &sol.y {
            assert_relative_eq!(y[0] + y[1], 1.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_jacobian_matches_finite_differences() {
        let mut reactor = BatchReactorODE::isothermal(three_species_mechanism(), 1000.0).unwrap();
        let y = DVector::from_vec(vec![0.7, 0.4, 0.25]);
        let (_, J) = reactor.jacobian(0.0, &y).unwrap();
        let n = y.len();
        for l in 0..n {
            let h = 1e-6 * y[l];
            let mut plus = y.clone();
            plus[l] += h;
            let mut minus = y.clone();
            minus[l] -= h;
            let f_plus = reactor.derivatives(0.0, &plus).unwrap();
            let f_minus = reactor.derivatives(0.0, &minus).unwrap();
            for i in 0..n {
                let fd = (f_plus[i] - f_minus[i]) / (2.0 * h);
                assert_relative_eq!(J[(i, l)], fd, max_relative = 1e-4, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_isothermal_pressure_from_ideal_gas() {
        let T = 1234.5;
        let mut reactor = BatchReactorODE::isothermal(three_species_mechanism(), T).unwrap();
        let y = DVector::from_vec(vec![0.01, 0.002, -1e-9]);
        reactor.derivatives(0.0, &y).unwrap();
        let state = reactor.last_resolved().unwrap().clone();
        let c_tot = 0.012;
        assert_relative_eq!(state.c_tot, c_tot, max_relative = 1e-14);
        assert_relative_eq!(state.P, c_tot * R_G * T, max_relative = 1e-14);
        assert_relative_eq!(reactor.evaluator().pressure(), c_tot * R_G * T, max_relative = 1e-14);
        assert_eq!(reactor.evaluator().temperature(), T);
    }

    #[test]
    fn test_adiabatic_temperature_consistent_with_enthalpy() {
        let T0 = 1000.0;
        let P0 = 1.0e5;
        let c0 = DVector::from_vec(vec![P0 / (R_G * T0), 0.0]);
        let mut reactor =
            BatchReactorODE::adiabatic_from_initial_state(decay_mechanism(), T0, P0, &c0).unwrap();
        let H = match reactor.params().mode {
            ReactorMode::Adiabatic { H, .. } => H,
            ReactorMode::Isothermal { .. } => panic!("expected adiabatic mode"),
        };
        // pure A at T0: h = cp·(T0 - T_ref), mw = 30
        assert_relative_eq!(H, CP * (T0 - T_REF) / 30.0, max_relative = 1e-12);

        // initial state resolves back to T0
        reactor.derivatives(0.0, &c0).unwrap();
        assert_relative_eq!(reactor.last_resolved().unwrap().T, T0, max_relative = 1e-9);

        // half converted: h_mix = -2.5e7 + cp·(T - T_ref) = H·mw
        let y = DVector::from_vec(vec![0.5, 0.5]);
        reactor.derivatives(0.0, &y).unwrap();
        let state = reactor.last_resolved().unwrap().clone();
        let expected_T = T_REF + (CP * (T0 - T_REF) + 2.5e7) / CP;
        assert_relative_eq!(state.T, expected_T, max_relative = 1e-9);
        assert_relative_eq!(expected_T, 1833.33, epsilon = 0.01);
        let h = reactor
            .evaluator()
            .mixture_molar_enthalpy(state.T, state.P, &state.x)
            .unwrap();
        assert_relative_eq!(h, H * state.mw, max_relative = 1e-9);
        assert_eq!(state.P, P0);
        assert_eq!(reactor.evaluator().pressure(), P0);
        assert_relative_eq!(reactor.evaluator().temperature(), expected_T, max_relative = 1e-9);
    }

    #[test]
    fn test_degenerate_and_invalid_states() {
        let mut reactor = BatchReactorODE::isothermal(decay_mechanism(), 1000.0).unwrap();
        let zeros = DVector::from_vec(vec![0.0, 0.0]);
        assert!(matches!(
            reactor.derivatives(0.0, &zeros),
            Err(ReactorError::DegenerateState(_))
        ));
        assert!(matches!(
            reactor.jacobian(0.0, &zeros),
            Err(ReactorError::DegenerateState(_))
        ));
        let negative = DVector::from_vec(vec![-1.0, -2.0]);
        assert!(matches!(
            reactor.derivatives(0.0, &negative),
            Err(ReactorError::DegenerateState(_))
        ));
        let nan = DVector::from_vec(vec![f64::NAN, 1.0]);
        assert!(matches!(
            reactor.derivatives(0.0, &nan),
            Err(ReactorError::NonFiniteState(_))
        ));
        let short = DVector::from_vec(vec![1.0]);
        assert!(matches!(
            reactor.derivatives(0.0, &short),
            Err(ReactorError::DimensionMismatch {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn test_dfdt_is_zero() {
        let mut reactor = BatchReactorODE::adiabatic(RecordingStub::decay(), 1000.0, 1.0e5, 7.0e5)
            .unwrap();
        for (t, s) in [(0.0, vec![1.0, 0.0]), (3.5, vec![0.2, 0.8]), (1e3, vec![1e-9, 1.0])] {
            let (dfdt, _) = reactor.jacobian(t, &DVector::from_vec(s)).unwrap();
            assert!(dfdt.iter().all(|v| *v == 0.0));
        }
    }

    #[test]
    fn test_evaluator_call_sequence() {
        let mut reactor = BatchReactorODE::adiabatic(RecordingStub::decay(), 1000.0, 1.0e5, 7.0e5)
            .unwrap();
        let y = DVector::from_vec(vec![0.6, 0.4]);
        reactor.derivatives(0.0, &y).unwrap();
        assert_eq!(
            reactor.evaluator().calls,
            vec![
                "temperature_from_enthalpy",
                "set_temperature",
                "set_pressure",
                "reaction_rates"
            ]
        );
        reactor.evaluator_mut().calls.clear();
        reactor.jacobian(0.0, &y).unwrap();
        assert_eq!(
            reactor.evaluator().calls,
            vec![
                "temperature_from_enthalpy",
                "set_temperature",
                "set_pressure",
                "derivatives_of_formation_rates"
            ]
        );

        let mut reactor = BatchReactorODE::isothermal(RecordingStub::decay(), 800.0).unwrap();
        reactor.jacobian(0.0, &y).unwrap();
        assert_eq!(
            reactor.evaluator().calls,
            vec![
                "set_temperature",
                "set_pressure",
                "derivatives_of_formation_rates"
            ]
        );
    }

    #[test]
    fn test_warm_start_follows_last_temperature() {
        let mut reactor = BatchReactorODE::adiabatic(RecordingStub::decay(), 1000.0, 1.0e5, 7.0e5)
            .unwrap();
        assert_eq!(reactor.warm_start_temperature(), 1000.0);
        let y1 = DVector::from_vec(vec![0.9, 0.1]);
        let y2 = DVector::from_vec(vec![0.3, 0.7]);
        reactor.derivatives(0.0, &y1).unwrap();
        let T1 = reactor.last_resolved().unwrap().T;
        assert_eq!(reactor.warm_start_temperature(), T1);
        reactor.jacobian(0.0, &y2).unwrap();
        assert_eq!(reactor.evaluator().guesses, vec![1000.0, T1]);

        reactor.set_start_temperature(1500.0).unwrap();
        reactor.derivatives(0.0, &y1).unwrap();
        assert_eq!(reactor.evaluator().guesses.last(), Some(&1500.0));
    }

    #[test]
    fn test_failed_inversion_is_reported() {
        let mut stub = RecordingStub::decay();
        stub.inversion = Inversion::Fails;
        let mut reactor = BatchReactorODE::adiabatic(stub, 1000.0, 1.0e5, 7.0e5).unwrap();
        let y = DVector::from_vec(vec![0.5, 0.5]);
        assert!(matches!(
            reactor.derivatives(0.0, &y),
            Err(ReactorError::EvaluatorFailure(KineticsError::InvalidParameters(_)))
        ));
        // nothing reached the kinetics
        assert!(!reactor.evaluator().calls.contains(&"reaction_rates"));

        let mut stub = RecordingStub::decay();
        stub.inversion = Inversion::ReturnsNaN;
        let mut reactor = BatchReactorODE::adiabatic(stub, 1000.0, 1.0e5, 7.0e5).unwrap();
        assert!(matches!(
            reactor.jacobian(0.0, &y),
            Err(ReactorError::EvaluatorFailure(KineticsError::InvalidTemperature(_)))
        ));
        assert_eq!(reactor.warm_start_temperature(), 1000.0);

        // a finite temperature outside the configured bounds is rejected as well
        let mut reactor =
            BatchReactorODE::adiabatic(RecordingStub::decay(), 1000.0, 1.0e5, 7.0e5).unwrap();
        reactor.set_temperature_bounds(300.0, 500.0).unwrap();
        assert!(matches!(
            reactor.derivatives(0.0, &y),
            Err(ReactorError::EvaluatorFailure(KineticsError::InvalidTemperature(_)))
        ));
    }

    #[test]
    fn test_real_thermo_out_of_range_is_evaluator_failure() {
        // enthalpy far above anything reachable below 10000 K
        let mut reactor = BatchReactorODE::adiabatic(decay_mechanism(), 1000.0, 1.0e5, 1.0e9)
            .unwrap();
        let y = DVector::from_vec(vec![1.0, 0.0]);
        assert!(matches!(
            reactor.derivatives(0.0, &y),
            Err(ReactorError::EvaluatorFailure(KineticsError::Thermo(_)))
        ));
    }

    #[test]
    fn test_borrowed_and_boxed_evaluators() {
        let mut mech = decay_mechanism();
        {
            let mut reactor = BatchReactorODE::isothermal(&mut mech, 750.0).unwrap();
            reactor
                .derivatives(0.0, &DVector::from_vec(vec![1.0, 1.0]))
                .unwrap();
        }
        assert_eq!(mech.temperature(), 750.0);
        assert_relative_eq!(mech.pressure(), 2.0 * R_G * 750.0, max_relative = 1e-14);

        let boxed: Box<dyn ThermoKineticsEvaluator> = Box::new(decay_mechanism());
        let mut reactor = BatchReactorODE::isothermal(boxed, 750.0).unwrap();
        let dcdt = reactor
            .derivatives(0.0, &DVector::from_vec(vec![2.0, 0.0]))
            .unwrap();
        assert_relative_eq!(dcdt[0], -2.0, epsilon = 1e-14);
        let evaluator = reactor.into_evaluator();
        assert_eq!(evaluator.temperature(), 750.0);
    }

    #[test]
    fn test_parameter_setters_and_validation() {
        let mut reactor = BatchReactorODE::isothermal(decay_mechanism(), 1000.0).unwrap();
        assert!(matches!(
            reactor.set_enthalpy(1.0),
            Err(ReactorError::InvalidConfiguration(_))
        ));
        assert!(reactor.set_pressure(1.0e5).is_err());
        reactor.set_fixed_temperature(500.0).unwrap();
        assert_eq!(reactor.params().mode, ReactorMode::Isothermal { T: 500.0 });
        assert!(reactor.set_fixed_temperature(-1.0).is_err());
        assert_eq!(reactor.params().mode, ReactorMode::Isothermal { T: 500.0 });

        let mut reactor = BatchReactorODE::adiabatic(decay_mechanism(), 1000.0, 1.0e5, 0.0).unwrap();
        reactor.set_pressure(2.0e5).unwrap();
        reactor.set_enthalpy(-1.0e5).unwrap();
        assert_eq!(
            reactor.params().mode,
            ReactorMode::Adiabatic { P: 2.0e5, H: -1.0e5 }
        );
        assert!(reactor.set_fixed_temperature(300.0).is_err());
        assert!(reactor.set_pressure(0.0).is_err());
        assert!(reactor.set_start_temperature(f64::NAN).is_err());

        let bad = ReactorParameters::new(ReactorMode::Adiabatic { P: 1.0e5, H: f64::NAN }, 1000.0);
        assert!(BatchReactorODE::new(decay_mechanism(), bad).is_err());
        assert!(BatchReactorODE::isothermal(decay_mechanism(), 0.0).is_err());
    }
}
