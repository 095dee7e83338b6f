#[cfg(test)]
mod tests {
    use crate::Thermodynamics::ConstCpdata::ConstCpdata;
    use crate::Thermodynamics::NASA7data::NASA7data;
    use crate::Thermodynamics::mixture_thermo::MixtureThermo;
    use crate::Thermodynamics::thermo_api::{SpeciesThermo, ThermoError};
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    fn two_species_const_cp() -> MixtureThermo {
        MixtureThermo::new(
            vec!["A".to_string(), "B".to_string()],
            vec![30.0, 30.0],
            vec![
                SpeciesThermo::ConstantCp(ConstCpdata::new(0.0, 3.0e4)),
                SpeciesThermo::ConstantCp(ConstCpdata::new(-5.0e7, 3.0e4)),
            ],
        )
        .unwrap()
    }

    fn oxygen_nitrogen() -> MixtureThermo {
        let o2 = NASA7data::from_chemkin(
            200.0,
            1000.0,
            3500.0,
            [
                3.28253784e+00,
                1.48308754e-03,
                -7.57966669e-07,
                2.09470555e-10,
                -2.16717794e-14,
                -1.08845772e+03,
                5.45323129e+00,
            ],
            [
                3.78245636e+00,
                -2.99673416e-03,
                9.84730201e-06,
                -9.68129509e-09,
                3.24372837e-12,
                -1.06394356e+03,
                3.65767573e+00,
            ],
        )
        .unwrap();
        let n2 = NASA7data::from_chemkin(
            300.0,
            1000.0,
            5000.0,
            [
                0.02926640e+02,
                0.14879768e-02,
                -0.05684760e-05,
                0.10097038e-09,
                -0.06753351e-13,
                -0.09227977e+04,
                0.05980528e+02,
            ],
            [
                0.03298677e+02,
                0.14082404e-02,
                -0.03963222e-04,
                0.05641515e-07,
                -0.02444854e-10,
                -0.10208999e+04,
                0.03950372e+02,
            ],
        )
        .unwrap();
        MixtureThermo::new(
            vec!["O2".to_string(), "N2".to_string()],
            vec![31.998, 28.014],
            vec![SpeciesThermo::NASA7(o2), SpeciesThermo::NASA7(n2)],
        )
        .unwrap()
    }

    #[test]
    fn test_common_temperature_range() {
        let air = oxygen_nitrogen();
        assert_eq!(air.T_min, 300.0);
        assert_eq!(air.T_max, 3500.0);
        let mixture = two_species_const_cp();
        assert_eq!(mixture.T_min, 100.0);
        assert_eq!(mixture.T_max, 10000.0);
    }

    #[test]
    fn test_molecular_weight_and_mole_fractions() {
        let air = oxygen_nitrogen();
        let x = DVector::from_vec(vec![0.21, 0.79]);
        let mw = air.molecular_weight_from_mole_fractions(&x);
        assert_relative_eq!(mw, 0.21 * 31.998 + 0.79 * 28.014, epsilon = 1e-12);

        let w = DVector::from_vec(vec![0.21 * 31.998 / mw, 0.79 * 28.014 / mw]);
        let x_back = air.mole_fractions_from_mass_fractions(&w).unwrap();
        assert_relative_eq!(x_back[0], 0.21, epsilon = 1e-12);
        assert_relative_eq!(x_back[1], 0.79, epsilon = 1e-12);
    }

    #[test]
    fn test_temperature_from_enthalpy_closed_form() {
        let mixture = two_species_const_cp();
        let x = DVector::from_vec(vec![0.5, 0.5]);
        // h(T) = 3e4*(T - 298.15) - 2.5e7
        let T_expected = 1833.0;
        let H = 3.0e4 * (T_expected - 298.15) - 2.5e7;
        for guess in [300.0, 1000.0, 5000.0, f64::NAN] {
            let T = mixture.temperature_from_enthalpy(H, &x, guess).unwrap();
            assert_relative_eq!(T, T_expected, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_temperature_from_enthalpy_nasa() {
        let air = oxygen_nitrogen();
        let x = DVector::from_vec(vec![0.21, 0.79]);
        for T_true in [350.0, 999.0, 1001.0, 2500.0] {
            let H = air.mixture_molar_enthalpy(T_true, &x).unwrap();
            let T = air.temperature_from_enthalpy(H, &x, 1200.0).unwrap();
            assert_relative_eq!(T, T_true, max_relative = 1e-8);
            let H_back = air.mixture_molar_enthalpy(T, &x).unwrap();
            assert_relative_eq!(H_back, H, max_relative = 1e-8, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_temperature_from_enthalpy_at_range_break() {
        // the O2 polynomials jump by a fraction of a J/kmol at 1000 K, so the root
        // is only unique up to a tiny interval around the break
        let air = oxygen_nitrogen();
        let x = DVector::from_vec(vec![0.21, 0.79]);
        let H = air.mixture_molar_enthalpy(1000.0, &x).unwrap();
        let T = air.temperature_from_enthalpy(H, &x, 1200.0).unwrap();
        assert_relative_eq!(T, 1000.0, max_relative = 1e-5);
        let H_back = air.mixture_molar_enthalpy(T, &x).unwrap();
        assert_relative_eq!(H_back, H, max_relative = 1e-8);
    }

    #[test]
    fn test_temperature_from_enthalpy_out_of_bounds() {
        let air = oxygen_nitrogen();
        let x = DVector::from_vec(vec![0.21, 0.79]);
        let H_too_high = air.mixture_molar_enthalpy(3500.0, &x).unwrap() + 1.0e6;
        let result = air.temperature_from_enthalpy(H_too_high, &x, 1000.0);
        assert!(matches!(
            result,
            Err(ThermoError::EnthalpyOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_set_temperature_bounds() {
        let mut air = oxygen_nitrogen();
        assert!(air.set_temperature_bounds(400.0, 3000.0).is_ok());
        assert!(air.set_temperature_bounds(250.0, 3000.0).is_err());
        assert!(air.set_temperature_bounds(2000.0, 1000.0).is_err());
    }

    #[test]
    fn test_invalid_mixtures() {
        let bad_mass = MixtureThermo::new(
            vec!["A".to_string()],
            vec![-1.0],
            vec![SpeciesThermo::ConstantCp(ConstCpdata::new(0.0, 3.0e4))],
        );
        assert!(bad_mass.is_err());
        let bad_len = MixtureThermo::new(
            vec!["A".to_string(), "B".to_string()],
            vec![1.0],
            vec![SpeciesThermo::ConstantCp(ConstCpdata::new(0.0, 3.0e4))],
        );
        assert!(bad_len.is_err());
        let bad_cp = MixtureThermo::new(
            vec!["A".to_string()],
            vec![1.0],
            vec![SpeciesThermo::ConstantCp(ConstCpdata::new(0.0, 0.0))],
        );
        assert!(bad_cp.is_err());
    }

    #[test]
    fn test_species_thermo_serde() {
        let json = r#"[
            {"model": "ConstantCp", "dh_ref": -1.0e8, "Cp": 3.0e4},
            {"model": "NASA7", "T_ranges": [300.0, 1000.0], "coeffs": [[3.5, 0.0, 0.0, 0.0, 0.0, -1000.0, 3.0]]}
        ]"#;
        let models: Vec<SpeciesThermo> = serde_json::from_str(json).unwrap();
        assert_eq!(models[0].model_name(), "ConstantCp");
        assert_eq!(models[1].model_name(), "NASA7");
        match &models[0] {
            SpeciesThermo::ConstantCp(data) => assert_eq!(data.T_ref, 298.15),
            _ => panic!("wrong model"),
        }
    }
}
