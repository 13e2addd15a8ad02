use approx::{assert_abs_diff_eq, assert_relative_eq};
use metfor::{HectoPascal, Kelvin, Meters, MetersPSec, Quantity};
use parcel_ascent::{
    entraining_ascent, find_adiabat_temperature, run_entraining_ascent, run_nonentraining_ascent,
    AscentConfig, AscentStatus, Environment, ParcelState, PhysicalConstants, TerminationCause,
};

mod utils;

#[test]
fn zero_entrainment_matches_reference_integration() {
    let cnst = PhysicalConstants::new();
    let env = utils::make_test_profile();
    let parcel = utils::source_parcel(&cnst, &env, 0.5);

    let config = AscentConfig::new()
        .with_entrainment_rate(0.0)
        .with_time_horizon(2500.0)
        .with_report_interval(10.0);

    let full = run_entraining_ascent(&cnst, &parcel, &env, config).unwrap();
    let reference = run_nonentraining_ascent(&cnst, &parcel, &env, config).unwrap();

    assert_eq!(full.status(), reference.status());
    assert_eq!(full.trajectory().len(), reference.trajectory().len());
    assert!(full.trajectory().len() > 10);

    for (a, b) in full.trajectory().iter().zip(reference.trajectory()) {
        assert_eq!(a.time, b.time);
        assert_relative_eq!(a.height.unpack(), b.height.unpack(), max_relative = 1.0e-4);
        assert_abs_diff_eq!(a.velocity.unpack(), b.velocity.unpack(), epsilon = 1.0e-2);
        assert_eq!(a.theta_e, b.theta_e);
        assert_eq!(a.total_water, b.total_water);
    }
}

#[test]
fn negative_buoyancy_everywhere_terminates_after_first_step() {
    let cnst = PhysicalConstants::new();
    let env = utils::make_test_profile();

    let parcel = ParcelState::new(MetersPSec(0.5), Meters(3000.0), Kelvin(300.0), 0.01);
    let ascent = run_entraining_ascent(&cnst, &parcel, &env, AscentConfig::default()).unwrap();

    assert_eq!(
        ascent.status(),
        AscentStatus::Terminated(TerminationCause::Descending)
    );
    assert_ne!(ascent.status(), AscentStatus::TimeExpired);
    assert_eq!(ascent.trajectory().len(), 1);
}

#[test]
fn trajectory_is_time_ordered() {
    let cnst = PhysicalConstants::new();
    let env = utils::make_test_profile();
    let parcel = utils::source_parcel(&cnst, &env, 0.5);

    for &rate in &[0.0, 2.0e-4, 1.0e-3] {
        let config = AscentConfig::new().with_entrainment_rate(rate);
        let ascent = run_entraining_ascent(&cnst, &parcel, &env, config).unwrap();

        assert_eq!(ascent.trajectory()[0].time, 0.0);
        for pair in ascent.trajectory().windows(2) {
            assert_abs_diff_eq!(pair[1].time - pair[0].time, 10.0, epsilon = 1.0e-9);
        }
    }
}

#[test]
fn stronger_entrainment_lowers_the_top() {
    let cnst = PhysicalConstants::new();
    let env = utils::make_test_profile();
    let parcel = utils::source_parcel(&cnst, &env, 0.5);

    let tops: Vec<f64> = [0.0, 2.0e-4, 1.0e-3]
        .iter()
        .map(|&rate| {
            let config = AscentConfig::new().with_entrainment_rate(rate);
            run_entraining_ascent(&cnst, &parcel, &env, config)
                .unwrap()
                .max_height()
                .unwrap()
                .unpack()
        })
        .collect();

    assert!(tops[0] > tops[1]);
    assert!(tops[1] > tops[2]);
}

#[test]
fn iterator_can_stop_early() {
    let cnst = PhysicalConstants::new();
    let env = utils::make_test_profile();
    let parcel = utils::source_parcel(&cnst, &env, 0.5);

    let iter = entraining_ascent(&cnst, &parcel, &env, AscentConfig::default()).unwrap();
    let below_5km: Vec<_> = iter.take_while(|pnt| pnt.height < Meters(5000.0)).collect();

    assert!(!below_5km.is_empty());
    assert!(below_5km.iter().all(|pnt| pnt.height < Meters(5000.0)));
}

#[test]
fn undiluted_cloud_follows_the_adiabat() {
    let cnst = PhysicalConstants::new();
    let env = utils::make_test_profile();
    let parcel = utils::source_parcel(&cnst, &env, 0.5);

    let config = AscentConfig::new().with_time_horizon(400.0);
    let ascent = run_entraining_ascent(&cnst, &parcel, &env, config).unwrap();
    let states = ascent.thermodynamic_profile(&cnst, &env).unwrap();

    for (pnt, state) in ascent.trajectory().iter().zip(&states) {
        let p = env.pressure_at(pnt.height).unwrap();
        let adiabat_t = find_adiabat_temperature(&cnst, parcel.theta_e, p).unwrap();

        assert!(state.liquid > 0.0);
        assert_abs_diff_eq!(state.temperature.unpack(), adiabat_t.unpack(), epsilon = 0.05);
    }
}

#[test]
fn profile_wind_is_interpolated() {
    let env = utils::make_test_profile();

    let wind = env.wind_at(Meters(1125.0)).unwrap();
    assert_abs_diff_eq!(wind.speed.unpack(), 8.375, epsilon = 1.0e-2);

    let top = env.wind_at(Meters(50_000.0)).unwrap();
    assert_abs_diff_eq!(top.speed.unpack(), 53.0, epsilon = 1.0e-9);

    assert_eq!(env.pressure_at(Meters(-100.0)).unwrap(), HectoPascal(1000.0));
}
