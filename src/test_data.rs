//! Data used in tests.
use crate::environment::EnvironmentalProfile;
use metfor::{Celsius, HectoPascal, Knots, Meters, WindSpdDir};
use optional::some;
use std::{fs::File, io::Read, path::PathBuf};

/// A conditionally unstable sounding every 250 m from the surface to 16 km.
///
/// Standard lapse rate to a tropopause at 10 km and still cooling slowly above it. The dew point
/// depression grows with height. Pressure is hydrostatic.
pub(crate) fn make_test_profile() -> EnvironmentalProfile {
    let mut test_path = PathBuf::new();
    test_path.push("test_data");
    test_path.push("synthetic_sounding.csv");

    let mut f = File::open(&test_path).expect(&format!("Error opening file: {:?}", test_path));
    let mut contents = String::new();
    f.read_to_string(&mut contents)
        .expect(&format!("Error reading file: {:?}", test_path));

    let mut pressure = vec![];
    let mut height = vec![];
    let mut temperature = vec![];
    let mut dew_point = vec![];
    let mut wind = vec![];

    for line in contents.lines().skip(1).filter(|line| !line.trim().is_empty()) {
        let row: Vec<f64> = line
            .split(',')
            .map(|val| val.trim().parse().expect("bad value in test data"))
            .collect();

        height.push(Meters(row[0]));
        pressure.push(HectoPascal(row[1]));
        temperature.push(Celsius(row[2]));
        dew_point.push(Celsius(row[3]));
        wind.push(some(WindSpdDir {
            direction: row[4],
            speed: Knots(row[5]),
        }));
    }

    EnvironmentalProfile::new(pressure, height, temperature, dew_point)
        .and_then(|env| env.with_wind_profile(wind))
        .expect("bad test profile")
        .with_source_description("synthetic test sounding".to_owned())
}
