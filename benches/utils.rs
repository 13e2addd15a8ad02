use metfor::{Celsius, HectoPascal, Knots, Meters, MetersPSec, WindSpdDir};
use optional::some;
use parcel_ascent::{
    initial_state_from_level, EnvironmentalProfile, ParcelState, PhysicalConstants,
};
use std::{fs::File, io::Read, path::PathBuf, str::FromStr};

/// The synthetic sounding in `test_data/synthetic_sounding.csv`. It is conditionally unstable
/// with a tropopause at 10 km, and winds veer and strengthen with height.
#[allow(dead_code)]
pub fn make_test_profile() -> EnvironmentalProfile {
    let mut test_path = PathBuf::new();
    test_path.push("test_data");
    test_path.push("synthetic_sounding.csv");
    load_test_csv_profile(&test_path)
}

fn load_test_csv_profile(location: &PathBuf) -> EnvironmentalProfile {
    let mut f = File::open(location).expect(&format!("Error opening file: {:?}", location));
    let mut contents = String::new();
    f.read_to_string(&mut contents)
        .expect(&format!("Error reading file: {:?}", location));

    let mut pressure = vec![];
    let mut height = vec![];
    let mut temperature = vec![];
    let mut dew_point = vec![];
    let mut wind = vec![];

    for line in contents.lines().skip(1).filter(|line| !line.trim().is_empty()) {
        let row: Vec<f64> = line
            .split(',')
            .map(|val| f64::from_str(val.trim()).expect("bad value in test data"))
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

/// Air from the level nearest 900 hPa, released at 3 km.
#[allow(dead_code)]
pub fn source_parcel(
    cnst: &PhysicalConstants,
    env: &EnvironmentalProfile,
    velocity: f64,
) -> ParcelState {
    let source = env
        .nearest_pressure_level(HectoPascal(900.0))
        .expect("no source level");

    initial_state_from_level(cnst, &source, Meters(3000.0), MetersPSec(velocity))
        .expect("bad source level")
}
