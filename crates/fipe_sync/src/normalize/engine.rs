use std::sync::LazyLock;

use regex::Regex;

use super::WordList;
use crate::vehicle::VehicleType;

static LITERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+[.,]\d+").expect("static regex"));

static BARE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{2,4}\b").expect("static regex"));

static VALVES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})\s?v\b").expect("static regex"));

static POWER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{2,4})\s*(cv|hp)\b").expect("static regex"));

static TURBO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(turbo|tsi|tfsi|thp|ecoboost|tb|t-jet|tjet|turbodiesel|bi-turbo|biturbo|tdi)\b",
    )
    .expect("static regex")
});

/// Bare-number displacement bounds for motorcycles.
const MIN_BARE_CC: u32 = 50;
const MAX_BARE_CC: u32 = 2500;

// Longer and more specific codes first.
static ENGINE_CODES: LazyLock<WordList<&'static str>> = LazyLock::new(|| {
    WordList::new(&[
        ("Dual VVT-i", "Dual VVT-i"),
        ("VVT-i", "VVT-i"),
        ("i-VTEC", "i-VTEC"),
        ("VTEC", "VTEC"),
        ("Zetec Rocam", "Zetec Rocam"),
        ("Rocam", "Rocam"),
        ("Sigma", "Sigma"),
        ("Duratec", "Duratec"),
        ("EcoBoost", "EcoBoost"),
        ("EA211", "EA211"),
        ("EA111", "EA111"),
        ("EA888", "EA888"),
        ("E.torQ", "E.torQ"),
        ("EtorQ", "E.torQ"),
        ("Firefly", "Firefly"),
        ("Fire", "Fire"),
        ("MultiAir", "MultiAir"),
        ("T-Jet", "T-Jet"),
        ("T200", "T200"),
        ("T270", "T270"),
        ("THP", "THP"),
        ("TFSI", "TFSI"),
        ("TSI", "TSI"),
        ("TDI", "TDI"),
        ("MPI", "MPI"),
        ("SPE/4", "SPE/4"),
        ("VHCE", "VHCE"),
        ("VHC", "VHC"),
        ("VHT", "VHT"),
        ("SCe", "SCe"),
        ("Hi-Torque", "Hi-Torque"),
        ("Kappa", "Kappa"),
        ("Gamma", "Gamma"),
        ("Nu", "Nu"),
        ("SkyActiv", "SkyActiv"),
        ("Boxer", "Boxer"),
        ("CRDi", "CRDi"),
        ("HDi", "HDi"),
        ("BlueHDi", "BlueHDi"),
        ("dCi", "dCi"),
        ("MultiJet", "MultiJet"),
    ])
});

/// Engine attributes pulled from a model name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineSpec {
    pub displacement_cc: Option<u32>,
    pub valves: Option<u32>,
    pub turbo: bool,
    pub engine_code: Option<&'static str>,
    /// `"2.0 16V"`, `"1.0 Turbo"` or `"150cc"`.
    pub engine_name: Option<String>,
    pub power: Option<u32>,
}

/// Parse engine attributes from a folded model name.
#[must_use]
pub fn parse_engine(folded: &str, vehicle_type: VehicleType) -> EngineSpec {
    let liters = LITERS.find(folded).map(|m| m.as_str().replace(',', "."));
    let mut displacement_cc = liters
        .as_deref()
        .and_then(|l| l.parse::<f64>().ok())
        .map(|l| (l * 1000.0).round() as u32)
        .filter(|cc| *cc > 0);

    if displacement_cc.is_none() && vehicle_type == VehicleType::Motorcycle {
        displacement_cc = BARE_NUMBER
            .find_iter(folded)
            .filter_map(|m| m.as_str().parse::<u32>().ok())
            .find(|cc| (MIN_BARE_CC..=MAX_BARE_CC).contains(cc));
    }

    let valves = VALVES
        .captures(folded)
        .and_then(|c| c[1].parse::<u32>().ok())
        .filter(|v| *v > 0);
    let power = POWER.captures(folded).and_then(|c| c[1].parse::<u32>().ok());
    let turbo = TURBO.is_match(folded);

    let engine_name = displacement_cc.map(|cc| {
        if vehicle_type == VehicleType::Motorcycle {
            return format!("{cc}cc");
        }
        let mut name = liters.clone().unwrap_or_else(|| format!("{:.1}", f64::from(cc) / 1000.0));
        if let Some(v) = valves {
            name.push_str(&format!(" {v}V"));
        }
        if turbo {
            name.push_str(" Turbo");
        }
        name
    });

    EngineSpec {
        displacement_cc,
        valves,
        turbo,
        engine_code: ENGINE_CODES.first_match(folded),
        engine_name,
        power,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::fold;

    fn car(model: &str) -> EngineSpec {
        parse_engine(&fold(model), VehicleType::Car)
    }

    #[test]
    fn decimal_liters_become_cc() {
        let spec = car("Civic 2.0 16V EXL CVT");
        assert_eq!(spec.displacement_cc, Some(2000));
        assert_eq!(spec.valves, Some(16));
        assert_eq!(spec.engine_name.as_deref(), Some("2.0 16V"));

        assert_eq!(car("Gol 1,6 Total Flex 8V").displacement_cc, Some(1600));
        assert_eq!(car("Onix 1.0 Turbo").engine_name.as_deref(), Some("1.0 Turbo"));
    }

    #[test]
    fn turbo_markers_are_whole_words() {
        assert!(car("Polo 200 TSI 1.0 Flex").turbo);
        assert!(car("Fiesta 1.0 EcoBoost").turbo);
        assert!(car("Amarok CD 2.0 16V TDI 4x4 Diesel").turbo);
        assert!(car("Argo 1.3 T-Jet").turbo);
        assert!(!car("Civic 2.0 16V EXL CVT").turbo);
        assert!(!car("Tbilisi 1.0").turbo);
    }

    #[test]
    fn motorcycle_bare_number_only_when_no_decimal() {
        let spec = parse_engine(&fold("XRE 300 Rally"), VehicleType::Motorcycle);
        assert_eq!(spec.displacement_cc, Some(300));
        assert_eq!(spec.engine_name.as_deref(), Some("300cc"));

        // Out-of-range numbers are skipped.
        let spec = parse_engine(&fold("MT 07 689"), VehicleType::Motorcycle);
        assert_eq!(spec.displacement_cc, Some(689));

        // Cars never use the bare-number rule.
        assert_eq!(car("Polo 200 TSI").displacement_cc, None);
    }

    #[test]
    fn power_and_engine_codes() {
        let spec = car("Golf GTI 2.0 TSI 230cv Aut.");
        assert_eq!(spec.power, Some(230));
        assert_eq!(spec.engine_code, Some("TSI"));
        assert_eq!(car("Fit 1.5 i-VTEC").engine_code, Some("i-VTEC"));
        assert_eq!(car("Corolla 2.0 Dual VVT-i").engine_code, Some("Dual VVT-i"));
        assert_eq!(car("Uno 1.0").engine_code, None);
    }
}
