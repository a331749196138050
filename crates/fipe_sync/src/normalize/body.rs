use std::sync::LazyLock;

use super::WordList;
use crate::vehicle::{BodyType, VehicleType};

// Keywords match as substrings of the padded folded name; short ones carry
// their own spaces. Explicit body keywords come before model names, so
// "City Hatch" is a hatch even though the City is listed as a sedan.
static CAR_KEYWORDS: LazyLock<WordList<BodyType>> = LazyLock::new(|| {
    use BodyType::*;
    WordList::new(&[
        ("conversível", Convertible),
        ("cabriolet", Convertible),
        ("cabrio", Convertible),
        ("roadster", Convertible),
        ("spyder", Convertible),
        ("spider", Convertible),
        ("coupé", Coupe),
        ("cupê", Coupe),
        ("cabine dupla", Pickup),
        ("cab. dupla", Pickup),
        ("cabine simples", Pickup),
        ("cab. simples", Pickup),
        ("cabine estendida", Pickup),
        (" CD ", Pickup),
        (" CS ", Pickup),
        (" CE ", Pickup),
        ("pick-up", Pickup),
        ("pickup", Pickup),
        ("picape", Pickup),
        ("station wagon", Wagon),
        (" sw ", Wagon),
        ("wagon", Wagon),
        ("variant", Wagon),
        ("avant", Wagon),
        ("sportwagen", Wagon),
        ("weekend", Wagon),
        ("sedan", Sedan),
        ("sedã", Sedan),
        ("hatch", Hatch),
        ("hatchback", Hatch),
        ("minivan", Minivan),
        ("furgão", Van),
        ("furgao", Van),
        (" van ", Van),
        ("suv", Suv),
        // Model names.
        ("Hilux SW4", Suv),
        ("SW4", Suv),
        ("Corolla Cross", Suv),
        ("Compass", Suv),
        ("Commander", Suv),
        ("Renegade", Suv),
        ("HR-V", Suv),
        ("CR-V", Suv),
        ("WR-V", Suv),
        ("ZR-V", Suv),
        ("Tracker", Suv),
        ("Trailblazer", Suv),
        ("Equinox", Suv),
        ("Creta", Suv),
        ("Tucson", Suv),
        ("ix35", Suv),
        ("Santa Fe", Suv),
        ("Sportage", Suv),
        ("Sorento", Suv),
        ("Kicks", Suv),
        ("Duster", Suv),
        ("Captur", Suv),
        ("T-Cross", Suv),
        ("Nivus", Suv),
        ("Taos", Suv),
        ("Tiguan", Suv),
        ("Touareg", Suv),
        ("EcoSport", Suv),
        ("Territory", Suv),
        ("Bronco", Suv),
        ("Pajero", Suv),
        ("Outlander", Suv),
        ("ASX", Suv),
        ("Eclipse Cross", Suv),
        ("RAV4", Suv),
        ("Pulse", Suv),
        ("Fastback", Suv),
        ("2008", Suv),
        ("3008", Suv),
        ("C4 Cactus", Suv),
        ("Aircross", Suv),
        ("Q3", Suv),
        ("Q5", Suv),
        (" X1 ", Suv),
        (" X3 ", Suv),
        ("GLA", Suv),
        ("Evoque", Suv),
        ("Discovery", Suv),
        ("Hilux", Pickup),
        ("Ranger", Pickup),
        ("S10", Pickup),
        ("Amarok", Pickup),
        ("Frontier", Pickup),
        ("L200", Pickup),
        ("Triton", Pickup),
        ("Toro", Pickup),
        ("Strada", Pickup),
        ("Saveiro", Pickup),
        ("Montana", Pickup),
        ("Oroch", Pickup),
        ("Maverick", Pickup),
        ("Rampage", Pickup),
        (" Ram ", Pickup),
        ("Parati", Wagon),
        ("SpaceFox", Wagon),
        ("Spin", Minivan),
        ("Zafira", Minivan),
        ("Livina", Minivan),
        ("Picasso", Minivan),
        ("Doblò", Minivan),
        ("Idea", Minivan),
        ("Kangoo", Van),
        ("Fiorino", Van),
        ("Ducato", Van),
        ("Master", Van),
        ("Sprinter", Van),
        ("Boxer", Van),
        ("Jumper", Van),
        ("Expert", Van),
        ("Transit", Van),
        ("Onix Plus", Sedan),
        ("Prisma", Sedan),
        ("Cobalt", Sedan),
        ("Cruze", Sedan),
        ("Corolla", Sedan),
        ("Civic", Sedan),
        ("City", Sedan),
        ("Accord", Sedan),
        ("Virtus", Sedan),
        ("Voyage", Sedan),
        ("Jetta", Sedan),
        ("Passat", Sedan),
        ("HB20S", Sedan),
        ("Cronos", Sedan),
        ("Grand Siena", Sedan),
        ("Siena", Sedan),
        ("Versa", Sedan),
        ("Sentra", Sedan),
        ("Logan", Sedan),
        ("Fusion", Sedan),
        ("Focus Sedan", Sedan),
        ("Camry", Sedan),
        ("Yaris Sedan", Sedan),
    ])
});

static MOTORCYCLE_KEYWORDS: LazyLock<WordList<BodyType>> = LazyLock::new(|| {
    use BodyType::*;
    WordList::new(&[
        ("scooter", Scooter),
        ("PCX", Scooter),
        (" ADV ", Scooter),
        ("Elite", Scooter),
        (" Lead ", Scooter),
        ("Biz", Scooter),
        ("NMax", Scooter),
        ("XMax", Scooter),
        (" Neo ", Scooter),
        ("Burgman", Scooter),
        ("Citycom", Scooter),
        ("Fluo", Scooter),
        ("Gold Wing", Touring),
        ("Electra Glide", Touring),
        ("Road King", Touring),
        ("Street Glide", Touring),
        ("Road Glide", Touring),
        ("touring", Touring),
        (" RT ", Touring),
        ("custom", Custom),
        ("Shadow", Custom),
        ("Boulevard", Custom),
        ("Intruder", Custom),
        ("Drag Star", Custom),
        ("Midnight Star", Custom),
        ("Softail", Custom),
        ("Fat Boy", Custom),
        ("Sportster", Custom),
        ("Rebel", Custom),
        ("Vulcan", Custom),
        ("Bobber", Custom),
        ("trail", Trail),
        ("XRE", Trail),
        ("Bros", Trail),
        ("Lander", Trail),
        ("Crosser", Trail),
        ("Ténéré", Trail),
        ("Tenere", Trail),
        ("Africa Twin", Trail),
        ("Versys", Trail),
        ("V-Strom", Trail),
        ("Tiger", Trail),
        (" GS ", Trail),
        ("Adventure", Trail),
        ("Sahara", Trail),
        ("CBR", Sport),
        ("YZF", Sport),
        (" R1 ", Sport),
        (" R3 ", Sport),
        ("Ninja", Sport),
        ("GSX-R", Sport),
        ("GSX-S", Naked),
        ("Panigale", Sport),
        ("S 1000 RR", Sport),
        ("ZX-6R", Sport),
        ("ZX-10R", Sport),
        ("naked", Naked),
        ("Hornet", Naked),
        ("CB 500F", Naked),
        ("CB 650F", Naked),
        ("CB 650R", Naked),
        ("MT-03", Naked),
        ("MT-07", Naked),
        ("MT-09", Naked),
        ("Z400", Naked),
        ("Z650", Naked),
        ("Z900", Naked),
        ("Duke", Naked),
        ("Street Triple", Naked),
        ("Speed Triple", Naked),
        ("Monster", Naked),
        ("XJ6", Naked),
        ("Bandit", Naked),
    ])
});

static TRUCK_KEYWORDS: LazyLock<WordList<BodyType>> = LazyLock::new(|| {
    use BodyType::*;
    WordList::new(&[
        ("ônibus", Bus),
        ("micro-ônibus", Bus),
        ("microônibus", Bus),
        ("bus", Bus),
        ("Volare", Bus),
        ("cavalo mecânico", Tractor),
        ("cavalo", Tractor),
        ("trator", Tractor),
        ("tractor", Tractor),
        ("chassi", Chassis),
        ("chassis", Chassis),
        ("cabine-chassi", Chassis),
        ("plataforma", Chassis),
    ])
});

/// Body style from per-category keywords, else the category default.
#[must_use]
pub fn detect_body_type(folded: &str, vehicle_type: VehicleType) -> BodyType {
    let table = match vehicle_type {
        VehicleType::Car => &CAR_KEYWORDS,
        VehicleType::Motorcycle => &MOTORCYCLE_KEYWORDS,
        VehicleType::Truck => &TRUCK_KEYWORDS,
    };
    table
        .first_substring_match(folded)
        .unwrap_or_else(|| BodyType::default_for(vehicle_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::fold;

    fn car(model: &str) -> BodyType {
        detect_body_type(&fold(model), VehicleType::Car)
    }

    #[test]
    fn car_keywords_then_model_names() {
        assert_eq!(car("Civic Sedan EXL 2.0 Flex 16V Aut."), BodyType::Sedan);
        assert_eq!(car("City Hatch EX 1.5"), BodyType::Hatch);
        assert_eq!(car("City EX 1.5"), BodyType::Sedan);
        assert_eq!(car("Hilux SW4 SRX 2.8 4x4"), BodyType::Suv);
        assert_eq!(car("Strada Volcano 1.3 CD"), BodyType::Pickup);
        assert_eq!(car("Compass Longitude 2.0"), BodyType::Suv);
        assert_eq!(car("Golf Variant 2.0"), BodyType::Wagon);
        assert_eq!(car("Mustang GT Conversível 5.0"), BodyType::Convertible);
        assert_eq!(car("Gol 1.0"), BodyType::Hatch);
    }

    #[test]
    fn keywords_match_inside_longer_tokens() {
        assert_eq!(car("Fiesta Sedan1.6 Flex"), BodyType::Sedan);
        assert_eq!(car("Jetta Variante 2.5"), BodyType::Wagon);
    }

    #[test]
    fn padded_keywords_need_a_standalone_token() {
        assert_eq!(car("Fluence Advance 2.0"), BodyType::Hatch);
        assert_eq!(car("Hilux SW4 2.8"), BodyType::Suv);
        assert_eq!(car("Courier 1.6 CE"), BodyType::Pickup);
        assert_eq!(car("Panorama 1.6"), BodyType::Hatch);
        let moto = |m: &str| detect_body_type(&fold(m), VehicleType::Motorcycle);
        assert_eq!(moto("Africa Twin Adventure"), BodyType::Trail);
        assert_eq!(moto("Sport 600 Start"), BodyType::Street);
    }

    #[test]
    fn motorcycle_and_truck_tables() {
        let moto = |m: &str| detect_body_type(&fold(m), VehicleType::Motorcycle);
        assert_eq!(moto("PCX 150 DLX"), BodyType::Scooter);
        assert_eq!(moto("CBR 650R"), BodyType::Sport);
        assert_eq!(moto("XRE 300 Rally"), BodyType::Trail);
        assert_eq!(moto("MT-07 ABS"), BodyType::Naked);
        assert_eq!(moto("CG 160 Titan"), BodyType::Street);

        let truck = |m: &str| detect_body_type(&fold(m), VehicleType::Truck);
        assert_eq!(truck("Volare W9 Micro-ônibus"), BodyType::Bus);
        assert_eq!(truck("Axor 2544 Cavalo Mecânico 6x2"), BodyType::Tractor);
        assert_eq!(truck("Accelo 815 Chassi"), BodyType::Chassis);
        assert_eq!(truck("Cargo 816 S"), BodyType::Truck);
    }
}
