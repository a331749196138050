use std::sync::LazyLock;

use super::WordList;
use crate::names::{fold, name_key};

/// Known model names. More specific names precede the names they contain,
/// e.g. "Grand Siena" before "Siena" and "Golf" before "Gol". A trailing
/// space pins the end of a short name to a word boundary.
const MODELS: &[&str] = &[
    // Chevrolet
    "Onix Plus", "Onix", "Prisma", "Celta", "Corsa", "Classic", "Cobalt", "Cruze", "Spin",
    "Tracker", "Trailblazer", "Equinox", "Montana", "S10", "Agile", "Astra", "Vectra", "Meriva",
    "Zafira", "Captiva", "Camaro", "Omega", "Blazer",
    // Volkswagen
    "Golf", "Gol", "Voyage", "Saveiro", "Polo", "Virtus", "Nivus", "T-Cross", "Taos", "Tiguan",
    "Touareg", "Amarok", "Jetta", "Passat", "CrossFox", "SpaceFox", "Fox", "up!", "Up ",
    "Fusca", "Parati", "Santana", "Kombi",
    // Fiat
    "Grand Siena", "Siena", "Palio Weekend", "Palio", "Uno", "Mobi", "Argo", "Cronos", "Strada",
    "Toro", "Fiorino", "Doblò", "Ducato", "Idea", "Punto", "Linea", "Bravo", "Stilo", "Pulse",
    "Fastback", "Marea", "Tempra", "Tipo",
    // Ford
    "EcoSport", "Ka+", "Ka ", "Fiesta", "Focus", "Fusion", "Ranger", "Territory", "Bronco Sport",
    "Bronco", "Maverick", "Edge", "Mustang", "Escort", "Courier", "Transit",
    // Toyota
    "Corolla Cross", "Corolla", "Etios", "Yaris", "Hilux SW4", "SW4", "Hilux", "RAV4", "Camry",
    "Prius", "Land Cruiser",
    // Honda
    "Civic", "City", "Fit", "HR-V", "WR-V", "CR-V", "ZR-V", "Accord",
    // Hyundai
    "HB20S", "HB20X", "HB20", "Creta", "Tucson", "ix35", "Santa Fe", "Azera", "Elantra", "i30",
    "Veloster", "HR ",
    // Renault
    "Kwid", "Sandero Stepway", "Sandero", "Logan", "Duster Oroch", "Oroch", "Duster", "Captur",
    "Fluence", "Mégane", "Clio", "Kangoo", "Master", "Symbol", "Scénic",
    // Nissan
    "Kicks", "Versa", "March", "Sentra", "Frontier", "Livina", "Tiida", "Leaf",
    // Jeep / RAM
    "Renegade", "Compass", "Commander", "Wrangler", "Grand Cherokee", "Cherokee", "Rampage",
    "2500", "1500",
    // Peugeot / Citroën
    "208", "2008", "308", "3008", "408", "5008", "207", "206", "Partner", "Expert", "Boxer",
    "C3 Aircross", "C3", "C4 Cactus", "C4 Lounge", "C4 Picasso", "C4", "Jumpy", "Jumper",
    "Xsara Picasso",
    // Mitsubishi / Kia / others
    "L200 Triton", "L200", "Pajero Sport", "Pajero", "Outlander", "Eclipse Cross", "ASX",
    "Lancer", "Sportage", "Sorento", "Cerato", "Picanto", "Soul", "Stonic", "Tiggo 8", "Tiggo 7",
    "Tiggo 5x", "Tiggo 2", "Arrizo 6", "Arrizo 5", "Song Plus", "Song", "Dolphin", "Seal",
    "Yuan Plus", "Haval H6",
    // Premium
    "Range Rover Evoque", "Range Rover Velar", "Range Rover Sport", "Range Rover", "Discovery",
    "Defender", "Série 3", "Série 1", "X1", "X3", "X5", "Classe A", "Classe C", "GLA", "GLC",
    "A3", "A4", "Q3", "Q5", "XC60", "XC40",
    // Motorcycles
    "CG 160", "CG 150", "CG 125", "CB 500F", "CB 500X", "CB 650R", "CB 300F", "CB 250F",
    "CBR 650R", "CBR 1000RR", "XRE 300", "XRE 190", "NXR 160", "Bros", "Biz", "Pop ", "PCX",
    "Elite", "ADV ", "Africa Twin", "Gold Wing", "Fazer 250", "Fazer", "Factor", "Crosser",
    "Lander", "Ténéré", "NMax", "XMax", "MT-03", "MT-07", "MT-09", "YZF R3", "YZF R1",
    "Ninja 400", "Ninja", "Versys", "Z400", "Z900", "Burgman", "V-Strom", "GSX-S", "Hayabusa",
    "Duke", "Street Triple", "Tiger", "Monster", "Panigale",
    // Trucks and buses
    "Accelo", "Atego", "Axor", "Actros", "Arocs", "Constellation", "Delivery", "Worker", "Cargo",
    "Tector", "Stralis", "Daily", "Hi-Way", "FH", "FMX", "FM", "VMX", "VM", "Volare",
];

// Keys start with a space so a name only matches where a word begins.
static MODEL_WORDS: LazyLock<WordList<&'static str>> = LazyLock::new(|| {
    let keys: Vec<String> = MODELS.iter().map(|m| format!(" {m}")).collect();
    let entries: Vec<(&str, &'static str)> = keys
        .iter()
        .zip(MODELS)
        .map(|(key, m)| (key.as_str(), m.trim_end()))
        .collect();
    WordList::new(&entries)
});

/// Base model of a full model name.
///
/// The first known model (in list order) found as a substring wins.
/// Otherwise the first whitespace token is used, or the whole name when that
/// token has no letters or digits.
#[must_use]
pub fn base_model(full_model_name: &str) -> String {
    let trimmed = full_model_name.trim();
    if let Some(known) = MODEL_WORDS.first_substring_match(&fold(trimmed)) {
        return known.to_string();
    }
    match trimmed.split_whitespace().next() {
        Some(token) if !name_key(token).is_empty() => token.to_string(),
        _ => trimmed.to_string(),
    }
}
