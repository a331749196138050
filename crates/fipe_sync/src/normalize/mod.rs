//! Free-text model parsing.
//!
//! Upstream model names pack everything into one string, e.g.
//! `"Civic Sedan EXL 2.0 Flex 16V Aut."`. [`normalize`] pulls structured
//! attributes out of it. Each extractor works on the folded (lowercase,
//! diacritic-free) string independently of the others; within one keyword
//! list, order decides ties.

mod body;
mod engine;
mod model;
mod transmission;
mod trim;

pub use body::detect_body_type;
pub use engine::{EngineSpec, parse_engine};
pub use model::base_model;
pub use transmission::detect_transmission;
pub use trim::detect_trim;

use crate::names::fold;
use crate::vehicle::{Fuel, NormalizedVehicleRecord, RawVehicleRecord};

/// Derive structured attributes from a raw record. Pure and deterministic.
#[must_use]
pub fn normalize(raw: &RawVehicleRecord) -> NormalizedVehicleRecord {
    let full_model_name = raw.model.trim().to_string();
    let folded = fold(&full_model_name);
    let engine = parse_engine(&folded, raw.vehicle_type);

    NormalizedVehicleRecord {
        brand: raw.brand.trim().to_string(),
        base_model: base_model(&full_model_name),
        year: raw.year,
        trim: detect_trim(&folded).map(str::to_string),
        engine_code: engine.engine_code.map(str::to_string),
        engine_name: engine.engine_name,
        displacement_cc: engine.displacement_cc,
        valves: engine.valves,
        fuel: detect_fuel(&raw.fuel_original, &folded),
        transmission: detect_transmission(&folded),
        body_type: detect_body_type(&folded, raw.vehicle_type),
        vehicle_type: raw.vehicle_type,
        power: engine.power,
        turbo: engine.turbo,
        fipe_code: raw.fipe_code.clone(),
        price: raw.price,
        full_model_name,
    }
}

/// Fuel from the upstream label, else from markers in the model name.
fn detect_fuel(fuel_original: &str, folded_model: &str) -> Fuel {
    match Fuel::from_label(fuel_original) {
        Fuel::Unknown => {}
        fuel => return fuel,
    }
    const MARKERS: [(&str, Fuel); 6] = [
        ("flex", Fuel::Flex),
        ("diesel", Fuel::Diesel),
        ("hibrido", Fuel::Hybrid),
        ("hybrid", Fuel::Hybrid),
        ("eletrico", Fuel::Electric),
        ("electric", Fuel::Electric),
    ];
    MARKERS
        .iter()
        .find(|(marker, _)| find_word(folded_model, marker).is_some())
        .map_or(Fuel::Unknown, |(_, fuel)| *fuel)
}

/// Byte offset of the first whole-word occurrence of `needle` in `haystack`.
///
/// A word boundary is the start or end of the string or any
/// non-alphanumeric character. Both arguments are expected to be folded.
pub(crate) fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.match_indices(needle).map(|(i, _)| i).find(|&i| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + needle.len()..].chars().next();
        before.is_none_or(|c| !c.is_alphanumeric()) && after.is_none_or(|c| !c.is_alphanumeric())
    })
}

/// Ordered keyword list, folded once.
///
/// Entries keep any surrounding spaces, so a substring entry such as
/// `" cd "` only matches a standalone token.
pub(crate) struct WordList<T: Copy + 'static> {
    entries: Vec<(String, T)>,
}

impl<T: Copy + 'static> WordList<T> {
    pub(crate) fn new(raw: &[(&str, T)]) -> Self {
        Self {
            entries: raw.iter().map(|(word, value)| (fold(word), *value)).collect(),
        }
    }

    /// Value of the first entry, in list order, found in `folded` as a
    /// whole word.
    pub(crate) fn first_match(&self, folded: &str) -> Option<T> {
        self.entries
            .iter()
            .find(|(word, _)| find_word(folded, word.trim()).is_some())
            .map(|(_, value)| *value)
    }

    /// Value of the first entry, in list order, contained anywhere in
    /// `folded`. The haystack is whitespace-collapsed and padded with one
    /// space on each side.
    pub(crate) fn first_substring_match(&self, folded: &str) -> Option<T> {
        let padded = padded(folded);
        self.entries
            .iter()
            .find(|(word, _)| !word.trim().is_empty() && padded.contains(word.as_str()))
            .map(|(_, value)| *value)
    }
}

fn padded(folded: &str) -> String {
    let mut out = String::with_capacity(folded.len() + 2);
    out.push(' ');
    for token in folded.split_whitespace() {
        out.push_str(token);
        out.push(' ');
    }
    out
}
