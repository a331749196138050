use std::sync::LazyLock;

use super::WordList;

/// Known trim tokens. Order is priority: the first one present wins.
const TRIMS: &[&str] = &[
    // Honda
    "EXL", "EXR", "EXS", "LXL", "LXR", "LXS", "EX", "LX", "DX", "Touring", "Type R", "Si",
    // Toyota
    "XEI", "XLI", "GLI", "SRX", "SRV", "SR", "Altis", "XRE", "XRS", "XS",
    // GM
    "Premier", "LTZ", "LT", "LS", "Activ", "Midnight", "Joy", "RS",
    // VW
    "Highline", "Comfortline", "Trendline", "Extreme", "Cross", "GTI", "GTS", "Sense",
    // Ford
    "Titanium", "SEL", "Freestyle", "Storm", "XLT", "Limited",
    // Fiat / Jeep
    "Volcano", "Trekking", "Drive", "Way", "Attractive", "Essence", "Sporting", "Precision",
    "Endurance", "Freedom", "Ranch", "Ultra", "Longitude", "Trailhawk", "Overland", "Sport",
    "Lounge", "Adventure", "Blackmotion",
    // Renault / Nissan
    "Iconic", "Intense", "Zen", "Life", "Expression", "Dynamique", "Privilege", "Outsider",
    "Exclusive", "Advance", "Tekna", "Platinum",
    // PSA
    "Allure", "Griffe", "Feline", "Shine", "Feel", "Live", "Tendance", "Vibe",
    // Hyundai / Kia
    "Comfort Plus", "Evolution", "Vision", "Diamond", "Ultimate", "EX2", "LX2",
    // Generic
    "Premium", "Luxury", "Elite", "Executive", "Prestige", "Signature", "Laramie", "Rebel",
    "Base", "Standard",
];

static TRIM_WORDS: LazyLock<WordList<&'static str>> = LazyLock::new(|| {
    let entries: Vec<(&str, &'static str)> = TRIMS.iter().map(|t| (*t, *t)).collect();
    WordList::new(&entries)
});

/// First known trim token present as a whole word in a folded model name.
#[must_use]
pub fn detect_trim(folded: &str) -> Option<&'static str> {
    TRIM_WORDS.first_match(folded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::fold;

    #[test]
    fn first_listed_trim_wins() {
        assert_eq!(detect_trim(&fold("Civic 2.0 16V EXL CVT")), Some("EXL"));
        assert_eq!(detect_trim(&fold("Civic Sedan LX 1.7")), Some("LX"));
        assert_eq!(detect_trim(&fold("Corolla XEi 2.0 Flex")), Some("XEI"));
        // Both present: list order decides.
        assert_eq!(detect_trim(&fold("Renegade Sport Longitude 2.0")), Some("Longitude"));
    }

    #[test]
    fn trims_must_be_whole_words() {
        assert_eq!(detect_trim(&fold("Exlusivo 1.0")), None);
        assert_eq!(detect_trim(&fold("Uno Mille 1.0")), None);
    }
}
