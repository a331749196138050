use std::sync::LazyLock;

use regex::Regex;

use crate::vehicle::Transmission;

static RULES: LazyLock<Vec<(Regex, Transmission)>> = LazyLock::new(|| {
    [
        (r"\b(cvt|x-?tronic|multitronic|lineartronic|multidrive)\b", Transmission::Cvt),
        (
            r"\b(dsg|dct|s-?tronic|powershift|tiptronic|pdk|edc)\b",
            Transmission::DualClutch,
        ),
        (
            r"\b(aut|auto|automatico|automatica|automatic|at|at6|at8)\b",
            Transmission::Automatic,
        ),
        (r"\b(mec|mecanico|mecanica|manual|mt)\b", Transmission::Manual),
        (
            r"\b(dualogic|easytronic|i-?motion|automatizad[oa]|amt|asg|gsr)\b",
            Transmission::AutomatedManual,
        ),
    ]
    .into_iter()
    .map(|(pattern, transmission)| (Regex::new(pattern).expect("static regex"), transmission))
    .collect()
});

/// Gearbox family of a folded model name; first rule that matches wins.
#[must_use]
pub fn detect_transmission(folded: &str) -> Transmission {
    RULES
        .iter()
        .find(|(rule, _)| rule.is_match(folded))
        .map_or(Transmission::Unidentified, |(_, t)| *t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::fold;

    fn detect(model: &str) -> Transmission {
        detect_transmission(&fold(model))
    }

    #[test]
    fn rules_in_priority_order() {
        assert_eq!(detect("Civic 2.0 16V EXL CVT"), Transmission::Cvt);
        assert_eq!(detect("Kicks SL 1.6 Xtronic"), Transmission::Cvt);
        assert_eq!(detect("Jetta 2.0 TSI DSG"), Transmission::DualClutch);
        assert_eq!(detect("A4 2.0 Tiptronic"), Transmission::DualClutch);
        assert_eq!(detect("Onix Plus 1.0 Turbo Aut."), Transmission::Automatic);
        assert_eq!(detect("Corolla XEi 2.0 Automático"), Transmission::Automatic);
        assert_eq!(detect("Gol 1.0 Mec."), Transmission::Manual);
        assert_eq!(detect("Palio 1.8 Dualogic"), Transmission::AutomatedManual);
        assert_eq!(detect("Up! Move 1.0 I-Motion"), Transmission::AutomatedManual);
        assert_eq!(detect("Uno Mille 1.0"), Transmission::Unidentified);
    }

    #[test]
    fn automatic_needs_a_whole_word() {
        // "automatizado" is not "automatico".
        assert_eq!(detect("Celta 1.4 Automatizado"), Transmission::AutomatedManual);
    }
}
