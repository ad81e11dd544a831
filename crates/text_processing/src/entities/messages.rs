//! User-facing clarification texts

use poultry_assistant_core::{Language, SlotName};

fn slot_label(slot: SlotName, language: &Language) -> &'static str {
    match (language, slot) {
        (Language::French, SlotName::Breed) => "la race (ex. Ross 308, Cobb 500)",
        (Language::French, SlotName::AgeDays) => "l'âge en jours (ex. 21 jours)",
        (Language::French, SlotName::MetricType) => {
            "l'indicateur recherché (ex. poids, indice de consommation, mortalité)"
        },
        (Language::French, SlotName::Sex) => "le sexe (mâles, femelles ou mixte)",
        (Language::French, SlotName::Weight) => "le poids actuel (ex. 2,1 kg)",
        (Language::Spanish, SlotName::Breed) => "la raza (ej. Ross 308, Cobb 500)",
        (Language::Spanish, SlotName::AgeDays) => "la edad en días (ej. 21 días)",
        (Language::Spanish, SlotName::MetricType) => {
            "el indicador (ej. peso, conversión alimenticia, mortalidad)"
        },
        (Language::Spanish, SlotName::Sex) => "el sexo (machos, hembras o mixto)",
        (Language::Spanish, SlotName::Weight) => "el peso actual (ej. 2,1 kg)",
        (_, SlotName::Breed) => "the breed (e.g. Ross 308, Cobb 500)",
        (_, SlotName::AgeDays) => "the age in days (e.g. 21 days)",
        (_, SlotName::MetricType) => "the metric (e.g. body weight, FCR, mortality)",
        (_, SlotName::Sex) => "the sex (males, females or mixed)",
        (_, SlotName::Weight) => "the current weight (e.g. 2.1 kg)",
    }
}

fn labels(missing: &[SlotName], language: &Language) -> String {
    missing
        .iter()
        .map(|slot| slot_label(*slot, language))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Question asking the user for every missing slot
pub(super) fn clarification(missing: &[SlotName], language: &Language) -> String {
    let wanted = labels(missing, language);
    match language {
        Language::French => format!(
            "Pour vous donner une réponse précise, pourriez-vous préciser : {}.",
            wanted
        ),
        Language::Spanish => format!(
            "Para darle una respuesta precisa, ¿podría indicar: {}?",
            wanted
        ),
        _ => format!("To give you a precise answer, could you specify: {}?", wanted),
    }
}

/// Soft hint when the answer can be attempted without the missing slot
pub(super) fn processable_hint(missing: &[SlotName], language: &Language) -> String {
    let wanted = labels(missing, language);
    match language {
        Language::French => format!(
            "Réponse générale fournie. Pour plus de précision, indiquez {}.",
            wanted
        ),
        Language::Spanish => format!(
            "Respuesta general. Para mayor precisión, indique {}.",
            wanted
        ),
        _ => format!("General answer provided. For more precision, specify {}.", wanted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clarification_lists_every_slot() {
        let message = clarification(&[SlotName::Breed, SlotName::AgeDays], &Language::French);
        assert!(message.contains("race"));
        assert!(message.contains("jours"));
    }

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        let message = clarification(&[SlotName::Breed], &Language::from_code("de"));
        assert!(message.contains("breed"));
    }
}
