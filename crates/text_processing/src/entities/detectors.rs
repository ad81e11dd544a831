//! Pure slot detectors
//!
//! Every detector is a function `(text) -> Option<value>` over statically
//! compiled patterns. Breed detection can also run against a config-driven
//! vocabulary through [`BreedMatcher`].

use once_cell::sync::Lazy;
use regex::Regex;

use poultry_assistant_config::constants::validator::MAX_AGE_DAYS;
use poultry_assistant_config::DomainVocabulary;

/// Canonical metric identifiers
pub mod metrics {
    pub const FEED_CONVERSION_RATIO: &str = "feed_conversion_ratio";
    pub const BODY_WEIGHT: &str = "body_weight";
    pub const DAILY_WEIGHT_GAIN: &str = "daily_weight_gain";
    pub const FEED_INTAKE: &str = "feed_intake";
    pub const WATER_INTAKE: &str = "water_intake";
    pub const MORTALITY: &str = "mortality";
    pub const LIVABILITY: &str = "livability";
    pub const UNIFORMITY: &str = "uniformity";
    pub const EGG_PRODUCTION: &str = "egg_production";
    pub const EGG_WEIGHT: &str = "egg_weight";
    pub const BREAST_YIELD: &str = "breast_yield";
    pub const CARCASS_YIELD: &str = "carcass_yield";
    pub const PRODUCTION_INDEX: &str = "production_index";
    pub const HATCHABILITY: &str = "hatchability";

    pub const ALL: [&str; 14] = [
        FEED_CONVERSION_RATIO,
        BODY_WEIGHT,
        DAILY_WEIGHT_GAIN,
        FEED_INTAKE,
        WATER_INTAKE,
        MORTALITY,
        LIVABILITY,
        UNIFORMITY,
        EGG_PRODUCTION,
        EGG_WEIGHT,
        BREAST_YIELD,
        CARCASS_YIELD,
        PRODUCTION_INDEX,
        HATCHABILITY,
    ];

    pub fn is_canonical(value: &str) -> bool {
        ALL.contains(&value)
    }
}

/// Canonical sex labels
pub mod sexes {
    pub const MALE: &str = "male";
    pub const FEMALE: &str = "female";
    pub const MIXED: &str = "mixed";
}

// Phrase -> canonical metric. Sorted longest-first when compiled so that
// "poids de l'oeuf" wins over "poids".
const METRIC_PHRASES: &[(&str, &str)] = &[
    ("indice de consommation", metrics::FEED_CONVERSION_RATIO),
    ("conversion alimentaire", metrics::FEED_CONVERSION_RATIO),
    ("feed conversion ratio", metrics::FEED_CONVERSION_RATIO),
    ("feed conversion", metrics::FEED_CONVERSION_RATIO),
    ("índice de conversión", metrics::FEED_CONVERSION_RATIO),
    ("conversión alimenticia", metrics::FEED_CONVERSION_RATIO),
    ("fcr", metrics::FEED_CONVERSION_RATIO),
    ("gain moyen quotidien", metrics::DAILY_WEIGHT_GAIN),
    ("average daily gain", metrics::DAILY_WEIGHT_GAIN),
    ("daily weight gain", metrics::DAILY_WEIGHT_GAIN),
    ("daily gain", metrics::DAILY_WEIGHT_GAIN),
    ("gmq", metrics::DAILY_WEIGHT_GAIN),
    ("adg", metrics::DAILY_WEIGHT_GAIN),
    ("ganancia diaria", metrics::DAILY_WEIGHT_GAIN),
    ("poids de l'oeuf", metrics::EGG_WEIGHT),
    ("poids de l'œuf", metrics::EGG_WEIGHT),
    ("poids des oeufs", metrics::EGG_WEIGHT),
    ("poids des œufs", metrics::EGG_WEIGHT),
    ("egg weight", metrics::EGG_WEIGHT),
    ("poids vif", metrics::BODY_WEIGHT),
    ("body weight", metrics::BODY_WEIGHT),
    ("live weight", metrics::BODY_WEIGHT),
    ("poids", metrics::BODY_WEIGHT),
    ("weight", metrics::BODY_WEIGHT),
    ("peso", metrics::BODY_WEIGHT),
    ("consommation d'eau", metrics::WATER_INTAKE),
    ("water consumption", metrics::WATER_INTAKE),
    ("water intake", metrics::WATER_INTAKE),
    ("consumo de agua", metrics::WATER_INTAKE),
    ("consommation d'aliment", metrics::FEED_INTAKE),
    ("consommation alimentaire", metrics::FEED_INTAKE),
    ("feed consumption", metrics::FEED_INTAKE),
    ("feed intake", metrics::FEED_INTAKE),
    ("consumo de alimento", metrics::FEED_INTAKE),
    ("consommation", metrics::FEED_INTAKE),
    ("taux de mortalité", metrics::MORTALITY),
    ("mortalité", metrics::MORTALITY),
    ("mortality", metrics::MORTALITY),
    ("mortalidad", metrics::MORTALITY),
    ("viabilité", metrics::LIVABILITY),
    ("livability", metrics::LIVABILITY),
    ("homogénéité", metrics::UNIFORMITY),
    ("uniformité", metrics::UNIFORMITY),
    ("uniformity", metrics::UNIFORMITY),
    ("taux de ponte", metrics::EGG_PRODUCTION),
    ("egg production", metrics::EGG_PRODUCTION),
    ("laying rate", metrics::EGG_PRODUCTION),
    ("ponte", metrics::EGG_PRODUCTION),
    ("rendement en filet", metrics::BREAST_YIELD),
    ("rendement filet", metrics::BREAST_YIELD),
    ("breast meat yield", metrics::BREAST_YIELD),
    ("breast yield", metrics::BREAST_YIELD),
    ("rendement carcasse", metrics::CARCASS_YIELD),
    ("carcass yield", metrics::CARCASS_YIELD),
    ("production efficiency factor", metrics::PRODUCTION_INDEX),
    ("indice de production", metrics::PRODUCTION_INDEX),
    ("epef", metrics::PRODUCTION_INDEX),
    ("eclosabilité", metrics::HATCHABILITY),
    ("éclosabilité", metrics::HATCHABILITY),
    ("hatchability", metrics::HATCHABILITY),
];

static METRIC_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    let mut phrases: Vec<&(&str, &str)> = METRIC_PHRASES.iter().collect();
    phrases.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
    phrases
        .into_iter()
        .map(|(phrase, metric)| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(phrase));
            (Regex::new(&pattern).unwrap(), *metric)
        })
        .collect()
});

// Age: explicit days, weeks (x7), then "J21" / "day 21" forms
static AGE_DAYS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,3})\s*(jours?|j|days?|d|días?|dias?)\b").unwrap()
});
static AGE_WEEKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:[.,]\d+)?)\s*(?:semaines?|sem|weeks?|wks?|wk|semanas?)\b").unwrap()
});
static AGE_PREFIXED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:jour|day|día|dia|j|d)\s?(\d{1,3})\b").unwrap()
});

static SEX_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)\b(?:mixtes?|mixed|as[\s_-]?hatched|non[\s-]?sexés?|straight[\s-]?run)\b").unwrap(),
            sexes::MIXED,
        ),
        (
            Regex::new(r"(?i)\b(?:mâles?|males?|coqs?|cockerels?|machos?)\b").unwrap(),
            sexes::MALE,
        ),
        (
            Regex::new(r"(?i)\b(?:femelles?|females?|pullets?|hembras?)\b").unwrap(),
            sexes::FEMALE,
        ),
    ]
});

// Body weight in grams or kilograms
static WEIGHT_KG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+(?:[.,]\d+)?)\s*(?:kg|kilos?|kilogrammes?|kilograms?)\b").unwrap());
static WEIGHT_G: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+(?:[.,]\d+)?)\s*(?:g|gr|grammes?|grams?|gramos?)\b").unwrap());

static GENERAL_QUESTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:recommand\w*|recommend\w*|conseil\w*|advice|advise|best|meilleur\w*|mieux|compar\w*|versus|vs|comment|how\s+(?:to|do\s+(?:i|you|we)|can\s+(?:i|we)|should\s+(?:i|we))|calcul\w*|définition|defin\w*|expliqu\w*|explain\w*|en\s+général|in\s+general|généralement|generally|tips?|astuces?|bonnes?\s+pratiques?|best\s+practices?|cómo|mejor\w*)\b",
    )
    .unwrap()
});

/// Compiled breed aliases, matched in vocabulary order
#[derive(Debug, Clone)]
pub struct BreedMatcher {
    patterns: Vec<(Regex, String)>,
}

impl BreedMatcher {
    /// Compile one pattern per spelling; spellings that fail to compile are skipped
    pub fn from_vocabulary(vocabulary: &DomainVocabulary) -> Self {
        let mut patterns = Vec::new();

        for breed in &vocabulary.breeds {
            for spelling in breed.spellings() {
                let tokens: Vec<String> = spelling
                    .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
                    .filter(|t| !t.is_empty())
                    .map(regex::escape)
                    .collect();
                if tokens.is_empty() {
                    continue;
                }

                let pattern = format!(r"(?i)\b{}\b", tokens.join(r"[\s\-_]*"));
                match Regex::new(&pattern) {
                    Ok(regex) => patterns.push((regex, breed.name.clone())),
                    Err(e) => {
                        tracing::warn!(spelling, error = %e, "Skipping breed alias that does not compile")
                    },
                }
            }
        }

        Self { patterns }
    }

    /// Canonical breed mentioned in the text
    pub fn detect(&self, text: &str) -> Option<String> {
        self.patterns
            .iter()
            .find(|(regex, _)| regex.is_match(text))
            .map(|(_, name)| name.clone())
    }

    /// Surface form of the first breed mention, as written by the user
    pub fn find_mention<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.patterns
            .iter()
            .find_map(|(regex, _)| regex.find(text))
            .map(|m| m.as_str())
    }
}

impl Default for BreedMatcher {
    fn default() -> Self {
        Self::from_vocabulary(&DomainVocabulary::default())
    }
}

static DEFAULT_BREEDS: Lazy<BreedMatcher> = Lazy::new(BreedMatcher::default);

/// Canonical breed name from the built-in vocabulary
pub fn detect_breed(text: &str) -> Option<String> {
    DEFAULT_BREEDS.detect(text)
}

/// Age in days; weeks are converted with a factor of 7
///
/// Ages above the default maximum are skipped in favour of a later mention.
pub fn detect_age_days(text: &str) -> Option<u32> {
    detect_age_days_within(text, MAX_AGE_DAYS)
}

/// First age mention in `[0, max_days]`
///
/// Day mentions are tried before week mentions, then the "J21" form.
pub fn detect_age_days_within(text: &str, max_days: u32) -> Option<u32> {
    let in_range = |days: &u32| *days <= max_days;

    let days = AGE_DAYS
        .captures_iter(text)
        .filter(|c| !is_elided_unit(text, c))
        .filter_map(|c| c.get(1)?.as_str().parse::<u32>().ok())
        .find(in_range);
    if days.is_some() {
        return days;
    }

    let weeks = AGE_WEEKS
        .captures_iter(text)
        .filter_map(|c| parse_decimal(c.get(1)?.as_str()))
        .map(|weeks| (weeks * 7.0).round() as u32)
        .find(in_range);
    if weeks.is_some() {
        return weeks;
    }

    AGE_PREFIXED
        .captures_iter(text)
        .filter_map(|c| c.get(1)?.as_str().parse::<u32>().ok())
        .find(in_range)
}

// "308 d'un lot": a one-letter unit followed by an apostrophe is an elided article
fn is_elided_unit(text: &str, captures: &regex::Captures<'_>) -> bool {
    let (Some(unit), Some(whole)) = (captures.get(2), captures.get(0)) else {
        return false;
    };
    unit.as_str().chars().count() == 1 && text[whole.end()..].starts_with(['\'', '\u{2019}'])
}

/// Canonical metric for the longest matching phrase
pub fn detect_metric_type(text: &str) -> Option<&'static str> {
    METRIC_PATTERNS
        .iter()
        .find(|(regex, _)| regex.is_match(text))
        .map(|(_, metric)| *metric)
}

/// Canonical sex label
pub fn detect_sex(text: &str) -> Option<&'static str> {
    SEX_PATTERNS
        .iter()
        .find(|(regex, _)| regex.is_match(text))
        .map(|(_, sex)| *sex)
}

/// Body weight in grams
pub fn detect_weight_grams(text: &str) -> Option<f64> {
    if let Some(kg) = WEIGHT_KG
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_decimal(m.as_str()))
    {
        return Some(kg * 1000.0);
    }

    WEIGHT_G
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_decimal(m.as_str()))
}

/// Whether the query asks for general advice rather than a flock-specific figure
pub fn is_general_question(text: &str) -> bool {
    GENERAL_QUESTION.is_match(text)
}

/// Whether a value is a sex label in any supported language
pub fn is_sex_label(value: &str) -> bool {
    SEX_PATTERNS
        .iter()
        .skip(1)
        .any(|(regex, _)| regex.find(value).is_some_and(|m| m.as_str().len() == value.trim().len()))
}

fn parse_decimal(raw: &str) -> Option<f64> {
    raw.replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_breed() {
        assert_eq!(detect_breed("FCR mâles Ross 308").as_deref(), Some("Ross 308"));
        assert_eq!(detect_breed("poids cobb500 à 35j").as_deref(), Some("Cobb 500"));
        assert_eq!(detect_breed("Hy-Line W-36 egg weight").as_deref(), Some("Hy-Line W-36"));
        assert_eq!(detect_breed("poids des poulets"), None);
    }

    #[test]
    fn test_specific_breed_before_generic() {
        assert_eq!(detect_breed("ross 708 females").as_deref(), Some("Ross 708"));
        assert_eq!(detect_breed("my ross flock").as_deref(), Some("Ross"));
    }

    #[test]
    fn test_find_mention_keeps_surface_form() {
        let matcher = BreedMatcher::default();
        assert_eq!(matcher.find_mention("FCR mâles Ross 308 à 35 jours"), Some("Ross 308"));
    }

    #[test]
    fn test_detect_age_days() {
        assert_eq!(detect_age_days("Poids Ross 308 à 21 jours"), Some(21));
        assert_eq!(detect_age_days("weight at 35 days"), Some(35));
        assert_eq!(detect_age_days("poids à 5 semaines"), Some(35));
        assert_eq!(detect_age_days("FCR at J42"), Some(42));
        assert_eq!(detect_age_days("Ross 308 à 28j"), Some(28));
        assert_eq!(detect_age_days("Quel poids?"), None);
    }

    #[test]
    fn test_breed_number_is_not_an_age() {
        assert_eq!(detect_age_days("Ross 308 35 jours"), Some(35));
        assert_eq!(detect_age_days("Cobb 500 mortality"), None);
        assert_eq!(detect_age_days("Poids Ross 308 d'un lot de 21 jours"), Some(21));
        assert_eq!(detect_age_days("Poids Ross 308 d’un lot de 21 jours"), Some(21));
        assert_eq!(detect_age_days("Cobb 500 d'origine"), None);
    }

    #[test]
    fn test_age_beyond_max_is_skipped() {
        assert_eq!(detect_age_days("Poids à 300 jours"), None);
        assert_eq!(detect_age_days_within("lot de 90 jours ou 42 jours", 60), Some(42));
        assert_eq!(detect_age_days_within("poids à 10 semaines", 60), None);
    }

    #[test]
    fn test_detect_metric_longest_first() {
        assert_eq!(detect_metric_type("Quel poids?"), Some(metrics::BODY_WEIGHT));
        assert_eq!(
            detect_metric_type("poids de l'oeuf à 30 semaines"),
            Some(metrics::EGG_WEIGHT)
        );
        assert_eq!(
            detect_metric_type("Impact nutrition sur FCR"),
            Some(metrics::FEED_CONVERSION_RATIO)
        );
        assert_eq!(
            detect_metric_type("what is the feed conversion of cobb"),
            Some(metrics::FEED_CONVERSION_RATIO)
        );
        assert_eq!(detect_metric_type("bonjour"), None);
    }

    #[test]
    fn test_detect_sex() {
        assert_eq!(detect_sex("FCR mâles Ross 308"), Some(sexes::MALE));
        assert_eq!(detect_sex("female broilers"), Some(sexes::FEMALE));
        assert_eq!(detect_sex("as hatched flock"), Some(sexes::MIXED));
        assert_eq!(detect_sex("poids Ross 308"), None);
    }

    #[test]
    fn test_detect_weight() {
        assert_eq!(detect_weight_grams("they weigh 2,4 kg"), Some(2400.0));
        assert_eq!(detect_weight_grams("poids 850 g"), Some(850.0));
        assert_eq!(detect_weight_grams("Ross 308"), None);
    }

    #[test]
    fn test_general_question() {
        assert!(is_general_question("Comment calculer le FCR?"));
        assert!(is_general_question("What is the best lighting program?"));
        assert!(is_general_question("How do I calculate uniformity?"));
        assert!(!is_general_question("Quel poids?"));
        assert!(!is_general_question("What is the body weight?"));
        assert!(!is_general_question("Pourquoi la mortalité augmente ?"));
        assert!(!is_general_question("C'est quoi le FCR des Ross 308 à 35 jours ?"));
    }

    #[test]
    fn test_sex_label() {
        assert!(is_sex_label("male"));
        assert!(is_sex_label("Femelles"));
        assert!(!is_sex_label("mixed"));
        assert!(!is_sex_label("male birds"));
    }
}
