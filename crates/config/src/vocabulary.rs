//! Domain vocabulary
//!
//! Keyword tables that decide what "looks like poultry" before any model is
//! consulted. Built-in defaults cover French, English and Spanish; a YAML
//! file can replace them without a rebuild.
//!
//! ```yaml
//! domain_keywords: [poulet, broiler, fcr]
//! breeds:
//!   - name: Ross 308
//!     aliases: ["ross 308", "ross308", "r308"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

/// A breed/strain with the spellings users type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreedEntry {
    /// Canonical name returned by detection
    pub name: String,
    /// Lowercase spellings; whitespace and hyphens are matched loosely
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl BreedEntry {
    fn new(name: &str, aliases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Canonical name plus aliases
    pub fn spellings(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Domain vocabulary tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainVocabulary {
    /// Terms whose presence keeps a query out of the classifier fast-reject path
    #[serde(default = "default_domain_keywords")]
    pub domain_keywords: Vec<String>,

    /// Breeds in detection order (more specific entries first)
    #[serde(default = "default_breeds")]
    pub breeds: Vec<BreedEntry>,
}

impl Default for DomainVocabulary {
    fn default() -> Self {
        Self {
            domain_keywords: default_domain_keywords(),
            breeds: default_breeds(),
        }
    }
}

impl DomainVocabulary {
    /// Load from a YAML file; missing sections keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileNotFound(format!("{}: {}", path.display(), e)))?;

        let vocabulary: Self =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        tracing::debug!(
            path = %path.display(),
            keywords = vocabulary.domain_keywords.len(),
            breeds = vocabulary.breeds.len(),
            "Loaded domain vocabulary"
        );

        Ok(vocabulary)
    }

    /// Load from `path` when given, otherwise use the built-in tables
    pub fn load_or_default(path: Option<&str>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Whether the text mentions any domain keyword
    ///
    /// Keywords match at a word start, so plurals ("poulets", "broilers")
    /// count as hits.
    pub fn contains_domain_keyword(&self, text: &str) -> bool {
        self.matched_keyword(text).is_some()
    }

    /// First domain keyword found in the text
    pub fn matched_keyword(&self, text: &str) -> Option<&str> {
        let haystack = text.to_lowercase();
        self.domain_keywords
            .iter()
            .find(|keyword| starts_word(&haystack, &keyword.to_lowercase()))
            .map(String::as_str)
    }

    /// Canonical name of a known breed, matching name or alias loosely
    pub fn canonical_breed(&self, value: &str) -> Option<&str> {
        let wanted = squash(value);
        self.breeds
            .iter()
            .find(|breed| breed.spellings().any(|s| squash(s) == wanted))
            .map(|breed| breed.name.as_str())
    }
}

/// Load the vocabulary at `path`, or the built-in tables when none is configured
pub fn load_vocabulary(path: Option<&str>) -> Result<DomainVocabulary, ConfigError> {
    DomainVocabulary::load_or_default(path)
}

/// Lowercase and drop whitespace, hyphens and underscores
fn squash(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn starts_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |prev| !prev.is_alphanumeric())
    })
}

fn default_domain_keywords() -> Vec<String> {
    [
        // French
        "poulet", "poule", "poussin", "volaille", "aviculture", "avicole", "élevage", "éleveur",
        "pondeuse", "ponte", "œuf", "oeuf", "couvoir", "éclosion", "incubation", "dinde",
        "canard", "caille", "litière", "poulailler", "bâtiment", "aliment", "abreuvement",
        "indice de consommation", "conversion alimentaire", "gmq", "mortalité", "coccidiose",
        "gumboro", "vaccin", "reproducteur", "chair",
        // English
        "chicken", "poultry", "broiler", "layer", "hen", "chick", "rooster", "egg", "hatchery",
        "hatching", "turkey", "duck", "flock", "litter", "feed", "feed conversion", "mortality",
        "coccidiosis", "vaccine", "breeder", "barn",
        // Spanish
        "pollo", "gallina", "avícola", "avicultura", "huevo", "pollito", "engorde",
        // Strains and metrics
        "ross", "cobb", "hubbard", "lohmann", "hy-line", "isa brown", "dekalb", "novogen",
        "shaver", "bovans", "fcr", "epef", "adg",
    ]
    .iter()
    .map(|k| k.to_string())
    .collect()
}

fn default_breeds() -> Vec<BreedEntry> {
    vec![
        BreedEntry::new("Ross 308", &["ross 308", "ross308", "r308"]),
        BreedEntry::new("Ross 708", &["ross 708", "ross708", "r708"]),
        BreedEntry::new("Ross PM3", &["ross pm3"]),
        BreedEntry::new("Cobb 500", &["cobb 500", "cobb500", "c500"]),
        BreedEntry::new("Cobb 700", &["cobb 700", "cobb700"]),
        BreedEntry::new("Hubbard Flex", &["hubbard flex"]),
        BreedEntry::new("Hubbard JA87", &["hubbard ja87", "ja87", "ja 87"]),
        BreedEntry::new("Hubbard Classic", &["hubbard classic", "hubbard"]),
        BreedEntry::new("ISA Brown", &["isa brown", "isa"]),
        BreedEntry::new("Lohmann Brown", &["lohmann brown"]),
        BreedEntry::new("Lohmann LSL", &["lohmann lsl", "lsl"]),
        BreedEntry::new("Hy-Line Brown", &["hy-line brown", "hyline brown"]),
        BreedEntry::new("Hy-Line W-36", &["hy-line w-36", "hy-line w36", "w-36", "w36"]),
        BreedEntry::new("Dekalb White", &["dekalb white", "dekalb"]),
        BreedEntry::new("Novogen Brown", &["novogen brown", "novogen"]),
        BreedEntry::new("Shaver", &["shaver"]),
        BreedEntry::new("Bovans", &["bovans"]),
        BreedEntry::new("Ross", &["ross"]),
        BreedEntry::new("Cobb", &["cobb"]),
    ]
}
