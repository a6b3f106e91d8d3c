//! Table-name inflection and foreign-key reference guessing.
//!
//! Column names such as `customer_id` hint at the table they point to, but the
//! hint is only as good as English pluralization. Guesses therefore carry a
//! confidence and a list of candidates instead of a single answer.

use inflector::Inflector;
use serde::{Deserialize, Serialize};

/// Irregular plurals that show up in business schemas.
static IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("leaf", "leaves"),
    ("life", "lives"),
    ("half", "halves"),
    ("analysis", "analyses"),
    ("basis", "bases"),
    ("crisis", "crises"),
    ("diagnosis", "diagnoses"),
    ("criterion", "criteria"),
    ("datum", "data"),
    ("medium", "media"),
    ("index", "indices"),
    ("matrix", "matrices"),
    ("vertex", "vertices"),
];

/// Words whose singular and plural forms are spelled the same.
static UNCOUNTABLE: &[&str] = &[
    "equipment", "information", "series", "species", "staff", "inventory", "feedback",
    "software", "news",
];

pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let lower = word.to_lowercase();
    if UNCOUNTABLE.contains(&lower.as_str()) {
        return lower;
    }
    for (singular, plural) in IRREGULAR_PLURALS {
        if lower == *singular || lower == *plural {
            return plural.to_string();
        }
    }

    lower.to_plural()
}

pub fn singularize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let lower = word.to_lowercase();
    if UNCOUNTABLE.contains(&lower.as_str()) {
        return lower;
    }
    for (singular, plural) in IRREGULAR_PLURALS {
        if lower == *plural || lower == *singular {
            return singular.to_string();
        }
    }

    lower.to_singular()
}

fn is_irregular(word: &str) -> bool {
    let lower = word.to_lowercase();
    UNCOUNTABLE.contains(&lower.as_str())
        || IRREGULAR_PLURALS
            .iter()
            .any(|(singular, plural)| lower == *singular || lower == *plural)
}

/// How much a reference guess should be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
}

/// Candidate tables a foreign-key-shaped column may point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceGuess {
    /// Column name with the key suffix/prefix removed.
    pub stem: String,
    /// Candidate table names, most likely first.
    pub candidates: Vec<String>,
    pub confidence: Confidence,
}

impl ReferenceGuess {
    /// Most likely table name, without checking it exists.
    pub fn best(&self) -> Option<&str> {
        self.candidates.first().map(String::as_str)
    }

    /// First candidate present in `known_tables` (case-insensitive).
    pub fn resolve<'a, I>(&self, known_tables: I) -> Option<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let known: Vec<&str> = known_tables.into_iter().collect();
        self.candidates.iter().find_map(|candidate| {
            known
                .iter()
                .find(|table| table.eq_ignore_ascii_case(candidate))
                .map(|table| table.to_string())
        })
    }
}

/// Strip the key marker from a column name, returning the lower-case stem.
pub fn reference_stem(column_name: &str) -> Option<String> {
    let lower = column_name.to_lowercase();
    if lower == "id" {
        return None;
    }

    let stem = if let Some(stem) = lower.strip_suffix("_id") {
        stem.to_string()
    } else if let Some(stem) = column_name.strip_suffix("Id") {
        stem.to_snake_case()
    } else if let Some(rest) = lower.strip_prefix("fk_") {
        rest.strip_suffix("_id").unwrap_or(rest).to_string()
    } else {
        return None;
    };

    let stem = stem.trim_matches('_').to_string();
    if stem.is_empty() { None } else { Some(stem) }
}

/// Guess which table a foreign-key-shaped column references.
///
/// Returns `None` when the name carries no usable stem. Only the last
/// underscore-separated word is inflected (`order_item_id` -> `order_items`).
pub fn guess_reference(column_name: &str) -> Option<ReferenceGuess> {
    let stem = reference_stem(column_name)?;
    let (prefix, last) = match stem.rsplit_once('_') {
        Some((prefix, last)) => (format!("{prefix}_"), last.to_string()),
        None => (String::new(), stem.clone()),
    };

    let plural = format!("{prefix}{}", pluralize(&last));
    let singular = format!("{prefix}{}", singularize(&last));

    let mut candidates = Vec::new();
    for candidate in [plural.clone(), singular.clone(), stem.clone()] {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }

    let confidence = if plural == singular || is_irregular(&last) {
        Confidence::Low
    } else {
        Confidence::Medium
    };

    Some(ReferenceGuess {
        stem,
        candidates,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pluralizes_regular_and_irregular_words() {
        assert_eq!(pluralize("customer"), "customers");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("person"), "people");
        assert_eq!(pluralize("people"), "people");
        assert_eq!(pluralize("staff"), "staff");
    }

    #[test]
    fn singularizes_regular_and_irregular_words() {
        assert_eq!(singularize("customers"), "customer");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("analyses"), "analysis");
    }

    #[test]
    fn guesses_plural_first() {
        let guess = guess_reference("user_id").expect("guess");
        assert_eq!(guess.stem, "user");
        assert_eq!(guess.candidates, vec!["users".to_string(), "user".to_string()]);
        assert_eq!(guess.confidence, Confidence::Medium);
    }

    #[test]
    fn handles_camel_case_and_fk_prefix() {
        let guess = guess_reference("customerId").expect("guess");
        assert_eq!(guess.best(), Some("customers"));

        let guess = guess_reference("fk_product").expect("guess");
        assert_eq!(guess.best(), Some("products"));
    }

    #[test]
    fn inflects_only_the_last_word() {
        let guess = guess_reference("order_item_id").expect("guess");
        assert_eq!(guess.best(), Some("order_items"));
    }

    #[test]
    fn irregular_stems_are_low_confidence() {
        let guess = guess_reference("staff_id").expect("guess");
        assert_eq!(guess.confidence, Confidence::Low);
        assert_eq!(guess.candidates, vec!["staff".to_string()]);
    }

    #[test]
    fn no_guess_without_stem() {
        assert!(guess_reference("id").is_none());
        assert!(guess_reference("_id").is_none());
        assert!(guess_reference("email").is_none());
    }

    #[test]
    fn resolves_against_known_tables() {
        let guess = guess_reference("person_id").expect("guess");
        assert_eq!(guess.resolve(["orders", "People"]), Some("People".to_string()));
        assert_eq!(guess.resolve(["orders"]), None);
    }
}
