use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Industry the generated database should model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    Ecommerce,
    Healthcare,
    Finance,
    Education,
    Manufacturing,
    Retail,
    Technology,
    Hospitality,
    Logistics,
    Consulting,
    Custom,
}

impl BusinessType {
    pub const ALL: [BusinessType; 11] = [
        BusinessType::Ecommerce,
        BusinessType::Healthcare,
        BusinessType::Finance,
        BusinessType::Education,
        BusinessType::Manufacturing,
        BusinessType::Retail,
        BusinessType::Technology,
        BusinessType::Hospitality,
        BusinessType::Logistics,
        BusinessType::Consulting,
        BusinessType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessType::Ecommerce => "ecommerce",
            BusinessType::Healthcare => "healthcare",
            BusinessType::Finance => "finance",
            BusinessType::Education => "education",
            BusinessType::Manufacturing => "manufacturing",
            BusinessType::Retail => "retail",
            BusinessType::Technology => "technology",
            BusinessType::Hospitality => "hospitality",
            BusinessType::Logistics => "logistics",
            BusinessType::Consulting => "consulting",
            BusinessType::Custom => "custom",
        }
    }
}

/// Schema size tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    #[default]
    Medium,
    Complex,
    Enterprise,
}

impl Complexity {
    pub const ALL: [Complexity; 4] = [
        Complexity::Simple,
        Complexity::Medium,
        Complexity::Complex,
        Complexity::Enterprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Medium => "medium",
            Complexity::Complex => "complex",
            Complexity::Enterprise => "enterprise",
        }
    }

    /// Table-count range requested from the model.
    pub fn table_count_target(&self) -> &'static str {
        match self {
            Complexity::Simple => "3-5",
            Complexity::Medium => "6-10",
            Complexity::Complex => "11-18",
            Complexity::Enterprise => "19-25",
        }
    }
}

/// Sample data volume tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl SampleSize {
    pub const ALL: [SampleSize; 3] = [SampleSize::Small, SampleSize::Medium, SampleSize::Large];

    pub fn as_str(&self) -> &'static str {
        match self {
            SampleSize::Small => "small",
            SampleSize::Medium => "medium",
            SampleSize::Large => "large",
        }
    }

    /// Target records per table for the robust pipeline.
    pub fn target_records(&self) -> usize {
        match self {
            SampleSize::Small => 30,
            SampleSize::Medium => 50,
            SampleSize::Large => 75,
        }
    }

    /// Record-count range for the single-call path.
    pub fn legacy_range(&self) -> &'static str {
        match self {
            SampleSize::Small => "15-25",
            SampleSize::Medium => "30-40",
            SampleSize::Large => "45-60",
        }
    }
}

macro_rules! text_enum {
    ($ty:ident, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let wanted = value.trim().to_ascii_lowercase();
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|variant| variant.as_str() == wanted)
                    .ok_or_else(|| {
                        let allowed: Vec<&str> = $ty::ALL.iter().map(|v| v.as_str()).collect();
                        format!(
                            "unknown {} '{}', expected one of: {}",
                            $what,
                            value,
                            allowed.join(", ")
                        )
                    })
            }
        }
    };
}

text_enum!(BusinessType, "business type");
text_enum!(Complexity, "complexity");
text_enum!(SampleSize, "sample size");

/// Parameters for one database generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseRequest {
    pub business_type: BusinessType,
    pub complexity: Complexity,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default = "default_include_sample_data")]
    pub include_sample_data: bool,
    #[serde(default)]
    pub sample_size: SampleSize,
    #[serde(default)]
    pub additional_context: String,
    /// Overrides the sample size tier's records per table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_records: Option<usize>,
}

fn default_include_sample_data() -> bool {
    true
}

impl DatabaseRequest {
    pub fn new(
        business_type: BusinessType,
        complexity: Complexity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            business_type,
            complexity,
            description: description.into(),
            requirements: Vec::new(),
            include_sample_data: true,
            sample_size: SampleSize::default(),
            additional_context: String::new(),
            target_records: None,
        }
    }

    /// Records per table for the batch generator.
    pub fn target_records(&self) -> usize {
        self.target_records
            .unwrap_or_else(|| self.sample_size.target_records())
    }

    /// Context string handed to the batch generator.
    pub fn business_context(&self) -> String {
        format!("{} ({} business)", self.description, self.business_type)
    }
}

/// First `max` characters of `text`, on a char boundary.
pub(crate) fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Healthcare".parse::<BusinessType>(), Ok(BusinessType::Healthcare));
        assert_eq!(" large ".parse::<SampleSize>(), Ok(SampleSize::Large));
        let err = "huge".parse::<Complexity>().unwrap_err();
        assert!(err.contains("simple, medium, complex, enterprise"));
    }

    #[test]
    fn tiers_map_to_targets() {
        assert_eq!(SampleSize::Small.target_records(), 30);
        assert_eq!(SampleSize::default().target_records(), 50);
        assert_eq!(SampleSize::Large.legacy_range(), "45-60");
        assert_eq!(Complexity::Enterprise.table_count_target(), "19-25");
    }

    #[test]
    fn business_context_names_type() {
        let request = DatabaseRequest::new(
            BusinessType::Ecommerce,
            Complexity::Simple,
            "Online bookstore",
        );
        assert_eq!(request.business_context(), "Online bookstore (ecommerce business)");
        assert!(request.include_sample_data);
        assert_eq!(request.target_records(), 50);
    }

    #[test]
    fn deserializes_with_defaults() {
        let request: DatabaseRequest = serde_json::from_str(
            r#"{"business_type":"retail","complexity":"complex","description":"Shoes"}"#,
        )
        .expect("request");
        assert_eq!(request.sample_size, SampleSize::Medium);
        assert!(request.include_sample_data);
        assert!(request.requirements.is_empty());
    }

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
