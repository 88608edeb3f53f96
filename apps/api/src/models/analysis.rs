//! Canonical candidate analysis schema.
//!
//! The extractor is a best-effort language model, so every field defaults to
//! empty and the field adapters in [`lenient`] accept the shapes models tend
//! to produce (nulls, numbers where text is expected, a single string where a
//! list is expected, plain strings where an entry object is expected). Wire
//! keys follow the admin API's resume documents.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use self::lenient::KeyTable;

/// Top-level keys the extractor is known to use, canonical key first.
const ANALYSIS_KEYS: KeyTable = &[
    ("email", &["email_address"]),
    ("phone_number", &["phone"]),
    ("social_profile_links", &["social_profiles"]),
    ("education_details", &["education"]),
    ("work_experience_details", &["work_experience"]),
    ("key_skills", &["skills"]),
    ("project_experience", &["projects"]),
    ("profile_summary", &["summary"]),
];

const EDUCATION_KEYS: KeyTable = &[
    ("institute", &["institution", "school"]),
    ("major", &["field", "field_of_study"]),
    ("dates", &["duration"]),
];

const WORK_KEYS: KeyTable = &[
    ("company", &["employer", "organization"]),
    ("title", &["role", "position"]),
    ("dates", &["duration"]),
    ("responsibilities", &["highlights"]),
];

const PROJECT_KEYS: KeyTable = &[
    ("name", &["title", "project_name"]),
    ("technologies", &["tech_stack", "technologies_used"]),
    ("dates", &["duration"]),
    ("link", &["url"]),
];

/// Deserialization first folds alias keys onto their canonical key (see
/// [`lenient::canonical_keys`]), so a payload carrying both `skills` and
/// `key_skills` is read rather than rejected as a duplicate field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self", default)]
pub struct CandidateAnalysis {
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,

    #[serde(deserialize_with = "lenient::text")]
    pub email: String,

    #[serde(deserialize_with = "lenient::text")]
    pub phone_number: String,

    #[serde(deserialize_with = "lenient::text_list")]
    pub social_profile_links: Vec<String>,

    #[serde(rename = "education_details", deserialize_with = "lenient::entries")]
    pub education_entries: Vec<EducationEntry>,

    #[serde(rename = "work_experience_details", deserialize_with = "lenient::entries")]
    pub work_entries: Vec<WorkEntry>,

    #[serde(rename = "key_skills", deserialize_with = "lenient::text_list")]
    pub skills: Vec<String>,

    #[serde(rename = "project_experience", deserialize_with = "lenient::entries")]
    pub project_entries: Vec<ProjectEntry>,

    #[serde(deserialize_with = "lenient::text")]
    pub profile_summary: String,

    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::number"
    )]
    pub experience_years: Option<f64>,
}

impl Serialize for CandidateAnalysis {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        CandidateAnalysis::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for CandidateAnalysis {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut value = lenient::canonical_keys(Value::deserialize(deserializer)?, ANALYSIS_KEYS);
        if let Value::Object(map) = &mut value {
            lenient::canonical_entry_keys(map, "education_details", EDUCATION_KEYS);
            lenient::canonical_entry_keys(map, "work_experience_details", WORK_KEYS);
            lenient::canonical_entry_keys(map, "project_experience", PROJECT_KEYS);
        }
        CandidateAnalysis::deserialize(value).map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationEntry {
    #[serde(deserialize_with = "lenient::text")]
    pub institute: String,
    #[serde(deserialize_with = "lenient::text")]
    pub degree: String,
    #[serde(deserialize_with = "lenient::text")]
    pub major: String,
    #[serde(deserialize_with = "lenient::text")]
    pub location: String,
    #[serde(deserialize_with = "lenient::text")]
    pub dates: String,
    /// Free text kept when the extractor gave a sentence instead of an object.
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "lenient::text")]
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkEntry {
    #[serde(deserialize_with = "lenient::text")]
    pub company: String,
    #[serde(deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(deserialize_with = "lenient::text")]
    pub location: String,
    #[serde(deserialize_with = "lenient::text")]
    pub dates: String,
    #[serde(deserialize_with = "lenient::text_list")]
    pub responsibilities: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "lenient::text")]
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectEntry {
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(deserialize_with = "lenient::text")]
    pub description: String,
    #[serde(deserialize_with = "lenient::text_list")]
    pub technologies: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub dates: String,
    #[serde(deserialize_with = "lenient::text")]
    pub link: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "lenient::text")]
    pub summary: String,
}

impl From<String> for EducationEntry {
    fn from(summary: String) -> Self {
        Self {
            summary,
            ..Self::default()
        }
    }
}

impl From<String> for WorkEntry {
    fn from(summary: String) -> Self {
        Self {
            summary,
            ..Self::default()
        }
    }
}

impl From<String> for ProjectEntry {
    fn from(summary: String) -> Self {
        Self {
            summary,
            ..Self::default()
        }
    }
}

pub(crate) mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::{Map, Value};

    /// `(canonical key, aliases)` pairs, in priority order.
    pub type KeyTable = &'static [(&'static str, &'static [&'static str])];

    /// Moves the first non-null value among a canonical key and its aliases
    /// onto the canonical key and drops the rest. Non-objects pass through.
    pub fn canonical_keys(value: Value, table: KeyTable) -> Value {
        let Value::Object(mut map) = value else {
            return value;
        };
        for (canonical, aliases) in table {
            let mut chosen = None;
            for key in std::iter::once(canonical).chain(aliases.iter()) {
                if let Some(found) = map.remove(*key) {
                    if chosen.is_none() && !found.is_null() {
                        chosen = Some(found);
                    }
                }
            }
            if let Some(found) = chosen {
                map.insert(canonical.to_string(), found);
            }
        }
        Value::Object(map)
    }

    /// [`canonical_keys`] applied to each entry under `field`, which may be a
    /// list or a single entry object.
    pub fn canonical_entry_keys(map: &mut Map<String, Value>, field: &str, table: KeyTable) {
        if let Some(slot) = map.get_mut(field) {
            *slot = match slot.take() {
                Value::Array(items) => Value::Array(
                    items
                        .into_iter()
                        .map(|item| canonical_keys(item, table))
                        .collect(),
                ),
                other => canonical_keys(other, table),
            };
        }
    }

    /// Any scalar becomes its text; null becomes empty; lists are comma-joined.
    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(value_text(Value::deserialize(d)?))
    }

    /// A list of texts. Accepts a single comma-separated string, and flattens
    /// objects of lists (skills grouped by category).
    pub fn text_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(value_texts(Value::deserialize(d)?))
    }

    pub fn entries<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + From<String>,
    {
        let items = match Value::deserialize(d)? {
            Value::Null => Vec::new(),
            Value::Array(items) => items,
            other => vec![other],
        };
        Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Null => None,
                Value::Object(_) => {
                    let fallback = item.to_string();
                    Some(serde_json::from_value(item).unwrap_or_else(|_| T::from(fallback)))
                }
                other => Some(value_text(other))
                    .filter(|s| !s.is_empty())
                    .map(T::from),
            })
            .collect())
    }

    /// Numbers, or strings that start with one ("5+ years").
    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => {
                let digits: String = s
                    .trim()
                    .chars()
                    .take_while(|c| c.is_ascii_digit() || *c == '.')
                    .collect();
                digits.parse().ok()
            }
            _ => None,
        })
    }

    fn value_text(value: Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.trim().to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(_) => value_texts(value).join(", "),
            Value::Object(_) => value.to_string(),
        }
    }

    fn value_texts(value: Value) -> Vec<String> {
        match value {
            Value::Null => Vec::new(),
            Value::String(s) => s
                .split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect(),
            Value::Array(items) => items
                .into_iter()
                .map(value_text)
                .filter(|s| !s.is_empty())
                .collect(),
            Value::Object(map) => map.into_iter().flat_map(|(_, v)| value_texts(v)).collect(),
            other => vec![value_text(other)],
        }
    }
}
