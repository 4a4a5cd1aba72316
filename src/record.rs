//! The structured result of analysing a resume.
//!
//! Every field is optional. The generative service is untrusted: it may omit
//! fields, rename them, or return the wrong JSON type. [`ResumeRecord::from_value`]
//! coerces field by field, so one malformed field becomes `None` instead of
//! sinking the whole record. Unknown fields are ignored.
//!
//! Serialisation skips absent fields, so a record exported with
//! [`ResumeRecord::to_json_pretty`] parses back to an equal record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Structured resume data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_information: Option<ContactInformation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_experience: Option<Vec<WorkExperience>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<Vec<Education>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_summary: Option<String>,

    /// Suitability score, always within `0..=100`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suitability_score: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,

    /// Extra sections such as "Awards" or "Certifications".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_sections: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInformation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkExperience {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsibilities: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Education {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graduation_year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technologies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl ResumeRecord {
    /// Coerce a parsed JSON value into a record.
    ///
    /// Returns `None` only when the top level is not a JSON object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        Some(Self {
            name: get(obj, &["name", "full_name"]).and_then(text),
            contact_information: get(obj, &["contact_information", "contact_info", "contactInfo", "contact"])
                .and_then(Value::as_object)
                .map(ContactInformation::from_object),
            summary: get(obj, &["summary", "professional_summary"]).and_then(text),
            work_experience: get(obj, &["work_experience", "experience", "workExperience"])
                .and_then(|v| entries(v, WorkExperience::from_object)),
            education: get(obj, &["education"]).and_then(|v| entries(v, Education::from_object)),
            skills: get(obj, &["skills"]).and_then(|v| text_list(v, ListStyle::CommaSeparated)),
            overall_summary: get(obj, &["overall_summary", "overallSummary"]).and_then(text),
            suitability_score: get(obj, &["suitability_score", "suitabilityScore", "score"])
                .and_then(score),
            projects: get(obj, &["projects"]).and_then(|v| entries(v, Project::from_object)),
            custom_sections: get(obj, &["custom_sections", "customSections"]).and_then(sections),
        })
    }

    /// Pretty-printed JSON export: 2-space indent, UTF-8, absent fields omitted.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// True when the service returned nothing usable.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl ContactInformation {
    fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            email: get(obj, &["email"]).and_then(text),
            phone: get(obj, &["phone", "phone_number"]).and_then(text),
            linkedin: get(obj, &["linkedin", "linked_in"]).and_then(text),
            github: get(obj, &["github"]).and_then(text),
            portfolio: get(obj, &["portfolio", "website"]).and_then(text),
            address: get(obj, &["address", "location"]).and_then(text),
        }
    }
}

impl WorkExperience {
    fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            job_title: get(obj, &["job_title", "jobTitle", "title", "role"]).and_then(text),
            company: get(obj, &["company", "employer"]).and_then(text),
            location: get(obj, &["location"]).and_then(text),
            duration: get(obj, &["duration", "dates"]).and_then(text),
            responsibilities: get(obj, &["responsibilities"])
                .and_then(|v| text_list(v, ListStyle::Whole)),
        }
    }
}

impl Education {
    fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            degree: get(obj, &["degree"]).and_then(text),
            institution: get(obj, &["institution", "school", "university"]).and_then(text),
            location: get(obj, &["location"]).and_then(text),
            graduation_year: get(obj, &["graduation_year", "graduationYear", "graduationDate", "year"])
                .and_then(text),
            details: get(obj, &["details"]).and_then(|v| text_list(v, ListStyle::Whole)),
        }
    }
}

impl Project {
    fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            name: get(obj, &["name", "title"]).and_then(text),
            description: get(obj, &["description"]).and_then(text),
            technologies: get(obj, &["technologies", "technologiesUsed", "technologies_used"])
                .and_then(|v| text_list(v, ListStyle::CommaSeparated)),
            link: get(obj, &["link", "url"]).and_then(text),
        }
    }
}

// ── Lenient coercion helpers ─────────────────────────────────────────────

/// First present, non-null value among `keys`.
fn get<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

/// Scalars become strings; arrays of scalars are joined; objects are dropped.
fn text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar_text).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        Value::Null | Value::Object(_) => None,
    }
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[derive(Clone, Copy)]
enum ListStyle {
    /// A bare string is one item.
    Whole,
    /// A bare string is split on commas ("Go, SQL").
    CommaSeparated,
}

/// Arrays keep their scalar items in order; objects of arrays (categorised
/// skills) are flattened in key order; bare strings follow `style`.
fn text_list(v: &Value, style: ListStyle) -> Option<Vec<String>> {
    let items: Vec<String> = match v {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        Value::Object(map) => map
            .values()
            .filter_map(|inner| text_list(inner, style))
            .flatten()
            .collect(),
        Value::String(s) => match style {
            ListStyle::Whole => vec![s.clone()],
            ListStyle::CommaSeparated => s
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
        },
        _ => return None,
    };
    Some(items)
}

/// Arrays of objects; non-object items are skipped.
fn entries<T>(v: &Value, build: fn(&Map<String, Value>) -> T) -> Option<Vec<T>> {
    match v {
        Value::Array(items) => Some(items.iter().filter_map(Value::as_object).map(build).collect()),
        Value::Object(obj) => Some(vec![build(obj)]),
        _ => None,
    }
}

/// Integers, floats and numeric strings ("85", "85/100", "85%") are rounded
/// and clamped to `0..=100`.
fn score(v: &Value) -> Option<u8> {
    let raw = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            let s = s.split('/').next().unwrap_or(s).trim();
            let s = s.trim_end_matches('%').trim();
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().clamp(0.0, 100.0) as u8)
}

fn sections(v: &Value) -> Option<BTreeMap<String, Vec<String>>> {
    let obj = v.as_object()?;
    let map: BTreeMap<String, Vec<String>> = obj
        .iter()
        .filter_map(|(k, v)| text_list(v, ListStyle::Whole).map(|items| (k.clone(), items)))
        .collect();
    Some(map)
}
