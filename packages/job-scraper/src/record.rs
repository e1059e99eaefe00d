//! Structured job records.
//!
//! The extraction service returns loosely-typed JSON. [`ExtractedJob`]
//! accepts that shape and fills anything absent with `"N/A"`; a
//! [`JobRecord`] is the stamped, persisted form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::hashing::LinkHash;

/// Placeholder for a field the posting did not provide.
pub const NOT_AVAILABLE: &str = "N/A";

/// One extracted job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub company: String,
    pub job_title: String,
    pub industry: String,
    pub location: String,
    pub responsibilities: Vec<String>,
    pub qualifications: Vec<String>,
    pub skills: Vec<String>,
    pub source_link_hash: LinkHash,
    pub captured_at: DateTime<Utc>,
}

impl JobRecord {
    /// One-line description for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} - {} - {} @ {}: {} responsibilities, {} qualifications, {} skills",
            self.company,
            self.job_title,
            self.industry,
            self.location,
            self.responsibilities.len(),
            self.qualifications.len(),
            self.skills.len()
        )
    }

    /// Render a list field as a bulleted block.
    pub fn bulleted(items: &[String]) -> String {
        items
            .iter()
            .map(|item| format!("- {item}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The JSON object the extraction service is asked to produce.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedJob {
    #[serde(default = "not_available", deserialize_with = "text_or_na")]
    pub company: String,

    #[serde(
        default = "not_available",
        deserialize_with = "text_or_na",
        alias = "title",
        alias = "job_title"
    )]
    pub job_title: String,

    #[serde(default = "not_available", deserialize_with = "text_or_na")]
    pub industry: String,

    #[serde(default = "not_available", deserialize_with = "text_or_na")]
    pub location: String,

    #[serde(default = "not_available_list", deserialize_with = "list_or_na")]
    pub responsibilities: Vec<String>,

    #[serde(default = "not_available_list", deserialize_with = "list_or_na")]
    pub qualifications: Vec<String>,

    #[serde(default = "not_available_list", deserialize_with = "list_or_na")]
    pub skills: Vec<String>,
}

impl ExtractedJob {
    /// Parse a service answer. The top level must be a JSON object.
    pub fn from_json(content: &str) -> Result<Self, String> {
        match serde_json::from_str::<Value>(content) {
            Ok(value @ Value::Object(_)) => {
                serde_json::from_value(value).map_err(|e| e.to_string())
            }
            Ok(other) => Err(format!("expected a JSON object, got {}", json_type(&other))),
            Err(e) => Err(format!("invalid JSON: {e}")),
        }
    }

    pub fn into_record(self, source_link_hash: LinkHash, captured_at: DateTime<Utc>) -> JobRecord {
        JobRecord {
            company: self.company,
            job_title: self.job_title,
            industry: self.industry,
            location: self.location,
            responsibilities: self.responsibilities,
            qualifications: self.qualifications,
            skills: self.skills,
            source_link_hash,
            captured_at,
        }
    }
}

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

fn not_available_list() -> Vec<String> {
    vec![not_available()]
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn scalar_text(value: Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn text_or_na<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(value).unwrap_or_else(not_available))
}

fn list_or_na<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let items: Vec<String> = match Value::deserialize(deserializer)? {
        Value::Array(values) => values.into_iter().filter_map(scalar_text).collect(),
        single => scalar_text(single).into_iter().collect(),
    };
    if items.is_empty() {
        Ok(not_available_list())
    } else {
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_object() {
        let job = ExtractedJob::from_json(
            r#"{
                "company": "Acme",
                "jobTitle": "Backend Engineer",
                "location": "Remote",
                "industry": "Software",
                "responsibilities": ["Build APIs", "Review code"],
                "qualifications": ["3+ years"],
                "skills": ["Rust", "SQL"]
            }"#,
        )
        .unwrap();

        assert_eq!(job.company, "Acme");
        assert_eq!(job.job_title, "Backend Engineer");
        assert_eq!(job.responsibilities, vec!["Build APIs", "Review code"]);
        assert_eq!(job.skills, vec!["Rust", "SQL"]);
    }

    #[test]
    fn test_missing_and_empty_fields_become_na() {
        let job = ExtractedJob::from_json(
            r#"{"company": "Acme", "jobTitle": "", "skills": [], "qualifications": null}"#,
        )
        .unwrap();

        assert_eq!(job.company, "Acme");
        assert_eq!(job.job_title, NOT_AVAILABLE);
        assert_eq!(job.location, NOT_AVAILABLE);
        assert_eq!(job.skills, vec![NOT_AVAILABLE]);
        assert_eq!(job.qualifications, vec![NOT_AVAILABLE]);
        assert_eq!(job.responsibilities, vec![NOT_AVAILABLE]);
    }

    #[test]
    fn test_loose_shapes_are_tolerated() {
        let job = ExtractedJob::from_json(
            r#"{"title": "Analyst", "skills": "Excel", "responsibilities": ["Report", 42, null, ""]}"#,
        )
        .unwrap();

        assert_eq!(job.job_title, "Analyst");
        assert_eq!(job.skills, vec!["Excel"]);
        assert_eq!(job.responsibilities, vec!["Report", "42"]);
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(ExtractedJob::from_json(r#"["Acme", "Engineer"]"#).is_err());
        assert!(ExtractedJob::from_json("Sorry, I can't help with that.").is_err());
    }

    #[test]
    fn test_record_rendering() {
        let record = ExtractedJob::from_json(r#"{"company": "Acme", "jobTitle": "SRE"}"#)
            .unwrap()
            .into_record(LinkHash::of("https://acme.test/jobs/1"), Utc::now());

        assert_eq!(
            record.summary(),
            "Acme - SRE - N/A @ N/A: 1 responsibilities, 1 qualifications, 1 skills"
        );
        assert_eq!(
            JobRecord::bulleted(&["Rust".to_string(), "Go".to_string()]),
            "- Rust\n- Go"
        );
    }
}
