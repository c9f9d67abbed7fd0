//! Types for doctor records

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The two per-user collections; same record shape, never merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// General doctors, `/api/doctors`
    Doctors,
    /// Emergency-contact doctors, `/api/emergencydoctors`
    EmergencyDoctors,
}

impl Resource {
    /// Collection path
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Doctors => "/api/doctors",
            Resource::EmergencyDoctors => "/api/emergencydoctors",
        }
    }

    /// Path of one record.
    ///
    /// The id must be a single path segment; anything that could climb out of
    /// the collection or start a query is refused with [`Error::UnknownRecord`].
    pub fn record_path(&self, id: &str) -> Result<String> {
        let unsafe_segment = id.is_empty()
            || id == "."
            || id == ".."
            || id.contains(|c: char| matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_control());
        if unsafe_segment {
            return Err(Error::UnknownRecord(id.to_string()));
        }
        Ok(format!("{}/{}", self.path(), id))
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Doctors => f.write_str("doctors"),
            Resource::EmergencyDoctors => f.write_str("emergency doctors"),
        }
    }
}

/// A doctor as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorRecord {
    /// Backend-assigned identifier; absent until the record is persisted
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Doctor name
    #[serde(rename = "doctor_name", default)]
    pub name: String,

    /// Mobile number
    #[serde(rename = "doctor_mobile_number", default)]
    pub mobile_number: String,

    /// Hospital or practice
    #[serde(default)]
    pub workplace: Option<String>,

    /// Consultant role or specialty
    #[serde(default)]
    pub consultant: Option<String>,
}

impl DoctorRecord {
    /// Whether the four editable fields equal the draft's
    pub fn matches(&self, draft: &DoctorDraft) -> bool {
        self.name == draft.name
            && self.mobile_number == draft.mobile_number
            && self.workplace.as_deref().unwrap_or_default() == draft.workplace
            && self.consultant.as_deref().unwrap_or_default() == draft.consultant
    }
}

/// Form contents while a create/edit form is open
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DoctorDraft {
    /// Doctor name
    #[serde(rename = "doctor_name")]
    pub name: String,
    /// Mobile number
    #[serde(rename = "doctor_mobile_number")]
    pub mobile_number: String,
    /// Hospital or practice
    pub workplace: String,
    /// Consultant role or specialty
    pub consultant: String,
}

impl DoctorDraft {
    /// Build a draft from field values
    pub fn new(
        name: impl Into<String>,
        mobile_number: impl Into<String>,
        workplace: impl Into<String>,
        consultant: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mobile_number: mobile_number.into(),
            workplace: workplace.into(),
            consultant: consultant.into(),
        }
    }

    /// Pre-fill an edit form from a stored record
    pub fn from_record(record: &DoctorRecord) -> Self {
        Self {
            name: record.name.clone(),
            mobile_number: record.mobile_number.clone(),
            workplace: record.workplace.clone().unwrap_or_default(),
            consultant: record.consultant.clone().unwrap_or_default(),
        }
    }

    /// Check required fields.
    ///
    /// Name and mobile number are always required; creation also requires
    /// workplace and consultant.
    pub fn validate(&self, for_create: bool) -> Result<()> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.mobile_number.trim().is_empty() {
            missing.push("mobile number");
        }
        if for_create {
            if self.workplace.trim().is_empty() {
                missing.push("workplace");
            }
            if self.consultant.trim().is_empty() {
                missing.push("consultant");
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::validation(missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_wire_names() {
        let record: DoctorRecord = serde_json::from_value(json!({
            "_id": "64f0",
            "doctor_name": "Dr. A",
            "doctor_mobile_number": "123",
            "workplace": "X",
            "user": "u1",
            "createdAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(record.id.as_deref(), Some("64f0"));
        assert_eq!(record.name, "Dr. A");
        assert_eq!(record.consultant, None);

        let aliased: DoctorRecord = serde_json::from_value(json!({"id": "7", "doctor_name": "Dr. B"})).unwrap();
        assert_eq!(aliased.id.as_deref(), Some("7"));
        assert_eq!(aliased.mobile_number, "");
    }

    #[test]
    fn test_draft_serializes_like_the_form() {
        let draft = DoctorDraft::new("Dr. A", "123", "X", "Y");
        assert_eq!(
            serde_json::to_value(&draft).unwrap(),
            json!({"doctor_name": "Dr. A", "doctor_mobile_number": "123", "workplace": "X", "consultant": "Y"})
        );
    }

    #[test]
    fn test_validation_rules() {
        let draft = DoctorDraft::new("Dr. A", "123", "", "");
        assert!(draft.validate(false).is_ok());
        match draft.validate(true) {
            Err(Error::ValidationFailed(fields)) => assert_eq!(fields, vec!["workplace", "consultant"]),
            other => panic!("unexpected result: {:?}", other),
        }

        let blank = DoctorDraft::new(" ", "", "X", "Y");
        match blank.validate(false) {
            Err(Error::ValidationFailed(fields)) => assert_eq!(fields, vec!["name", "mobile number"]),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_draft_from_record() {
        let record = DoctorRecord {
            id: Some("1".to_string()),
            name: "Dr. A".to_string(),
            mobile_number: "123".to_string(),
            workplace: None,
            consultant: Some("Cardiology".to_string()),
        };
        let draft = DoctorDraft::from_record(&record);
        assert_eq!(draft.workplace, "");
        assert!(record.matches(&draft));
        assert_eq!(Resource::EmergencyDoctors.record_path("1").unwrap(), "/api/emergencydoctors/1");
    }

    #[test]
    fn test_record_path_stays_inside_collection() {
        assert_eq!(Resource::Doctors.record_path("64f0a1").unwrap(), "/api/doctors/64f0a1");
        for id in ["", ".", "..", "../users/login", "a/b", "a\\b", "1?x=2", "1#frag", "%2e%2e"] {
            assert!(
                matches!(Resource::Doctors.record_path(id), Err(Error::UnknownRecord(_))),
                "accepted {:?}",
                id
            );
        }
    }
}
