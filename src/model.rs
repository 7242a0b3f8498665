use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "teacher")]
    Teacher,
    #[serde(rename = "admin")]
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::Admin => "admin",
        }
    }
}

/// The logged-in account, as persisted under the global `user` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A self-registered account in the global `users` list. Demo accounts
/// are compiled in and never appear here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub salt: String,
    pub password_sha256: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisabilityLevel {
    Mild,
    Moderate,
    Severe,
}

impl DisabilityLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Mild" => Some(Self::Mild),
            "Moderate" => Some(Self::Moderate),
            "Severe" => Some(Self::Severe),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mild => "Mild",
            Self::Moderate => "Moderate",
            Self::Severe => "Severe",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Male" => Some(Self::Male),
            "Female" => Some(Self::Female),
            "Other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResidenceType {
    Permanent,
    Temporary,
}

impl ResidenceType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Permanent" => Some(Self::Permanent),
            "Temporary" => Some(Self::Temporary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardianStatus {
    #[serde(rename = "Both Parents")]
    BothParents,
    #[serde(rename = "Single Parent")]
    SingleParent,
    Guardian,
    Orphan,
}

impl GuardianStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Both Parents" => Some(Self::BothParents),
            "Single Parent" => Some(Self::SingleParent),
            "Guardian" => Some(Self::Guardian),
            "Orphan" => Some(Self::Orphan),
            _ => None,
        }
    }
}

/// An uploaded document. `data` holds the full `data:<type>;base64,<...>`
/// URL and is omitted from list payloads to keep them small.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAttachment {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Safeguarding fields, visible to admins only. Absent fields fall back
/// to the safe answer, not to `false` across the board.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitiveInfo {
    #[serde(default)]
    pub was_abused: bool,
    #[serde(default = "default_true")]
    pub is_safe_at_home: bool,
    #[serde(default = "default_true")]
    pub is_family_supportive: bool,
    #[serde(default, rename = "hasPTSD")]
    pub has_ptsd: bool,
    #[serde(default)]
    pub has_self_harm_history: bool,
}

impl Default for SensitiveInfo {
    fn default() -> Self {
        Self {
            was_abused: false,
            is_safe_at_home: true,
            is_family_supportive: true,
            has_ptsd: false,
            has_self_harm_history: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub age: i64,
    pub grade: String,
    pub disability_type: String,
    pub disability_level: DisabilityLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residence_type: Option<ResidenceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_school: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_guardian_status: Option<GuardianStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_assigned: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disability_percentage: Option<i64>,
    #[serde(default)]
    pub has_disability_id_card: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referred_hospital: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_notes: Option<String>,
    #[serde(default)]
    pub certificates: Vec<FileAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disability_id_card: Option<FileAttachment>,
    #[serde(default)]
    pub sensitive: SensitiveInfo,
}

impl Student {
    pub fn new(
        id: String,
        name: String,
        age: i64,
        grade: String,
        disability_type: String,
        disability_level: DisabilityLevel,
    ) -> Self {
        Self {
            id,
            name,
            age,
            grade,
            disability_type,
            disability_level,
            gender: None,
            address: None,
            residence_type: None,
            previous_school: None,
            parent_guardian_status: None,
            teacher_assigned: None,
            disability_percentage: None,
            has_disability_id_card: false,
            medical_history: None,
            referred_hospital: None,
            emergency_contact: None,
            admission_date: None,
            other_notes: None,
            certificates: Vec::new(),
            disability_id_card: None,
            sensitive: SensitiveInfo::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    pub id: String,
    pub name: String,
}

/// Allocates a record id from the wall clock, in milliseconds. Ids
/// already present in `existing` are skipped so two records created
/// within the same millisecond stay distinct.
pub fn next_record_id<'a, I>(existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: HashSet<&str> = existing.into_iter().collect();
    let mut candidate = Utc::now().timestamp_millis();
    loop {
        let id = candidate.to_string();
        if !taken.contains(id.as_str()) {
            return id;
        }
        candidate += 1;
    }
}
