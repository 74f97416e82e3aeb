use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;
use validator::{Validate, ValidationError};

use super::requests::ServiceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Student,
    Tutor,
    Counsellor,
}

impl Role {
    pub fn is_provider(self) -> bool {
        matches!(self, Role::Tutor | Role::Counsellor)
    }

    pub fn id_prefix(self) -> &'static str {
        match self {
            Role::Student => "stu-",
            Role::Tutor => "tutor-",
            Role::Counsellor => "counsellor-",
        }
    }

    pub fn service_kind(self) -> Option<ServiceKind> {
        match self {
            Role::Student => None,
            Role::Tutor => Some(ServiceKind::Tutoring),
            Role::Counsellor => Some(ServiceKind::Counselling),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Student" => Ok(Role::Student),
            "Tutor" => Ok(Role::Tutor),
            "Counsellor" => Ok(Role::Counsellor),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Role::Student => "Student",
            Role::Tutor => "Tutor",
            Role::Counsellor => "Counsellor",
        };
        f.write_str(label)
    }
}

/// Service category of a request or of what a provider offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    #[default]
    Academic,
    Personal,
    Mental,
    Financial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyBlock {
    pub day: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Either free text ("Monday 9–12, Wednesday 14–17") or structured blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Schedule {
    Weekly(Vec<WeeklyBlock>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub role: Role,
    pub name: String,
    pub email: Option<String>,
    /// Student, tutor or counsellor number. A lookup aid, not an identifier.
    #[serde(alias = "studentNumber", alias = "tutorNumber", alias = "counsellorNumber")]
    pub number: Option<String>,
    pub phone: Option<String>,
    pub university: Option<String>,
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(alias = "type")]
    pub service_type: Option<Category>,
    pub bio: Option<String>,
    #[serde(default)]
    pub available_now: bool,
    #[serde(alias = "availability")]
    pub schedule: Option<Schedule>,
    #[serde(default)]
    pub suspended: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn teaches_module(&self, module: &str) -> bool {
        self.modules.iter().any(|m| m.eq_ignore_ascii_case(module))
    }
}

pub fn validate_profile_name(name: &str) -> Result<(), ValidationError> {
    let is_empty_or_whitespace = name.trim().is_empty();
    let is_too_long = name.graphemes(true).count() > 256;
    let forbidden_characters = ['/', '(', ')', '"', '<', '>', '\\', '{', '}'];
    let contains_forbidden_characters = name.chars().any(|g| forbidden_characters.contains(&g));

    if is_empty_or_whitespace || is_too_long || contains_forbidden_characters {
        let mut error = ValidationError::new("invalid_name");
        error.message = Some(format!("{} is not a valid profile name", name).into());
        return Err(error);
    }
    Ok(())
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterProfilePayload {
    pub role: Role,
    #[validate(custom = "validate_profile_name")]
    pub name: String,
    #[validate(email(message = "Email is not valid"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 32, message = "Number must be 1-32 characters"))]
    pub number: Option<String>,
    pub phone: Option<String>,
    pub university: Option<String>,
    #[serde(default)]
    pub modules: Vec<String>,
    pub service_type: Option<Category>,
    #[validate(length(max = 2000, message = "Bio must be at most 2000 characters"))]
    pub bio: Option<String>,
    pub schedule: Option<Schedule>,
}

/// Profile edits made by the profile's owner.
#[derive(Validate, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfilePayload {
    #[validate(custom = "validate_profile_name")]
    pub name: Option<String>,
    #[validate(email(message = "Email is not valid"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub university: Option<String>,
    pub modules: Option<Vec<String>>,
    pub service_type: Option<Category>,
    #[validate(length(max = 2000, message = "Bio must be at most 2000 characters"))]
    pub bio: Option<String>,
}

/// Shallow-merge patch; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub university: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_now: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspended: Option<bool>,
}

impl From<UpdateProfilePayload> for ProfilePatch {
    fn from(payload: UpdateProfilePayload) -> Self {
        ProfilePatch {
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            university: payload.university,
            modules: payload.modules,
            service_type: payload.service_type,
            bio: payload.bio,
            ..Default::default()
        }
    }
}
