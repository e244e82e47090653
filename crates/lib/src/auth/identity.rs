//! Identity returned by backend verification, plus the optional registration payload.

use serde::{Deserialize, Serialize};

/// Practice the registered user belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Practice {
    #[serde(rename = "practiceName", default)]
    pub name: Option<String>,
    #[serde(rename = "practiceID", default)]
    pub id: Option<serde_json::Value>,
    #[serde(rename = "isPrimary", default)]
    pub is_primary: bool,
}

/// Downstream profile (`ad_data`). Its presence means the user is provisioned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationData {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_type: Option<String>,
    #[serde(default)]
    pub practices: Vec<Practice>,
    #[serde(default)]
    pub practice_count: Option<u32>,
}

impl RegistrationData {
    /// First practice flagged primary, else the first one.
    pub fn primary_practice(&self) -> Option<&Practice> {
        self.practices
            .iter()
            .find(|p| p.is_primary)
            .or_else(|| self.practices.first())
    }

    pub fn practice_name(&self) -> String {
        match self.primary_practice() {
            Some(p) => non_empty(p.name.as_deref())
                .unwrap_or("Unknown Practice")
                .to_string(),
            None => "No Practice".to_string(),
        }
    }

    pub fn practice_count(&self) -> u32 {
        self.practice_count
            .unwrap_or(self.practices.len() as u32)
    }
}

/// User object from `/auth/verify`. Unknown fields are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "userPrincipalName", default)]
    pub user_principal_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Verified user, optionally registered downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub user: UserProfile,
    pub registration: Option<RegistrationData>,
}

impl Identity {
    pub fn new(user: UserProfile, registration: Option<RegistrationData>) -> Self {
        Self { user, registration }
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }

    /// Registration full name, then the directory display name, then "User".
    pub fn display_name(&self) -> String {
        self.registration
            .as_ref()
            .and_then(|r| non_empty(r.full_name.as_deref()))
            .or_else(|| non_empty(self.user.display_name.as_deref()))
            .unwrap_or("User")
            .to_string()
    }

    /// First non-empty directory email field, then the registration email.
    pub fn email(&self) -> Option<String> {
        [
            self.user.user_principal_name.as_deref(),
            self.user.email.as_deref(),
            self.user.preferred_username.as_deref(),
            self.user.mail.as_deref(),
            self.registration.as_ref().and_then(|r| r.email.as_deref()),
        ]
        .into_iter()
        .find_map(non_empty)
        .map(str::to_string)
    }

    /// "Full Name (ProfileType) - Practice" for registered users, the display name otherwise.
    pub fn header_label(&self) -> String {
        match &self.registration {
            Some(r) => format!(
                "{} ({}) - {}",
                self.display_name(),
                non_empty(r.profile_type.as_deref()).unwrap_or("User"),
                r.practice_name()
            ),
            None => self.display_name(),
        }
    }

    pub fn greeting(&self) -> String {
        format!(
            "Welcome, {}! Your intelligent assistant for reports",
            self.display_name()
        )
    }
}
