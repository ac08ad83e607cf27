use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::Role;
use crate::error::AppError;

/// Theme key every unknown lookup falls back to.
pub const DEFAULT_THEME: &str = "default";
/// Theme key reserved for the superroot role.
pub const EXCLUSIVE_THEME: &str = "superroot";

pub const STUDENT_ID_PREFIX: &str = "STU-";
pub const FACULTY_ID_PREFIX: &str = "FAC-";

/// The single aggregate the portal operates on. Snapshots written by earlier
/// tooling may carry additional collections (subjects, CO/PO mappings,
/// question papers); those are untouched here but survive a round-trip
/// through the flattened `extra` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub students: Vec<StudentRecord>,
    #[serde(default)]
    pub faculty: Vec<FacultyRecord>,
    #[serde(default)]
    pub themes: BTreeMap<String, Theme>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub username: String,
    /// Bcrypt hash. The record never holds a plaintext credential; checks go
    /// through `store::authenticate_user`.
    pub password: String,
    pub role: Role,
    pub theme: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Immutable style descriptor, keyed by theme identifier in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub primary: String,
    pub secondary: String,
    pub navbar: String,
    pub sidebar: String,
    pub accent: String,
}

fn theme(
    name: &str,
    primary: &str,
    secondary: &str,
    gradient: &str,
    accent: &str,
) -> Theme {
    Theme {
        name: name.to_string(),
        primary: primary.to_string(),
        secondary: secondary.to_string(),
        navbar: gradient.to_string(),
        sidebar: gradient.to_string(),
        accent: accent.to_string(),
    }
}

pub fn default_themes() -> BTreeMap<String, Theme> {
    let mut themes = BTreeMap::new();

    themes.insert(
        "default".to_string(),
        theme(
            "Default Blue",
            "#1976d2",
            "#64b5f6",
            "linear-gradient(135deg, #e3f2fd 0%, #bbdefb 50%, #90caf9 100%)",
            "#1565c0",
        ),
    );
    themes.insert(
        "green".to_string(),
        theme(
            "Green Theme",
            "#2e7d32",
            "#66bb6a",
            "linear-gradient(135deg, #e8f5e9 0%, #c8e6c9 50%, #a5d6a7 100%)",
            "#1b5e20",
        ),
    );
    themes.insert(
        "purple".to_string(),
        theme(
            "Purple Theme",
            "#7b1fa2",
            "#ba68c8",
            "linear-gradient(135deg, #f3e5f5 0%, #e1bee7 50%, #ce93d8 100%)",
            "#4a148c",
        ),
    );
    themes.insert(
        "orange".to_string(),
        theme(
            "Orange Theme",
            "#e65100",
            "#ff9800",
            "linear-gradient(135deg, #fff3e0 0%, #ffe0b2 50%, #ffcc80 100%)",
            "#bf360c",
        ),
    );
    themes.insert(
        "teal".to_string(),
        theme(
            "Teal Theme",
            "#00695c",
            "#26a69a",
            "linear-gradient(135deg, #e0f2f1 0%, #b2dfdb 50%, #80cbc4 100%)",
            "#004d40",
        ),
    );
    themes.insert(
        "superroot".to_string(),
        theme(
            "Superroot Exclusive",
            "#00203F",
            "#ADEFD1",
            "linear-gradient(135deg, #00203F 0%, #003d5c 50%, #004d6b 100%)",
            "#ADEFD1",
        ),
    );

    themes
}

/// Synthesized when neither the cache nor the bundled snapshot is readable:
/// the two seed accounts, empty record collections, and the fixed catalog.
pub fn default_document() -> Result<Document, AppError> {
    let now = Utc::now();

    let users = vec![
        UserRecord {
            username: "admin".to_string(),
            password: bcrypt::hash("admin123", bcrypt::DEFAULT_COST)?,
            role: Role::Admin,
            theme: DEFAULT_THEME.to_string(),
            created_at: now,
            last_login: None,
        },
        UserRecord {
            username: "superroot".to_string(),
            password: bcrypt::hash("superroot123", bcrypt::DEFAULT_COST)?,
            role: Role::Superroot,
            theme: EXCLUSIVE_THEME.to_string(),
            created_at: now,
            last_login: None,
        },
    ];

    Ok(Document {
        users,
        students: Vec::new(),
        faculty: Vec::new(),
        themes: default_themes(),
        extra: Map::new(),
    })
}
