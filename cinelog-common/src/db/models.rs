//! Database models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Role an actor row plays on a movie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Actor,
    Director,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Actor, Role::Director];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Actor => "actor",
            Role::Director => "director",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "actor" => Ok(Role::Actor),
            "director" => Ok(Role::Director),
            other => Err(Error::Internal(format!("Unknown relation role: {}", other))),
        }
    }
}

/// The single account allowed to edit the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Display name shown on the index page
    pub name: Option<String>,
    pub username: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub release_date: Option<NaiveDate>,
    pub country: Option<String>,
    pub genre: Option<String>,
    pub year: Option<String>,
    /// Box office, in units of 100 million CNY
    pub box_office: Option<f64>,
}

impl Movie {
    /// Box office usable for analytics (set and non-zero)
    pub fn recorded_box_office(&self) -> Option<f64> {
        self.box_office.filter(|b| *b != 0.0)
    }
}

/// Column values for inserting or updating a movie
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieFields {
    pub title: String,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub box_office: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub name: Option<String>,
    pub gender: Option<String>,
    pub country: Option<String>,
}

/// Column values for inserting or updating an actor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActorFields {
    pub name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl ActorFields {
    /// Name-only actor, as created by cast reconciliation
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            gender: None,
            country: None,
        }
    }
}

/// Link between a movie and an actor row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub id: i64,
    pub movie_id: i64,
    pub actor_id: i64,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_through_text() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("主演".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Director).unwrap(), "\"director\"");
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User {
            id: 1,
            name: Some("Admin".into()),
            username: Some("admin".into()),
            password_hash: Some("sha256$1$aa$bb".into()),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "admin");
    }

    #[test]
    fn test_zero_box_office_is_not_recorded() {
        let mut movie = Movie {
            id: 1,
            title: "t".into(),
            release_date: None,
            country: None,
            genre: None,
            year: None,
            box_office: Some(0.0),
        };
        assert_eq!(movie.recorded_box_office(), None);
        movie.box_office = Some(3.5);
        assert_eq!(movie.recorded_box_office(), Some(3.5));
    }
}
