use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A stored user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    /// Always strictly positive.
    pub age: i32,
    pub created_at: DateTime<Utc>,
}

/// The fields a caller supplies when creating a user. `created_at` is stamped
/// at insert time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub age: i32,
}

impl NewUser {
    pub fn new(name: impl Into<String>, age: i32) -> Self {
        Self {
            name: name.into(),
            age,
        }
    }

    /// Checks the field constraints before the row reaches the database.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "name".to_string(),
                "must not be empty".to_string(),
            ));
        }
        if self.age <= 0 {
            return Err(CoreError::InvalidInput(
                "age".to_string(),
                format!("must be positive, got {}", self.age),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_user_passes() {
        assert!(NewUser::new("ada", 36).validate().is_ok());
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = NewUser::new("   ", 36).validate().unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidInput("name".into(), "must not be empty".into())
        );
    }

    #[test]
    fn non_positive_age_is_rejected() {
        assert!(NewUser::new("ada", 0).validate().is_err());
        assert!(NewUser::new("ada", -3).validate().is_err());
    }

    #[test]
    fn user_serializes_with_rfc3339_timestamp() {
        let user = User {
            id: 7,
            name: "ada".into(),
            age: 36,
            created_at: DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["created_at"], "2024-05-01T10:00:00Z");
        assert_eq!(json["age"], 36);
    }
}
