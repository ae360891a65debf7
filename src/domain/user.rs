//! User account types.

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// A persisted user document.
///
/// The `password` field holds the argon2id PHC hash, never the plaintext.
/// Users are never deleted; the only mutation after signup is pushing and
/// pulling entries of the owned `predictions` reference list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub email: String,
    pub password: String,
    pub name: String,
    pub created_at: DateTime,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub predictions: Vec<ObjectId>,
}

impl User {
    /// Create a new user document with a fresh id, timestamped now.
    #[must_use]
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(),
            email: email.into(),
            password: password_hash.into(),
            name: name.into(),
            created_at: DateTime::now(),
            is_admin: false,
            predictions: Vec::new(),
        }
    }
}

/// Client-facing view of a user. Excludes the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_hex(),
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// Signup request body.
#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Login request body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user = User::new("a@x.com", "$argon2id$stub", "A");
        assert!(!user.is_admin);
        assert!(user.predictions.is_empty());
    }

    #[test]
    fn test_user_response_omits_password() {
        let user = User::new("a@x.com", "$argon2id$stub", "A");
        let response = UserResponse::from(&user);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "a@x.com");
        assert_eq!(json["id"], user.id.to_hex());
    }
}
