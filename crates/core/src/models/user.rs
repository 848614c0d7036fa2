//! Account profile stored in the `users` collection.

use chrono::{DateTime, Utc};

use crate::decode::{DecodeDocument, DecodeError, FieldReader, Fields, Problem};
use crate::types::{Email, Role, UserId};

/// Profile document keyed by the identity provider's UID.
///
/// Customers and owners only carry `email` and `role`; tailors provisioned by
/// an owner also record their contact details and the owner's ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// Identity provider UID.
    pub id: UserId,
    /// Sign-in email.
    pub email: Option<Email>,
    /// Account role.
    pub role: Role,
    /// Display name (tailors).
    pub name: Option<String>,
    /// Contact phone (tailors).
    pub phone: Option<String>,
    /// Free-form skills description (tailors).
    pub skills: Option<String>,
    /// Owner who provisioned this account (tailors).
    pub owner_id: Option<UserId>,
    /// When the profile was written.
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Name to show in lists: the profile name, else the email's local part,
    /// else the UID.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or_else(|| self.email.as_ref().map(Email::local_part))
            .unwrap_or_else(|| self.id.as_str())
    }
}

impl DecodeDocument for UserProfile {
    fn decode(id: &str, fields: &Fields) -> Result<Self, DecodeError> {
        let doc = FieldReader::new(id, fields);

        let role = doc
            .string(&["role"])?
            .parse::<Role>()
            .map_err(|e| doc.error("role", Problem::InvalidValue(e.0)))?;
        let email = doc
            .opt_string(&["email"])?
            .map(|raw| Email::parse(&raw).map_err(|_| doc.error("email", Problem::InvalidValue(raw))))
            .transpose()?;

        Ok(Self {
            id: UserId::new(id),
            email,
            role,
            name: doc.opt_string(&["name"])?,
            phone: doc.opt_string(&["phone"])?,
            skills: doc.opt_string(&["skills"])?,
            owner_id: doc.opt_string(&["ownerId"])?.map(UserId::new),
            created_at: doc.timestamp("createdAt")?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn decode(value: serde_json::Value) -> Result<UserProfile, DecodeError> {
        let serde_json::Value::Object(fields) = value else {
            unreachable!("test documents are objects");
        };
        UserProfile::decode("uid-1", &fields)
    }

    #[test]
    fn test_decode_customer() {
        let profile = decode(json!({
            "email": "Ali@Example.com",
            "role": "customer",
            "createdAt": "2025-02-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(profile.role, Role::Customer);
        assert_eq!(profile.display_name(), "ali");
        assert!(profile.created_at.is_some());
    }

    #[test]
    fn test_decode_tailor_with_owner() {
        let profile = decode(json!({
            "email": "t@x.com",
            "role": "tailor",
            "name": "Bilal",
            "ownerId": "owner-7",
            "skills": "sherwani"
        }))
        .unwrap();
        assert_eq!(profile.owner_id, Some(UserId::new("owner-7")));
        assert_eq!(profile.display_name(), "Bilal");
    }

    #[test]
    fn test_unknown_role_is_a_decode_error() {
        let err = decode(json!({ "role": "admin" })).unwrap_err();
        assert_eq!(err.field, "role");
    }

    #[test]
    fn test_missing_role_is_a_decode_error() {
        let err = decode(json!({ "email": "a@b.c" })).unwrap_err();
        assert_eq!(err.problem, Problem::Missing);
    }
}
