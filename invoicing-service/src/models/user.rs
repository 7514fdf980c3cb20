use mongodb::bson::Bson;
use serde::{de, Deserialize, Deserializer};

/// Read-only view of an account in the shared `users` collection.
///
/// Accounts are written by the auth service; this service only resolves
/// recipients and issuer display names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    /// Hex form of an `ObjectId` key, or the key itself when stored as a string.
    #[serde(rename = "_id", deserialize_with = "object_id_or_string")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: name.into(),
        }
    }

    /// Name shown on issued invoices; falls back to the email.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

fn object_id_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Bson::deserialize(deserializer)? {
        Bson::ObjectId(oid) => Ok(oid.to_hex()),
        Bson::String(id) => Ok(id),
        other => Err(de::Error::custom(format!(
            "unsupported user _id type: {:?}",
            other.element_type()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, from_document, oid::ObjectId};

    #[test]
    fn reads_accounts_keyed_by_object_id() {
        let oid = ObjectId::new();
        let user: User = from_document(doc! {
            "_id": oid,
            "name": "Bob",
            "email": "bob@x",
            "password": "$2b$10$hash",
            "__v": 0
        })
        .unwrap();

        assert_eq!(user.id, oid.to_hex());
        assert_eq!(user.email, "bob@x");
        assert_eq!(user.display_name(), "Bob");
    }

    #[test]
    fn reads_accounts_keyed_by_string() {
        let user: User = from_document(doc! {
            "_id": "3f0c2a4e-7d1b-4c55-9a2e-5b8f1d6e0a11",
            "email": "carol@x"
        })
        .unwrap();

        assert_eq!(user.id, "3f0c2a4e-7d1b-4c55-9a2e-5b8f1d6e0a11");
        assert_eq!(user.display_name(), "carol@x");
    }

    #[test]
    fn rejects_numeric_keys() {
        let result = from_document::<User>(doc! { "_id": 7, "email": "dave@x" });
        assert!(result.is_err());
    }
}
