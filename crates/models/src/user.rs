use uuid::Uuid;

use crate::db::{Row, StorageError};

pub const TABLE: &str = "users";
pub const KEY_COLUMN: &str = "id";

/// Every column of the users table, in the order reads select them.
pub const COLUMNS: [&str; 8] = [
    "id",
    "first_name",
    "last_name",
    "gender",
    "date_of_birth",
    "phone_number",
    "email",
    "is_blocked",
];

/// Table definition for operators provisioning a keyspace. The service never runs DDL.
pub const SCHEMA_CQL: &str = "CREATE TABLE IF NOT EXISTS users (
    id text PRIMARY KEY,
    first_name text,
    last_name text,
    gender text,
    date_of_birth text,
    phone_number text,
    email text,
    is_blocked boolean
)";

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_GENDER_LEN: usize = 32;
pub const MAX_DATE_OF_BIRTH_LEN: usize = 32;
pub const MAX_EMAIL_LEN: usize = 254;

/// A stored user account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub date_of_birth: String,
    pub phone_number: String,
    pub email: String,
    pub is_blocked: bool,
}

impl User {
    /// Map a row selected with [`COLUMNS`] back to a record.
    pub fn from_row(row: &Row) -> Result<Self, StorageError> {
        Ok(Self {
            id: row.text("id")?,
            first_name: row.text("first_name")?,
            last_name: row.text("last_name")?,
            gender: row.text("gender")?,
            date_of_birth: row.text("date_of_birth")?,
            phone_number: row.text("phone_number")?,
            email: row.text("email")?,
            is_blocked: row.boolean("is_blocked")?,
        })
    }
}

/// Profile and contact data supplied when an account is opened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub date_of_birth: String,
    pub phone_number: String,
    pub email: String,
}

impl NewUser {
    /// Build the stored record under a freshly minted id. New accounts are never blocked.
    pub fn into_user(self, id: String) -> User {
        User {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            gender: self.gender,
            date_of_birth: self.date_of_birth,
            phone_number: self.phone_number,
            email: self.email,
            is_blocked: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub date_of_birth: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContactUpdate {
    pub phone_number: String,
    pub email: String,
}

/// Mint a new opaque record id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn validate_id(id: &str) -> Result<(), String> {
    if id.trim().is_empty() {
        return Err("value is required".into());
    }
    Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| "value must be a valid UUID".into())
}

pub fn validate_name(name: &str) -> Result<(), String> {
    required_within(name, MAX_NAME_LEN)
}

pub fn validate_gender(gender: &str) -> Result<(), String> {
    required_within(gender, MAX_GENDER_LEN)
}

/// Date of birth is kept verbatim; only presence and length are checked.
pub fn validate_date_of_birth(dob: &str) -> Result<(), String> {
    required_within(dob, MAX_DATE_OF_BIRTH_LEN)
}

pub fn validate_phone_number(phone: &str) -> Result<(), String> {
    if phone.is_empty() {
        return Err("value is required".into());
    }
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err("value must be digits with an optional leading '+'".into());
    }
    if !(4..=15).contains(&digits.len()) {
        return Err("value must have between 4 and 15 digits".into());
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("value is required".into());
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(format!("value must be at most {MAX_EMAIL_LEN} characters"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err("value must not contain whitespace".into());
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err("value must be a valid email address".into());
    };
    let domain_ok = domain.contains('.')
        && !domain.contains('@')
        && !domain.starts_with('.')
        && !domain.ends_with('.');
    if local.is_empty() || !domain_ok {
        return Err("value must be a valid email address".into());
    }
    Ok(())
}

fn required_within(value: &str, max: usize) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err("value is required".into());
    }
    if value.chars().count() > max {
        return Err(format!("value must be at most {max} characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_maps_to_user() {
        let row = COLUMNS.iter().fold(Row::new(), |row, c| match *c {
            "is_blocked" => row.with(c, true),
            other => row.with(c, format!("v_{other}")),
        });
        let user = User::from_row(&row).unwrap();
        assert_eq!(user.first_name, "v_first_name");
        assert_eq!(user.email, "v_email");
        assert!(user.is_blocked);
    }

    #[test]
    fn partial_row_is_a_decode_error() {
        let row = Row::new().with("id", "x");
        assert!(matches!(User::from_row(&row), Err(StorageError::Decode(_))));
    }

    #[test]
    fn new_user_starts_unblocked() {
        let nu = NewUser {
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            gender: "F".into(),
            date_of_birth: "1990-01-01".into(),
            phone_number: "+1000".into(),
            email: "ann@x.com".into(),
        };
        let u = nu.into_user(new_id());
        assert!(!u.is_blocked);
        assert!(validate_id(&u.id).is_ok());
    }

    #[test]
    fn field_rules() {
        assert!(validate_id("").is_err());
        assert!(validate_id("not-a-uuid").is_err());

        assert!(validate_name("  ").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
        assert!(validate_name("Ann").is_ok());

        assert!(validate_phone_number("+1000").is_ok());
        assert!(validate_phone_number("5551234567").is_ok());
        assert!(validate_phone_number("+12").is_err());
        assert!(validate_phone_number("555-1234").is_err());

        assert!(validate_email("ann@x.com").is_ok());
        assert!(validate_email("ann@localhost").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("ann @x.com").is_err());
        assert!(validate_email("a@b@x.com").is_err());

        assert!(validate_date_of_birth("sometime in 1990").is_ok());
        assert!(validate_gender("").is_err());
    }
}
