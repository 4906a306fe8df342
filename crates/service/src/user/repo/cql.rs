use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use models::db::{Session, StorageError, Value};
use models::user::{self, ContactUpdate, NewUser, ProfileUpdate, User};

use crate::user::repository::UserRepository;

const INSERT_USER: &str = "INSERT INTO users (id, first_name, last_name, gender, date_of_birth, phone_number, email, is_blocked) VALUES (?, ?, ?, ?, ?, ?, ?, ?)";
const UPDATE_PROFILE: &str = "UPDATE users SET first_name = ?, last_name = ?, gender = ?, date_of_birth = ? WHERE id = ? IF EXISTS";
const UPDATE_BLOCKED: &str = "UPDATE users SET is_blocked = ? WHERE id = ? IF EXISTS";
const UPDATE_CONTACT: &str = "UPDATE users SET phone_number = ?, email = ? WHERE id = ? IF EXISTS";
const SELECT_BY_ID: &str = "SELECT id, first_name, last_name, gender, date_of_birth, phone_number, email, is_blocked FROM users WHERE id = ?";

/// Repository issuing parameterized statements against a column-store session.
///
/// Updates are conditional on the row existing, so a write against an unknown
/// id leaves no partial row behind and the follow-up read reports `None`.
pub struct CqlUserRepository<S: Session + ?Sized> {
    session: Arc<S>,
}

impl<S: Session + ?Sized> CqlUserRepository<S> {
    pub fn new(session: Arc<S>) -> Self { Self { session } }

    async fn fetch(&self, id: &str) -> Result<Option<User>, StorageError> {
        let row = self.session.query_one(SELECT_BY_ID, &[Value::from(id)]).await?;
        row.as_ref().map(User::from_row).transpose()
    }
}

/// Builds the contact lookup, leaving out empty criteria. `None` when nothing is left to match on.
fn contact_query(phone_number: &str, email: &str) -> Option<(String, Vec<Value>)> {
    let mut conditions = Vec::new();
    let mut params = Vec::new();
    if !phone_number.is_empty() {
        conditions.push("phone_number = ?");
        params.push(Value::from(phone_number));
    }
    if !email.is_empty() {
        conditions.push("email = ?");
        params.push(Value::from(email));
    }
    if conditions.is_empty() {
        return None;
    }
    let statement = format!(
        "SELECT {} FROM {} WHERE {} LIMIT 1",
        user::COLUMNS.join(", "),
        user::TABLE,
        conditions.join(" OR ")
    );
    Some((statement, params))
}

#[async_trait]
impl<S: Session + ?Sized> UserRepository for CqlUserRepository<S> {
    #[instrument(skip_all)]
    async fn create(&self, profile: NewUser) -> Result<User, StorageError> {
        let created = profile.into_user(user::new_id());
        let params = [
            Value::from(created.id.as_str()),
            Value::from(created.first_name.as_str()),
            Value::from(created.last_name.as_str()),
            Value::from(created.gender.as_str()),
            Value::from(created.date_of_birth.as_str()),
            Value::from(created.phone_number.as_str()),
            Value::from(created.email.as_str()),
            Value::from(created.is_blocked),
        ];
        self.session.execute(INSERT_USER, &params).await?;
        debug!(user_id = %created.id, "row inserted");
        Ok(created)
    }

    #[instrument(skip(self, profile))]
    async fn update_profile(&self, id: &str, profile: ProfileUpdate) -> Result<Option<User>, StorageError> {
        let params = [
            Value::from(profile.first_name),
            Value::from(profile.last_name),
            Value::from(profile.gender),
            Value::from(profile.date_of_birth),
            Value::from(id),
        ];
        self.session.execute(UPDATE_PROFILE, &params).await?;
        self.fetch(id).await
    }

    #[instrument(skip(self))]
    async fn set_blocked(&self, id: &str, blocked: bool) -> Result<Option<User>, StorageError> {
        self.session.execute(UPDATE_BLOCKED, &[Value::from(blocked), Value::from(id)]).await?;
        self.fetch(id).await
    }

    #[instrument(skip(self, contact))]
    async fn update_contact(&self, id: &str, contact: ContactUpdate) -> Result<Option<User>, StorageError> {
        let params = [Value::from(contact.phone_number), Value::from(contact.email), Value::from(id)];
        self.session.execute(UPDATE_CONTACT, &params).await?;
        self.fetch(id).await
    }

    #[instrument(skip_all)]
    async fn find_by_contact(&self, phone_number: &str, email: &str) -> Result<Option<User>, StorageError> {
        let Some((statement, params)) = contact_query(phone_number, email) else {
            return Ok(None);
        };
        let row = self.session.query_one(&statement, &params).await?;
        row.as_ref().map(User::from_row).transpose()
    }
}
