use async_trait::async_trait;

use models::db::StorageError;
use models::user::{ContactUpdate, NewUser, ProfileUpdate, User};

/// Persistence of user records.
///
/// Mutations return the record as re-read from storage after the write, or
/// `None` when no record has the given id. Storage failures are always `Err`,
/// never folded into `None`.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new, unblocked record under a freshly minted id.
    async fn create(&self, profile: NewUser) -> Result<User, StorageError>;
    async fn update_profile(&self, id: &str, profile: ProfileUpdate) -> Result<Option<User>, StorageError>;
    async fn set_blocked(&self, id: &str, blocked: bool) -> Result<Option<User>, StorageError>;
    async fn update_contact(&self, id: &str, contact: ContactUpdate) -> Result<Option<User>, StorageError>;
    /// First record whose phone number or email matches; empty arguments do not take part in the match.
    async fn find_by_contact(&self, phone_number: &str, email: &str) -> Result<Option<User>, StorageError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockUserRepository {
        users: Mutex<Vec<User>>,
        calls: AtomicUsize,
        failure: Mutex<Option<StorageError>>,
    }

    impl MockUserRepository {
        /// Number of repository calls made so far.
        pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

        /// Make every following call fail with `err`.
        pub fn fail_with(&self, err: StorageError) {
            *self.failure.lock().unwrap() = Some(err);
        }

        fn enter(&self) -> Result<(), StorageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.failure.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        fn modify(&self, id: &str, f: impl FnOnce(&mut User)) -> Option<User> {
            let mut users = self.users.lock().unwrap();
            let user = users.iter_mut().find(|u| u.id == id)?;
            f(user);
            Some(user.clone())
        }
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn create(&self, profile: NewUser) -> Result<User, StorageError> {
            self.enter()?;
            let user = profile.into_user(models::user::new_id());
            self.users.lock().unwrap().push(user.clone());
            Ok(user)
        }

        async fn update_profile(&self, id: &str, p: ProfileUpdate) -> Result<Option<User>, StorageError> {
            self.enter()?;
            Ok(self.modify(id, |u| {
                u.first_name = p.first_name;
                u.last_name = p.last_name;
                u.gender = p.gender;
                u.date_of_birth = p.date_of_birth;
            }))
        }

        async fn set_blocked(&self, id: &str, blocked: bool) -> Result<Option<User>, StorageError> {
            self.enter()?;
            Ok(self.modify(id, |u| u.is_blocked = blocked))
        }

        async fn update_contact(&self, id: &str, c: ContactUpdate) -> Result<Option<User>, StorageError> {
            self.enter()?;
            Ok(self.modify(id, |u| {
                u.phone_number = c.phone_number;
                u.email = c.email;
            }))
        }

        async fn find_by_contact(&self, phone_number: &str, email: &str) -> Result<Option<User>, StorageError> {
            self.enter()?;
            let users = self.users.lock().unwrap();
            Ok(users
                .iter()
                .find(|u| {
                    (!phone_number.is_empty() && u.phone_number == phone_number)
                        || (!email.is_empty() && u.email == email)
                })
                .cloned())
        }
    }
}
