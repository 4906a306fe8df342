use std::sync::Arc;

use tracing::{debug, error, info, instrument};

use models::db::StorageError;
use models::user::{ContactUpdate, ProfileUpdate, User};

use crate::errors::ServiceError;
use crate::rpc::user_service_server::UserService;
use crate::rpc::{
    BlockUserRequest, CreateUserRequest, GetUserRequest, UnblockUserRequest, UpdateContactRequest, UpdateUserRequest,
    UserResponse,
};
use crate::user::repository::UserRepository;
use crate::user::validation::Validate;

/// Orchestrates each account operation: validate, delegate to the
/// repository, classify the outcome. Transport independent; the
/// [`UserService`] impl below adapts it to the native RPC surface.
pub struct UserHandler<R: UserRepository> {
    repo: Arc<R>,
}

/// Log a storage failure in full and reduce it to a transport-safe class.
fn storage_failure(operation: &'static str) -> impl FnOnce(StorageError) -> ServiceError {
    move |e| {
        error!(operation, error = %e, "storage failure");
        match e {
            StorageError::Decode(_) => ServiceError::Internal(operation.to_string()),
            StorageError::Unavailable(_) | StorageError::Rejected(_) => {
                ServiceError::StorageUnavailable(operation.to_string())
            }
        }
    }
}

fn validated<T: Validate>(req: &T) -> Result<(), ServiceError> {
    req.validate().map_err(|v| {
        debug!(violations = %v, "request rejected");
        ServiceError::Validation(v)
    })
}

fn missing(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("user {id} not found"))
}

impl<R: UserRepository> UserHandler<R> {
    pub fn new(repo: Arc<R>) -> Self { Self { repo } }

    /// Open a new account.
    ///
    /// # Examples
    /// ```
    /// use service::rpc::CreateUserRequest;
    /// use service::user::{handler::UserHandler, repository::mock::MockUserRepository};
    /// use std::sync::Arc;
    /// let handler = UserHandler::new(Arc::new(MockUserRepository::default()));
    /// let req = CreateUserRequest {
    ///     first_name: "Ann".into(), last_name: "Lee".into(), gender: "F".into(),
    ///     date_of_birth: "1990-01-01".into(), phone_number: "+1000".into(), email: "ann@x.com".into(),
    /// };
    /// let user = tokio_test::block_on(handler.create_user(req)).unwrap();
    /// assert!(!user.is_blocked);
    /// assert!(!user.id.is_empty());
    /// ```
    #[instrument(skip(self, req))]
    pub async fn create_user(&self, req: CreateUserRequest) -> Result<User, ServiceError> {
        validated(&req)?;
        let user = self.repo.create(req.into()).await.map_err(storage_failure("create user"))?;
        info!(user_id = %user.id, "user_created");
        Ok(user)
    }

    #[instrument(skip(self, req), fields(user_id = %req.id))]
    pub async fn update_user(&self, req: UpdateUserRequest) -> Result<User, ServiceError> {
        validated(&req)?;
        let profile = ProfileUpdate {
            first_name: req.first_name,
            last_name: req.last_name,
            gender: req.gender,
            date_of_birth: req.date_of_birth,
        };
        let user = self
            .repo
            .update_profile(&req.id, profile)
            .await
            .map_err(storage_failure("update user"))?
            .ok_or_else(|| missing(&req.id))?;
        info!(user_id = %user.id, "user_profile_updated");
        Ok(user)
    }

    #[instrument(skip(self, req), fields(user_id = %req.id))]
    pub async fn block_user(&self, req: BlockUserRequest) -> Result<User, ServiceError> {
        validated(&req)?;
        self.set_blocked(&req.id, true, "block user").await
    }

    #[instrument(skip(self, req), fields(user_id = %req.id))]
    pub async fn unblock_user(&self, req: UnblockUserRequest) -> Result<User, ServiceError> {
        validated(&req)?;
        self.set_blocked(&req.id, false, "unblock user").await
    }

    async fn set_blocked(&self, id: &str, blocked: bool, operation: &'static str) -> Result<User, ServiceError> {
        let user = self
            .repo
            .set_blocked(id, blocked)
            .await
            .map_err(storage_failure(operation))?
            .ok_or_else(|| missing(id))?;
        info!(user_id = %user.id, blocked, "user_block_status_changed");
        Ok(user)
    }

    #[instrument(skip(self, req), fields(user_id = %req.id))]
    pub async fn update_contact(&self, req: UpdateContactRequest) -> Result<User, ServiceError> {
        validated(&req)?;
        let contact = ContactUpdate { phone_number: req.phone_number, email: req.email };
        let user = self
            .repo
            .update_contact(&req.id, contact)
            .await
            .map_err(storage_failure("update contact"))?
            .ok_or_else(|| missing(&req.id))?;
        info!(user_id = %user.id, "user_contact_updated");
        Ok(user)
    }

    /// Look a user up by phone number or email; the first match wins.
    #[instrument(skip(self, req))]
    pub async fn get_user(&self, req: GetUserRequest) -> Result<User, ServiceError> {
        validated(&req)?;
        self.repo
            .find_by_contact(&req.phone_number, &req.email)
            .await
            .map_err(storage_failure("fetch user"))?
            .ok_or_else(|| ServiceError::not_found("user"))
    }
}

fn respond(result: Result<User, ServiceError>) -> Result<tonic::Response<UserResponse>, tonic::Status> {
    result.map(|u| tonic::Response::new(u.into())).map_err(Into::into)
}

#[tonic::async_trait]
impl<R: UserRepository + 'static> UserService for UserHandler<R> {
    async fn create_user(
        &self,
        request: tonic::Request<CreateUserRequest>,
    ) -> Result<tonic::Response<UserResponse>, tonic::Status> {
        respond(UserHandler::create_user(self, request.into_inner()).await)
    }

    async fn update_user(
        &self,
        request: tonic::Request<UpdateUserRequest>,
    ) -> Result<tonic::Response<UserResponse>, tonic::Status> {
        respond(UserHandler::update_user(self, request.into_inner()).await)
    }

    async fn block_user(
        &self,
        request: tonic::Request<BlockUserRequest>,
    ) -> Result<tonic::Response<UserResponse>, tonic::Status> {
        respond(UserHandler::block_user(self, request.into_inner()).await)
    }

    async fn unblock_user(
        &self,
        request: tonic::Request<UnblockUserRequest>,
    ) -> Result<tonic::Response<UserResponse>, tonic::Status> {
        respond(UserHandler::unblock_user(self, request.into_inner()).await)
    }

    async fn update_contact(
        &self,
        request: tonic::Request<UpdateContactRequest>,
    ) -> Result<tonic::Response<UserResponse>, tonic::Status> {
        respond(UserHandler::update_contact(self, request.into_inner()).await)
    }

    async fn get_user(
        &self,
        request: tonic::Request<GetUserRequest>,
    ) -> Result<tonic::Response<UserResponse>, tonic::Status> {
        respond(UserHandler::get_user(self, request.into_inner()).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::repo::cql::CqlUserRepository;
    use crate::user::repository::mock::MockUserRepository;
    use models::db::Consistency;
    use models::memory::MemorySession;
    use tonic::Code;

    fn ann() -> CreateUserRequest {
        CreateUserRequest {
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            gender: "F".into(),
            date_of_birth: "1990-01-01".into(),
            phone_number: "+1000".into(),
            email: "ann@x.com".into(),
        }
    }

    fn stored() -> (Arc<MemorySession>, UserHandler<CqlUserRepository<MemorySession>>) {
        let session = Arc::new(
            MemorySession::new("user_service", Consistency::Quorum)
                .with_table(models::user::TABLE, models::user::KEY_COLUMN),
        );
        let repo = Arc::new(CqlUserRepository::new(session.clone()));
        (session, UserHandler::new(repo))
    }

    #[tokio::test]
    async fn create_mints_unique_ids_and_starts_unblocked() -> anyhow::Result<()> {
        let (_s, h) = stored();
        let a = h.create_user(ann()).await?;
        let b = h.create_user(ann()).await?;
        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);
        assert!(!a.is_blocked && !b.is_blocked);
        assert_eq!(a.first_name, "Ann");
        assert_eq!(a.email, "ann@x.com");
        Ok(())
    }

    #[tokio::test]
    async fn created_user_is_found_by_phone() -> anyhow::Result<()> {
        let (_s, h) = stored();
        let created = h.create_user(ann()).await?;
        let found = h
            .get_user(GetUserRequest { phone_number: "+1000".into(), email: String::new() })
            .await?;
        assert_eq!(found, created);
        Ok(())
    }

    #[tokio::test]
    async fn profile_update_keeps_contact_and_block_state() -> anyhow::Result<()> {
        let (_s, h) = stored();
        let u = h.create_user(ann()).await?;
        h.block_user(BlockUserRequest { id: u.id.clone() }).await?;
        let updated = h
            .update_user(UpdateUserRequest {
                id: u.id.clone(),
                first_name: "Anne".into(),
                last_name: "Leigh".into(),
                gender: "X".into(),
                date_of_birth: "1991-01-01".into(),
            })
            .await?;
        assert_eq!(updated.first_name, "Anne");
        assert_eq!(updated.phone_number, u.phone_number);
        assert_eq!(updated.email, u.email);
        assert!(updated.is_blocked);
        Ok(())
    }

    #[tokio::test]
    async fn block_then_unblock_restores_record() -> anyhow::Result<()> {
        let (_s, h) = stored();
        let u = h.create_user(ann()).await?;
        let blocked = h.block_user(BlockUserRequest { id: u.id.clone() }).await?;
        assert!(blocked.is_blocked);
        let unblocked = h.unblock_user(UnblockUserRequest { id: u.id.clone() }).await?;
        assert_eq!(unblocked, u);
        Ok(())
    }

    #[tokio::test]
    async fn contact_update_keeps_block_state() -> anyhow::Result<()> {
        let (_s, h) = stored();
        let u = h.create_user(ann()).await?;
        h.block_user(BlockUserRequest { id: u.id.clone() }).await?;
        let moved = h
            .update_contact(UpdateContactRequest {
                id: u.id.clone(),
                phone_number: "+2000".into(),
                email: "ann@y.org".into(),
            })
            .await?;
        assert!(moved.is_blocked);
        assert_eq!(moved.first_name, "Ann");
        let found = h
            .get_user(GetUserRequest { phone_number: String::new(), email: "ann@y.org".into() })
            .await?;
        assert_eq!(found.id, u.id);
        Ok(())
    }

    #[tokio::test]
    async fn mutations_on_unknown_id_are_not_found() {
        let (session, h) = stored();
        let id = models::user::new_id();
        let err = h.block_user(BlockUserRequest { id: id.clone() }).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let err = h.unblock_user(UnblockUserRequest { id: id.clone() }).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let err = h
            .update_contact(UpdateContactRequest { id: id.clone(), phone_number: "+1234".into(), email: "a@b.co".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let err = h
            .update_user(UpdateUserRequest {
                id,
                first_name: "A".into(),
                last_name: "B".into(),
                gender: "C".into(),
                date_of_birth: "D".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert_eq!(session.row_count(models::user::TABLE).await, 0);
    }

    #[tokio::test]
    async fn lookup_with_split_matches_returns_one_record() -> anyhow::Result<()> {
        let (_s, h) = stored();
        let a = h.create_user(ann()).await?;
        let b = h
            .create_user(CreateUserRequest { phone_number: "+2000".into(), email: "bob@x.com".into(), ..ann() })
            .await?;
        let hit = h
            .get_user(GetUserRequest { phone_number: a.phone_number.clone(), email: b.email.clone() })
            .await?;
        assert!(hit == a || hit == b);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_requests_never_reach_the_repository() {
        let repo = Arc::new(MockUserRepository::default());
        let h = UserHandler::new(repo.clone());

        let err = h.create_user(CreateUserRequest { first_name: String::new(), ..ann() }).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(h.update_user(UpdateUserRequest::default()).await.is_err());
        assert!(h.block_user(BlockUserRequest { id: "nope".into() }).await.is_err());
        assert!(h.unblock_user(UnblockUserRequest::default()).await.is_err());
        assert!(h.update_contact(UpdateContactRequest::default()).await.is_err());
        assert!(h.get_user(GetUserRequest::default()).await.is_err());
        assert_eq!(repo.calls(), 0);
    }

    #[tokio::test]
    async fn storage_failures_surface_as_internal_without_driver_text() {
        let (session, h) = stored();
        let u = h.create_user(ann()).await.unwrap();
        session.set_unavailable(true);

        let err = h.block_user(BlockUserRequest { id: u.id.clone() }).await.unwrap_err();
        assert!(matches!(err, ServiceError::StorageUnavailable(_)));

        let status = UserService::get_user(
            &h,
            tonic::Request::new(GetUserRequest { phone_number: "+1000".into(), email: String::new() }),
        )
        .await
        .unwrap_err();
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), "failed to fetch user");
    }

    #[tokio::test]
    async fn decode_failures_are_internal() {
        let repo = Arc::new(MockUserRepository::default());
        repo.fail_with(StorageError::Decode("column id missing from row".into()));
        let h = UserHandler::new(repo);
        let err = h.create_user(ann()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)));
    }

    #[tokio::test]
    async fn rpc_surface_maps_error_classes() {
        let (_s, h) = stored();
        let status = UserService::block_user(&h, tonic::Request::new(BlockUserRequest { id: "x".into() }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);

        let status = UserService::block_user(&h, tonic::Request::new(BlockUserRequest { id: models::user::new_id() }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);

        let resp = UserService::create_user(&h, tonic::Request::new(ann())).await.unwrap().into_inner();
        assert_eq!(resp.first_name, "Ann");
        assert!(!resp.is_blocked);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_calls_on_a_shared_handler_stay_consistent() -> anyhow::Result<()> {
        const N: usize = 32;
        let (session, h) = stored();
        let h = Arc::new(h);

        let creates: Vec<_> = (0..N)
            .map(|i| {
                let h = h.clone();
                tokio::spawn(async move {
                    let mut req = ann();
                    req.phone_number = format!("+1{i:04}");
                    req.email = format!("user{i}@x.com");
                    h.create_user(req).await
                })
            })
            .collect();
        let mut users = Vec::with_capacity(N);
        for task in creates {
            users.push(task.await??);
        }
        let ids: std::collections::HashSet<_> = users.iter().map(|u| u.id.clone()).collect();
        assert_eq!(ids.len(), N);
        assert_eq!(session.row_count(models::user::TABLE).await, N);

        // even users get blocked, odd users get a new contact, all at once
        let mutations: Vec<_> = users
            .iter()
            .enumerate()
            .map(|(i, u)| {
                let h = h.clone();
                let id = u.id.clone();
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        h.block_user(BlockUserRequest { id }).await
                    } else {
                        let req = UpdateContactRequest {
                            id,
                            phone_number: format!("+2{i:04}"),
                            email: format!("moved{i}@x.com"),
                        };
                        h.update_contact(req).await
                    }
                })
            })
            .collect();
        for (i, task) in mutations.into_iter().enumerate() {
            let resp = task.await??;
            assert_eq!(resp.id, users[i].id);
            let reread = h
                .get_user(GetUserRequest { phone_number: resp.phone_number.clone(), email: String::new() })
                .await?;
            assert_eq!(reread, resp);
            if i % 2 == 0 {
                assert!(resp.is_blocked);
                assert_eq!(resp.email, users[i].email);
            } else {
                assert!(!resp.is_blocked);
                assert_eq!(resp.email, format!("moved{i}@x.com"));
            }
        }
        assert_eq!(session.row_count(models::user::TABLE).await, N);

        // block and contact change racing on the same record touch disjoint columns
        let target = users[1].id.clone();
        let (blocked, moved) = tokio::join!(
            tokio::spawn({
                let h = h.clone();
                let id = target.clone();
                async move { h.block_user(BlockUserRequest { id }).await }
            }),
            tokio::spawn({
                let h = h.clone();
                let id = target.clone();
                async move {
                    h.update_contact(UpdateContactRequest {
                        id,
                        phone_number: "+39999".into(),
                        email: "final@x.com".into(),
                    })
                    .await
                }
            }),
        );
        assert!(blocked??.is_blocked);
        assert_eq!(moved??.email, "final@x.com");
        let reread = h
            .get_user(GetUserRequest { phone_number: "+39999".into(), email: String::new() })
            .await?;
        assert_eq!(reread.id, target);
        assert!(reread.is_blocked);
        assert_eq!(reread.email, "final@x.com");
        assert_eq!(session.row_count(models::user::TABLE).await, N);
        Ok(())
    }
}
