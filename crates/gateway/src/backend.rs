//! Where the gateway sends translated calls: straight into the handler, or
//! over a gRPC channel to a running server.

use std::sync::Arc;

use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Response, Status};

use service::rpc::user_service_client::UserServiceClient;
use service::rpc::user_service_server::UserService;
use service::rpc::{
    BlockUserRequest, CreateUserRequest, GetUserRequest, UnblockUserRequest, UpdateContactRequest, UpdateUserRequest,
    UserResponse,
};

#[async_trait]
pub trait UserBackend: Send + Sync + 'static {
    async fn create_user(&self, req: CreateUserRequest) -> Result<UserResponse, Status>;
    async fn update_user(&self, req: UpdateUserRequest) -> Result<UserResponse, Status>;
    async fn block_user(&self, req: BlockUserRequest) -> Result<UserResponse, Status>;
    async fn unblock_user(&self, req: UnblockUserRequest) -> Result<UserResponse, Status>;
    async fn update_contact(&self, req: UpdateContactRequest) -> Result<UserResponse, Status>;
    async fn get_user(&self, req: GetUserRequest) -> Result<UserResponse, Status>;
}

pub type SharedBackend = Arc<dyn UserBackend>;

/// Calls the RPC implementation directly, skipping the wire.
pub struct InProcess<T: UserService> {
    inner: Arc<T>,
}

impl<T: UserService> InProcess<T> {
    pub fn new(inner: Arc<T>) -> Self { Self { inner } }
}

#[async_trait]
impl<T: UserService> UserBackend for InProcess<T> {
    async fn create_user(&self, req: CreateUserRequest) -> Result<UserResponse, Status> {
        self.inner.create_user(Request::new(req)).await.map(Response::into_inner)
    }

    async fn update_user(&self, req: UpdateUserRequest) -> Result<UserResponse, Status> {
        self.inner.update_user(Request::new(req)).await.map(Response::into_inner)
    }

    async fn block_user(&self, req: BlockUserRequest) -> Result<UserResponse, Status> {
        self.inner.block_user(Request::new(req)).await.map(Response::into_inner)
    }

    async fn unblock_user(&self, req: UnblockUserRequest) -> Result<UserResponse, Status> {
        self.inner.unblock_user(Request::new(req)).await.map(Response::into_inner)
    }

    async fn update_contact(&self, req: UpdateContactRequest) -> Result<UserResponse, Status> {
        self.inner.update_contact(Request::new(req)).await.map(Response::into_inner)
    }

    async fn get_user(&self, req: GetUserRequest) -> Result<UserResponse, Status> {
        self.inner.get_user(Request::new(req)).await.map(Response::into_inner)
    }
}

/// Dials the native RPC endpoint; each call runs on a clone of one shared channel.
#[derive(Clone)]
pub struct Loopback {
    client: UserServiceClient<Channel>,
}

impl Loopback {
    pub fn new(channel: Channel) -> Self {
        Self { client: UserServiceClient::new(channel) }
    }

    /// Build a channel to `endpoint` without dialing; the first call connects.
    /// Must be called from within a tokio runtime.
    pub fn connect_lazy(endpoint: &str) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(endpoint.to_string())?.connect_lazy();
        Ok(Self::new(channel))
    }
}

#[async_trait]
impl UserBackend for Loopback {
    async fn create_user(&self, req: CreateUserRequest) -> Result<UserResponse, Status> {
        self.client.clone().create_user(req).await.map(Response::into_inner)
    }

    async fn update_user(&self, req: UpdateUserRequest) -> Result<UserResponse, Status> {
        self.client.clone().update_user(req).await.map(Response::into_inner)
    }

    async fn block_user(&self, req: BlockUserRequest) -> Result<UserResponse, Status> {
        self.client.clone().block_user(req).await.map(Response::into_inner)
    }

    async fn unblock_user(&self, req: UnblockUserRequest) -> Result<UserResponse, Status> {
        self.client.clone().unblock_user(req).await.map(Response::into_inner)
    }

    async fn update_contact(&self, req: UpdateContactRequest) -> Result<UserResponse, Status> {
        self.client.clone().update_contact(req).await.map(Response::into_inner)
    }

    async fn get_user(&self, req: GetUserRequest) -> Result<UserResponse, Status> {
        self.client.clone().get_user(req).await.map(Response::into_inner)
    }
}
