//! Client side of `user.UserService`.

use super::messages::*;
use super::user_service_server::SERVICE_NAME;
use tonic::codegen::*;

/// Typed client for the user service over any gRPC transport.
#[derive(Debug, Clone)]
pub struct UserServiceClient<T> {
    inner: tonic::client::Grpc<T>,
}

impl UserServiceClient<tonic::transport::Channel> {
    /// Dial `dst` eagerly and build a client on the resulting channel.
    pub async fn connect<D>(dst: D) -> std::result::Result<Self, tonic::transport::Error>
    where
        D: TryInto<tonic::transport::Endpoint>,
        D::Error: Into<StdError>,
    {
        let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
        Ok(Self::new(conn))
    }
}

impl<T> UserServiceClient<T>
where
    T: tonic::client::GrpcService<tonic::body::BoxBody>,
    T::Error: Into<StdError> + std::fmt::Debug,
    T::ResponseBody: Body<Data = Bytes> + std::marker::Send + 'static,
    <T::ResponseBody as Body>::Error: Into<StdError> + std::marker::Send,
{
    pub fn new(inner: T) -> Self {
        Self { inner: tonic::client::Grpc::new(inner) }
    }

    async fn unary<M>(
        &mut self,
        request: tonic::Request<M>,
        method: &'static str,
        path: &'static str,
    ) -> std::result::Result<tonic::Response<UserResponse>, tonic::Status>
    where
        M: prost::Message + std::marker::Send + std::marker::Sync + 'static,
    {
        self.inner
            .ready()
            .await
            .map_err(|e| tonic::Status::new(tonic::Code::Unknown, format!("Service was not ready: {e:?}")))?;
        let codec = tonic::codec::ProstCodec::default();
        let path = http::uri::PathAndQuery::from_static(path);
        let mut req = request;
        req.extensions_mut().insert(GrpcMethod::new(SERVICE_NAME, method));
        self.inner.unary(req, path, codec).await
    }

    pub async fn create_user(
        &mut self,
        request: impl tonic::IntoRequest<CreateUserRequest>,
    ) -> std::result::Result<tonic::Response<UserResponse>, tonic::Status> {
        self.unary(request.into_request(), "CreateUser", "/user.UserService/CreateUser").await
    }

    pub async fn update_user(
        &mut self,
        request: impl tonic::IntoRequest<UpdateUserRequest>,
    ) -> std::result::Result<tonic::Response<UserResponse>, tonic::Status> {
        self.unary(request.into_request(), "UpdateUser", "/user.UserService/UpdateUser").await
    }

    pub async fn block_user(
        &mut self,
        request: impl tonic::IntoRequest<BlockUserRequest>,
    ) -> std::result::Result<tonic::Response<UserResponse>, tonic::Status> {
        self.unary(request.into_request(), "BlockUser", "/user.UserService/BlockUser").await
    }

    pub async fn unblock_user(
        &mut self,
        request: impl tonic::IntoRequest<UnblockUserRequest>,
    ) -> std::result::Result<tonic::Response<UserResponse>, tonic::Status> {
        self.unary(request.into_request(), "UnblockUser", "/user.UserService/UnblockUser").await
    }

    pub async fn update_contact(
        &mut self,
        request: impl tonic::IntoRequest<UpdateContactRequest>,
    ) -> std::result::Result<tonic::Response<UserResponse>, tonic::Status> {
        self.unary(request.into_request(), "UpdateContact", "/user.UserService/UpdateContact").await
    }

    pub async fn get_user(
        &mut self,
        request: impl tonic::IntoRequest<GetUserRequest>,
    ) -> std::result::Result<tonic::Response<UserResponse>, tonic::Status> {
        self.unary(request.into_request(), "GetUser", "/user.UserService/GetUser").await
    }
}
