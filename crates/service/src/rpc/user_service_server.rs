//! Server side of `user.UserService`.

use super::messages::*;
use tonic::codegen::*;

pub const SERVICE_NAME: &str = "user.UserService";

/// The native RPC interface: one unary method per account operation.
#[async_trait]
pub trait UserService: std::marker::Send + std::marker::Sync + 'static {
    async fn create_user(
        &self,
        request: tonic::Request<CreateUserRequest>,
    ) -> std::result::Result<tonic::Response<UserResponse>, tonic::Status>;

    async fn update_user(
        &self,
        request: tonic::Request<UpdateUserRequest>,
    ) -> std::result::Result<tonic::Response<UserResponse>, tonic::Status>;

    async fn block_user(
        &self,
        request: tonic::Request<BlockUserRequest>,
    ) -> std::result::Result<tonic::Response<UserResponse>, tonic::Status>;

    async fn unblock_user(
        &self,
        request: tonic::Request<UnblockUserRequest>,
    ) -> std::result::Result<tonic::Response<UserResponse>, tonic::Status>;

    async fn update_contact(
        &self,
        request: tonic::Request<UpdateContactRequest>,
    ) -> std::result::Result<tonic::Response<UserResponse>, tonic::Status>;

    async fn get_user(
        &self,
        request: tonic::Request<GetUserRequest>,
    ) -> std::result::Result<tonic::Response<UserResponse>, tonic::Status>;
}

/// Tower service routing gRPC paths to a [`UserService`] implementation.
pub struct UserServiceServer<T: UserService> {
    inner: Arc<T>,
}

impl<T: UserService> UserServiceServer<T> {
    pub fn new(inner: T) -> Self {
        Self { inner: Arc::new(inner) }
    }

    pub fn from_arc(inner: Arc<T>) -> Self {
        Self { inner }
    }
}

impl<T: UserService> Clone for UserServiceServer<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: UserService> tonic::server::NamedService for UserServiceServer<T> {
    const NAME: &'static str = SERVICE_NAME;
}

macro_rules! unary_svc {
    ($svc:ident, $req:ty, $method:ident) => {
        struct $svc<T: UserService>(Arc<T>);

        impl<T: UserService> tonic::server::UnaryService<$req> for $svc<T> {
            type Response = UserResponse;
            type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;

            fn call(&mut self, request: tonic::Request<$req>) -> Self::Future {
                let inner = self.0.clone();
                Box::pin(async move { inner.$method(request).await })
            }
        }
    };
}

unary_svc!(CreateUserSvc, CreateUserRequest, create_user);
unary_svc!(UpdateUserSvc, UpdateUserRequest, update_user);
unary_svc!(BlockUserSvc, BlockUserRequest, block_user);
unary_svc!(UnblockUserSvc, UnblockUserRequest, unblock_user);
unary_svc!(UpdateContactSvc, UpdateContactRequest, update_contact);
unary_svc!(GetUserSvc, GetUserRequest, get_user);

fn unary<S, M, B>(method: S, req: http::Request<B>) -> BoxFuture<http::Response<tonic::body::BoxBody>, std::convert::Infallible>
where
    S: tonic::server::UnaryService<M, Response = UserResponse> + std::marker::Send + 'static,
    S::Future: std::marker::Send + 'static,
    M: prost::Message + Default + std::marker::Send + 'static,
    B: Body + std::marker::Send + 'static,
    B::Error: Into<StdError> + std::marker::Send + 'static,
{
    Box::pin(async move {
        let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
        Ok(grpc.unary(method, req).await)
    })
}

impl<T, B> tonic::codegen::Service<http::Request<B>> for UserServiceServer<T>
where
    T: UserService,
    B: Body + std::marker::Send + 'static,
    B::Error: Into<StdError> + std::marker::Send + 'static,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let inner = self.inner.clone();
        match req.uri().path() {
            "/user.UserService/CreateUser" => unary(CreateUserSvc(inner), req),
            "/user.UserService/UpdateUser" => unary(UpdateUserSvc(inner), req),
            "/user.UserService/BlockUser" => unary(BlockUserSvc(inner), req),
            "/user.UserService/UnblockUser" => unary(UnblockUserSvc(inner), req),
            "/user.UserService/UpdateContact" => unary(UpdateContactSvc(inner), req),
            "/user.UserService/GetUser" => unary(GetUserSvc(inner), req),
            _ => Box::pin(async move {
                let mut response = http::Response::new(tonic::body::empty_body());
                let headers = response.headers_mut();
                headers.insert(
                    http::header::HeaderName::from_static("grpc-status"),
                    http::HeaderValue::from(tonic::Code::Unimplemented as i32),
                );
                headers.insert(
                    http::header::CONTENT_TYPE,
                    http::HeaderValue::from_static("application/grpc"),
                );
                Ok(response)
            }),
        }
    }
}
