//! Wire messages of the `user.UserService` package.
//!
//! Each message is both a protobuf message (native RPC) and a serde type
//! (HTTP/JSON gateway). JSON uses lowerCamelCase names and every field is
//! optional on input: absent fields decode to their zero value.

use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateUserRequest {
    #[prost(string, tag = "1")]
    pub first_name: String,
    #[prost(string, tag = "2")]
    pub last_name: String,
    #[prost(string, tag = "3")]
    pub gender: String,
    #[prost(string, tag = "4")]
    pub date_of_birth: String,
    #[prost(string, tag = "5")]
    pub phone_number: String,
    #[prost(string, tag = "6")]
    pub email: String,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUserRequest {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub first_name: String,
    #[prost(string, tag = "3")]
    pub last_name: String,
    #[prost(string, tag = "4")]
    pub gender: String,
    #[prost(string, tag = "5")]
    pub date_of_birth: String,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockUserRequest {
    #[prost(string, tag = "1")]
    pub id: String,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnblockUserRequest {
    #[prost(string, tag = "1")]
    pub id: String,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateContactRequest {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub phone_number: String,
    #[prost(string, tag = "3")]
    pub email: String,
}

/// Lookup by contact details; either field may be left empty.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetUserRequest {
    #[prost(string, tag = "1")]
    pub phone_number: String,
    #[prost(string, tag = "2")]
    pub email: String,
}

/// The user record as returned by every method.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserResponse {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub first_name: String,
    #[prost(string, tag = "3")]
    pub last_name: String,
    #[prost(string, tag = "4")]
    pub gender: String,
    #[prost(string, tag = "5")]
    pub date_of_birth: String,
    #[prost(string, tag = "6")]
    pub phone_number: String,
    #[prost(string, tag = "7")]
    pub email: String,
    #[prost(bool, tag = "8")]
    pub is_blocked: bool,
}

impl From<models::user::User> for UserResponse {
    fn from(u: models::user::User) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name,
            last_name: u.last_name,
            gender: u.gender,
            date_of_birth: u.date_of_birth,
            phone_number: u.phone_number,
            email: u.email,
            is_blocked: u.is_blocked,
        }
    }
}

impl From<CreateUserRequest> for models::user::NewUser {
    fn from(r: CreateUserRequest) -> Self {
        Self {
            first_name: r.first_name,
            last_name: r.last_name,
            gender: r.gender,
            date_of_birth: r.date_of_birth,
            phone_number: r.phone_number,
            email: r.email,
        }
    }
}
