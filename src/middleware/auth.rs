//! Caller identity extraction.
//!
//! Session verification is owned by the upstream gateway, which injects
//! the authenticated user id as the `x-user-id` header. Requests reaching
//! this service without it are rejected.

use std::future::Future;
use std::pin::Pin;

use actix_web::{Error, FromRequest, HttpRequest};
use uuid::Uuid;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user as asserted by the gateway.
#[derive(Debug, Clone, Copy)]
pub struct AuthedUser {
    pub id: Uuid,
}

impl FromRequest for AuthedUser {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let user_id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok());

        Box::pin(async move {
            let id = user_id.ok_or(AppError::Unauthorized)?;
            Ok(AuthedUser { id })
        })
    }
}
