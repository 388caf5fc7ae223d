//! Actor identity extraction.
//!
//! Session and credential handling live in the authenticating gateway; it
//! forwards the authenticated user id in the `x-user-id` header. The
//! extractor resolves that id against the directory and rejects unapproved
//! or deactivated accounts.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{request::Parts, StatusCode};
use diesel::prelude::*;
use uuid::Uuid;

use crate::shared::models::User;
use crate::shared::schema::users;
use crate::shared::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user driving the current request.
#[derive(Debug, Clone)]
pub struct Actor(pub User);

impl std::ops::Deref for Actor {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = Arc::<AppState>::from_ref(state);

        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "Missing user identity"))?;
        let user_id = Uuid::parse_str(header)
            .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid user identity"))?;

        let mut conn = state
            .conn
            .get()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Database unavailable"))?;
        let user = users::table
            .find(user_id)
            .first::<User>(&mut conn)
            .optional()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?
            .ok_or((StatusCode::UNAUTHORIZED, "Unknown user"))?;

        if !user.is_active {
            return Err((StatusCode::UNAUTHORIZED, "Account deactivated"));
        }
        if !user.approved {
            return Err((StatusCode::FORBIDDEN, "Account pending approval"));
        }

        Ok(Actor(user))
    }
}
