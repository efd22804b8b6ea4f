//! Shared application state and auth extractors.

use crate::error::ApiError;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use case_engine::{CaseService, ReclaimService};
use casetrack_auth::session::{Plane, SessionIdentity, SessionManager, StaffCredentials};
use casetrack_auth::{LoginGuard, Notifier, OtpService};
use std::net::SocketAddr;
use std::sync::Arc;

/// State shared across handlers. Cloned per request; everything inside is
/// an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub cases: Arc<CaseService>,
    pub reclaims: Arc<ReclaimService>,
    pub otp: Arc<OtpService>,
    pub sessions: Arc<SessionManager>,
    pub guard: Arc<LoginGuard>,
    pub notifier: Arc<dyn Notifier>,
    pub staff: Arc<StaffCredentials>,
}

fn bearer_token(parts: &Parts) -> Result<String, ApiError> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("No token provided"))?;
    let token = header.strip_prefix("Bearer ").unwrap_or(header);
    if token.is_empty() {
        return Err(ApiError::unauthorized("No token provided"));
    }
    Ok(token.to_string())
}

/// A request authenticated on the staff plane.
pub struct StaffAuth(pub SessionIdentity);

#[async_trait::async_trait]
impl FromRequestParts<AppState> for StaffAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let identity = state.sessions.validate(&token, Plane::Staff).await?;
        Ok(Self(identity))
    }
}

/// A request authenticated on the client plane.
pub struct ClientAuth(pub SessionIdentity);

#[async_trait::async_trait]
impl FromRequestParts<AppState> for ClientAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let identity = state.sessions.validate(&token, Plane::Client).await?;
        Ok(Self(identity))
    }
}

/// Best-effort request source for the login guard: `X-Forwarded-For` when a
/// proxy set it, else the peer address, else a fixed bucket. Spoofable by
/// nature; the guard bounds exposure per source, nothing more.
pub struct SourceIp(pub String);

#[async_trait::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SourceIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(forwarded) = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
        {
            if let Some(first) = forwarded.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return Ok(Self(first.to_string()));
                }
            }
        }
        let source = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(Self(source))
    }
}
