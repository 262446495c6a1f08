use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

use crate::error::AppError;
use crate::state::AppState;

/// Address of the client that sent the request.
///
/// Taken from the TCP peer, or from the first `X-Forwarded-For` entry when
/// `server.trust_forwarded_for` is enabled. The router must be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub struct ClientIp(pub IpAddr);

fn forwarded_for(parts: &Parts) -> Option<IpAddr> {
    parts
        .headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok())
}

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if state.config.server.trust_forwarded_for
            && let Some(ip) = forwarded_for(parts)
        {
            return Ok(ClientIp(ip));
        }

        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| ClientIp(addr.ip()))
            .ok_or_else(|| AppError::Internal("Client address unavailable".into()))
    }
}
