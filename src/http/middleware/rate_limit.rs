use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;

use crate::app::rate_limiter::{RateLimiter, RateWindow};
use crate::http::AppError;
use crate::AppState;

/// Attempt budget for an unauthenticated endpoint.
fn ip_limit_for(path: &str, method: &str) -> Option<(&'static str, u32, RateWindow)> {
    match (path, method) {
        ("/v1/auth/login", "POST") => Some(("login", 10, RateWindow::Hour)),
        ("/v1/users", "POST") => Some(("signup", 3, RateWindow::Day)),
        _ => None,
    }
}

/// IP-based rate limiting for sign-in and registration.
pub async fn ip_rate_limit_middleware(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some((action, limit, window)) =
        ip_limit_for(request.uri().path(), request.method().as_str())
    else {
        return Ok(next.run(request).await);
    };
    // Requests without a peer address (in-process callers) are not limited.
    let Some(ConnectInfo(addr)) = connect_info else {
        return Ok(next.run(request).await);
    };

    let ip = addr.ip().to_string();
    let rate_limiter = RateLimiter::new(state.cache.clone());
    let limited = rate_limiter
        .hit_ip(&ip, action, limit, window)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to check IP rate limit");
            AppError::internal("failed to check rate limit")
        })?;

    if limited {
        tracing::warn!(ip = ip, action = action, "IP rate limit exceeded");
        return Err(AppError::rate_limited(
            "Too many attempts from your IP address. Please try again later.",
        ));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_only_sign_in_and_registration() {
        assert_eq!(
            ip_limit_for("/v1/auth/login", "POST").map(|(action, _, _)| action),
            Some("login")
        );
        assert_eq!(
            ip_limit_for("/v1/users", "POST").map(|(action, _, _)| action),
            Some("signup")
        );
        assert!(ip_limit_for("/v1/users", "GET").is_none());
        assert!(ip_limit_for("/v1/chat/messages", "POST").is_none());
    }
}
