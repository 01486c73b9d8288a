/// Rate Limiting System
use crate::{
    config::RateLimitConfig,
    context::AppContext,
    error::{HubError, HubResult},
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

type DirectLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>;

fn non_zero(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
}

/// Rate limiter manager
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    authenticated: Arc<DirectLimiter>,
    unauthenticated: Arc<DirectLimiter>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let auth_quota = Quota::per_second(non_zero(config.authenticated_rps))
            .allow_burst(non_zero(config.burst_size));

        // Anonymous callers get a fifth of the burst allowance
        let unauth_quota = Quota::per_second(non_zero(config.unauthenticated_rps))
            .allow_burst(non_zero(config.burst_size / 5));

        Self {
            enabled: config.enabled,
            authenticated: Arc::new(GovernorLimiter::direct(auth_quota)),
            unauthenticated: Arc::new(GovernorLimiter::direct(unauth_quota)),
        }
    }

    fn check(&self, limiter: &DirectLimiter) -> HubResult<()> {
        if !self.enabled {
            return Ok(());
        }
        limiter.check().map_err(|_| HubError::RateLimitExceeded {
            retry_after: Duration::from_secs(1),
        })
    }

    /// Check rate limit for authenticated user
    pub fn check_authenticated(&self) -> HubResult<()> {
        self.check(&self.authenticated)
    }

    /// Check rate limit for unauthenticated user
    pub fn check_unauthenticated(&self) -> HubResult<()> {
        self.check(&self.unauthenticated)
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, HubError> {
    let has_auth_header = request.headers().get("authorization").is_some();

    if has_auth_header {
        ctx.rate_limiter.check_authenticated()?;
    } else {
        ctx.rate_limiter.check_unauthenticated()?;
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(burst_size: u32) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            authenticated_rps: 10,
            unauthenticated_rps: 5,
            burst_size,
        }
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(&config(50));

        // Should allow first request
        assert!(limiter.check_authenticated().is_ok());
        assert!(limiter.check_unauthenticated().is_ok());
    }

    #[test]
    fn test_burst_limit() {
        let limiter = RateLimiter::new(&config(5));

        // Should allow burst requests
        for _ in 0..5 {
            assert!(limiter.check_authenticated().is_ok());
        }

        // Should hit rate limit after burst
        assert!(matches!(
            limiter.check_authenticated(),
            Err(HubError::RateLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_disabled_limiter_never_rejects() {
        let mut config = config(1);
        config.enabled = false;
        let limiter = RateLimiter::new(&config);

        for _ in 0..100 {
            assert!(limiter.check_unauthenticated().is_ok());
        }
    }
}
