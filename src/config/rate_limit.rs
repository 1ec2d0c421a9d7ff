use std::sync::Arc;

use governor::middleware::NoOpMiddleware;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;

/// Rate limit configuration for the API.
///
/// Two tiers: a general per-IP limit across the API, and a stricter limit
/// for the unauthenticated auth endpoints.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Requests per second for general endpoints
    pub general_per_second: u64,
    /// Burst size for general endpoints
    pub general_burst_size: u32,
    /// Requests per second for auth endpoints (stricter)
    pub auth_per_second: u64,
    /// Burst size for auth endpoints (stricter)
    pub auth_burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            general_per_second: 2,
            general_burst_size: 30,
            auth_per_second: 1,
            auth_burst_size: 5,
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            general_per_second: std::env::var("RATE_LIMIT_GENERAL_PER_SECOND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.general_per_second),
            general_burst_size: std::env::var("RATE_LIMIT_GENERAL_BURST_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.general_burst_size),
            auth_per_second: std::env::var("RATE_LIMIT_AUTH_PER_SECOND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.auth_per_second),
            auth_burst_size: std::env::var("RATE_LIMIT_AUTH_BURST_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.auth_burst_size),
        }
    }

    /// Layer limiting general API endpoints by peer IP.
    pub fn general_layer(&self) -> GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware, axum::body::Body> {
        let config = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(self.general_per_second)
                .burst_size(self.general_burst_size)
                .key_extractor(PeerIpKeyExtractor)
                .finish()
                .expect("Failed to build general rate limiter config"),
        );
        GovernorLayer::new(config)
    }

    /// Stricter layer for login/refresh, limiting brute force by peer IP.
    pub fn auth_layer(&self) -> GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware, axum::body::Body> {
        let config = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(self.auth_per_second)
                .burst_size(self.auth_burst_size)
                .key_extractor(PeerIpKeyExtractor)
                .finish()
                .expect("Failed to build auth rate limiter config"),
        );
        GovernorLayer::new(config)
    }
}
