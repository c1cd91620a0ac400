use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use serde_json::json;
use tracing::warn;

use crate::i18n::{message, DEFAULT_LANGUAGE};

/// Fixed-window request limiter keyed by client IP. Each protected route
/// group carries its own instance, so budgets never bleed across routes.
#[derive(Clone)]
pub struct RateLimit {
    max_requests: u32,
    window: Duration,
    hits: Arc<DashMap<String, Entry>>,
}

#[derive(Debug)]
struct Entry {
    requests: u32,
    window_start: Instant,
}

impl RateLimit {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: Arc::new(DashMap::new()),
        }
    }

    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Counts a hit for `key`. False once the key is over budget for the
    /// current window.
    fn try_acquire(&self, key: &str) -> bool {
        let mut entry = self.hits.entry(key.to_string()).or_insert_with(|| Entry {
            requests: 0,
            window_start: Instant::now(),
        });

        if entry.window_start.elapsed() > self.window {
            entry.requests = 0;
            entry.window_start = Instant::now();
        }

        if entry.requests >= self.max_requests {
            return false;
        }

        entry.requests += 1;
        true
    }

    fn exceeded_response(&self, language: &str) -> Response {
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": format!("Rate limit exceeded: {} per 1 minute", self.max_requests),
                "detail": message(language, "too_many_requests"),
            })),
        )
            .into_response()
    }
}

/// Middleware entry point, attached per route group with
/// `middleware::from_fn_with_state`.
pub async fn enforce(State(limit): State<RateLimit>, request: Request, next: Next) -> Response {
    let client_ip = request
        .headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    if !limit.try_acquire(&client_ip) {
        let language = request
            .headers()
            .get(axum::http::header::ACCEPT_LANGUAGE)
            .and_then(|h| h.to_str().ok())
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        warn!(client_ip = %client_ip, "rate limit exceeded");
        return limit.exceeded_response(&language);
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_budget_then_blocks() {
        let limit = RateLimit::per_minute(3);
        assert!(limit.try_acquire("1.2.3.4"));
        assert!(limit.try_acquire("1.2.3.4"));
        assert!(limit.try_acquire("1.2.3.4"));
        assert!(!limit.try_acquire("1.2.3.4"));
        assert!(!limit.try_acquire("1.2.3.4"));
    }

    #[test]
    fn budgets_are_per_client() {
        let limit = RateLimit::per_minute(1);
        assert!(limit.try_acquire("1.2.3.4"));
        assert!(!limit.try_acquire("1.2.3.4"));
        assert!(limit.try_acquire("5.6.7.8"));
    }

    #[test]
    fn window_expiry_resets_the_budget() {
        let limit = RateLimit::new(1, Duration::from_millis(20));
        assert!(limit.try_acquire("1.2.3.4"));
        assert!(!limit.try_acquire("1.2.3.4"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(limit.try_acquire("1.2.3.4"));
    }

    #[test]
    fn separate_instances_do_not_share_budgets() {
        let login = RateLimit::per_minute(1);
        let recovery = RateLimit::per_minute(1);
        assert!(login.try_acquire("1.2.3.4"));
        assert!(recovery.try_acquire("1.2.3.4"));
    }
}
