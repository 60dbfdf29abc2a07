//! Per-domain rate limiting.
//!
//! Tracks the last request time for each domain and awaits the configured
//! delay before the next request to the same domain. Domains never block
//! each other. State is owned by the limiter instance, so independent crawls
//! can run with independent throttling policies.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;
use url::Url;

/// Delay policy: a fixed duration, or a closure evaluated on every check so
/// the policy can change over time (time-of-day throttling and the like).
#[derive(Clone)]
pub enum Delay {
    Fixed(Duration),
    Dynamic(Arc<dyn Fn() -> Duration + Send + Sync>),
}

impl Delay {
    /// Resolve the policy to a concrete duration for this check.
    pub fn current(&self) -> Duration {
        match self {
            Delay::Fixed(d) => *d,
            Delay::Dynamic(f) => f(),
        }
    }
}

impl From<Duration> for Delay {
    fn from(d: Duration) -> Self {
        Delay::Fixed(d)
    }
}

impl fmt::Debug for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delay::Fixed(d) => f.debug_tuple("Fixed").field(d).finish(),
            Delay::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Default delay between requests to one domain.
const DEFAULT_DELAY: Duration = Duration::from_secs(5);

/// Rate limiter keyed on a URL's host (plus `:port` when explicit).
///
/// All URLs sharing a domain share one clock; there is no per-path
/// granularity, no jitter, and no wait cap. Intended for use from the single
/// orchestration task.
#[derive(Debug)]
pub struct DomainRateLimiter {
    delay: Delay,
    last_request: HashMap<String, Instant>,
}

impl DomainRateLimiter {
    pub fn new(delay: impl Into<Delay>) -> Self {
        Self {
            delay: delay.into(),
            last_request: HashMap::new(),
        }
    }

    /// Extract the rate-limit key from a URL: host, plus `:port` when the
    /// URL carries an explicit non-default port.
    pub fn rate_limit_key(url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        Some(match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }

    /// Await until the domain's delay has elapsed since its last request.
    ///
    /// A domain with no recorded request is ready immediately; the map is
    /// only written by [`record`](Self::record).
    pub async fn wait_if_needed(&self, domain: &str) {
        let wait = self.time_until_ready(domain);
        if wait > Duration::ZERO {
            debug!("rate limiting {}: waiting {:?}", domain, wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Stamp "now" as the domain's last request time.
    pub fn record(&mut self, domain: &str) {
        self.last_request.insert(domain.to_string(), Instant::now());
    }

    /// Throttle a request to `url`: wait out the domain's delay, then stamp.
    ///
    /// URLs without a parseable host are never throttled.
    pub async fn limit(&mut self, url: &str) {
        let Some(domain) = Self::rate_limit_key(url) else {
            return;
        };
        self.wait_if_needed(&domain).await;
        self.record(&domain);
    }

    fn time_until_ready(&self, domain: &str) -> Duration {
        match self.last_request.get(domain) {
            Some(last) => {
                let delay = self.delay.current();
                let elapsed = last.elapsed();
                if elapsed >= delay {
                    Duration::ZERO
                } else {
                    delay - elapsed
                }
            }
            None => Duration::ZERO,
        }
    }
}

impl Default for DomainRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}
