use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, instrument};

/// Token bucket throttle for NCBI E-utilities
///
/// NCBI allows 3 requests per second without an API key and 10 with one.
/// Requests over the limit are answered with HTTP 429 and repeated
/// violations can get the caller's IP blocked.
#[derive(Clone)]
pub struct RateLimiter {
    bucket: Arc<Mutex<TokenBucket>>,
    rate: f64,
}

struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Take a token, or report how long until one is available
    fn try_take(&mut self) -> Option<Duration> {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            None
        } else {
            let missing = 1.0 - self.tokens;
            Some(Duration::from_secs_f64(missing / self.refill_rate))
        }
    }
}

impl RateLimiter {
    /// Create a limiter allowing `rate` requests per second
    ///
    /// ```
    /// use pubmed_paper_fetcher::rate_limit::RateLimiter;
    ///
    /// let limiter = RateLimiter::new(3.0);
    /// assert_eq!(limiter.rate(), 3.0);
    /// ```
    pub fn new(rate: f64) -> Self {
        let rate = if rate.is_finite() && rate > 0.0 {
            rate
        } else {
            1.0
        };
        let capacity = rate.max(1.0);

        Self {
            bucket: Arc::new(Mutex::new(TokenBucket {
                tokens: capacity,
                capacity,
                refill_rate: rate,
                last_refill: Instant::now(),
            })),
            rate,
        }
    }

    /// NCBI limit without an API key (3 requests/second)
    pub fn ncbi_default() -> Self {
        Self::new(3.0)
    }

    /// NCBI limit with an API key (10 requests/second)
    pub fn ncbi_with_key() -> Self {
        Self::new(10.0)
    }

    /// Wait until a request may be sent, then consume one token
    #[instrument(skip(self))]
    pub async fn acquire(&self) {
        loop {
            let wait = self.bucket.lock().await.try_take();
            match wait {
                None => return,
                Some(duration) => {
                    debug!(wait_ms = duration.as_millis() as u64, "Waiting for rate limit token");
                    sleep(duration).await;
                }
            }
        }
    }

    /// Configured requests per second
    pub fn rate(&self) -> f64 {
        self.rate
    }
}
