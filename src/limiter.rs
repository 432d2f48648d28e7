use std::fmt;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Minimum spacing between calls to a quota-limited service. Free-tier
/// quotas sit around 10 requests/minute; 15s keeps a comfortable margin.
pub const MIN_INTERVAL: Duration = Duration::from_secs(15);

/// A category of external dependency sharing one rate-limit budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceClass {
    Description,
    Image,
}

impl fmt::Display for ServiceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceClass::Description => write!(f, "description"),
            ServiceClass::Image => write!(f, "image"),
        }
    }
}

/// In-process spacing between consecutive calls per service class.
///
/// One instance is shared by every pipeline in the process. Each class has
/// its own slot; the slot's lock is held across the wait so two concurrent
/// callers can never both observe a stale grant time.
pub struct RateLimiter {
    interval: Duration,
    description: Mutex<Option<Instant>>,
    image: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_interval(MIN_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            description: Mutex::new(None),
            image: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until at least the configured interval has elapsed since the
    /// previous grant for `class`, then records now as the new grant time.
    /// The first acquisition for a class proceeds immediately.
    pub async fn acquire(&self, class: ServiceClass) {
        let mut slot = self.slot(class).lock().await;
        if let Some(last) = *slot {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                let wait = self.interval - elapsed;
                debug!(
                    service = %class,
                    wait_secs = wait.as_secs_f64(),
                    "rate limiting: waiting before next call"
                );
                tokio::time::sleep(wait).await;
            }
        }
        *slot = Some(Instant::now());
    }

    fn slot(&self, class: ServiceClass) -> &Mutex<Option<Instant>> {
        match class {
            ServiceClass::Description => &self.description,
            ServiceClass::Image => &self.image,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
