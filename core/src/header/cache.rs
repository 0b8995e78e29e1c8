use super::WaterfallHeader;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

pub const DEFAULT_HEADER_TTL: Duration = Duration::from_secs(5 * 60);

/// Monotonic time source for cache freshness checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic tests.
#[cfg(test)]
pub struct FakeClock {
    origin: Instant,
    elapsed: std::sync::Mutex<Duration>,
}

#[cfg(test)]
impl FakeClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: std::sync::Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut elapsed) = self.elapsed.lock() {
            *elapsed += by;
        }
    }
}

#[cfg(test)]
impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl Clock for FakeClock {
    fn now(&self) -> Instant {
        let elapsed = self.elapsed.lock().map(|e| *e).unwrap_or_default();
        self.origin + elapsed
    }
}

struct CachedHeader {
    header: Arc<WaterfallHeader>,
    fetched_at: Instant,
}

/// Station URL → header, one entry per URL. Entries are replaced wholesale on
/// `put` (last write wins) and are never served once `ttl` has elapsed. There
/// is no background sweep; staleness is checked lazily on `get`.
pub struct HeaderCache {
    entries: RwLock<HashMap<String, CachedHeader>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl HeaderCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self::new(ttl, Arc::new(SystemClock))
    }

    pub fn get(&self, station_url: &str) -> Option<Arc<WaterfallHeader>> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(station_url)?;
        let age = self.clock.now().saturating_duration_since(entry.fetched_at);
        (age < self.ttl).then(|| entry.header.clone())
    }

    pub fn put(&self, station_url: &str, header: WaterfallHeader) -> Arc<WaterfallHeader> {
        let header = Arc::new(header);
        let entry = CachedHeader {
            header: header.clone(),
            fetched_at: self.clock.now(),
        };
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(station_url.to_string(), entry);
        }
        header
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HeaderCache {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_HEADER_TTL)
    }
}
