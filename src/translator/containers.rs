/*!
 * Backend containers and the failover selection pool.
 *
 * A container is one named backend instance behind a translator — a
 * credential set, a proxy, a mirror endpoint. Failures are tracked per
 * container; a container that fails too often is blocked for a cooldown
 * window and the pool rotates to the longest-idle alternative.
 */

use std::collections::BTreeMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Default cooldown applied to a container that exceeds its failure limit.
pub const DEFAULT_BLOCK_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of consecutive failures before blocking.
pub const DEFAULT_MAX_FAILURES: u32 = 3;

/// One backend instance with its failure/blocking bookkeeping.
#[derive(Debug, Clone)]
pub struct TranslatorContainer {
    /// Container name, for logs and diagnostics
    pub name: String,

    /// Whether this is the primary container (restored as a last resort)
    pub is_primary: bool,

    /// Cooldown window applied once `max_failures` is reached
    pub block_timeout: Duration,

    /// Consecutive failures tolerated before blocking
    pub max_failures: u32,

    /// Consecutive failures since the last success
    pub fail_uses: u32,

    /// End of the current block, if any
    pub blocked_until: Option<Instant>,

    /// When this container last handled a call
    pub last_used_at: Option<Instant>,

    /// Free-form per-container data (credential overrides, proxy urls)
    pub extra: BTreeMap<String, String>,
}

impl TranslatorContainer {
    /// A non-primary container with default limits.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_primary: false,
            block_timeout: DEFAULT_BLOCK_TIMEOUT,
            max_failures: DEFAULT_MAX_FAILURES,
            fail_uses: 0,
            blocked_until: None,
            last_used_at: None,
            extra: BTreeMap::new(),
        }
    }

    /// The primary container with default limits.
    pub fn primary(name: impl Into<String>) -> Self {
        Self { is_primary: true, ..Self::new(name) }
    }

    /// Override the failure limit.
    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = max_failures.max(1);
        self
    }

    /// Override the cooldown window.
    pub fn with_block_timeout(mut self, block_timeout: Duration) -> Self {
        self.block_timeout = block_timeout;
        self
    }

    /// Attach a free-form key/value pair.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// True while the block window has not elapsed.
    pub fn is_blocked(&self) -> bool {
        self.blocked_until.is_some_and(|until| until > Instant::now())
    }

    /// Record a successful call: reset failures and clear any block.
    pub fn mark_success(&mut self) {
        self.fail_uses = 0;
        self.blocked_until = None;
        self.last_used_at = Some(Instant::now());
    }

    /// Record a failed call, blocking once the limit is reached.
    pub fn mark_failure(&mut self) {
        self.fail_uses += 1;
        self.last_used_at = Some(Instant::now());
        if self.fail_uses >= self.max_failures {
            self.blocked_until = Some(Instant::now() + self.block_timeout);
        }
    }

    /// Force-unblock and reset counters.
    pub fn restore(&mut self) {
        self.fail_uses = 0;
        self.blocked_until = None;
    }
}

/// Mutex-guarded container set owned by one translator.
#[derive(Debug)]
pub struct ContainerPool {
    slots: Mutex<Vec<TranslatorContainer>>,
}

impl ContainerPool {
    /// Build a pool; an empty list gets a single default primary named
    /// `fallback_name`.
    pub fn new(containers: Vec<TranslatorContainer>, fallback_name: &str) -> Self {
        let slots = if containers.is_empty() {
            vec![TranslatorContainer::primary(fallback_name)]
        } else {
            containers
        };
        Self { slots: Mutex::new(slots) }
    }

    /// Number of containers in the pool.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// True when the pool holds no containers. Never the case for pools
    /// built through `new`.
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Select the next container and stamp its `last_used_at`.
    ///
    /// Prefers the least-recently-used non-blocked container, strictly
    /// avoiding the one just used unless it is the only option. When every
    /// container is blocked and `prefer_primary` is set, the primary is
    /// force-restored as a last resort.
    pub fn select(&self, prefer_primary: bool, last_used: Option<usize>) -> Option<usize> {
        let mut slots = self.slots.lock();

        let mut available: Vec<usize> = (0..slots.len())
            .filter(|&i| !slots[i].is_blocked())
            .collect();

        if available.is_empty() && prefer_primary {
            if let Some(primary) = Self::primary_index(&slots) {
                slots[primary].restore();
                available = vec![primary];
            }
        }
        if available.is_empty() {
            return None;
        }

        available.sort_by_key(|&i| (last_used == Some(i), slots[i].last_used_at));
        let chosen = available[0];
        slots[chosen].last_used_at = Some(Instant::now());
        Some(chosen)
    }

    /// Clone of the container at `index` for use during a call.
    pub fn snapshot(&self, index: usize) -> TranslatorContainer {
        self.slots.lock()[index].clone()
    }

    /// Record a success on the container at `index`.
    pub fn mark_success(&self, index: usize) {
        self.slots.lock()[index].mark_success();
    }

    /// Record a failure on the container at `index`.
    pub fn mark_failure(&self, index: usize) {
        self.slots.lock()[index].mark_failure();
    }

    /// Snapshot of every container, for diagnostics and tests.
    pub fn containers(&self) -> Vec<TranslatorContainer> {
        self.slots.lock().clone()
    }

    fn primary_index(slots: &[TranslatorContainer]) -> Option<usize> {
        slots
            .iter()
            .position(|c| c.is_primary)
            .or_else(|| if slots.is_empty() { None } else { Some(0) })
    }
}
