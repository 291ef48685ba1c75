/*!
 * Per-engine rate limiting and backoff for limited (no-API) modes.
 *
 * Each engine id owns one throttle: a minimum inter-call interval, a
 * rolling calls-per-minute window, and a "slow mode" backoff entered after
 * a rate-limit failure. Slow mode self-heals after five minutes without
 * further errors. All of it hangs off an `OrchestratorState` instance that
 * callers inject into the service, rather than module-level globals, so
 * tests can run against isolated state and a paused clock.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use parking_lot::Mutex;
use tokio::time::{Instant, sleep};

use crate::errors::TranslationError;
use crate::registry::EngineId;

/// Slow mode expires after this long without a new error.
const SLOW_MODE_TTL: Duration = Duration::from_secs(300);

/// Penalty bounds applied when entering slow mode.
const SLOW_PENALTY_MIN_SEC: f64 = 2.0;
const SLOW_PENALTY_MAX_SEC: f64 = 30.0;

/// Ceiling for the generic (non-rate-limit) degradation penalty.
const GENERIC_PENALTY_MAX_SEC: f64 = 10.0;

/// Static pacing limits for one engine's limited mode.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Minimum spacing between calls while in slow mode
    pub min_interval: Duration,

    /// Call budget per rolling 60-second window (0 disables the window)
    pub max_calls_per_min: u32,

    /// Hard per-request character limit
    pub max_chars_per_request: usize,
}

/// Conservative limits tuned per engine; web-scrape endpoints get the
/// tightest pacing.
pub fn default_limits(engine_id: EngineId) -> RateLimitConfig {
    match engine_id {
        EngineId::Deepl | EngineId::YandexTranslate => RateLimitConfig {
            min_interval: Duration::from_secs_f64(4.0),
            max_calls_per_min: 10,
            max_chars_per_request: 800,
        },
        EngineId::GoogleTranslate => RateLimitConfig {
            min_interval: Duration::from_secs_f64(3.5),
            max_calls_per_min: 12,
            max_chars_per_request: 800,
        },
        _ => RateLimitConfig {
            min_interval: Duration::from_secs_f64(3.0),
            max_calls_per_min: 10,
            max_chars_per_request: 800,
        },
    }
}

/// Per-engine backoff bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct BackoffState {
    /// Extra delay applied to every slow-mode call, in seconds
    pub penalty_delay_sec: f64,

    /// When the last error was recorded
    pub last_error_at: Option<Instant>,

    /// Whether slow mode is active
    pub slow_mode: bool,

    /// When slow mode was first entered
    pub slow_since: Option<Instant>,

    /// Whether the current slow-mode activation was already surfaced
    pub notified: bool,
}

impl BackoffState {
    fn reset(&mut self) {
        *self = BackoffState::default();
    }
}

/// Pacing state machine for one engine. Pure with respect to time: every
/// transition takes an explicit `now`, the async sleeping lives in
/// `OrchestratorState`.
#[derive(Debug)]
struct Throttle {
    cfg: RateLimitConfig,
    backoff: BackoffState,
    last_call_at: Option<Instant>,
    window_started_at: Option<Instant>,
    window_calls: u32,
}

impl Throttle {
    fn new(cfg: RateLimitConfig) -> Self {
        Self {
            cfg,
            backoff: BackoffState::default(),
            last_call_at: None,
            window_started_at: None,
            window_calls: 0,
        }
    }

    fn check_length(&self, text_length: usize) -> Result<(), TranslationError> {
        if text_length > self.cfg.max_chars_per_request {
            return Err(TranslationError::TextTooLong {
                length: text_length,
                max: self.cfg.max_chars_per_request,
            });
        }
        Ok(())
    }

    /// Compute how long the next call must wait. In the fast path (no slow
    /// mode) this records the call time and returns zero.
    fn next_delay(&mut self, now: Instant) -> Duration {
        if self.backoff.slow_mode
            && self
                .backoff
                .last_error_at
                .is_some_and(|at| now.duration_since(at) > SLOW_MODE_TTL)
        {
            debug!("slow mode expired without new errors, clearing backoff");
            self.backoff.reset();
        }

        if !self.backoff.slow_mode {
            self.last_call_at = Some(now);
            return Duration::ZERO;
        }

        let mut wait = Duration::ZERO;

        if self.cfg.max_calls_per_min > 0 {
            match self.window_started_at {
                Some(start) if now.duration_since(start) >= Duration::from_secs(60) => {
                    self.window_started_at = Some(now);
                    self.window_calls = 0;
                }
                Some(start) if self.window_calls >= self.cfg.max_calls_per_min => {
                    let until_reset = Duration::from_secs(60) - now.duration_since(start);
                    wait += until_reset;
                    self.window_started_at = Some(now + until_reset);
                    self.window_calls = 0;
                }
                Some(_) => {}
                None => {
                    self.window_started_at = Some(now);
                    self.window_calls = 0;
                }
            }
        }

        if let Some(last) = self.last_call_at {
            let since_last = now.duration_since(last);
            if since_last < self.cfg.min_interval {
                wait += self.cfg.min_interval - since_last;
            }
        }

        wait += Duration::from_secs_f64(self.backoff.penalty_delay_sec.max(0.0));
        wait
    }

    fn record_call(&mut self, now: Instant) {
        self.last_call_at = Some(now);
        if self.backoff.slow_mode {
            self.window_calls += 1;
        }
    }
}

/// Process-wide mutable orchestration state: one throttle and backoff
/// record per engine id, created lazily and kept for the process lifetime.
///
/// Shared between the translation service and engine adapters; every field
/// is mutex-guarded so concurrent callers only contend, never corrupt.
#[derive(Debug, Default)]
pub struct OrchestratorState {
    throttles: Mutex<HashMap<EngineId, Arc<Mutex<Throttle>>>>,
}

impl OrchestratorState {
    /// Fresh state with default limits for every engine.
    pub fn new() -> Self {
        Self::default()
    }

    fn throttle(&self, engine_id: EngineId) -> Arc<Mutex<Throttle>> {
        let mut map = self.throttles.lock();
        map.entry(engine_id)
            .or_insert_with(|| Arc::new(Mutex::new(Throttle::new(default_limits(engine_id)))))
            .clone()
    }

    /// Replace the pacing limits for one engine. Existing backoff state is
    /// kept.
    pub fn configure_limits(&self, engine_id: EngineId, cfg: RateLimitConfig) {
        let entry = self.throttle(engine_id);
        entry.lock().cfg = cfg;
    }

    /// Gate one limited-mode call. Fails fast with `TextTooLong`, returns
    /// immediately outside slow mode, otherwise sleeps out the rolling
    /// window, the inter-call interval and the current penalty before
    /// recording the call.
    pub async fn wait_or_raise(
        &self,
        engine_id: EngineId,
        text_length: usize,
    ) -> Result<(), TranslationError> {
        let entry = self.throttle(engine_id);
        let wait = {
            let mut throttle = entry.lock();
            throttle.check_length(text_length)?;
            let delay = throttle.next_delay(Instant::now());
            if delay.is_zero() && !throttle.backoff.slow_mode {
                return Ok(());
            }
            delay
        };

        if !wait.is_zero() {
            debug!("{}: pacing limited-mode call, sleeping {:?}", engine_id, wait);
            sleep(wait).await;
        }
        entry.lock().record_call(Instant::now());
        Ok(())
    }

    /// Enter slow mode after a rate-limit signal. Idempotent while already
    /// slow; a fresh transition re-arms the one-shot notice.
    pub fn activate_slow_mode(&self, engine_id: EngineId, reason: &str) {
        let entry = self.throttle(engine_id);
        let mut throttle = entry.lock();
        let backoff = &mut throttle.backoff;
        let was_slow = backoff.slow_mode;
        let now = Instant::now();

        backoff.last_error_at = Some(now);
        backoff.slow_since.get_or_insert(now);
        backoff.slow_mode = true;
        backoff.penalty_delay_sec = backoff
            .penalty_delay_sec
            .clamp(SLOW_PENALTY_MIN_SEC, SLOW_PENALTY_MAX_SEC);
        if !was_slow {
            backoff.notified = false;
            warn!("{}: entering slow mode ({})", engine_id, reason);
        }
    }

    /// Record an engine failure. Rate-limit conditions (HTTP 429/403 or a
    /// "rate limit" message) activate slow mode; anything else bumps the
    /// generic penalty by one second up to a ceiling.
    pub fn register_backoff_failure(
        &self,
        engine_id: EngineId,
        status_code: Option<u16>,
        message: &str,
    ) {
        let is_rate_limit = matches!(status_code, Some(429) | Some(403))
            || message.to_lowercase().contains("rate limit");
        if is_rate_limit {
            self.activate_slow_mode(engine_id, message);
            return;
        }

        let entry = self.throttle(engine_id);
        let mut throttle = entry.lock();
        throttle.backoff.penalty_delay_sec =
            (throttle.backoff.penalty_delay_sec + 1.0).min(GENERIC_PENALTY_MAX_SEC);
        throttle.backoff.last_error_at = Some(Instant::now());
    }

    /// True exactly once per slow-mode activation, for user-facing
    /// notification; a no-op otherwise.
    pub fn consume_slow_mode_notice(&self, engine_id: EngineId) -> bool {
        let entry = self.throttle(engine_id);
        let mut throttle = entry.lock();
        if throttle.backoff.slow_mode && !throttle.backoff.notified {
            throttle.backoff.notified = true;
            return true;
        }
        false
    }

    /// Whether the engine is currently in slow mode.
    pub fn is_slow_mode(&self, engine_id: EngineId) -> bool {
        self.throttle(engine_id).lock().backoff.slow_mode
    }

    /// Current penalty delay for the engine.
    pub fn penalty_delay(&self, engine_id: EngineId) -> Duration {
        let secs = self.throttle(engine_id).lock().backoff.penalty_delay_sec;
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Snapshot of the engine's backoff record.
    pub fn backoff_snapshot(&self, engine_id: EngineId) -> BackoffState {
        self.throttle(engine_id).lock().backoff.clone()
    }
}
