//! Configuration system for pipeline timing, caching and backend access
//!
//! Tuning knobs are grouped into a hierarchical [`PipelineOptions`] that can be
//! produced from a preset [`PipelineProfile`] or built by hand. Backend access
//! settings come from the environment through [`BackendConfig`].

use crate::core::constants::*;
use crate::{MapError, Result};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineProfile {
    Balanced,
    /// Slower devices: frame-rate adaptive debounce and a smaller cache
    LowPower,
    /// Fast devices on good networks: shorter debounce, larger cache
    Responsive,
    Custom(PipelineOptions),
}

impl PipelineProfile {
    pub fn resolve(&self) -> PipelineOptions {
        match self {
            Self::Balanced => PipelineOptions {
                fetch: FetchConfig::default(),
                debounce: DebounceConfig::default(),
                adaptive: AdaptiveDebounceConfig::default(),
                cache: CacheConfig::default(),
            },
            Self::LowPower => PipelineOptions {
                fetch: FetchConfig::default(),
                debounce: DebounceConfig {
                    strategy: DebounceStrategy::Adaptive,
                    bounds_delay_ms: 500,
                },
                adaptive: AdaptiveDebounceConfig::default(),
                cache: CacheConfig { capacity: 128 },
            },
            Self::Responsive => PipelineOptions {
                fetch: FetchConfig {
                    retry_delay_ms: 500,
                    ..FetchConfig::default()
                },
                debounce: DebounceConfig {
                    strategy: DebounceStrategy::Fixed,
                    bounds_delay_ms: 150,
                },
                adaptive: AdaptiveDebounceConfig::default(),
                cache: CacheConfig { capacity: 512 },
            },
            Self::Custom(options) => options.clone(),
        }
    }
}

impl Default for PipelineProfile {
    fn default() -> Self {
        Self::Balanced
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub fetch: FetchConfig,
    pub debounce: DebounceConfig,
    pub adaptive: AdaptiveDebounceConfig,
    pub cache: CacheConfig,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineProfile::default().resolve()
    }
}

/// Freshness, retention and retry policy of the remote data fetcher
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// How long a result is served without refetching
    pub stale_time_ms: u64,
    /// How long an unused result is retained before eviction
    pub gc_time_ms: u64,
    /// Retries after the first failed attempt
    pub retry: u32,
    pub retry_delay_ms: u64,
    pub exponential_backoff: bool,
    /// Regaining window focus never triggers a refetch when false
    pub refetch_on_window_focus: bool,
}

impl FetchConfig {
    pub fn stale_time(&self) -> Duration {
        Duration::from_millis(self.stale_time_ms)
    }

    pub fn gc_time(&self) -> Duration {
        Duration::from_millis(self.gc_time_ms)
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let base = self.retry_delay_ms;
        let delay = if self.exponential_backoff {
            base.saturating_mul(1u64 << attempt.saturating_sub(1).min(16))
        } else {
            base
        };
        Duration::from_millis(delay.min(MAX_RETRY_DELAY_MS))
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            stale_time_ms: DEFAULT_STALE_TIME_MS,
            gc_time_ms: DEFAULT_GC_TIME_MS,
            retry: DEFAULT_FETCH_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            exponential_backoff: true,
            refetch_on_window_focus: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceStrategy {
    /// Fixed quiet period for viewport bounds
    Fixed,
    /// Quiet period chosen from the measured frame rate
    Adaptive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DebounceConfig {
    pub strategy: DebounceStrategy,
    pub bounds_delay_ms: u64,
}

impl DebounceConfig {
    pub fn bounds_delay(&self) -> Duration {
        Duration::from_millis(self.bounds_delay_ms)
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            strategy: DebounceStrategy::Fixed,
            bounds_delay_ms: DEFAULT_BOUNDS_DEBOUNCE_MS,
        }
    }
}

/// A frame-rate threshold and the debounce delay used at or above it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayTier {
    pub min_fps: f64,
    pub delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveDebounceConfig {
    /// Frame durations per measurement window
    pub window: usize,
    pub initial_delay_ms: u64,
    /// Checked in order; the first tier whose `min_fps` is met wins
    pub tiers: Vec<DelayTier>,
    /// Used when no tier matches
    pub fallback_delay_ms: u64,
}

impl AdaptiveDebounceConfig {
    pub fn select_delay(&self, fps: f64) -> Duration {
        let delay_ms = self
            .tiers
            .iter()
            .find(|tier| fps >= tier.min_fps)
            .map(|tier| tier.delay_ms)
            .unwrap_or(self.fallback_delay_ms);
        Duration::from_millis(delay_ms)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

impl Default for AdaptiveDebounceConfig {
    fn default() -> Self {
        Self {
            window: FRAME_WINDOW,
            initial_delay_ms: DEFAULT_ADAPTIVE_DELAY_MS,
            tiers: vec![
                DelayTier {
                    min_fps: 50.0,
                    delay_ms: 200,
                },
                DelayTier {
                    min_fps: 30.0,
                    delay_ms: 400,
                },
            ],
            fallback_delay_ms: 800,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Upper bound on distinct query keys held at once
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Hosted backend access settings
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
    /// Only present server-side; never exposed through public config
    pub service_role_key: Option<String>,
    pub map_token: Option<String>,
    pub cron_secret: Option<String>,
    pub port: u16,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            service_role_key: None,
            map_token: None,
            cron_secret: None,
            port: 8787,
        }
    }

    /// Loads settings from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| MapError::Config(format!("environment variable {key} is not set")))
        };
        let optional = |key: &str| -> Option<String> {
            let value = lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
            if value.is_none() {
                log::debug!("{key} not set");
            }
            value
        };

        let url = required("SUPABASE_URL")?;
        url::Url::parse(&url)
            .map_err(|e| MapError::Config(format!("invalid SUPABASE_URL '{url}': {e}")))?;

        let port = match optional("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| MapError::Config(format!("invalid PORT value '{raw}': {e}")))?,
            None => {
                log::info!("PORT not set, using default: 8787");
                8787
            }
        };

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key: required("SUPABASE_ANON_KEY")?,
            service_role_key: optional("SUPABASE_SERVICE_ROLE_KEY"),
            map_token: optional("MAPBOX_PUBLIC_TOKEN"),
            cron_secret: optional("CRON_SECRET"),
            port,
        })
    }
}
