use once_cell::sync::Lazy;
use regex::RegexSet;
use url::Url;

const CACHE_PREFIX: &str = "propmap-";

/// Requests that must never be served from or written to a cache
static EXCLUDED: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"/rest/v1/",
        r"/auth/v1/",
        r"/functions/v1/",
        r"/storage/v1/object/sign/",
        r"/realtime/v1/",
        r"/_vercel/insights/",
        r"^https?://([a-z0-9-]+\.)*(google-analytics\.com|googletagmanager\.com|plausible\.io|posthog\.com|vercel-insights\.com)(:\d+)?/",
    ])
    .unwrap_or_else(|e| {
        log::error!("invalid cache exclusion pattern: {}", e);
        RegexSet::empty()
    })
});

static STATIC_ASSET: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"^/_next/static/",
        r"^/icons/",
        r"\.(js|css|png|jpe?g|svg|webp|ico|woff2?)$",
    ])
    .unwrap_or_else(|e| {
        log::error!("invalid static asset pattern: {}", e);
        RegexSet::empty()
    })
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Straight to the network, never cached
    Bypass,
    /// Serve from cache when present, else fetch and store
    CacheFirst,
    /// Fetch first, fall back to the cached copy when offline
    NetworkFirst,
}

/// Caching rules of the installable app shell
#[derive(Debug, Clone, PartialEq)]
pub struct OfflinePolicy {
    pub version: u32,
    /// Paths fetched and stored at install time
    pub precache: Vec<String>,
    pub offline_page: String,
    /// Entry bound of the dynamic runtime cache
    pub runtime_capacity: usize,
}

impl Default for OfflinePolicy {
    fn default() -> Self {
        Self {
            version: 1,
            precache: ["/", "/offline.html", "/manifest.json", "/icons/icon-192.png", "/icons/icon-512.png"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            offline_page: "/offline.html".to_string(),
            runtime_capacity: 100,
        }
    }
}

impl OfflinePolicy {
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn static_cache_name(&self) -> String {
        format!("{}static-v{}", CACHE_PREFIX, self.version)
    }

    pub fn dynamic_cache_name(&self) -> String {
        format!("{}dynamic-v{}", CACHE_PREFIX, self.version)
    }

    pub fn is_excluded(url: &str) -> bool {
        EXCLUDED.is_match(url)
    }

    pub fn is_precached(&self, path: &str) -> bool {
        self.precache.iter().any(|p| p == path)
    }

    /// How a request should be served
    pub fn decide(&self, method: &str, url: &str, is_navigation: bool) -> CacheDecision {
        if !method.eq_ignore_ascii_case("GET") {
            return CacheDecision::Bypass;
        }
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::debug!("not caching unparseable url {}: {}", url, e);
                return CacheDecision::Bypass;
            }
        };
        if !matches!(parsed.scheme(), "http" | "https") || Self::is_excluded(url) {
            return CacheDecision::Bypass;
        }
        if is_navigation {
            return CacheDecision::NetworkFirst;
        }
        let path = parsed.path();
        if self.is_precached(path) || STATIC_ASSET.is_match(path) {
            CacheDecision::CacheFirst
        } else {
            CacheDecision::NetworkFirst
        }
    }

    /// Caches left behind by older versions, to delete on activation
    pub fn stale_caches<S: AsRef<str>>(&self, existing: &[S]) -> Vec<String> {
        let current = [self.static_cache_name(), self.dynamic_cache_name()];
        existing
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| name.starts_with(CACHE_PREFIX) && !current.iter().any(|c| c == name))
            .map(str::to_string)
            .collect()
    }
}
