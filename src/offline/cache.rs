use lru::LruCache;
use std::num::NonZeroUsize;

/// A response as stored by the shell caches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl ShellResponse {
    pub fn new(status: u16, content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    pub fn html(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, "text/html; charset=utf-8", body)
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Bounded URL -> response store
#[derive(Debug)]
pub struct RuntimeCache {
    name: String,
    entries: LruCache<String, ShellResponse>,
}

impl RuntimeCache {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name: name.into(),
            entries: LruCache::new(capacity),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fragments never reach the server, so they are not part of the key
    fn key(url: &str) -> &str {
        url.split('#').next().unwrap_or(url)
    }

    pub fn get(&mut self, url: &str) -> Option<ShellResponse> {
        self.entries.get(Self::key(url)).cloned()
    }

    /// Stores successful responses only; returns whether it was stored
    pub fn put(&mut self, url: &str, response: ShellResponse) -> bool {
        if !response.is_ok() {
            return false;
        }
        self.entries.put(Self::key(url).to_string(), response);
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains(Self::key(url))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
