//! # Store Options
//!
//! Construction-time configuration. Every field has a default, so options can be built
//! in code (`StoreOptions { host: .., ..Default::default() }`) or deserialized from a
//! partial JSON object.

use crate::adapter::Headers;
use serde::Deserialize;

/// Media type sent with every request unless the caller overrides `Content-Type`.
pub const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Host prefixed to every resource path unless a resource sets its own. A trailing
    /// slash is dropped when URLs are built.
    pub host: String,
    /// Extra request headers, layered over the JSON:API defaults.
    pub headers: Headers,
    /// Maximum nesting of fetches triggered by relationship resolution.
    pub max_resolution_depth: usize,
    /// Run the integrity checker on every fetched entity and attach its diagnostics as
    /// warnings.
    pub check_integrity: bool,
    /// Capacity of the identity cache's request channel.
    pub cache_buffer: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            host: "/".to_string(),
            headers: Headers::new(),
            max_resolution_depth: 32,
            check_integrity: false,
            cache_buffer: 32,
        }
    }
}

impl StoreOptions {
    /// Headers sent to the adapter: the defaults overridden by [`StoreOptions::headers`].
    pub fn request_headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), JSON_API_MEDIA_TYPE.to_string());
        headers.extend(self.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        headers
    }
}
