//! Request classification.
//!
//! Decides whether an intercepted request is handled by the worker at all and,
//! if so, which freshness policy applies.

use std::sync::LazyLock;

use dxquiz_client::is_same_origin;
use dxquiz_core::Request;
use regex::Regex;
use url::Url;

static IMAGE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(png|jpe?g|webp|svg)$").expect("image pattern is valid"));

const ASSET_SUFFIXES: &[&str] = &[".js", ".css", ".json", ".html"];

/// Kind of an intercepted same-origin resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Binary media, served cache-first.
    Image,
    /// Markup, script, style or data, served network-first.
    Asset,
}

/// Why a request was left to the default network path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReason {
    CrossOrigin,
    NotGet,
    Unclassified,
}

/// Routing decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Intercept(ResourceKind),
    PassThrough(PassReason),
}

/// Classify a URL pathname. Query strings are not part of the pathname.
pub fn classify(path: &str) -> Option<ResourceKind> {
    if IMAGE_PATH.is_match(path) {
        return Some(ResourceKind::Image);
    }
    // "/" also ends with '/', so directory-style navigations and the root share one check
    if path.ends_with('/') || ASSET_SUFFIXES.iter().any(|suffix| path.ends_with(suffix)) {
        return Some(ResourceKind::Asset);
    }
    None
}

/// Route `request` for a worker whose scope lives at `origin`.
pub fn route(request: &Request, origin: &Url) -> Route {
    if !is_same_origin(request.url(), origin) {
        return Route::PassThrough(PassReason::CrossOrigin);
    }
    if !request.is_get() {
        return Route::PassThrough(PassReason::NotGet);
    }
    match classify(request.url().path()) {
        Some(kind) => Route::Intercept(kind),
        None => Route::PassThrough(PassReason::Unclassified),
    }
}
