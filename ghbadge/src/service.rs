// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Badge request handling on top of the two cache namespaces.
///
/// [`BadgeService`] answers from the render cache when it can, falls back to
/// the data cache, and only then asks the [`ActivitySource`]. Cache writes
/// that fail are logged and otherwise ignored.
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use hyper::StatusCode;
use tracing::{debug, error, info, warn};

use crate::{
    badge::{self, BadgeDefaults, BadgeRequest, BadgeValues, HTML_CONTENT_TYPE},
    cache::{CACHE_TTL, CacheStore, data_key},
    config::BadgeSettings,
    error::Error,
    github::ActivitySource,
    stats::{UserStats, fetch_user_stats},
    template,
};

/// Content type of the cache administration responses.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Response produced by the service, independent of the HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct Reply
{
    pub status:       StatusCode,
    pub content_type: Option<&'static str,>,
    /// Adds `Access-Control-Allow-Origin: *`.
    pub cors:         bool,
    pub body:         Bytes,
}

impl Reply
{
    /// Successful response with `body` of `content_type`.
    pub fn ok(content_type: &'static str, body: impl Into<Bytes,>,) -> Self
    {
        Self {
            status: StatusCode::OK, content_type: Some(content_type,), cors: false, body: body.into(),
        }
    }

    /// Rendered error page for unknown users and routes.
    pub fn not_found() -> Self
    {
        Self {
            status:       StatusCode::NOT_FOUND,
            content_type: Some(HTML_CONTENT_TYPE,),
            cors:         false,
            body:         Bytes::from(template::not_found_page(),),
        }
    }

    /// Bare status without a body.
    pub fn empty(status: StatusCode,) -> Self
    {
        Self {
            status, content_type: None, cors: false, body: Bytes::new(),
        }
    }

    /// Sets the CORS flag.
    pub fn with_cors(mut self, cors: bool,) -> Self
    {
        self.cors = cors;
        self
    }

    fn with_status(mut self, status: StatusCode,) -> Self
    {
        self.status = status;
        self
    }
}

/// Badge request handler with injected cache and data source.
pub struct BadgeService<C, S,>
{
    cache:        Arc<C,>,
    source:       S,
    defaults:     BadgeDefaults,
    analytics_id: Option<String,>,
}

impl<C, S,> BadgeService<C, S,>
where
    C: CacheStore,
    S: ActivitySource,
{
    /// Creates a handler over a shared `cache` and an activity `source`.
    ///
    /// Flag defaults and the analytics id are taken from `settings`.
    pub fn new(cache: Arc<C,>, source: S, settings: &BadgeSettings,) -> Self
    {
        Self {
            cache,
            source,
            defaults: settings.defaults(),
            analytics_id: settings.analytics_id.clone(),
        }
    }

    /// Flag defaults applied when parsing requests.
    pub fn defaults(&self,) -> &BadgeDefaults
    {
        &self.defaults
    }

    /// Shared cache handle.
    pub fn cache(&self,) -> &Arc<C,>
    {
        &self.cache
    }

    /// Serves one badge request.
    ///
    /// The render cache is consulted first. On a miss the statistics come
    /// from the data cache or, failing that, from the source. A missing user
    /// yields the 404 page and any other source failure an empty 500; neither
    /// writes to the cache.
    pub async fn badge(&self, request: &BadgeRequest,) -> Reply
    {
        if let Some(callback,) = request.callback.as_deref() {
            if !badge::is_valid_callback(callback,) {
                debug!("Rejecting invalid callback {:?} for {}", callback, request.username);
                return Reply::ok(TEXT_CONTENT_TYPE, "Invalid callback.",)
                    .with_status(StatusCode::BAD_REQUEST,)
                    .with_cors(request.cors,);
            }
        }

        let render_key = request.cache_key();
        if let Some(cached,) = self.cache.get(&render_key,) {
            return Reply::ok(request.content_type(), cached,).with_cors(request.cors,);
        }

        let stats = match self.load_stats(&request.username,).await {
            Ok(stats,) => stats,
            Err(error,) if error.is_not_found() => {
                info!("{}", error);
                return Reply::not_found().with_cors(request.cors,);
            }
            Err(error,) => {
                error!("Failed to build badge for {}: {}", request.username, error);
                return Reply::empty(StatusCode::INTERNAL_SERVER_ERROR,).with_cors(request.cors,);
            }
        };

        let body = match self.render(&stats, request,) {
            Ok(body,) => Bytes::from(body,),
            Err(error,) => {
                error!("Failed to render badge for {}: {}", request.username, error);
                return Reply::empty(StatusCode::INTERNAL_SERVER_ERROR,).with_cors(request.cors,);
            }
        };

        self.store(&render_key, body.clone(),);
        Reply::ok(request.content_type(), body,).with_cors(request.cors,)
    }

    /// Plain-text hit and miss counters.
    pub fn cache_report(&self,) -> Reply
    {
        let stats = self.cache.stats();
        Reply::ok(
            TEXT_CONTENT_TYPE,
            format!("Cache Hits: {}\nCache Misses: {}\n", stats.hits, stats.misses),
        )
    }

    /// Flushes the cache when `requested`, answering with the flushed count.
    pub fn flush(&self, requested: bool,) -> Reply
    {
        if !requested {
            return Reply::ok(TEXT_CONTENT_TYPE, "Nothing to do.",);
        }

        let flushed = self.cache.flush_all();
        info!("Flushed {} cache entries", flushed);
        Reply::ok(TEXT_CONTENT_TYPE, flushed.to_string(),)
    }

    async fn load_stats(&self, username: &str,) -> Result<UserStats, Error,>
    {
        let key = data_key(username,);
        if let Some(raw,) = self.cache.get(&key,) {
            match serde_json::from_slice::<UserStats,>(&raw,) {
                Ok(stats,) => return Ok(stats,),
                Err(error,) => warn!("Discarding undecodable cache entry {}: {}", key, error),
            }
        }

        let stats = fetch_user_stats(&self.source, username, Utc::now(),).await?;
        match serde_json::to_vec(&stats,) {
            Ok(json,) => self.store(&key, Bytes::from(json,),),
            Err(error,) => error!("Failed to encode stats for {}: {}", username, error),
        }

        Ok(stats,)
    }

    fn render(&self, stats: &UserStats, request: &BadgeRequest,) -> Result<String, Error,>
    {
        let values = BadgeValues::new(stats,);
        match request.callback.as_deref() {
            Some(callback,) => badge::render_jsonp(callback, &values,),
            None => Ok(badge::render_html(&values, request, self.analytics_id.as_deref(),),),
        }
    }

    fn store(&self, key: &str, value: Bytes,)
    {
        if let Err(error,) = self.cache.set(key, value, CACHE_TTL,) {
            error!("{}", error);
        }
    }
}
