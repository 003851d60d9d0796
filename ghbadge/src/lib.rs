//! Embeddable GitHub activity badges with a two-tier cache.
//!
//! The library fetches a user's profile, repositories and recent commits from
//! GitHub, condenses them into [`UserStats`] and renders either an HTML badge
//! with an inline sparkline or a JSONP payload. Computed statistics and final
//! responses are cached separately so that every parameter variant of a badge
//! shares a single upstream fetch per day.

mod badge;
mod cache;
mod config;
mod error;
mod github;
mod server;
mod service;
mod sparkline;
mod stats;
mod template;

pub use badge::{
    BadgeDefaults, BadgeRequest, BadgeValues, HTML_CONTENT_TYPE, JAVASCRIPT_CONTENT_TYPE,
    is_valid_callback, is_valid_username, render_html, render_jsonp,
};
pub use cache::{
    CACHE_TTL, CacheStats, CacheStore, DEFAULT_MAX_ENTRIES, DEFAULT_MAX_ITEM_BYTES, MemoryCache,
    data_key, render_key,
};
pub use config::{
    BadgeSettings, CacheSettings, DEFAULT_LISTEN, Settings, load_settings, parse_settings,
};
pub use error::{Error, io_error};
pub use github::{ActivitySource, Commit, GitHubSource, Repository, RepositoryOwner, UserProfile};
pub use server::{route, serve};
pub use service::{BadgeService, Reply, TEXT_CONTENT_TYPE};
pub use sparkline::{SparklineOptions, SparklineStyle, data_uri, render as render_sparkline};
pub use stats::{
    LanguageShare, RECENT_DAYS, UserStats, daily_commit_series, fetch_user_stats,
    language_distribution, most_active_repository, summarize, window_start,
};
pub use template::{escape_html, index_page, minify_html, not_found_page, shortnum, smart_truncate};
