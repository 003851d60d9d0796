// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Badge request parameters and output rendering.
//!
//! A badge is rendered either as a minified HTML card or, when a JSONP
//! callback is supplied, as a `callback(json)` script carrying the same
//! values. Both renderings are deterministic for a given [`UserStats`] and
//! [`BadgeRequest`], which is what makes the render cache sound.

use std::{
    fmt::Write as _,
    sync::LazyLock
};

use regex::Regex;
use serde::Serialize;

use crate::{
    cache::render_key,
    error::Error,
    sparkline::{self, SparklineOptions},
    stats::{RECENT_DAYS, UserStats},
    template::{escape_html, minify_html, shortnum, smart_truncate}
};

/// Content type of HTML badges and error pages.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Content type of JSONP badges.
pub const JAVASCRIPT_CONTENT_TYPE: &str = "application/javascript; charset=utf-8";

static USERNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9-]{1,39}$").expect("valid username pattern")
});

static CALLBACK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*$")
        .expect("valid callback pattern")
});

/// Returns `true` when `username` is a syntactically valid GitHub login.
pub fn is_valid_username(username: &str) -> bool {
    USERNAME_PATTERN.is_match(username)
}

/// Returns `true` when `callback` is a dotted JavaScript identifier path.
pub fn is_valid_callback(callback: &str) -> bool {
    CALLBACK_PATTERN.is_match(callback)
}

/// Values used for flags that the request leaves out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeDefaults {
    /// Show the support link.
    pub support:   bool,
    /// Embed the analytics snippet.
    pub analytics: bool
}

impl Default for BadgeDefaults {
    fn default() -> Self {
        Self {
            support:   true,
            analytics: true
        }
    }
}

/// Parameters of a single badge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeRequest {
    pub username:  String,
    pub support:   bool,
    pub analytics: bool,
    pub callback:  Option<String>,
    /// Whether the response carries `Access-Control-Allow-Origin: *`.
    pub cors:      bool
}

impl BadgeRequest {
    /// Builds a request from the raw query string.
    ///
    /// `s` and `a` are `false` only when equal to `"0"`, `true` for any
    /// other value, and fall back to `defaults` when absent. The first
    /// occurrence of a repeated parameter wins. An empty `callback` counts as
    /// absent.
    ///
    /// # Example
    ///
    /// ```
    /// use ghbadge::{BadgeDefaults, BadgeRequest};
    ///
    /// let request =
    ///     BadgeRequest::parse("octocat", Some("s=0&callback=show"), false, &BadgeDefaults::default());
    /// assert!(!request.support);
    /// assert!(request.analytics);
    /// assert_eq!(request.callback.as_deref(), Some("show"));
    /// ```
    pub fn parse(
        username: &str,
        query: Option<&str>,
        has_origin: bool,
        defaults: &BadgeDefaults
    ) -> Self {
        let lookup = |name: &str| -> Option<String> {
            query.and_then(|raw| {
                url::form_urlencoded::parse(raw.as_bytes())
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| value.into_owned())
            })
        };

        Self {
            username:  username.to_owned(),
            support:   parse_flag(lookup("s").as_deref(), defaults.support),
            analytics: parse_flag(lookup("a").as_deref(), defaults.analytics),
            callback:  lookup("callback").filter(|value| !value.is_empty()),
            cors:      has_origin
        }
    }

    /// Render-cache key covering every parameter that affects the body.
    pub fn cache_key(&self) -> String {
        render_key(
            &self.username,
            self.support,
            self.analytics,
            self.callback.as_deref()
        )
    }

    /// Content type of the rendered badge.
    pub fn content_type(&self) -> &'static str {
        if self.callback.is_some() {
            JAVASCRIPT_CONTENT_TYPE
        } else {
            HTML_CONTENT_TYPE
        }
    }
}

fn parse_flag(value: Option<&str>, default: bool) -> bool {
    match value {
        None => default,
        Some(value) => value != "0"
    }
}

/// View values shared by the HTML and JSONP renderings.
#[derive(Debug, Serialize)]
pub struct BadgeValues<'a> {
    #[serde(flatten)]
    pub stats:            &'a UserStats,
    /// `data:` URI of the commit sparkline.
    pub commit_sparkline: String,
    /// Length of the commit window in days.
    pub days:             u32
}

impl<'a> BadgeValues<'a> {
    /// Derives the view values, rendering the commit sparkline.
    pub fn new(stats: &'a UserStats) -> Self {
        let series = &stats.commit_counts_by_day;
        let image = sparkline::render(series, &SparklineOptions::impulse(series));

        Self {
            stats,
            commit_sparkline: sparkline::data_uri(&image),
            days: RECENT_DAYS
        }
    }
}

/// Renders the JSONP body `callback(json)`.
///
/// # Errors
///
/// Returns [`Error::Serialize`] if the values cannot be encoded.
pub fn render_jsonp(callback: &str, values: &BadgeValues<'_>) -> Result<String, Error> {
    let json = serde_json::to_string(values)?;
    Ok(format!("{callback}({json})"))
}

/// Renders the minified HTML badge.
///
/// The support link is included when `request.support` is set; the analytics
/// snippet when `request.analytics` is set and an `analytics_id` is known.
pub fn render_html(
    values: &BadgeValues<'_>,
    request: &BadgeRequest,
    analytics_id: Option<&str>
) -> String {
    let stats = values.stats;
    let login = escape_html(&stats.username);
    let profile_url = escape_html(&stats.profile_url);
    let display = stats.display_name.as_deref().unwrap_or(&stats.username);
    let display = escape_html(&smart_truncate(display, 24)).into_owned();
    let languages = stats
        .language_distribution
        .iter()
        .take(3)
        .map(|language| language.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let languages = escape_html(&smart_truncate(&languages, 32)).into_owned();

    let mut buffer = String::with_capacity(2048);
    let _ = write!(
        buffer,
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>{login} on GitHub</title>
    <style>
      body {{ margin: 0; font: 12px/1.4 sans-serif; color: #24292f; }}
      .badge {{ display: flex; gap: 8px; padding: 6px; border: 1px solid #d0d7de; border-radius: 6px; }}
      .summary span, .activity span {{ display: block; }}
    </style>
  </head>
  <body>
    <div class="badge">
      <a class="avatar" href="{profile_url}" target="_blank"><img src="{avatar}" width="48" height="48" alt="{login}"></a>
      <div class="summary">
        <a class="name" href="{profile_url}" target="_blank">{display}</a>
        <span class="repos">{own} repos, {forks} forks</span>
        <span class="followers">{followers} followers, {project_followers} project followers</span>
        <span class="languages">{languages}</span>
      </div>
      <div class="activity">
        <img class="sparkline" src="{sparkline}" alt="Commits over the last {days} days" title="Up to {max} commits a day over the last {days} days">
"#,
        avatar = escape_html(&stats.avatar_url),
        own = shortnum(i64::from(stats.own_repo_count)),
        forks = shortnum(i64::from(stats.fork_repo_count)),
        followers = shortnum(i64::from(stats.followers)),
        project_followers = shortnum(stats.follower_delta),
        sparkline = values.commit_sparkline,
        days = values.days,
        max = stats.max_daily_commits
    );

    if !stats.last_active_project.is_empty() {
        let project = escape_html(&stats.last_active_project);
        match stats.last_active_project_url.as_deref() {
            Some(url) => {
                let _ = writeln!(
                    buffer,
                    r#"        <span class="project">Last project: <a href="{}" target="_blank">{project}</a></span>"#,
                    escape_html(url)
                );
            }
            None => {
                let _ = writeln!(
                    buffer,
                    r#"        <span class="project">Last project: {project}</span>"#
                );
            }
        }
    }
    buffer.push_str("      </div>\n");

    if request.support {
        buffer.push_str(
            "      <a class=\"support\" href=\"/\" target=\"_blank\">Get your own badge</a>\n"
        );
    }
    buffer.push_str("    </div>\n");

    if let Some(id) = analytics_id.filter(|_| request.analytics) {
        let id = escape_html(id);
        let _ = writeln!(
            buffer,
            r#"    <script async src="https://www.googletagmanager.com/gtag/js?id={id}"></script>
    <script>
      window.dataLayer = window.dataLayer || [];
      function gtag() {{ dataLayer.push(arguments); }}
      gtag('js', new Date());
      gtag('config', '{id}');
    </script>"#
        );
    }
    buffer.push_str("  </body>\n</html>\n");

    minify_html(&buffer)
}
