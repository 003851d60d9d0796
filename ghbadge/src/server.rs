// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! HTTP surface of the badge service.
//!
//! [`route`] maps requests onto [`BadgeService`] operations and [`serve`]
//! drives the hyper HTTP/1 accept loop until the shutdown future resolves.

use std::{convert::Infallible, future::Future, sync::Arc};

use bytes::Bytes;
use http_body_util::{BodyExt as _, Full, Limited};
use hyper::{
    Method, Request, Response, StatusCode,
    body::Body,
    header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, HeaderValue, ORIGIN},
    server::conn::http1,
    service::service_fn
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::{
    badge::{self, BadgeRequest, HTML_CONTENT_TYPE},
    cache::CacheStore,
    error::Error,
    github::ActivitySource,
    service::{BadgeService, Reply},
    template
};

/// Largest accepted form body for `POST /cache`.
const MAX_FORM_BYTES: usize = 4 * 1024;

/// Dispatches one request.
///
/// Routes:
///
/// * `GET /` - index page
/// * `GET /badge/<username>` - badge as HTML or JSONP
/// * `GET /cache` - hit and miss counters
/// * `POST /cache` - flush when the form or the query string carries `flush=1`
///
/// Anything else, including malformed usernames, receives the 404 page.
pub async fn route<C, S, B>(
    service: &BadgeService<C, S>,
    request: Request<B>
) -> Response<Full<Bytes>>
where
    C: CacheStore,
    S: ActivitySource,
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>
{
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    debug!("{} {}", method, request.uri());

    let reply = match (&method, path.as_str()) {
        (&Method::GET, "/") => Reply::ok(HTML_CONTENT_TYPE, template::index_page()),
        (&Method::GET, "/cache") => service.cache_report(),
        (&Method::POST, "/cache") => {
            let query = request.uri().query().map(str::to_owned);
            match read_flush_flag(query.as_deref(), request.into_body()).await {
                Ok(requested) => service.flush(requested),
                Err(reason) => {
                    warn!("Rejecting cache flush form: {}", reason);
                    Reply::empty(StatusCode::BAD_REQUEST)
                }
            }
        }
        (&Method::GET, other) => match other.strip_prefix("/badge/") {
            Some(username) if badge::is_valid_username(username) => {
                let has_origin = request.headers().contains_key(ORIGIN);
                let badge_request = BadgeRequest::parse(
                    username,
                    request.uri().query(),
                    has_origin,
                    service.defaults()
                );
                service.badge(&badge_request).await
            }
            _ => Reply::not_found()
        },
        _ => Reply::not_found()
    };

    into_response(reply)
}

/// Accepts connections on `listener` until `shutdown` resolves.
///
/// Each connection is served on its own task. Accept failures are logged and
/// the loop keeps running.
///
/// # Errors
///
/// Currently never fails once the listener is bound; the signature leaves
/// room for fatal listener errors.
pub async fn serve<C, S, F>(
    listener: TcpListener,
    service: Arc<BadgeService<C, S>>,
    shutdown: F
) -> Result<(), Error>
where
    C: CacheStore + 'static,
    S: ActivitySource + 'static,
    F: Future<Output = ()>
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(connection) => connection,
                    Err(error) => {
                        warn!("Failed to accept connection: {}", error);
                        continue;
                    }
                };

                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    let handler = service_fn(move |request| {
                        let service = Arc::clone(&service);
                        async move { Ok::<_, Infallible>(route(&service, request).await) }
                    });

                    if let Err(error) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), handler)
                        .await
                    {
                        debug!("Connection from {} closed: {}", peer, Error::from(error));
                    }
                });
            }
            () = &mut shutdown => {
                info!("Shutdown requested, no longer accepting connections");
                return Ok(());
            }
        }
    }
}

fn into_response(reply: Reply) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(reply.body));
    *response.status_mut() = reply.status;

    let headers = response.headers_mut();
    if let Some(content_type) = reply.content_type {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    if reply.cors {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    }

    response
}

fn has_flush_flag(encoded: &[u8]) -> bool {
    url::form_urlencoded::parse(encoded).any(|(name, value)| name == "flush" && value == "1")
}

async fn read_flush_flag<B>(query: Option<&str>, body: B) -> Result<bool, String>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>
{
    let collected = Limited::new(body, MAX_FORM_BYTES)
        .collect()
        .await
        .map_err(|error| error.to_string())?
        .to_bytes();

    Ok(query.is_some_and(|query| has_flush_flag(query.as_bytes())) || has_flush_flag(&collected))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::{
        cache::MemoryCache,
        config::BadgeSettings,
        github::{Commit, Repository, UserProfile},
        stats::tests::{profile, repository}
    };

    struct StaticSource;

    impl ActivitySource for StaticSource {
        async fn user(&self, username: &str) -> Result<UserProfile, Error> {
            if username == "ghost" {
                return Err(Error::UserNotFound {
                    username: username.to_owned()
                });
            }
            Ok(profile(username, 1))
        }

        async fn repositories(&self, _username: &str) -> Result<Vec<Repository>, Error> {
            Ok(vec![repository("hello", false, Some("Rust"))])
        }

        async fn commits(
            &self,
            _repository: &Repository,
            _author: &str,
            _since: DateTime<Utc>
        ) -> Result<Vec<Commit>, Error> {
            Ok(Vec::new())
        }
    }

    fn service() -> BadgeService<MemoryCache, StaticSource> {
        BadgeService::new(
            Arc::new(MemoryCache::default()),
            StaticSource,
            &BadgeSettings::default()
        )
    }

    fn get(uri: &str) -> Request<Full<Bytes>> {
        Request::get(uri)
            .body(Full::new(Bytes::new()))
            .expect("valid request")
    }

    fn post_form(uri: &str, form: impl Into<Bytes>) -> Request<Full<Bytes>> {
        Request::post(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Full::new(form.into()))
            .expect("valid request")
    }

    async fn body_text(response: Response<Full<Bytes>>) -> String {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("infallible body")
            .to_bytes();
        String::from_utf8(bytes.to_vec()).expect("utf-8 body")
    }

    #[tokio::test]
    async fn index_page_is_served() {
        let response = route(&service(), get("/")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], HTML_CONTENT_TYPE);
        assert!(body_text(response).await.contains("GitHub Badge"));
    }

    #[tokio::test]
    async fn badge_route_renders_html() {
        let response = route(&service(), get("/badge/octocat")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert!(body_text(response).await.contains("octocat"));
    }

    #[tokio::test]
    async fn badge_route_serves_jsonp_with_cors() {
        let request = Request::get("/badge/octocat?callback=cb")
            .header(ORIGIN, "https://example.com")
            .body(Full::new(Bytes::new()))
            .expect("valid request");
        let response = route(&service(), request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            badge::JAVASCRIPT_CONTENT_TYPE
        );
        assert!(body_text(response).await.starts_with("cb("));
    }

    #[tokio::test]
    async fn unknown_user_and_routes_get_not_found_page() {
        let service = service();

        for uri in ["/badge/ghost", "/badge/bad_name", "/badge/", "/nope"] {
            let response = route(&service, get(uri)).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
            assert!(body_text(response).await.contains("could not be found"));
        }
    }

    #[tokio::test]
    async fn cache_report_counts_lookups() {
        let service = service();
        route(&service, get("/badge/octocat")).await;
        route(&service, get("/badge/octocat")).await;

        let body = body_text(route(&service, get("/cache")).await).await;
        assert!(body.starts_with("Cache Hits: 1\nCache Misses: 2\n"), "{body}");
    }

    #[tokio::test]
    async fn cache_flush_requires_flag() {
        let service = service();
        route(&service, get("/badge/octocat")).await;

        let untouched = route(&service, post_form("/cache", "flush=0")).await;
        assert_eq!(body_text(untouched).await, "Nothing to do.");

        let flushed = route(&service, post_form("/cache", "flush=1")).await;
        assert_eq!(flushed.status(), StatusCode::OK);
        assert_eq!(body_text(flushed).await, "2");
    }

    #[tokio::test]
    async fn cache_flush_accepts_query_string() {
        let service = service();
        route(&service, get("/badge/octocat")).await;

        let flushed = route(&service, post_form("/cache?flush=1", "")).await;
        assert_eq!(body_text(flushed).await, "2");

        let untouched = route(&service, post_form("/cache?flush=0", "")).await;
        assert_eq!(body_text(untouched).await, "Nothing to do.");
    }

    #[tokio::test]
    async fn oversized_flush_form_is_rejected() {
        let form = format!("flush=1&pad={}", "x".repeat(MAX_FORM_BYTES));
        let response = route(&service(), post_form("/cache", form)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
