// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// GitHub data access for badge statistics.
///
/// Wraps the REST endpoints needed to summarize a user's activity behind the
/// [`ActivitySource`] trait so the badge pipeline can run against any source.
use std::future::Future;

use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::error::Error;

const PER_PAGE: u8 = 100;
const MAX_PAGES: u32 = 10;

/// Profile fields used by the badge.
#[derive(Debug, Clone, Serialize, Deserialize,)]
pub struct UserProfile
{
    pub login:        String,
    #[serde(default)]
    pub name:         Option<String,>,
    #[serde(default)]
    pub avatar_url:   String,
    #[serde(default)]
    pub html_url:     String,
    #[serde(default)]
    pub public_repos: u32,
    #[serde(default)]
    pub followers:    u32,
}

/// Repository owner as embedded in repository payloads.
#[derive(Debug, Clone, Serialize, Deserialize,)]
pub struct RepositoryOwner
{
    pub login: String,
}

/// Repository fields used by the badge.
#[derive(Debug, Clone, Serialize, Deserialize,)]
pub struct Repository
{
    pub name:           String,
    pub owner:          RepositoryOwner,
    #[serde(default)]
    pub html_url:       String,
    #[serde(default)]
    pub fork:           bool,
    #[serde(default)]
    pub language:       Option<String,>,
    #[serde(default)]
    pub watchers_count: u32,
    #[serde(default)]
    pub pushed_at:      Option<DateTime<Utc,>,>,
}

/// Single commit attributed to a repository.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct Commit
{
    /// Name of the repository the commit belongs to.
    pub repository:   String,
    /// Committer timestamp.
    pub committed_at: DateTime<Utc,>,
}

/// Upstream source of user, repository and commit data.
///
/// Implementations report a missing user as [`Error::UserNotFound`] and every
/// other failure as [`Error::Upstream`].
pub trait ActivitySource: Send + Sync
{
    /// Fetches the public profile of `username`.
    fn user(&self, username: &str,) -> impl Future<Output = Result<UserProfile, Error,>,> + Send;

    /// Lists repositories owned by `username`.
    fn repositories(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Vec<Repository,>, Error,>,> + Send;

    /// Lists commits authored by `author` in `repository` since `since`.
    fn commits(
        &self,
        repository: &Repository,
        author: &str,
        since: DateTime<Utc,>,
    ) -> impl Future<Output = Result<Vec<Commit,>, Error,>,> + Send;
}

#[derive(Debug, Deserialize,)]
struct CommitRecord
{
    commit: CommitDetail,
}

#[derive(Debug, Deserialize,)]
struct CommitDetail
{
    committer: Option<Signature,>,
    author:    Option<Signature,>,
}

#[derive(Debug, Deserialize,)]
struct Signature
{
    date: DateTime<Utc,>,
}

impl CommitRecord
{
    fn committed_at(&self,) -> Option<DateTime<Utc,>,>
    {
        self.commit.committer.as_ref().or(self.commit.author.as_ref(),).map(|signature| signature.date,)
    }
}

#[derive(Debug, Serialize,)]
struct PageQuery<'a,>
{
    per_page: u8,
    page:     u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    author:   Option<&'a str,>,
    #[serde(skip_serializing_if = "Option::is_none")]
    since:    Option<String,>,
}

/// [`ActivitySource`] backed by the GitHub REST API.
#[derive(Clone,)]
pub struct GitHubSource
{
    octocrab: Octocrab,
}

impl GitHubSource
{
    /// Builds a client, authenticated when `token` is provided.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an unusable `api_base` and
    /// [`Error::Upstream`] when the client cannot be initialized.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ghbadge::GitHubSource;
    ///
    /// # fn example() -> Result<(), ghbadge::Error> {
    /// let token = std::env::var("GITHUB_TOKEN",).ok();
    /// let source = GitHubSource::new(token.as_deref(), None,)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(token: Option<&str,>, api_base: Option<&str,>,) -> Result<Self, Error,>
    {
        let mut builder = Octocrab::builder();
        if let Some(token,) = token {
            builder = builder.personal_token(token,);
        }
        if let Some(base,) = api_base {
            builder = builder.base_uri(base,).map_err(|e| {
                Error::validation(format!("invalid GitHub API base '{base}': {e}"),)
            },)?;
        }

        let octocrab = builder
            .build()
            .map_err(|e| Error::upstream(format!("failed to initialize GitHub client: {e}"),),)?;

        Ok(Self {
            octocrab,
        },)
    }

    async fn paginate<T: DeserializeOwned,>(
        &self,
        route: &str,
        author: Option<&str,>,
        since: Option<DateTime<Utc,>,>,
    ) -> octocrab::Result<Vec<T,>,>
    {
        let mut items = Vec::new();

        for page in 1..=MAX_PAGES {
            let query = PageQuery {
                per_page: PER_PAGE,
                page,
                author,
                since: since.map(|value| value.to_rfc3339(),),
            };
            let batch: Vec<T,> = self.octocrab.get(route, Some(&query,),).await?;
            let exhausted = batch.len() < usize::from(PER_PAGE,);
            items.extend(batch,);

            if exhausted {
                break;
            }
        }

        Ok(items,)
    }
}

fn status_of(error: &octocrab::Error,) -> Option<u16,>
{
    match error {
        octocrab::Error::GitHub {
            source, ..
        } => Some(source.status_code.as_u16(),),
        _ => None,
    }
}

/// Renders an octocrab error with the HTTP status and GitHub's message, which
/// its `Display` implementation leaves out.
fn describe(error: &octocrab::Error,) -> String
{
    match error {
        octocrab::Error::GitHub {
            source, ..
        } => format!("GitHub returned {}: {}", source.status_code, source.message),
        other => other.to_string(),
    }
}

fn user_error(username: &str, what: &str, error: octocrab::Error,) -> Error
{
    if status_of(&error,) == Some(404,) {
        return Error::UserNotFound {
            username: username.to_owned(),
        };
    }

    Error::upstream(format!("failed to fetch {what} for {username}: {}", describe(&error,)),)
}

impl ActivitySource for GitHubSource
{
    async fn user(&self, username: &str,) -> Result<UserProfile, Error,>
    {
        debug!("Fetching profile for {}", username);

        self.octocrab
            .get(format!("/users/{username}"), None::<&(),>,)
            .await
            .map_err(|e| user_error(username, "profile", e,),)
    }

    async fn repositories(&self, username: &str,) -> Result<Vec<Repository,>, Error,>
    {
        debug!("Fetching repositories for {}", username);

        self.paginate(&format!("/users/{username}/repos"), None, None,)
            .await
            .map_err(|e| user_error(username, "repositories", e,),)
    }

    async fn commits(
        &self,
        repository: &Repository,
        author: &str,
        since: DateTime<Utc,>,
    ) -> Result<Vec<Commit,>, Error,>
    {
        let owner = repository.owner.login.as_str();
        let name = repository.name.as_str();
        debug!("Fetching commits by {} in {}/{}", author, owner, name);

        let records: Vec<CommitRecord,> = match self
            .paginate(&format!("/repos/{owner}/{name}/commits"), Some(author,), Some(since,),)
            .await
        {
            Ok(records,) => records,
            // empty repository
            Err(error,) if status_of(&error,) == Some(409,) => Vec::new(),
            Err(error,) => {
                return Err(Error::upstream(format!(
                    "failed to fetch commits for {owner}/{name}: {}",
                    describe(&error,)
                ),),);
            }
        };

        Ok(records
            .iter()
            .filter_map(|record| {
                record.committed_at().map(|committed_at| Commit {
                    repository: name.to_owned(),
                    committed_at,
                },)
            },)
            .collect(),)
    }
}
