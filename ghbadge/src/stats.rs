// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Derived activity statistics for a GitHub user.
///
/// Turns the raw profile, repository list and recent commits into the values
/// displayed on a badge. [`summarize`] is pure; [`fetch_user_stats`] drives an
/// [`ActivitySource`] to collect its inputs.
use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::Error,
    github::{ActivitySource, Commit, Repository, UserProfile},
};

/// Number of days covered by the commit series, today included.
pub const RECENT_DAYS: u32 = 10;

/// Share of repositories written in one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize,)]
pub struct LanguageShare
{
    pub name:  String,
    /// Fraction of language-tagged repositories, in `0.0..=1.0`.
    pub share: f64,
}

/// Everything a badge needs to know about a user.
///
/// The value is computed once per cache lifetime and stored as JSON in the
/// data namespace of the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize,)]
pub struct UserStats
{
    pub username:                String,
    pub display_name:            Option<String,>,
    pub avatar_url:              String,
    pub profile_url:             String,
    pub followers:               u32,
    pub public_repo_count:       u32,
    pub own_repo_count:          u32,
    pub fork_repo_count:         u32,
    pub language_distribution:   Vec<LanguageShare,>,
    pub follower_delta:          i64,
    /// Commits per day, oldest first, exactly [`RECENT_DAYS`] entries.
    pub commit_counts_by_day:    Vec<u32,>,
    pub max_daily_commits:       u32,
    pub last_active_project:     String,
    pub last_active_project_url: Option<String,>,
}

/// Returns the first day of the window ending on `today`.
pub fn window_start(today: NaiveDate,) -> NaiveDate
{
    today.checked_sub_days(Days::new(u64::from(RECENT_DAYS - 1,),),).unwrap_or(NaiveDate::MIN,)
}

/// Counts commits per day over the window ending on `today`.
///
/// Days without commits are filled with zero and commits outside the window
/// are ignored, so the result always has [`RECENT_DAYS`] entries in
/// chronological order.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use ghbadge::daily_commit_series;
///
/// let today = NaiveDate::from_ymd_opt(2024, 3, 10,).expect("valid date",);
/// let day = NaiveDate::from_ymd_opt(2024, 3, 8,).expect("valid date",);
/// let series = daily_commit_series([day, day, day,], today,);
/// assert_eq!(series, vec![0, 0, 0, 0, 0, 0, 0, 3, 0, 0]);
/// ```
pub fn daily_commit_series<I,>(dates: I, today: NaiveDate,) -> Vec<u32,>
where
    I: IntoIterator<Item = NaiveDate,>,
{
    let start = window_start(today,);
    let mut counts: BTreeMap<NaiveDate, u32,> = BTreeMap::new();
    for date in dates.into_iter().filter(|date| (start..=today).contains(date,),) {
        *counts.entry(date,).or_default() += 1;
    }

    start
        .iter_days()
        .take(RECENT_DAYS as usize,)
        .map(|day| counts.get(&day,).copied().unwrap_or_default(),)
        .collect()
}

/// Picks the repository with the most commits.
///
/// Ties go to the lexicographically smallest repository name. Returns `None`
/// when there are no commits.
pub fn most_active_repository<'a, I,>(repositories: I,) -> Option<&'a str,>
where
    I: IntoIterator<Item = &'a str,>,
{
    let mut counts: BTreeMap<&str, u32,> = BTreeMap::new();
    for name in repositories {
        *counts.entry(name,).or_default() += 1;
    }

    let mut best: Option<(&str, u32,),> = None;
    for (name, count,) in counts {
        if best.is_none_or(|(_, top,)| count > top,) {
            best = Some((name, count,),);
        }
    }

    best.map(|(name, _,)| name,)
}

/// Tallies repository languages, most common first.
pub fn language_distribution(repositories: &[Repository],) -> Vec<LanguageShare,>
{
    let mut counts: BTreeMap<&str, u32,> = BTreeMap::new();
    for language in repositories.iter().filter_map(|repository| repository.language.as_deref(),) {
        *counts.entry(language,).or_default() += 1;
    }

    let total: u32 = counts.values().sum();
    let mut ranked: Vec<(&str, u32,),> = counts.into_iter().collect();
    // stable sort keeps alphabetical order among equal counts
    ranked.sort_by(|a, b| b.1.cmp(&a.1,),);

    ranked
        .into_iter()
        .map(|(name, count,)| LanguageShare {
            name:  name.to_owned(),
            share: f64::from(count,) / f64::from(total,),
        },)
        .collect()
}

/// Computes [`UserStats`] from already fetched data.
///
/// `commits` may contain entries outside the window ending on `today`; they
/// are ignored for both the daily series and the most active project.
pub fn summarize(
    profile: &UserProfile,
    repositories: &[Repository],
    commits: &[Commit],
    today: NaiveDate,
) -> UserStats
{
    let start = window_start(today,);
    let recent: Vec<&Commit,> = commits
        .iter()
        .filter(|commit| (start..=today).contains(&commit.committed_at.date_naive(),),)
        .collect();

    let commit_counts_by_day =
        daily_commit_series(recent.iter().map(|commit| commit.committed_at.date_naive(),), today,);
    let max_daily_commits = commit_counts_by_day.iter().copied().max().unwrap_or_default();

    let last_active_project =
        most_active_repository(recent.iter().map(|commit| commit.repository.as_str(),),)
            .unwrap_or_default()
            .to_owned();
    let last_active_project_url = if last_active_project.is_empty() {
        None
    } else {
        repositories
            .iter()
            .find(|repository| repository.name == last_active_project,)
            .map(|repository| repository.html_url.clone(),)
    };

    let public_repo_count = profile.public_repos;
    let forks = repositories.iter().filter(|repository| repository.fork,).count();
    let fork_repo_count = u32::try_from(forks,).unwrap_or(u32::MAX,).min(public_repo_count,);
    let project_followers: i64 =
        repositories.iter().map(|repository| i64::from(repository.watchers_count,),).sum();

    UserStats {
        username: profile.login.clone(),
        display_name: profile.name.clone(),
        avatar_url: profile.avatar_url.clone(),
        profile_url: profile.html_url.clone(),
        followers: profile.followers,
        public_repo_count,
        own_repo_count: public_repo_count - fork_repo_count,
        fork_repo_count,
        language_distribution: language_distribution(repositories,),
        follower_delta: project_followers - i64::from(public_repo_count,),
        commit_counts_by_day,
        max_daily_commits,
        last_active_project,
        last_active_project_url,
    }
}

/// Fetches everything needed for `username` and summarizes it.
///
/// Repositories not pushed to since the window start are skipped. Requests
/// are issued sequentially.
///
/// # Errors
///
/// Returns [`Error::UserNotFound`] when the source does not know the user and
/// [`Error::Upstream`] for any other failure. No partial result is produced.
pub async fn fetch_user_stats<S,>(
    source: &S,
    username: &str,
    now: DateTime<Utc,>,
) -> Result<UserStats, Error,>
where
    S: ActivitySource,
{
    let profile = source.user(username,).await?;
    let repositories = source.repositories(username,).await?;

    let today = now.date_naive();
    let since = window_start(today,).and_time(NaiveTime::MIN,).and_utc();

    let mut commits = Vec::new();
    for repository in
        repositories.iter().filter(|repository| repository.pushed_at.is_none_or(|at| at >= since,),)
    {
        commits.extend(source.commits(repository, &profile.login, since,).await?,);
    }
    debug!("Collected {} recent commits for {}", commits.len(), username);

    let stats = summarize(&profile, &repositories, &commits, today,);
    info!(
        "Computed stats for {}: {} repositories, {} commits in {} days",
        username,
        repositories.len(),
        stats.commit_counts_by_day.iter().sum::<u32>(),
        RECENT_DAYS
    );

    Ok(stats,)
}
