//! Cursor-driven pagination over a user's followers or followings.
//!
//! Pages depend on the previous page's cursor, so they are fetched strictly in
//! sequence. Each page gets a timeout and a bounded number of retries. When a
//! page cannot be fetched the loop stops and hands back everything gathered so
//! far together with the error. It never spins on a failing page.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use thiserror::Error;

use super::client::ProfileSource;
use super::error::{SourceError, short_error_message};
use super::types::{END_CURSOR, MAX_PAGE_SIZE, PageRequest, START_CURSOR, UserPage};
use crate::codec::decode_source_user;
use crate::profile::{Profile, RelationKind};
use crate::retry::{RetryConfig, with_retry};
use crate::sync::{ProgressCallback, SyncProgress, emit};

/// Default per-page request timeout.
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Options for a paginated fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Page-size hint; clamped to `1..=MAX_PAGE_SIZE`.
    pub page_size: u32,
    /// Retry policy applied to each page independently.
    pub retry: RetryConfig,
    /// Upper bound on a single page request.
    pub page_timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            retry: RetryConfig::default(),
            page_timeout: DEFAULT_PAGE_TIMEOUT,
        }
    }
}

/// Why a paginated fetch stopped early.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A page kept failing, or failed with a non-retryable error.
    #[error("fetching {relation} of {username} failed at cursor {cursor} after {attempts} attempt(s): {source}")]
    PageFailed {
        username: String,
        relation: RelationKind,
        cursor: i64,
        attempts: u32,
        #[source]
        source: SourceError,
    },

    /// The source handed back a cursor that was already visited.
    #[error("source repeated cursor {cursor} while paging {relation} of {username}")]
    CursorCycle {
        username: String,
        relation: RelationKind,
        cursor: i64,
    },
}

impl FetchError {
    /// The relation being paged when the error occurred.
    pub fn relation(&self) -> RelationKind {
        match self {
            FetchError::PageFailed { relation, .. } | FetchError::CursorCycle { relation, .. } => {
                *relation
            }
        }
    }
}

/// Result of paging through one relation.
///
/// `profiles` holds every decoded user in source order, including those
/// gathered before an error stopped the loop.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub profiles: Vec<Profile>,
    /// Pages successfully fetched.
    pub pages: u32,
    pub error: Option<FetchError>,
}

impl FetchOutcome {
    /// Whether every page up to the end cursor was fetched.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Discard partial results and keep only a complete sequence.
    pub fn into_result(self) -> Result<Vec<Profile>, FetchError> {
        match self.error {
            None => Ok(self.profiles),
            Some(e) => Err(e),
        }
    }
}

/// Fetch every page of `relation` for `username`.
pub async fn fetch_all(
    source: &dyn ProfileSource,
    username: &str,
    relation: RelationKind,
    options: &FetchOptions,
    on_progress: Option<&ProgressCallback>,
) -> FetchOutcome {
    let mut outcome = FetchOutcome::default();
    let mut request = PageRequest::first(username, relation, options.page_size);
    let mut visited: HashSet<i64> = HashSet::from([START_CURSOR]);

    emit(
        on_progress,
        SyncProgress::FetchingRelation {
            username: username.to_string(),
            relation,
        },
    );

    loop {
        let attempts = AtomicU32::new(0);
        let page = with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                fetch_page_with_timeout(source, &request, options.page_timeout)
            },
            &options.retry,
            SourceError::is_transient,
            |err, delay, attempt| {
                tracing::warn!(
                    username = %username,
                    relation = %relation,
                    cursor = request.cursor,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %short_error_message(err),
                    "Page request failed, retrying"
                );
                emit(
                    on_progress,
                    SyncProgress::PageRetry {
                        username: username.to_string(),
                        relation,
                        cursor: request.cursor,
                        attempt,
                        retry_after_ms: delay.as_millis() as u64,
                    },
                );
            },
        )
        .await;

        let page = match page {
            Ok(page) => page,
            Err(err) => {
                let attempts = attempts.load(Ordering::SeqCst);
                tracing::error!(
                    username = %username,
                    relation = %relation,
                    cursor = request.cursor,
                    attempts,
                    fetched = outcome.profiles.len(),
                    error = %err,
                    "Giving up on page, returning partial results"
                );
                outcome.error = Some(FetchError::PageFailed {
                    username: username.to_string(),
                    relation,
                    cursor: request.cursor,
                    attempts,
                    source: err,
                });
                break;
            }
        };

        let count = page.users.len();
        outcome
            .profiles
            .extend(page.users.iter().map(decode_source_user));
        outcome.pages += 1;

        tracing::debug!(
            username = %username,
            relation = %relation,
            page = outcome.pages,
            count,
            next_cursor = page.next_cursor,
            "Fetched page"
        );
        emit(
            on_progress,
            SyncProgress::FetchedPage {
                username: username.to_string(),
                relation,
                page: outcome.pages,
                count,
                total_so_far: outcome.profiles.len(),
            },
        );

        if page.next_cursor == END_CURSOR {
            break;
        }

        if !visited.insert(page.next_cursor) {
            tracing::error!(
                username = %username,
                relation = %relation,
                cursor = page.next_cursor,
                "Source repeated a cursor, stopping pagination"
            );
            outcome.error = Some(FetchError::CursorCycle {
                username: username.to_string(),
                relation,
                cursor: page.next_cursor,
            });
            break;
        }

        request = request.at(page.next_cursor);
    }

    emit(
        on_progress,
        SyncProgress::FetchComplete {
            username: username.to_string(),
            relation,
            total: outcome.profiles.len(),
            complete: outcome.is_complete(),
        },
    );

    outcome
}

async fn fetch_page_with_timeout(
    source: &dyn ProfileSource,
    request: &PageRequest,
    timeout: Duration,
) -> Result<UserPage, SourceError> {
    match tokio::time::timeout(timeout, source.fetch_page(request)).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout {
            seconds: timeout.as_secs(),
        }),
    }
}
