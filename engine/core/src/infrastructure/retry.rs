// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Bounded retry for transient store failures.
//!
//! Applied to reads only: a timed-out read is safe to repeat, a timed-out
//! write is surfaced immediately to avoid duplicate side effects.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::domain::repository::RepositoryError;

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(100);

/// Run a read operation, retrying transient failures with linear backoff.
pub async fn with_read_retry<T, F, Fut>(op_name: &str, mut op: F) -> Result<T, RepositoryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RepositoryError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                warn!(
                    "read '{}' failed (attempt {}/{}): {}",
                    op_name, attempt, MAX_ATTEMPTS, err
                );
                tokio::time::sleep(BASE_DELAY * attempt).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
