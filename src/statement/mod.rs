//! Asynchronous statement protocol: submit, poll, paginate, decode.
//!
//! One statement is in flight per call. The only suspension points are the
//! poll sleeps and the page fetches.

mod decode;
mod paginate;
mod poll;
mod submit;
mod types;

pub use decode::{decode_field, decode_row};
pub use paginate::{stream_records, RecordStream};
pub use poll::{wait_for_completion, PollConfig, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_SECS};
pub use submit::{build_execute_input, submit, StatementHandle};
pub use types::{Record, Value};

use futures::TryStreamExt;
use std::sync::Arc;

use crate::config::ConnectionIdentity;
use crate::data_api::DataApi;
use crate::error::Result;

/// Runs statements against one connection identity.
#[derive(Clone)]
pub struct StatementExecutor {
    api: Arc<dyn DataApi>,
    identity: Arc<ConnectionIdentity>,
    poll: PollConfig,
}

impl StatementExecutor {
    pub fn new(api: Arc<dyn DataApi>, identity: Arc<ConnectionIdentity>, poll: PollConfig) -> Self {
        Self { api, identity, poll }
    }

    pub fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }

    /// Submits `sql`, waits for it to finish and returns a lazy row stream.
    ///
    /// Submission and polling failures are returned before any row is produced.
    /// Page fetch failures surface as the last item of the stream.
    pub async fn execute(&self, sql: &str) -> Result<RecordStream> {
        let handle = submit(self.api.as_ref(), &self.identity, sql).await?;
        wait_for_completion(self.api.as_ref(), &handle, self.poll).await?;
        Ok(stream_records(self.api.clone(), handle))
    }

    /// Runs `sql` and buffers every row. Meant for small catalog queries.
    pub async fn fetch_all(&self, sql: &str) -> Result<Vec<Record>> {
        self.execute(sql).await?.try_collect().await
    }
}
