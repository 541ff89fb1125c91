//! Result pagination.
//!
//! Pages are fetched strictly in sequence, one at a time, as the caller
//! drains the stream. Rows are decoded and handed out as soon as their page
//! arrives.

use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tracing::debug;

use super::decode::decode_row;
use super::submit::StatementHandle;
use super::types::Record;
use crate::data_api::{DataApi, Field};
use crate::error::Result;

/// Lazy, forward-only stream of decoded rows.
pub type RecordStream = BoxStream<'static, Result<Record>>;

enum NextPage {
    First,
    Token(String),
    Done,
}

struct Cursor {
    api: Arc<dyn DataApi>,
    handle: StatementHandle,
    /// Captured from the first page and reused for every later page.
    columns: Option<Arc<[String]>>,
    rows: std::vec::IntoIter<Vec<Field>>,
    next: NextPage,
    pages_fetched: usize,
    rows_yielded: usize,
}

impl Cursor {
    async fn advance(mut self) -> Option<(Result<Record>, Self)> {
        loop {
            if let Some(row) = self.rows.next() {
                let columns = self.columns.clone().unwrap_or_else(|| Arc::from(Vec::new()));
                self.rows_yielded += 1;
                let record = Record::new(columns, decode_row(row));
                return Some((Ok(record), self));
            }

            let token = match std::mem::replace(&mut self.next, NextPage::Done) {
                NextPage::Done => {
                    debug!(
                        statement_id = self.handle.id(),
                        pages = self.pages_fetched,
                        rows = self.rows_yielded,
                        "Result stream exhausted"
                    );
                    return None;
                }
                NextPage::First => None,
                NextPage::Token(token) => Some(token),
            };

            // On error `next` stays Done, so the stream ends after yielding it.
            let fetched = self
                .api
                .get_statement_result(self.handle.id(), token.as_deref())
                .await;
            let page = match fetched {
                Ok(page) => page,
                Err(e) => return Some((Err(e), self)),
            };

            self.pages_fetched += 1;
            if self.columns.is_none() {
                let names: Arc<[String]> = page
                    .column_metadata
                    .iter()
                    .map(|column| column.name.clone())
                    .collect();
                self.columns = Some(names);
            }
            if let Some(token) = page.continuation() {
                self.next = NextPage::Token(token.to_string());
            }

            debug!(
                statement_id = self.handle.id(),
                page = self.pages_fetched,
                rows = page.records.len(),
                more = matches!(self.next, NextPage::Token(_)),
                "Fetched result page"
            );

            // An empty page with a token still continues.
            self.rows = page.records.into_iter();
        }
    }
}

/// Streams every row of a finished statement.
///
/// The stream ends after the page without a continuation token, or right
/// after yielding the first error.
pub fn stream_records(api: Arc<dyn DataApi>, handle: StatementHandle) -> RecordStream {
    let cursor = Cursor {
        api,
        handle,
        columns: None,
        rows: Vec::new().into_iter(),
        next: NextPage::First,
        pages_fetched: 0,
        rows_yielded: 0,
    };

    stream::unfold(cursor, Cursor::advance).boxed()
}
