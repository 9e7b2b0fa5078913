//! Cursor-paginated page fetching.
//!
//! One [`PageFetcher`] owns the pagination state for one collection
//! enumeration: the cursor (last successfully consumed document) and the
//! reached-end flag. The cursor only advances after a successful fetch, so
//! a failed fetch can be retried any number of times without skipping or
//! duplicating documents.

use stockpile_core::{CollectionPath, Document, RemoteStore, Result};

/// Issues ordered, limited page requests against one collection.
#[derive(Debug)]
pub struct PageFetcher {
    collection: CollectionPath,
    order_field: String,
    page_size: usize,
    cursor: Option<Document>,
    reached_end: bool,
}

impl PageFetcher {
    /// Creates a fetcher positioned at the start of the collection.
    #[must_use]
    pub fn new(collection: CollectionPath, order_field: impl Into<String>, page_size: usize) -> Self {
        Self {
            collection,
            order_field: order_field.into(),
            page_size,
            cursor: None,
            reached_end: false,
        }
    }

    /// Returns true once an empty page has signalled the end of the
    /// collection.
    #[must_use]
    pub const fn reached_end(&self) -> bool {
        self.reached_end
    }

    /// Rewinds to the start of the collection.
    pub fn reset(&mut self) {
        self.cursor = None;
        self.reached_end = false;
    }

    /// Captures the current cursor for a later [`rewind`](Self::rewind).
    #[must_use]
    pub fn checkpoint(&self) -> Option<Document> {
        self.cursor.clone()
    }

    /// Moves the cursor back to a previously captured checkpoint, so the
    /// documents fetched since then are delivered again on the next call.
    pub fn rewind(&mut self, checkpoint: Option<Document>) {
        self.cursor = checkpoint;
        self.reached_end = false;
    }

    /// Fetches the next page.
    ///
    /// Returns an empty page once the collection is exhausted; an empty
    /// result also sets [`reached_end`](Self::reached_end). Further calls
    /// after that are no-ops returning empty pages.
    ///
    /// # Errors
    ///
    /// Propagates store failures without advancing the cursor, so the call
    /// is safe to retry.
    pub async fn fetch_next<S: RemoteStore>(&mut self, store: &S) -> Result<Vec<Document>> {
        if self.reached_end {
            return Ok(Vec::new());
        }

        let page = store
            .query_page(
                &self.collection,
                &self.order_field,
                self.cursor.as_ref(),
                self.page_size,
            )
            .await?;

        match page.last() {
            Some(last) => self.cursor = Some(last.clone()),
            None => self.reached_end = true,
        }
        Ok(page)
    }
}
