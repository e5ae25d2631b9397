//! Lazily paged query results.
//!
//! The server returns query results in pages, each carrying the total match
//! count of the whole query. [`PagedEntityCollection`] holds the first page
//! and hands out [`EntityCursor`]s that walk the full result, fetching
//! further pages on demand with a 1-based `start-index` parameter.

use crate::entity::Entity;
use crate::session::Session;
use crate::wire::ResultSet;
use crate::{Error, Result};

/// The result of a query, fetched page by page.
///
/// The total count is fixed when the first page arrives. Every call to
/// [`cursor`](Self::cursor) starts over from that buffered first page and
/// fetches later pages independently of other cursors.
#[derive(Debug)]
pub struct PagedEntityCollection<'s> {
    session: &'s Session,
    query_url: String,
    first_page: ResultSet,
}

impl<'s> PagedEntityCollection<'s> {
    pub(crate) fn new(session: &'s Session, query_url: String, first_page: ResultSet) -> Self {
        Self {
            session,
            query_url,
            first_page,
        }
    }

    /// The server's total match count for the query.
    pub fn total_count(&self) -> usize {
        self.first_page.total_results
    }

    /// The query URL without paging parameters.
    pub fn query_url(&self) -> &str {
        &self.query_url
    }

    /// The entities of the first page.
    pub fn first_page(&self) -> &[Entity] {
        &self.first_page.entities
    }

    /// Returns a new single-pass cursor over the whole result.
    ///
    /// An empty first page with a non-zero total is not trusted: the cursor
    /// requests `start-index=1` again and fails if that page is empty too.
    pub fn cursor(&self) -> EntityCursor<'_> {
        let total = self.total_count();
        let first = self.first_page.entities.as_slice();
        // Some servers append an empty extra object, hence `<=`.
        let in_memory = total <= first.len();

        EntityCursor {
            session: self.session,
            query_url: &self.query_url,
            page: Page::Borrowed(first),
            in_memory,
            exhausted: false,
            offset: 1,
            index: 0,
            total,
        }
    }

    /// Drains a fresh cursor into a vector.
    pub async fn collect_all(&self) -> Result<Vec<Entity>> {
        let mut cursor = self.cursor();
        let mut entities = Vec::with_capacity(self.total_count());
        while let Some(entity) = cursor.try_next().await? {
            entities.push(entity);
        }
        Ok(entities)
    }
}

#[derive(Debug)]
enum Page<'c> {
    Borrowed(&'c [Entity]),
    Fetched(Vec<Entity>),
}

impl Page<'_> {
    fn entities(&self) -> &[Entity] {
        match self {
            Page::Borrowed(entities) => *entities,
            Page::Fetched(entities) => entities.as_slice(),
        }
    }
}

/// A single-pass position in a [`PagedEntityCollection`].
///
/// The cursor tracks the 1-based server offset of its buffered page and an
/// index into that page. When the page is used up it requests the next one
/// at `start-index = offset`. An empty page while results are still
/// declared ends the cursor with [`Error::UnexpectedEmptyPage`]; any other
/// fetch failure is returned as is. Either way the cursor yields nothing
/// afterwards.
#[derive(Debug)]
pub struct EntityCursor<'c> {
    session: &'c Session,
    query_url: &'c str,
    page: Page<'c>,
    in_memory: bool,
    exhausted: bool,
    offset: usize,
    index: usize,
    total: usize,
}

impl<'c> EntityCursor<'c> {
    /// Returns `true` if another entity can be produced.
    pub fn has_next(&self) -> bool {
        if self.exhausted {
            return false;
        }
        if self.in_memory {
            return self.index < self.page.entities().len();
        }
        self.offset + self.index <= self.total
    }

    /// Returns the next entity, or `None` once the result is exhausted.
    pub async fn try_next(&mut self) -> Result<Option<Entity>> {
        if !self.has_next() {
            return Ok(None);
        }

        if self.index == self.page.entities().len() {
            self.offset += self.index;
            self.index = 0;
            if let Err(e) = self.fetch_page().await {
                self.exhausted = true;
                return Err(e);
            }
        }

        let entity = self.page.entities()[self.index].clone();
        self.index += 1;
        Ok(Some(entity))
    }

    /// Returns the next entity, failing if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PageExhausted`] when called past the end.
    pub async fn next_entity(&mut self) -> Result<Entity> {
        let position = self.offset + self.index;
        self.try_next().await?.ok_or(Error::PageExhausted {
            position,
            total: self.total,
        })
    }

    async fn fetch_page(&mut self) -> Result<()> {
        let separator = if self.query_url.contains('?') { '&' } else { '?' };
        let url = format!("{}{}start-index={}", self.query_url, separator, self.offset);
        tracing::debug!(start_index = self.offset, total = self.total, "Fetching next page");

        let page = self.session.fetch_page(&url).await?;
        if page.entities.is_empty() {
            tracing::error!(
                start_index = self.offset,
                total = self.total,
                "Server returned an empty page"
            );
            return Err(Error::UnexpectedEmptyPage {
                start_index: self.offset,
                total: self.total,
            });
        }

        self.page = Page::Fetched(page.entities);
        Ok(())
    }
}
