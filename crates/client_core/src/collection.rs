//! Paginated, sortable view over the remote employee collection.
//!
//! The controller never performs I/O on its own: every parameter change hands
//! out a [`FetchTicket`] and the caller reports the response back through
//! [`CollectionView::complete`]. Only the most recently issued ticket may
//! change what is shown; earlier tickets are discarded whatever order their
//! responses arrive in.

use shared::{
    domain::{Employee, EmployeeId, EmployeePage, SortField, SortSpec},
    protocol::EmployeeQuery,
};
use tracing::{debug, warn};

use crate::{api::RosterApi, error::ClientError};

pub const GRID_PAGE_SIZE: u32 = 10;
pub const TILE_PAGE_SIZE: u32 = 12;

#[derive(Debug)]
pub struct FetchTicket {
    seq: u64,
    query: EmployeeQuery,
}

impl FetchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn query(&self) -> &EmployeeQuery {
        &self.query
    }
}

#[derive(Debug)]
pub enum FetchOutcome {
    Applied,
    Stale,
    Failed,
    /// The requested page lies past the last page; fetch the clamped page.
    Reissue(FetchTicket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageView<'a> {
    Idle,
    Loading,
    Failed(&'a str),
    Ready(&'a EmployeePage),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FetchStatus {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug)]
pub struct CollectionView {
    page: u32,
    page_size: u32,
    sort: Option<SortSpec>,
    issued_seq: u64,
    status: FetchStatus,
    loaded: Option<EmployeePage>,
}

impl CollectionView {
    pub fn new(page_size: u32, sort: Option<SortSpec>) -> Self {
        Self {
            page: 1,
            page_size,
            sort,
            issued_seq: 0,
            status: FetchStatus::Idle,
            loaded: None,
        }
    }

    pub fn grid(page_size: u32) -> Self {
        Self::new(page_size, Some(SortSpec::default()))
    }

    pub fn tile(page_size: u32) -> Self {
        Self::new(page_size, None)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn sort(&self) -> Option<SortSpec> {
        self.sort
    }

    pub fn is_sortable(&self) -> bool {
        self.sort.is_some()
    }

    pub fn query(&self) -> EmployeeQuery {
        EmployeeQuery {
            page: self.page,
            page_size: self.page_size,
            sort: self.sort,
        }
    }

    /// Sets the page without bounds checks; controls are expected to use
    /// [`has_previous`](Self::has_previous) and [`has_next`](Self::has_next).
    pub fn set_page(&mut self, page: u32) -> FetchTicket {
        self.page = page;
        self.begin_fetch()
    }

    /// Returns `None` when this presentation does not sort.
    pub fn set_sort(&mut self, field: SortField) -> Option<FetchTicket> {
        let current = self.sort?;
        self.sort = Some(current.toggled(field));
        Some(self.begin_fetch())
    }

    pub fn invalidate(&mut self) -> FetchTicket {
        self.begin_fetch()
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued_seq += 1;
        self.status = FetchStatus::Loading;
        let query = self.query();
        debug!(
            seq = self.issued_seq,
            page = query.page,
            page_size = query.page_size,
            "issuing collection fetch"
        );
        FetchTicket {
            seq: self.issued_seq,
            query,
        }
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.seq == self.issued_seq
    }

    pub fn complete(
        &mut self,
        ticket: FetchTicket,
        result: Result<EmployeePage, ClientError>,
    ) -> FetchOutcome {
        if !self.is_current(&ticket) {
            debug!(
                seq = ticket.seq,
                latest = self.issued_seq,
                "discarding stale collection response"
            );
            return FetchOutcome::Stale;
        }

        match result {
            Ok(page) => {
                if page.total_pages >= 1 && self.page > page.total_pages {
                    debug!(
                        requested = self.page,
                        total_pages = page.total_pages,
                        "requested page is past the end; clamping"
                    );
                    self.page = page.total_pages;
                    return FetchOutcome::Reissue(self.begin_fetch());
                }
                self.loaded = Some(page);
                self.status = FetchStatus::Ready;
                FetchOutcome::Applied
            }
            Err(err) => {
                warn!(seq = ticket.seq, "collection fetch failed: {err}");
                self.status = FetchStatus::Failed(err.message());
                FetchOutcome::Failed
            }
        }
    }

    /// Drives `ticket` (and any clamping follow-up) against `api`.
    pub async fn run(
        &mut self,
        api: &dyn RosterApi,
        token: &str,
        ticket: FetchTicket,
    ) -> Result<FetchOutcome, ClientError> {
        let mut ticket = ticket;
        loop {
            let result = api.employees(token, ticket.query()).await;
            let failure = result.as_ref().err().cloned();
            match self.complete(ticket, result) {
                FetchOutcome::Reissue(next) => ticket = next,
                FetchOutcome::Failed => {
                    return Err(failure.unwrap_or_else(|| {
                        ClientError::Decode("collection fetch failed".to_string())
                    }))
                }
                outcome => return Ok(outcome),
            }
        }
    }

    pub fn current_page(&self) -> PageView<'_> {
        match (&self.status, &self.loaded) {
            (FetchStatus::Idle, _) => PageView::Idle,
            (FetchStatus::Loading, _) => PageView::Loading,
            (FetchStatus::Failed(message), _) => PageView::Failed(message),
            (FetchStatus::Ready, Some(page)) => PageView::Ready(page),
            (FetchStatus::Ready, None) => PageView::Idle,
        }
    }

    /// Last successfully applied page, kept across later failures.
    pub fn last_loaded(&self) -> Option<&EmployeePage> {
        self.loaded.as_ref()
    }

    pub fn records(&self) -> &[Employee] {
        match self.current_page() {
            PageView::Ready(page) => &page.employees,
            _ => &[],
        }
    }

    pub fn find(&self, id: &EmployeeId) -> Option<&Employee> {
        self.loaded
            .as_ref()
            .and_then(|page| page.employees.iter().find(|employee| &employee.id == id))
    }

    pub fn total_pages(&self) -> u32 {
        self.loaded.as_ref().map_or(0, |page| page.total_pages)
    }

    pub fn total_count(&self) -> u64 {
        self.loaded.as_ref().map_or(0, |page| page.total_count)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn summary(&self) -> String {
        format!(
            "Page {} of {} ({} total)",
            self.page,
            self.total_pages(),
            self.total_count()
        )
    }

    /// Back to the first page with the initial sort, dropping loaded data.
    pub fn reset(&mut self) {
        self.page = 1;
        if self.sort.is_some() {
            self.sort = Some(SortSpec::default());
        }
        self.issued_seq += 1;
        self.status = FetchStatus::Idle;
        self.loaded = None;
    }
}

#[cfg(test)]
#[path = "tests/collection_tests.rs"]
mod tests;
