//! Synchronous state container for invoice UIs.
//!
//! The store holds data already fetched by [`crate::api::ApiClient`] and
//! never performs I/O itself. Every action is applied by a pure reduction
//! that rebuilds the filtered view before returning, so the full collection,
//! the filtered view, and the selection can never disagree.

use crate::models::Invoice;

/// Actions the reducer understands. Write failures surface as `LoadFailed`
/// only; local data is never mutated on a failed request.
#[derive(Debug, Clone)]
pub enum Action {
    LoadStarted,
    PageLoaded {
        items: Vec<Invoice>,
        next_cursor: Option<i64>,
    },
    InvoiceLoaded(Invoice),
    LoadFailed(String),
    FilterChanged(Option<String>),
    InvoiceSelected(Option<i64>),
    StatusUpdated {
        id: i64,
        status: String,
    },
    InvoiceReplaced(Invoice),
    InvoiceDeleted(i64),
    Cleared,
}

/// Invoice state store. Ordering is preserved: re-fetching an id replaces
/// its prior value in place, new ids append after existing ones.
#[derive(Debug, Clone, Default)]
pub struct InvoiceStore {
    all: Vec<Invoice>,
    filtered: Vec<Invoice>,
    selected_id: Option<i64>,
    status_filter: Option<String>,
    next_cursor: Option<i64>,
    loading: bool,
    error: Option<String>,
}

impl InvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one action. The filtered view is rebuilt at the end of every
    /// reduction, never between the individual mutations.
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::LoadStarted => {
                self.loading = true;
                self.error = None;
            }
            Action::PageLoaded { items, next_cursor } => {
                for invoice in items {
                    self.upsert(invoice);
                }
                self.next_cursor = next_cursor;
                self.loading = false;
                self.error = None;
            }
            Action::InvoiceLoaded(invoice) | Action::InvoiceReplaced(invoice) => {
                self.upsert(invoice);
                self.loading = false;
                self.error = None;
            }
            Action::LoadFailed(message) => {
                self.loading = false;
                self.error = Some(message);
            }
            Action::FilterChanged(status) => {
                self.status_filter = status;
            }
            Action::InvoiceSelected(id) => {
                self.selected_id = id;
            }
            Action::StatusUpdated { id, status } => {
                if let Some(invoice) = self.all.iter_mut().find(|inv| inv.id == id) {
                    invoice.status = status;
                }
            }
            Action::InvoiceDeleted(id) => {
                self.all.retain(|invoice| invoice.id != id);
                if self.selected_id == Some(id) {
                    self.selected_id = None;
                }
            }
            Action::Cleared => {
                self.all.clear();
                self.selected_id = None;
                self.status_filter = None;
                self.next_cursor = None;
                self.loading = false;
                self.error = None;
            }
        }
        self.refilter();
    }

    /// Replace in place by id, or append.
    fn upsert(&mut self, invoice: Invoice) {
        match self.all.iter_mut().find(|inv| inv.id == invoice.id) {
            Some(existing) => *existing = invoice,
            None => self.all.push(invoice),
        }
    }

    fn refilter(&mut self) {
        self.filtered = match &self.status_filter {
            Some(status) => self
                .all
                .iter()
                .filter(|invoice| invoice.status == *status)
                .cloned()
                .collect(),
            None => self.all.clone(),
        };
    }

    /// Invoices matching the current status filter.
    pub fn invoices(&self) -> &[Invoice] {
        &self.filtered
    }

    /// The full fetched collection, ignoring the filter.
    pub fn all_invoices(&self) -> &[Invoice] {
        &self.all
    }

    pub fn selected(&self) -> Option<&Invoice> {
        self.selected_id
            .and_then(|id| self.all.iter().find(|invoice| invoice.id == id))
    }

    pub fn status_filter(&self) -> Option<&str> {
        self.status_filter.as_deref()
    }

    pub fn next_cursor(&self) -> Option<i64> {
        self.next_cursor
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
