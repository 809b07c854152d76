//! Published diagnostics per document.
//!
//! Every validation pass of a document is stamped with a [`PassTicket`].
//! Publishing replaces the document's diagnostics wholesale, but only while
//! the ticket is the newest one issued for that document: a slow pass that
//! finishes after a newer one has started cannot overwrite the newer result.
//! A pass may publish more than once with the same ticket, e.g. a quick
//! synchronous set followed by the full set.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use log::debug;

use stagebook_core::error::Diagnostic;

/// Identifies one validation pass of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassTicket {
    document: String,
    sequence: u64,
}

impl PassTicket {
    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

#[derive(Debug, Default)]
struct Entry {
    latest: u64,
    diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Default)]
struct Inner {
    next_sequence: u64,
    documents: HashMap<String, Entry>,
}

/// Diagnostics of open documents, shared by reference.
#[derive(Debug, Default)]
pub struct DiagnosticStore {
    inner: Mutex<Inner>,
}

impl DiagnosticStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `document` with no diagnostics.
    pub fn open(&self, document: impl Into<String>) {
        let document = document.into();
        debug!(document = document.as_str(); "Document opened");
        self.lock().documents.entry(document).or_default();
    }

    /// Stop tracking `document`. Later publications for it are discarded.
    pub fn close(&self, document: &str) {
        debug!(document = document; "Document closed");
        self.lock().documents.remove(document);
    }

    pub fn is_open(&self, document: &str) -> bool {
        self.lock().documents.contains_key(document)
    }

    /// Issue the ticket for a new pass over `document`, opening it if needed.
    ///
    /// Sequence numbers never repeat within a store, so a ticket issued
    /// before a close and reopen stays stale.
    pub fn begin_pass(&self, document: &str) -> PassTicket {
        let mut inner = self.lock();
        inner.next_sequence += 1;
        let sequence = inner.next_sequence;
        inner.documents.entry(document.to_string()).or_default().latest = sequence;

        PassTicket {
            document: document.to_string(),
            sequence,
        }
    }

    /// Replace the document's diagnostics if `ticket` is still the latest.
    ///
    /// Returns `false`, leaving the store untouched, for a stale ticket or a
    /// closed document.
    pub fn publish(&self, ticket: &PassTicket, diagnostics: Vec<Diagnostic>) -> bool {
        let mut inner = self.lock();
        let Some(entry) = inner.documents.get_mut(ticket.document()) else {
            debug!(document = ticket.document(); "Discarding publication for closed document");
            return false;
        };

        if entry.latest != ticket.sequence() {
            debug!(
                document = ticket.document(),
                sequence = ticket.sequence(),
                latest = entry.latest;
                "Discarding stale publication"
            );
            return false;
        }

        entry.diagnostics = diagnostics;
        true
    }

    /// The published diagnostics of `document`.
    pub fn diagnostics(&self, document: &str) -> Option<Vec<Diagnostic>> {
        self.lock()
            .documents
            .get(document)
            .map(|entry| entry.diagnostics.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    fn warning(message: &str) -> Vec<Diagnostic> {
        vec![Diagnostic::warning(message)]
    }

    #[test]
    fn test_publish_replaces_wholesale() {
        let store = DiagnosticStore::new();
        store.open("a.treatments.yaml");

        let ticket = store.begin_pass("a.treatments.yaml");
        assert!(store.publish(&ticket, warning("first")));
        assert!(store.publish(&ticket, vec![]));

        assert_eq!(store.diagnostics("a.treatments.yaml"), Some(vec![]));
    }

    #[test]
    fn test_stale_ticket_cannot_overwrite() {
        let store = DiagnosticStore::new();
        let old = store.begin_pass("doc");
        let new = store.begin_pass("doc");

        assert!(store.publish(&new, warning("new")));
        assert!(!store.publish(&old, warning("old")));

        let published = store.diagnostics("doc").unwrap();
        assert_eq!(published[0].message(), "new");
    }

    #[test]
    fn test_tickets_are_per_document() {
        let store = DiagnosticStore::new();
        let a = store.begin_pass("a");
        let b = store.begin_pass("b");

        assert!(store.publish(&a, warning("a")));
        assert!(store.publish(&b, warning("b")));
        assert!(a.sequence() < b.sequence());
    }

    #[test]
    fn test_closed_documents_discard_publications() {
        let store = DiagnosticStore::new();
        let before_close = store.begin_pass("doc");
        store.close("doc");

        assert!(!store.is_open("doc"));
        assert!(!store.publish(&before_close, warning("late")));
        assert_eq!(store.diagnostics("doc"), None);

        store.open("doc");
        assert!(!store.publish(&before_close, warning("late")));
        assert_eq!(store.diagnostics("doc"), Some(vec![]));
    }

    #[test]
    fn test_shared_between_threads() {
        let store = Arc::new(DiagnosticStore::new());
        let ticket = store.begin_pass("doc");

        let handle = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.publish(&ticket, warning("from worker")))
        };

        assert!(handle.join().unwrap());
        assert_eq!(store.diagnostics("doc").map(|d| d.len()), Some(1));
    }
}
