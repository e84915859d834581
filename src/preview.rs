//! Preview handle lifecycle.
//!
//! A [`PreviewHandle`] is an RAII guard: dropping it releases the preview, so every
//! acquisition has a matching release on every path (supersession, reset, failure,
//! controller teardown). [`PreviewManager`] holds at most one live handle.

use crate::model::{ImageSubmission, PreviewInfo, PreviewUri};
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEntry {
    Acquired(PreviewUri),
    Released(PreviewUri),
}

/// Bookkeeping shared by a manager and the handles it issues.
#[derive(Debug, Default)]
pub struct PreviewLedger {
    next_id: AtomicU64,
    acquired: AtomicU64,
    released: AtomicU64,
    entries: Mutex<Vec<LedgerEntry>>,
}

impl PreviewLedger {
    pub fn acquired(&self) -> u64 {
        self.acquired.load(Ordering::Relaxed)
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }

    /// Handles acquired but not yet released.
    #[cfg(test)]
    pub fn live(&self) -> u64 {
        self.acquired().saturating_sub(self.released())
    }

    #[cfg(test)]
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    fn record(&self, entry: LedgerEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }
}

/// A revocable, locally addressable preview of an accepted submission.
#[derive(Debug)]
pub struct PreviewHandle {
    uri: PreviewUri,
    mime_type: String,
    bytes: Bytes,
    released: bool,
    ledger: Arc<PreviewLedger>,
}

impl PreviewHandle {
    pub fn uri(&self) -> &PreviewUri {
        &self.uri
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Preview bytes; empty once released.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    #[cfg(test)]
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Presenter view of this preview.
    pub fn info(&self) -> PreviewInfo {
        PreviewInfo {
            uri: self.uri.clone(),
            mime_type: self.mime_type().to_string(),
            size_bytes: self.bytes().len() as u64,
        }
    }

    /// Revoke the preview. Releasing twice is a no-op.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.bytes = Bytes::new();
        self.ledger.released.fetch_add(1, Ordering::Relaxed);
        self.ledger.record(LedgerEntry::Released(self.uri.clone()));
        log::debug!("released preview {}", self.uri);
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// Owns the single active preview of one workflow.
#[derive(Debug, Default)]
pub struct PreviewManager {
    current: Option<PreviewHandle>,
    ledger: Arc<PreviewLedger>,
}

impl PreviewManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> Arc<PreviewLedger> {
        self.ledger.clone()
    }

    /// Release whatever is currently held, then create a preview for `submission`.
    pub fn acquire(&mut self, submission: &ImageSubmission) -> PreviewUri {
        self.release();

        let id = self.ledger.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let uri = PreviewUri(format!("preview://fauna-lens/{id}"));
        self.ledger.acquired.fetch_add(1, Ordering::Relaxed);
        self.ledger.record(LedgerEntry::Acquired(uri.clone()));
        log::debug!("acquired preview {uri} for {}", submission.name);

        self.current = Some(PreviewHandle {
            uri: uri.clone(),
            mime_type: submission.mime_type.clone(),
            bytes: submission.bytes.clone(),
            released: false,
            ledger: self.ledger.clone(),
        });
        uri
    }

    /// Release the current preview, if any.
    pub fn release(&mut self) {
        if let Some(mut handle) = self.current.take() {
            handle.release();
        }
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<&PreviewUri> {
        self.current.as_ref().map(PreviewHandle::uri)
    }

    /// Look up a live preview by address; stale addresses resolve to `None`.
    pub fn resolve(&self, uri: &PreviewUri) -> Option<&PreviewHandle> {
        self.current.as_ref().filter(|h| h.uri() == uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(name: &str) -> ImageSubmission {
        ImageSubmission {
            name: name.to_string(),
            mime_type: "image/jpeg".to_string(),
            size_bytes: 3,
            bytes: Bytes::from_static(b"abc"),
        }
    }

    #[test]
    fn acquire_releases_previous_handle_first() {
        let mut mgr = PreviewManager::new();
        let ledger = mgr.ledger();
        let first = mgr.acquire(&submission("a.jpg"));
        let second = mgr.acquire(&submission("b.jpg"));

        assert_ne!(first, second);
        assert_eq!(
            ledger.entries(),
            vec![
                LedgerEntry::Acquired(first.clone()),
                LedgerEntry::Released(first.clone()),
                LedgerEntry::Acquired(second.clone()),
            ]
        );
        assert_eq!(ledger.live(), 1);
        assert!(mgr.resolve(&first).is_none());
        assert_eq!(mgr.resolve(&second).map(|h| h.bytes().len()), Some(3));
    }

    #[test]
    fn release_is_idempotent() {
        let mut mgr = PreviewManager::new();
        let ledger = mgr.ledger();
        mgr.release();
        mgr.acquire(&submission("a.jpg"));
        mgr.release();
        mgr.release();
        assert_eq!(ledger.acquired(), 1);
        assert_eq!(ledger.released(), 1);
        assert!(mgr.current().is_none());
    }

    #[test]
    fn handle_release_then_drop_counts_once() {
        let mut mgr = PreviewManager::new();
        let ledger = mgr.ledger();
        mgr.acquire(&submission("a.jpg"));
        let mut handle = mgr.current.take().unwrap();
        handle.release();
        assert!(handle.is_released());
        assert!(handle.bytes().is_empty());
        drop(handle);
        assert_eq!(ledger.released(), 1);
    }

    #[test]
    fn dropping_manager_releases_live_handle() {
        let mut mgr = PreviewManager::new();
        let ledger = mgr.ledger();
        for i in 0..5 {
            mgr.acquire(&submission(&format!("{i}.jpg")));
        }
        assert_eq!(ledger.live(), 1);
        drop(mgr);
        assert_eq!(ledger.live(), 0);
        assert_eq!(ledger.acquired(), 5);
    }

    #[test]
    fn resolve_describes_live_preview_only() {
        let mut mgr = PreviewManager::new();
        let first = mgr.acquire(&submission("a.jpg"));
        let info = mgr.resolve(&first).map(PreviewHandle::info).unwrap();
        assert_eq!(info.uri, first);
        assert_eq!(info.mime_type, "image/jpeg");
        assert_eq!(info.size_bytes, 3);

        let second = mgr.acquire(&submission("b.jpg"));
        assert!(mgr.resolve(&first).is_none());
        assert!(mgr.resolve(&second).is_some());
        mgr.release();
        assert!(mgr.resolve(&second).is_none());
    }
}
