use crate::convert::MarkdownConverter;
use crate::document::{DocumentId, EditEvent};
use log::{debug, warn};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub type FragmentSink = Box<dyn Fn(&str) + Send + Sync>;

/// Live change subscription for one document. Created active; `dispose`
/// moves it to the terminal state and is idempotent. A disposed watcher
/// silently drops late-arriving conversions instead of calling back.
pub struct DocumentWatcher {
    identity: DocumentId,
    converter: Arc<dyn MarkdownConverter>,
    on_fragment: FragmentSink,
    disposed: AtomicBool,
}

impl DocumentWatcher {
    pub fn watch(
        identity: DocumentId,
        converter: Arc<dyn MarkdownConverter>,
        on_fragment: FragmentSink,
    ) -> Arc<Self> {
        debug!("watching {identity}");
        Arc::new(Self {
            identity,
            converter,
            on_fragment,
            disposed: AtomicBool::new(false),
        })
    }

    pub fn identity(&self) -> &DocumentId {
        &self.identity
    }

    /// Reconverts the event's full text and delivers the fragment. Returns
    /// whether a fragment was delivered. Conversion failure drops the update
    /// and leaves the watcher active for the next edit.
    pub fn handle_edit(&self, event: &EditEvent) -> bool {
        if event.identity != self.identity {
            return false;
        }
        if self.is_disposed() {
            return false;
        }

        let fragment = match self.converter.convert(&event.new_text) {
            Ok(fragment) => fragment,
            Err(err) => {
                warn!("dropping update for {}: {err}", self.identity);
                return false;
            }
        };

        // Disposal may have raced the conversion.
        if self.is_disposed() {
            return false;
        }

        (self.on_fragment)(&fragment);
        true
    }

    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            debug!("released watch on {}", self.identity);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl Debug for DocumentWatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentWatcher")
            .field("identity", &self.identity)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
