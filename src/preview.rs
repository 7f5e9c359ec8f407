use crate::config::RenderOptions;
use crate::convert::{ConvertError, MarkdownConverter};
use crate::document::{DocumentId, EditEvent, EditFeed};
use crate::render;
use crate::view::{ViewHandle, ViewHost};
use crate::watch::DocumentWatcher;
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::{Notify, broadcast};
use tokio::task::JoinHandle;

#[derive(Debug)]
pub enum PreviewError {
    Io(std::io::Error),
    MissingDocument,
    Conversion(ConvertError),
}

impl Display for PreviewError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::MissingDocument => write!(f, "no markdown file selected"),
            Self::Conversion(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PreviewError {}

impl From<std::io::Error> for PreviewError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ConvertError> for PreviewError {
    fn from(value: ConvertError) -> Self {
        Self::Conversion(value)
    }
}

/// A live preview: one view, one watch subscription, released together.
/// Closing the view (from either side) disposes the subscription, so no
/// listener can outlive its view.
pub struct PreviewSession {
    view: Arc<dyn ViewHandle>,
    watcher: Arc<DocumentWatcher>,
    pump: JoinHandle<()>,
}

impl PreviewSession {
    pub fn close(&self) {
        self.view.dispose();
    }

    pub fn is_closed(&self) -> bool {
        self.watcher.is_disposed()
    }

    pub fn identity(&self) -> &DocumentId {
        self.watcher.identity()
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.view.dispose();
        self.pump.abort();
    }
}

/// Renders the initial document, opens a view for it, and follows edits from
/// `feed` until the view is disposed. Must be called from within a tokio
/// runtime.
pub fn open_preview(
    markdown: &str,
    identity: DocumentId,
    options: &RenderOptions,
    converter: Arc<dyn MarkdownConverter>,
    host: &dyn ViewHost,
    feed: &EditFeed,
    title: &str,
) -> Result<PreviewSession, PreviewError> {
    let document = render::render(markdown, options, converter.as_ref())?;
    let view = host.create_view(title, document.into_string());

    let watcher = DocumentWatcher::watch(identity, converter, {
        let view = view.clone();
        Box::new(move |fragment: &str| view.post_update(fragment))
    });

    let closed = Arc::new(Notify::new());
    view.on_dispose({
        let watcher = watcher.clone();
        let closed = closed.clone();
        Box::new(move || {
            watcher.dispose();
            closed.notify_one();
        })
    });

    let pump = tokio::spawn(pump_edits(feed.subscribe(), watcher.clone(), closed));

    Ok(PreviewSession {
        view,
        watcher,
        pump,
    })
}

/// One pump per session keeps delivery ordered: each edit is converted and
/// delivered to completion before the next is considered.
async fn pump_edits(
    mut rx: broadcast::Receiver<EditEvent>,
    watcher: Arc<DocumentWatcher>,
    closed: Arc<Notify>,
) {
    loop {
        if watcher.is_disposed() {
            break;
        }

        tokio::select! {
            _ = closed.notified() => break,
            recv = rx.recv() => {
                match recv {
                    Ok(event) => {
                        let _ = watcher.handle_edit(&event);
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    debug!("edit pump for {} stopped", watcher.identity());
}

#[cfg(test)]
mod tests {
    use super::open_preview;
    use crate::config::RenderOptions;
    use crate::convert::CmarkConverter;
    use crate::document::{DocumentId, EditEvent, EditFeed};
    use crate::view::{DisposeCallback, ViewHandle, ViewHost};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct FakeViewInner {
        initial: Mutex<Option<String>>,
        updates: Mutex<Vec<String>>,
        disposed: AtomicBool,
        callbacks: Mutex<Vec<DisposeCallback>>,
    }

    #[derive(Clone, Default)]
    struct FakeView {
        inner: Arc<FakeViewInner>,
    }

    impl FakeView {
        fn updates(&self) -> Vec<String> {
            self.inner.updates.lock().expect("updates lock").clone()
        }

        fn initial(&self) -> Option<String> {
            self.inner.initial.lock().expect("initial lock").clone()
        }
    }

    impl ViewHandle for FakeView {
        fn post_update(&self, html: &str) {
            if self.is_disposed() {
                return;
            }
            self.inner
                .updates
                .lock()
                .expect("updates lock")
                .push(html.to_string());
        }

        fn on_dispose(&self, callback: DisposeCallback) {
            if self.is_disposed() {
                callback();
                return;
            }
            self.inner
                .callbacks
                .lock()
                .expect("callbacks lock")
                .push(callback);
        }

        fn dispose(&self) {
            if self.inner.disposed.swap(true, Ordering::AcqRel) {
                return;
            }
            let callbacks = std::mem::take(
                &mut *self.inner.callbacks.lock().expect("callbacks lock"),
            );
            for callback in callbacks {
                callback();
            }
        }

        fn is_disposed(&self) -> bool {
            self.inner.disposed.load(Ordering::Acquire)
        }
    }

    #[derive(Clone, Default)]
    struct FakeHost {
        view: FakeView,
    }

    impl ViewHost for FakeHost {
        fn create_view(&self, _title: &str, initial_html: String) -> Arc<dyn ViewHandle> {
            *self.view.inner.initial.lock().expect("initial lock") = Some(initial_html);
            Arc::new(self.view.clone())
        }
    }

    async fn settle() {
        // lets the pump task drain everything queued on the feed
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn opens_with_the_rendered_initial_document() {
        let host = FakeHost::default();
        let feed = EditFeed::default();

        let session = open_preview(
            "# Hello",
            DocumentId::new("mem:doc"),
            &RenderOptions::default(),
            Arc::new(CmarkConverter::default()),
            &host,
            &feed,
            "doc.md",
        )
        .expect("open preview");

        let initial = host.view.initial().expect("initial document");
        assert!(initial.contains("<h1>Hello</h1>"));
        assert!(initial.contains("<style>"));
        assert!(!session.is_closed());

        session.close();
    }

    #[tokio::test]
    async fn edits_flow_to_the_view_in_order() {
        let host = FakeHost::default();
        let feed = EditFeed::default();
        let identity = DocumentId::new("mem:doc");

        let session = open_preview(
            "start",
            identity.clone(),
            &RenderOptions::default(),
            Arc::new(CmarkConverter::default()),
            &host,
            &feed,
            "doc.md",
        )
        .expect("open preview");

        feed.publish(EditEvent {
            identity: identity.clone(),
            new_text: String::from("new text"),
        });
        feed.publish(EditEvent {
            identity: identity.clone(),
            new_text: String::from("more text"),
        });
        settle().await;

        let updates = host.view.updates();
        assert_eq!(updates.len(), 2);
        assert!(updates[0].contains("new text"));
        assert!(updates[1].contains("more text"));

        session.close();
    }

    #[tokio::test]
    async fn foreign_document_edits_are_ignored() {
        let host = FakeHost::default();
        let feed = EditFeed::default();
        let identity = DocumentId::new("mem:watched");

        let session = open_preview(
            "start",
            identity.clone(),
            &RenderOptions::default(),
            Arc::new(CmarkConverter::default()),
            &host,
            &feed,
            "doc.md",
        )
        .expect("open preview");

        feed.publish(EditEvent {
            identity: identity.clone(),
            new_text: String::from("new text"),
        });
        feed.publish(EditEvent {
            identity: DocumentId::new("mem:other"),
            new_text: String::from("unrelated"),
        });
        settle().await;

        let updates = host.view.updates();
        assert_eq!(updates.len(), 1);
        assert!(updates[0].contains("new text"));

        session.close();
    }

    #[tokio::test]
    async fn closing_the_view_releases_the_subscription() {
        let host = FakeHost::default();
        let feed = EditFeed::default();
        let identity = DocumentId::new("mem:doc");

        let session = open_preview(
            "start",
            identity.clone(),
            &RenderOptions::default(),
            Arc::new(CmarkConverter::default()),
            &host,
            &feed,
            "doc.md",
        )
        .expect("open preview");

        // disposal initiated from the view side, as when the user closes it
        host.view.dispose();
        assert!(session.is_closed());

        feed.publish(EditEvent {
            identity,
            new_text: String::from("after close"),
        });
        settle().await;

        assert!(host.view.updates().is_empty());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let host = FakeHost::default();
        let feed = EditFeed::default();

        let session = open_preview(
            "start",
            DocumentId::new("mem:doc"),
            &RenderOptions::default(),
            Arc::new(CmarkConverter::default()),
            &host,
            &feed,
            "doc.md",
        )
        .expect("open preview");

        session.close();
        session.close();
        assert!(session.is_closed());
    }
}
