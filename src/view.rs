use std::sync::Arc;

pub type DisposeCallback = Box<dyn FnOnce() + Send>;

/// A live rendered surface. Updates replace the content region in place;
/// disposal is terminal and idempotent.
pub trait ViewHandle: Send + Sync {
    fn post_update(&self, html: &str);

    /// Registers a callback to run when the view is disposed. Callbacks
    /// registered after disposal run immediately, so a watch subscription
    /// can never outlive its view.
    fn on_dispose(&self, callback: DisposeCallback);

    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

pub trait ViewHost {
    fn create_view(&self, title: &str, initial_html: String) -> Arc<dyn ViewHandle>;
}
