use std::sync::Arc;

pub type NextFn<T> = Arc<dyn Fn(&T) + Send + Sync + 'static>;
pub type CompleteFn = Arc<dyn Fn() + Send + Sync + 'static>;

/// Observer with optional callbacks, handed to event sources such as host routers.
#[derive(Clone)]
pub struct PartialObserver<T> {
    pub next: Option<NextFn<T>>,
    pub complete: Option<CompleteFn>,
}

impl<T> PartialObserver<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_next<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.next = Some(Arc::new(callback));
        self
    }

    pub fn with_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.complete = Some(Arc::new(callback));
        self
    }

    pub fn notify_next(&self, value: &T) {
        if let Some(next) = &self.next {
            next(value);
        }
    }

    pub fn notify_complete(&self) {
        if let Some(complete) = &self.complete {
            complete();
        }
    }
}

impl<T> Default for PartialObserver<T> {
    fn default() -> Self {
        Self {
            next: None,
            complete: None,
        }
    }
}

pub type Unsubscribe = Box<dyn FnOnce() + Send + 'static>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn empty_observer_ignores_notifications() {
        let observer = PartialObserver::<u32>::new();
        observer.notify_next(&7);
        observer.notify_complete();
    }

    #[test]
    fn callbacks_receive_values() {
        let seen = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));
        let seen_cb = Arc::clone(&seen);
        let completed_cb = Arc::clone(&completed);
        let observer = PartialObserver::new()
            .with_next(move |value: &usize| {
                seen_cb.fetch_add(*value, Ordering::SeqCst);
            })
            .with_complete(move || {
                completed_cb.fetch_add(1, Ordering::SeqCst);
            });

        observer.notify_next(&3);
        observer.notify_next(&4);
        observer.notify_complete();

        assert_eq!(seen.load(Ordering::SeqCst), 7);
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }
}
