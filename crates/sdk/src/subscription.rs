//! Change notification with cancellable subscriptions.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

/// Callback receiving `(current, previous, subscription)`.
///
/// The callback may call [`Subscription::cancel`] on the handle it receives
/// to stop further notifications, including from within the call.
pub type Listener<T> = Arc<dyn Fn(&T, &T, &Subscription) + Send + Sync>;

/// Handle of a registered listener.
#[derive(Clone, Debug, Default)]
pub struct Subscription {
    cancelled: Arc<AtomicBool>,
}

impl Subscription {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        !self.cancelled.load(Ordering::SeqCst)
    }
}

/// Set of listeners notified on every change of a `T`.
pub struct Subscribers<T> {
    entries: Mutex<Vec<(Subscription, Listener<T>)>>,
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self { entries: Mutex::new(Vec::new()) }
    }
}

impl<T> std::fmt::Debug for Subscribers<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers").field("active", &self.len()).finish()
    }
}

impl<T> Subscribers<T> {
    pub fn subscribe(&self, listener: Listener<T>) -> Subscription {
        let subscription = Subscription::default();
        self.lock().push((subscription.clone(), listener));
        subscription
    }

    /// Invokes every active listener, then drops cancelled ones.
    ///
    /// Listeners run without the registry locked, so they may subscribe or
    /// cancel freely.
    pub fn notify(&self, current: &T, previous: &T) {
        let active: Vec<_> =
            self.lock().iter().filter(|(sub, _)| sub.is_active()).cloned().collect();
        for (subscription, listener) in active {
            if subscription.is_active() {
                listener(current, previous, &subscription);
            }
        }
        self.lock().retain(|(sub, _)| sub.is_active());
    }

    /// Number of active listeners.
    pub fn len(&self) -> usize {
        self.lock().iter().filter(|(sub, _)| sub.is_active()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Subscription, Listener<T>)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
