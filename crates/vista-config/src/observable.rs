//! Settings wrapper that tells subscribers when its value changes.
//!
//! Preview tooling subscribes to the settings it renders and regenerates when
//! they are edited. Notification is synchronous and happens on the caller's thread.

use rustc_hash::FxHashMap;

/// Handle returned by [`Observable::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Callback<T> = Box<dyn FnMut(&T) + Send>;

pub struct Observable<T> {
    value: T,
    subscribers: FxHashMap<SubscriptionId, Callback<T>>,
    next_id: u64,
}

impl<T: Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.value)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl<T> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            subscribers: FxHashMap::default(),
            next_id: 0,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&T) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.insert(id, Box::new(callback));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Call every subscriber with the current value.
    pub fn notify_changed(&mut self) {
        let value = &self.value;
        for callback in self.subscribers.values_mut() {
            callback(value);
        }
    }

    /// Mutate the value in place, then notify.
    pub fn update(&mut self, f: impl FnOnce(&mut T)) {
        f(&mut self.value);
        self.notify_changed();
    }

    /// Replace the value and notify.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.notify_changed();
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: PartialEq> Observable<T> {
    /// Replace the value, notifying only if it differs. Returns whether it changed.
    pub fn set_if_changed(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.set(value);
        true
    }
}
