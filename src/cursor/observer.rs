//! # Cursor Observers
//!
//! Two independent observer sets hang off every cursor:
//!
//! | Set       | Trait               | Told about                                  |
//! |-----------|---------------------|---------------------------------------------|
//! | data set  | [`DataSetObserver`] | requery (`on_changed`), deactivate/close    |
//! |           |                     | (`on_invalidated`)                          |
//! | content   | [`ContentObserver`] | fine-grained changes (`on_change`)          |
//!
//! Observers are registered as `Arc<dyn ..>` and identified by pointer, so the
//! same `Arc` cannot be registered twice and unregistration needs the `Arc`
//! that was registered.
//!
//! A [`ChangeNotifier`] is the external broadcaster keyed by resource URI.
//! A cursor with a notification URI registers a private self-observer with
//! it; external changes reach the cursor's content observers as
//! `on_change(false)`, and a self-originated `on_change(true)` is echoed back
//! to the notifier with the self-observer excluded, so it never loops.

use std::sync::{Arc, Weak};

use eyre::{bail, Result};
use parking_lot::Mutex;
use smallvec::SmallVec;

use super::CursorError;

pub trait DataSetObserver: Send + Sync {
    fn on_changed(&self);

    fn on_invalidated(&self);
}

pub trait ContentObserver: Send + Sync {
    fn on_change(&self, self_change: bool);

    /// Whether this observer wants `on_change(true)` calls.
    fn deliver_self_notifications(&self) -> bool {
        false
    }
}

fn same_observer<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

macro_rules! observable {
    ($name:ident, $observer:ident) => {
        #[derive(Default)]
        pub struct $name {
            observers: Mutex<SmallVec<[Arc<dyn $observer>; 2]>>,
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("observers", &self.len())
                    .finish()
            }
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn register(&self, observer: Arc<dyn $observer>) -> Result<()> {
                let mut observers = self.observers.lock();
                if observers.iter().any(|o| same_observer(o, &observer)) {
                    bail!(CursorError::ObserverAlreadyRegistered);
                }
                observers.push(observer);
                Ok(())
            }

            pub fn unregister(&self, observer: &Arc<dyn $observer>) -> Result<()> {
                let mut observers = self.observers.lock();
                let Some(index) = observers.iter().position(|o| same_observer(o, observer)) else {
                    bail!(CursorError::ObserverNotRegistered);
                };
                observers.remove(index);
                Ok(())
            }

            pub fn unregister_all(&self) {
                self.observers.lock().clear();
            }

            pub fn len(&self) -> usize {
                self.observers.lock().len()
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            /// Most recently registered first; the lock is not held while
            /// observers run.
            fn snapshot(&self) -> SmallVec<[Arc<dyn $observer>; 2]> {
                self.observers.lock().iter().rev().cloned().collect()
            }
        }
    };
}

observable!(DataSetObservable, DataSetObserver);
observable!(ContentObservable, ContentObserver);

impl DataSetObservable {
    pub fn notify_changed(&self) {
        for observer in self.snapshot() {
            observer.on_changed();
        }
    }

    pub fn notify_invalidated(&self) {
        for observer in self.snapshot() {
            observer.on_invalidated();
        }
    }
}

impl ContentObservable {
    /// Self-originated changes only reach observers that ask for them.
    pub fn dispatch_change(&self, self_change: bool) {
        for observer in self.snapshot() {
            if !self_change || observer.deliver_self_notifications() {
                observer.on_change(self_change);
            }
        }
    }
}

/// External change broadcaster keyed by resource URI.
pub trait ChangeNotifier: Send + Sync {
    fn register_observer(&self, uri: &str, observer: Arc<dyn ContentObserver>);

    fn unregister_observer(&self, observer: &Arc<dyn ContentObserver>);

    /// Notifies every observer watching `uri` (or a parent of it) except
    /// `excluded`.
    fn notify_change(&self, uri: &str, excluded: Option<&Arc<dyn ContentObserver>>);
}

/// In-process [`ChangeNotifier`]. An observer registered for `content://a`
/// also hears about `content://a/1`.
#[derive(Default)]
pub struct LocalChangeNotifier {
    observers: Mutex<Vec<(String, Arc<dyn ContentObserver>)>>,
}

impl std::fmt::Debug for LocalChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalChangeNotifier")
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl LocalChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }
}

fn watches(registered: &str, changed: &str) -> bool {
    match changed.strip_prefix(registered) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || registered.ends_with('/'),
        None => false,
    }
}

impl ChangeNotifier for LocalChangeNotifier {
    fn register_observer(&self, uri: &str, observer: Arc<dyn ContentObserver>) {
        self.observers.lock().push((uri.to_string(), observer));
    }

    fn unregister_observer(&self, observer: &Arc<dyn ContentObserver>) {
        self.observers
            .lock()
            .retain(|(_, registered)| !same_observer(registered, observer));
    }

    fn notify_change(&self, uri: &str, excluded: Option<&Arc<dyn ContentObserver>>) {
        let targets: Vec<Arc<dyn ContentObserver>> = self
            .observers
            .lock()
            .iter()
            .filter(|(registered, _)| watches(registered, uri))
            .filter(|(_, observer)| !excluded.is_some_and(|ex| same_observer(observer, ex)))
            .map(|(_, observer)| observer.clone())
            .collect();

        for observer in targets {
            observer.on_change(false);
        }
    }
}

#[derive(Default)]
struct NotifyState {
    uri: Option<String>,
    notifier: Option<Arc<dyn ChangeNotifier>>,
    self_observer: Option<Arc<dyn ContentObserver>>,
    registered: bool,
}

/// Content observers plus the notification URI registration of one cursor.
///
/// The registration state sits behind its own lock, separate from anything
/// guarding row data, since notifications arrive on arbitrary threads.
#[derive(Default)]
pub(crate) struct CursorNotifications {
    pub(crate) content: ContentObservable,
    state: Mutex<NotifyState>,
}

struct SelfObserver {
    cursor: Weak<CursorNotifications>,
}

impl ContentObserver for SelfObserver {
    fn on_change(&self, _self_change: bool) {
        if let Some(cursor) = self.cursor.upgrade() {
            cursor.on_change(false);
        }
    }
}

impl CursorNotifications {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn on_change(&self, self_change: bool) {
        let echo = {
            let state = self.state.lock();
            match (&state.uri, &state.notifier) {
                (Some(uri), Some(notifier)) if self_change => Some((
                    uri.clone(),
                    notifier.clone(),
                    state.self_observer.clone(),
                )),
                _ => None,
            }
        };

        self.content.dispatch_change(self_change);
        if let Some((uri, notifier, self_observer)) = echo {
            notifier.notify_change(&uri, self_observer.as_ref());
        }
    }

    pub(crate) fn set_notification_uri(
        self: &Arc<Self>,
        notifier: Arc<dyn ChangeNotifier>,
        uri: &str,
    ) {
        let mut state = self.state.lock();
        if let (Some(previous), Some(observer)) = (&state.notifier, &state.self_observer) {
            if state.registered {
                previous.unregister_observer(observer);
            }
        }

        let observer: Arc<dyn ContentObserver> = Arc::new(SelfObserver {
            cursor: Arc::downgrade(self),
        });
        notifier.register_observer(uri, observer.clone());

        state.uri = Some(uri.to_string());
        state.notifier = Some(notifier);
        state.self_observer = Some(observer);
        state.registered = true;
    }

    pub(crate) fn notification_uri(&self) -> Option<String> {
        self.state.lock().uri.clone()
    }

    pub(crate) fn unregister_self(&self) {
        let mut state = self.state.lock();
        if !state.registered {
            return;
        }
        if let (Some(notifier), Some(observer)) = (&state.notifier, &state.self_observer) {
            notifier.unregister_observer(observer);
        }
        state.registered = false;
    }

    pub(crate) fn reregister_self(&self) {
        let mut state = self.state.lock();
        if state.registered {
            return;
        }
        let (Some(uri), Some(notifier), Some(observer)) =
            (&state.uri, &state.notifier, &state.self_observer)
        else {
            return;
        };
        notifier.register_observer(uri, observer.clone());
        state.registered = true;
    }
}
