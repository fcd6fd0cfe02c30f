//! Event handler storage and subscription handles.
//!
//! Handlers live in [`HandlerMap`]s keyed by [`HandlerId`], backed by an
//! [`IndexMap`] so dispatch follows registration order and removal is O(1).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

/// Unique identifier for event handlers.
pub type HandlerId = u64;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a new globally-unique handler ID.
pub fn next_handler_id() -> HandlerId {
	NEXT_HANDLER_ID.fetch_add(1, Ordering::SeqCst)
}

/// Synchronous handler invoked on the connection's driver task.
pub type HandlerFn<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Handler storage shared between the manager and its subscriptions.
pub type HandlerMap<E> = Arc<Mutex<IndexMap<HandlerId, HandlerFn<E>>>>;

pub fn new_handler_map<E>() -> HandlerMap<E> {
	Arc::new(Mutex::new(IndexMap::new()))
}

/// Registers `handler` in `map` and returns a handle that removes it on drop.
pub fn register<E, F>(map: &HandlerMap<E>, handler: F) -> Subscription
where
	E: 'static,
	F: Fn(&E) + Send + Sync + 'static,
{
	let id = next_handler_id();
	map.lock().insert(id, Arc::new(handler));
	Subscription::from_handler_map(id, map)
}

/// Invokes every handler in `map` with `event`, in registration order.
///
/// Handlers are cloned out first so a handler may subscribe or unsubscribe
/// without deadlocking. Returns the number of handlers called.
pub fn dispatch<E>(map: &HandlerMap<E>, event: &E) -> usize {
	let handlers: Vec<HandlerFn<E>> = map.lock().values().cloned().collect();
	for handler in &handlers {
		handler(event);
	}
	handlers.len()
}

/// RAII handle that unregisters an event handler on drop.
///
/// Holds a weak reference to the handler map, so dropping after the owning
/// connection is gone (or after a bulk unsubscribe) is a no-op.
pub struct Subscription {
	id: HandlerId,
	dropper: Option<Arc<dyn Fn(HandlerId) + Send + Sync>>,
}

impl Subscription {
	/// Creates a subscription with a custom dropper function.
	pub fn new(id: HandlerId, dropper: Arc<dyn Fn(HandlerId) + Send + Sync>) -> Self {
		Self {
			id,
			dropper: Some(dropper),
		}
	}

	/// Creates a subscription from a handler map using a weak reference.
	pub fn from_handler_map<E: 'static>(id: HandlerId, handlers: &HandlerMap<E>) -> Self {
		let weak: Weak<Mutex<IndexMap<HandlerId, HandlerFn<E>>>> = Arc::downgrade(handlers);
		let dropper = Arc::new(move |id: HandlerId| {
			if let Some(map) = weak.upgrade() {
				map.lock().shift_remove(&id);
			}
		});
		Self::new(id, dropper)
	}

	/// Returns this subscription's handler ID.
	pub fn id(&self) -> HandlerId {
		self.id
	}

	/// Explicitly unsubscribes. Equivalent to dropping.
	pub fn unsubscribe(mut self) {
		if let Some(dropper) = self.dropper.take() {
			(dropper)(self.id);
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(dropper) = self.dropper.take() {
			(dropper)(self.id);
		}
	}
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("active", &self.dropper.is_some())
			.finish()
	}
}
