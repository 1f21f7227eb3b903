use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Handler invoked with a raw channel payload
pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// The raw sink wrapped by [`FunctionPublisher`]
pub type RawPublishFn = Arc<dyn Fn(&str, Value) -> anyhow::Result<()> + Send + Sync>;

/// Receives failures swallowed by a publisher: `(channel, error)`
pub type PublishErrorHandler = Arc<dyn Fn(&str, &anyhow::Error) + Send + Sync>;

/// Receives payloads rejected by [`subscribe_json`]
pub type InvalidPayloadHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Publishing side of a pub/sub channel. Implementations must not panic or fail.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, channel: &str, payload: Value);
}

/// Subscribing side of a pub/sub channel
pub trait EventSubscriber: Send + Sync {
    fn on(&self, channel: &str, handler: EventHandler) -> Unsubscribe;
}

/// Handle returned by every subscription. Dropping it keeps the listener alive;
/// call [`Unsubscribe::unsubscribe`] to detach.
#[must_use = "keep the handle to be able to unsubscribe"]
pub struct Unsubscribe {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Unsubscribe {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run a listener, logging instead of unwinding into the emitter.
pub(crate) fn call_isolated(context: &str, f: impl FnOnce()) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
        log::warn!(
            "Listener for {context} panicked: {}",
            panic_message(payload.as_ref())
        );
    }
}

struct ListenerSet<E> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Arc<dyn Fn(&E) + Send + Sync>)>>,
}

/// Typed, channel-less listener list with per-listener panic isolation.
pub struct Listeners<E> {
    inner: Arc<ListenerSet<E>>,
}

impl<E: 'static> Listeners<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ListenerSet {
                next_id: AtomicU64::new(1),
                entries: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn subscribe(&self, handler: Arc<dyn Fn(&E) + Send + Sync>) -> Unsubscribe {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.entries).push((id, handler));

        let weak: Weak<ListenerSet<E>> = Arc::downgrade(&self.inner);
        Unsubscribe::new(move || {
            if let Some(set) = weak.upgrade() {
                lock(&set.entries).retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }

    /// Deliver `event` to every listener registered at call time.
    pub fn emit(&self, context: &str, event: &E) {
        let snapshot: Vec<_> = lock(&self.inner.entries)
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in snapshot {
            call_isolated(context, || handler(event));
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.inner.entries).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: 'static> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// In-process pub/sub bus implementing both sides of the channel contract.
#[derive(Default)]
pub struct LocalEventBus {
    channels: Mutex<HashMap<String, Listeners<Value>>>,
}

impl LocalEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn listener_count(&self, channel: &str) -> usize {
        lock(&self.channels).get(channel).map_or(0, Listeners::len)
    }
}

impl EventPublisher for LocalEventBus {
    fn publish(&self, channel: &str, payload: Value) {
        let listeners = lock(&self.channels).get(channel).map(|l| Listeners {
            inner: Arc::clone(&l.inner),
        });
        if let Some(listeners) = listeners {
            listeners.emit(channel, &payload);
        }
    }
}

impl EventSubscriber for LocalEventBus {
    fn on(&self, channel: &str, handler: EventHandler) -> Unsubscribe {
        lock(&self.channels)
            .entry(channel.to_string())
            .or_default()
            .subscribe(handler)
    }
}

/// Options for [`FunctionPublisher`]
#[derive(Clone, Default)]
pub struct FunctionPublisherOptions {
    /// Prepended verbatim to every channel name
    pub channel_prefix: Option<String>,
    /// Send payloads as JSON text instead of structured values
    pub serialize_json: bool,
    pub on_error: Option<PublishErrorHandler>,
}

/// Adapts a raw publish function into an [`EventPublisher`].
///
/// Errors and panics raised by the raw function are routed to `on_error`
/// (or logged) and never reach the caller.
pub struct FunctionPublisher {
    publish: RawPublishFn,
    options: FunctionPublisherOptions,
}

impl FunctionPublisher {
    pub fn new(publish: RawPublishFn) -> Self {
        Self::with_options(publish, FunctionPublisherOptions::default())
    }

    pub fn with_options(publish: RawPublishFn, options: FunctionPublisherOptions) -> Self {
        Self { publish, options }
    }

    fn report(&self, channel: &str, err: &anyhow::Error) {
        match &self.options.on_error {
            Some(on_error) => call_isolated("publish error handler", || on_error(channel, err)),
            None => log::warn!("Publish to {channel} failed: {err:#}"),
        }
    }
}

impl EventPublisher for FunctionPublisher {
    fn publish(&self, channel: &str, payload: Value) {
        let channel = match &self.options.channel_prefix {
            Some(prefix) => format!("{prefix}{channel}"),
            None => channel.to_string(),
        };

        let payload = if self.options.serialize_json {
            match serde_json::to_string(&payload) {
                Ok(text) => Value::String(text),
                Err(err) => {
                    self.report(&channel, &err.into());
                    return;
                }
            }
        } else {
            payload
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| (self.publish)(&channel, payload)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => self.report(&channel, &err),
            Err(panic) => {
                let err = anyhow::anyhow!("publisher panicked: {}", panic_message(panic.as_ref()));
                self.report(&channel, &err);
            }
        }
    }
}

/// Fans each publish out to every target; one failing target never blocks the rest.
#[derive(Default, Clone)]
pub struct CompositePublisher {
    targets: Vec<Arc<dyn EventPublisher>>,
}

impl CompositePublisher {
    #[must_use]
    pub fn new(targets: Vec<Arc<dyn EventPublisher>>) -> Self {
        Self { targets }
    }

    pub fn push(&mut self, target: Arc<dyn EventPublisher>) {
        self.targets.push(target);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl EventPublisher for CompositePublisher {
    fn publish(&self, channel: &str, payload: Value) {
        for target in &self.targets {
            let payload = payload.clone();
            call_isolated(channel, || target.publish(channel, payload));
        }
    }
}

/// JSON text payloads are parsed; any other payload (including non-JSON text) passes through.
fn normalize_payload(payload: &Value) -> Value {
    match payload {
        Value::String(text) => {
            serde_json::from_str::<Value>(text).unwrap_or_else(|_| payload.clone())
        }
        other => other.clone(),
    }
}

/// Subscribe with typed, guarded delivery.
///
/// Payloads are normalised (JSON text is parsed), deserialised into `T` and
/// checked by `guard`. Only payloads passing both reach `handler`; the rest are
/// handed to `on_invalid` when given and otherwise dropped.
pub fn subscribe_json<T, G, H>(
    subscriber: &dyn EventSubscriber,
    channel: &str,
    guard: G,
    handler: H,
    on_invalid: Option<InvalidPayloadHandler>,
) -> Unsubscribe
where
    T: DeserializeOwned + 'static,
    G: Fn(&T) -> bool + Send + Sync + 'static,
    H: Fn(T) + Send + Sync + 'static,
{
    let channel_name = channel.to_string();
    let wrapped: EventHandler = Arc::new(move |raw: &Value| {
        let value = normalize_payload(raw);
        let accepted = serde_json::from_value::<T>(value.clone())
            .ok()
            .filter(|typed| guard(typed));
        match accepted {
            Some(typed) => handler(typed),
            None => {
                log::debug!("Dropping invalid payload on {channel_name}");
                if let Some(on_invalid) = &on_invalid {
                    on_invalid(&value);
                }
            }
        }
    });
    subscriber.on(channel, wrapped)
}
