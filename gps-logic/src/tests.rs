use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
};

use anyhow::{anyhow, bail};

use crate::{
    ExecutionContext, LocationListener, LocationProvider, LocationSample, ProviderKind,
    ProviderSettings, prelude::*,
};

type Listeners = HashMap<u64, LocationListener>;

/// Provider double that counts calls and lets tests push fixes by hand
#[derive(Default)]
pub struct MockProvider {
    last_known: Mutex<Option<LocationSample>>,
    pub deny_subscribe: AtomicBool,
    pub fail_unsubscribe: AtomicBool,
    pub panic_subscribe: AtomicBool,
    pub panic_unsubscribe: AtomicBool,
    subscribe_calls: AtomicUsize,
    unsubscribe_calls: AtomicUsize,
    next_handle: AtomicU64,
    active: Mutex<Listeners>,
    /// Every listener ever registered, including removed ones
    retained: Mutex<Vec<LocationListener>>,
    queried_kind: Mutex<Option<ProviderKind>>,
    subscribed_with: Mutex<Option<ProviderSettings>>,
}

impl MockProvider {
    pub fn with_fix(fix: LocationSample) -> Self {
        let provider = Self::default();
        provider.set_last_known(Some(fix));
        provider
    }

    pub fn denying() -> Self {
        let provider = Self::default();
        provider.deny_subscribe.store(true, Ordering::SeqCst);
        provider
    }

    pub fn set_last_known(&self, fix: Option<LocationSample>) {
        *self.last_known.lock().unwrap() = fix;
    }

    /// Deliver a fix to all active listeners
    pub fn push_fix(&self, fix: LocationSample) {
        let listeners = self.active.lock().unwrap().values().cloned().collect::<Vec<_>>();
        for listener in listeners {
            listener(fix);
        }
    }

    /// Deliver a fix to every listener ever registered, like a platform callback that was
    /// already in flight when the listener got removed
    pub fn push_stale_fix(&self, fix: LocationSample) {
        let listeners = self.retained.lock().unwrap().clone();
        for listener in listeners {
            listener(fix);
        }
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }

    pub fn active_listeners(&self) -> usize {
        self.active.lock().unwrap().len()
    }

    pub fn queried_kind(&self) -> Option<ProviderKind> {
        *self.queried_kind.lock().unwrap()
    }

    pub fn subscribed_with(&self) -> Option<ProviderSettings> {
        self.subscribed_with.lock().unwrap().clone()
    }
}

impl LocationProvider for MockProvider {
    type Handle = u64;

    fn last_known_fix(&self, kind: ProviderKind) -> Option<LocationSample> {
        *self.queried_kind.lock().unwrap() = Some(kind);
        *self.last_known.lock().unwrap()
    }

    fn subscribe(&self, settings: &ProviderSettings, listener: LocationListener) -> Result<u64> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_subscribe.load(Ordering::SeqCst) {
            panic!("Provider crashed while subscribing");
        }
        if self.deny_subscribe.load(Ordering::SeqCst) {
            bail!("Permission denied");
        }
        *self.subscribed_with.lock().unwrap() = Some(settings.clone());
        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.retained.lock().unwrap().push(listener.clone());
        self.active.lock().unwrap().insert(handle, listener);
        Ok(handle)
    }

    fn unsubscribe(&self, handle: u64) -> Result {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_unsubscribe.load(Ordering::SeqCst) {
            panic!("Provider crashed while unsubscribing");
        }
        if self.fail_unsubscribe.load(Ordering::SeqCst) {
            bail!("Platform error while removing updates");
        }
        self.active
            .lock()
            .unwrap()
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| anyhow!("Unknown listener {handle}"))
    }
}

/// Context double, hands out the same provider every time (or none at all)
pub struct MockContext {
    pub provider: Option<Arc<MockProvider>>,
}

impl MockContext {
    pub fn new(provider: MockProvider) -> (Self, Arc<MockProvider>) {
        let provider = Arc::new(provider);
        (
            Self {
                provider: Some(provider.clone()),
            },
            provider,
        )
    }

    pub fn without_provider() -> Self {
        Self { provider: None }
    }
}

impl ExecutionContext for MockContext {
    type Provider = MockProvider;

    fn location_provider(&self) -> Option<Arc<MockProvider>> {
        self.provider.clone()
    }
}
