use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};

use crate::{
    cache::SampleCache,
    location::{INVALID_COORDINATE, LocationComponent, LocationSample},
    provider::{ExecutionContext, LocationListener, LocationProvider},
    settings::ProviderSettings,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No usable execution context was passed
    #[error("No usable execution context")]
    InvalidContext,
    /// The platform offers no location service
    #[error("Location service unavailable")]
    CapabilityUnavailable,
    /// The platform rejected the subscription, usually a missing permission
    #[error("Failed to subscribe to location updates: {0}")]
    SubscriptionFailed(String),
    /// The platform failed to remove the listener, always swallowed
    #[error("Failed to unsubscribe from location updates: {0}")]
    UnsubscribeFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of a successful [LocationSession::enable]
pub enum EnableOutcome {
    /// Subscribed, the cache follows new fixes
    Active,
    /// Enabled without a subscription, reads stay on the primed fix (if there was one)
    /// until the session is disabled
    Degraded(SessionError),
    /// The session was already enabled, nothing was done
    AlreadyEnabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Disabled,
    Active,
    Degraded,
}

/// Clears the cache when dropped unless disarmed, also while unwinding out of a
/// panicking provider
struct ClearOnDrop<'a> {
    cache: &'a SampleCache,
    armed: bool,
}

impl<'a> ClearOnDrop<'a> {
    fn new(cache: &'a SampleCache) -> Self {
        Self { cache, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.cache.clear();
        }
    }
}

enum Lifecycle<P: LocationProvider> {
    Disabled,
    Enabled {
        provider: Arc<P>,
        subscription: Option<P::Handle>,
    },
}

/// Tracks the latest fix of a single location provider.
///
/// [LocationSession::enable] and [LocationSession::disable] are serialized by one lock,
/// which is never taken by the provider callback or by the coordinate getters. Those
/// only touch the [SampleCache] and can be called from any thread at any time.
///
/// Dropping the session disables it.
pub struct LocationSession<P: LocationProvider> {
    settings: ProviderSettings,
    cache: Arc<SampleCache>,
    lifecycle: Mutex<Lifecycle<P>>,
}

impl<P: LocationProvider> LocationSession<P> {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            cache: Arc::new(SampleCache::new()),
            lifecycle: Mutex::new(Lifecycle::Disabled),
        }
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle<P>> {
        // The lifecycle is only written once a transition is complete and the cache is
        // reset on unwind, so the state behind a poisoned lock is still consistent
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Start tracking with the location service of `context`.
    ///
    /// The cache is primed with the provider's last known fix before subscribing. If the
    /// subscription is rejected the session still becomes enabled, see
    /// [EnableOutcome::Degraded]. Calling this on an enabled session does nothing.
    pub fn enable<C>(&self, context: Option<&C>) -> Result<EnableOutcome, SessionError>
    where
        C: ExecutionContext<Provider = P>,
    {
        let Some(context) = context else {
            warn!("Not enabling location session, no context");
            return Err(SessionError::InvalidContext);
        };

        let mut lifecycle = self.lifecycle();

        if let Lifecycle::Enabled { .. } = &*lifecycle {
            debug!("Location session already enabled");
            return Ok(EnableOutcome::AlreadyEnabled);
        }

        let Some(provider) = context.location_provider() else {
            warn!("Can not get location provider");
            return Err(SessionError::CapabilityUnavailable);
        };
        info!("Got location provider");

        // Drop the primed fix again if the provider panics before we're enabled
        let reset = ClearOnDrop::new(&self.cache);

        let kind = self.settings.provider_kind;
        if let Some(fix) = provider.last_known_fix(kind) {
            info!("Primed with last known location");
            self.cache.replace(fix);
        } else {
            debug!("No last known location for {kind:?}");
        }

        let writer = self.cache.writer();
        let listener: LocationListener = Arc::new(move |fix| {
            writer.write(fix);
        });

        let (subscription, outcome) = match provider.subscribe(&self.settings, listener) {
            Ok(handle) => {
                info!("Subscribed to location updates");
                (Some(handle), EnableOutcome::Active)
            }
            Err(why) => {
                let err = SessionError::SubscriptionFailed(format!("{why:#}"));
                warn!("{err}, staying on the last known location");
                (None, EnableOutcome::Degraded(err))
            }
        };

        *lifecycle = Lifecycle::Enabled {
            provider,
            subscription,
        };
        reset.disarm();

        Ok(outcome)
    }

    /// Stop tracking. Releases the subscription if one is held and clears the cache, the
    /// session always ends up disabled. Does nothing if already disabled.
    pub fn disable(&self) {
        let mut lifecycle = self.lifecycle();

        let Lifecycle::Enabled {
            provider,
            subscription,
        } = std::mem::replace(&mut *lifecycle, Lifecycle::Disabled)
        else {
            debug!("Location session already disabled");
            return;
        };

        // Clears once unsubscribe returned or unwound, a write racing the unsubscribe is
        // fenced off by the cache
        let _clear = ClearOnDrop::new(&self.cache);

        if let Some(handle) = subscription {
            if let Err(why) = provider.unsubscribe(handle) {
                warn!("{}", SessionError::UnsubscribeFailed(format!("{why:#}")));
            }
        }

        info!("Location session disabled");
    }

    /// Enable or disable depending on `enabled`, returns the resulting status
    pub fn set_enabled<C>(
        &self,
        enabled: bool,
        context: Option<&C>,
    ) -> Result<SessionStatus, SessionError>
    where
        C: ExecutionContext<Provider = P>,
    {
        if enabled {
            self.enable(context)?;
        } else {
            self.disable();
        }
        Ok(self.status())
    }

    pub fn is_enabled(&self) -> bool {
        self.status() != SessionStatus::Disabled
    }

    pub fn status(&self) -> SessionStatus {
        match &*self.lifecycle() {
            Lifecycle::Disabled => SessionStatus::Disabled,
            Lifecycle::Enabled {
                subscription: Some(_),
                ..
            } => SessionStatus::Active,
            Lifecycle::Enabled {
                subscription: None, ..
            } => SessionStatus::Degraded,
        }
    }

    /// Latest fix with both coordinates from the same sample
    pub fn position(&self) -> Option<LocationSample> {
        self.cache.read()
    }

    /// Latitude of the latest fix, [INVALID_COORDINATE] if there is none
    pub fn latitude(&self) -> LocationComponent {
        self.position().map_or(INVALID_COORDINATE, |s| s.lat)
    }

    /// Longitude of the latest fix, [INVALID_COORDINATE] if there is none
    pub fn longitude(&self) -> LocationComponent {
        self.position().map_or(INVALID_COORDINATE, |s| s.long)
    }
}

impl<P: LocationProvider> Default for LocationSession<P> {
    fn default() -> Self {
        Self::new(ProviderSettings::default())
    }
}

impl<P: LocationProvider> Drop for LocationSession<P> {
    fn drop(&mut self) {
        self.disable();
    }
}
