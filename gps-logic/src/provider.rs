use std::sync::Arc;

use crate::{
    location::LocationSample,
    prelude::*,
    settings::{ProviderKind, ProviderSettings},
};

/// Callback the platform invokes with every new fix. May be called from any thread.
pub type LocationListener = Arc<dyn Fn(LocationSample) + Send + Sync>;

/// The platform location service, owned by the platform. A session only holds on to it
/// while enabled.
pub trait LocationProvider: Send + Sync {
    /// Identifies one registered listener
    type Handle: Send + 'static;

    /// The fix the platform has cached for `kind`, if any. Can be arbitrarily old.
    fn last_known_fix(&self, kind: ProviderKind) -> Option<LocationSample>;

    /// Register `listener` to receive new fixes until the returned handle is passed to
    /// [LocationProvider::unsubscribe].
    fn subscribe(
        &self,
        settings: &ProviderSettings,
        listener: LocationListener,
    ) -> Result<Self::Handle>;

    /// Stop delivering fixes to the listener behind `handle`. Not guaranteed to be
    /// idempotent, which is why the handle is consumed.
    fn unsubscribe(&self, handle: Self::Handle) -> Result;
}

/// Whatever grants access to the platform location service (an activity, a window, a
/// service connection)
pub trait ExecutionContext {
    type Provider: LocationProvider;

    /// Get the location service, [None] when the platform doesn't offer one
    fn location_provider(&self) -> Option<Arc<Self::Provider>>;
}
