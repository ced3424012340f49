use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use gps_logic::{
    ExecutionContext, LocationListener, LocationProvider, LocationSample, ProviderKind,
    ProviderSettings,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::prelude::*;

const EARTH_RADIUS_M: f64 = 6371000.0;
const METERS_PER_DEGREE: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
/// How the simulated device moves and how the simulated platform behaves
pub struct SimulationOptions {
    /// Where the device starts
    pub start: LocationSample,
    /// Movement per update, in degrees
    pub step: LocationSample,
    /// Random noise added to every fix, in meters
    pub jitter_m: f64,
    /// Fix the platform reports as last known
    pub last_known: Option<LocationSample>,
    /// Reject subscriptions as if the location permission was denied
    pub deny_subscribe: bool,
    /// Fail to remove listeners
    pub fail_unsubscribe: bool,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        let start = LocationSample::new(55.7558, 37.6173);
        Self {
            start,
            step: LocationSample::new(0.0001, 0.0001),
            jitter_m: 0.0,
            last_known: Some(start),
            deny_subscribe: false,
            fail_unsubscribe: false,
        }
    }
}

/// Great-circle distance between two samples in meters
pub fn distance_m(a: &LocationSample, b: &LocationSample) -> f64 {
    let (lat_a, lat_b) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = lat_b - lat_a;
    let d_long = (b.long - a.long).to_radians();
    let h = (d_lat * 0.5).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_long * 0.5).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

fn advance(from: &LocationSample, step: &LocationSample) -> LocationSample {
    LocationSample {
        lat: (from.lat + step.lat).clamp(-90.0, 90.0),
        long: (from.long + step.long + 180.0).rem_euclid(360.0) - 180.0,
    }
}

fn jitter(sample: LocationSample, jitter_m: f64) -> LocationSample {
    if jitter_m <= 0.0 {
        return sample;
    }
    let noise = jitter_m / METERS_PER_DEGREE;
    LocationSample {
        lat: sample.lat + rand::random_range(-noise..=noise),
        long: sample.long + rand::random_range(-noise..=noise),
    }
}

/// Location service backed by a background task walking a straight track
pub struct SimulatedProvider {
    options: SimulationOptions,
    runtime: Handle,
    subscriptions: Mutex<HashMap<Uuid, CancellationToken>>,
    emitted: Arc<AtomicUsize>,
}

impl SimulatedProvider {
    /// Needs to be called from within a tokio runtime, update tasks are spawned onto it
    pub fn new(options: SimulationOptions) -> Result<Self> {
        let runtime = Handle::try_current().context("Simulated provider needs a tokio runtime")?;
        Ok(Self {
            options,
            runtime,
            subscriptions: Mutex::new(HashMap::with_capacity(1)),
            emitted: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Number of fixes delivered to listeners so far
    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::Relaxed)
    }

    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }

    async fn emit_fixes(
        options: SimulationOptions,
        settings: ProviderSettings,
        listener: LocationListener,
        emitted: Arc<AtomicUsize>,
        cancel: CancellationToken,
    ) {
        let period = settings.min_interval().max(Duration::from_millis(1));
        let mut interval = tokio::time::interval(period);
        let mut position = options.start;
        let mut last_sent: Option<LocationSample> = None;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    break;
                }

                _ = interval.tick() => {
                    let fix = jitter(position, options.jitter_m);
                    let far_enough = last_sent.is_none_or(|last| {
                        distance_m(&last, &fix) >= f64::from(settings.min_distance_m)
                    });
                    if far_enough {
                        listener(fix);
                        emitted.fetch_add(1, Ordering::Relaxed);
                        last_sent = Some(fix);
                    }
                    position = advance(&position, &options.step);
                }
            }
        }
    }
}

impl LocationProvider for SimulatedProvider {
    type Handle = Uuid;

    fn last_known_fix(&self, kind: ProviderKind) -> Option<LocationSample> {
        debug!("Last known fix requested for {kind:?}");
        self.options.last_known
    }

    fn subscribe(&self, settings: &ProviderSettings, listener: LocationListener) -> Result<Uuid> {
        if self.options.deny_subscribe {
            bail!("Location permission denied");
        }

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        self.subscriptions
            .lock()
            .unwrap()
            .insert(id, cancel.clone());

        info!(
            "Simulating {:?} updates every {}ms / {}m for {id}",
            settings.provider_kind, settings.min_interval_ms, settings.min_distance_m
        );

        self.runtime.spawn(Self::emit_fixes(
            self.options.clone(),
            settings.clone(),
            listener,
            self.emitted.clone(),
            cancel,
        ));

        Ok(id)
    }

    fn unsubscribe(&self, handle: Uuid) -> Result {
        if self.options.fail_unsubscribe {
            bail!("Simulated platform failure removing {handle}");
        }

        let cancel = self
            .subscriptions
            .lock()
            .unwrap()
            .remove(&handle)
            .ok_or_else(|| anyhow!("Unknown subscription {handle}"))?;
        cancel.cancel();
        info!("Stopped simulated updates for {handle}");
        Ok(())
    }
}

impl Drop for SimulatedProvider {
    fn drop(&mut self) {
        // Listeners that were never removed would keep their task alive otherwise
        let subscriptions = self
            .subscriptions
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for (id, cancel) in subscriptions.drain() {
            debug!("Stopping leftover simulated updates for {id}");
            cancel.cancel();
        }
    }
}

/// Execution context granting access to a [SimulatedProvider], or to nothing at all
pub struct SimulatedPlatform {
    provider: Option<Arc<SimulatedProvider>>,
}

impl SimulatedPlatform {
    pub fn new(options: SimulationOptions) -> Result<Self> {
        let provider = SimulatedProvider::new(options)?;
        Ok(Self {
            provider: Some(Arc::new(provider)),
        })
    }

    /// A platform without a location service
    pub fn without_location() -> Self {
        Self { provider: None }
    }

    pub fn provider(&self) -> Option<&Arc<SimulatedProvider>> {
        self.provider.as_ref()
    }
}

impl ExecutionContext for SimulatedPlatform {
    type Provider = SimulatedProvider;

    fn location_provider(&self) -> Option<Arc<SimulatedProvider>> {
        self.provider.clone()
    }
}
