use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;

use crate::location::LocationSample;

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    /// Advanced on every clear, fences off writers created before it
    epoch: u64,
    sample: Option<LocationSample>,
}

/// Holds at most one [LocationSample], shared between the thread delivering fixes and
/// any number of readers.
///
/// The whole value is swapped as one immutable snapshot, so a reader can never see the
/// latitude of one fix paired with the longitude of another. Reads never take a lock.
#[derive(Debug)]
pub struct SampleCache {
    current: ArcSwap<Snapshot>,
}

impl SampleCache {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot {
                epoch: 0,
                sample: None,
            }),
        }
    }

    /// Get the latest sample, if any
    pub fn read(&self) -> Option<LocationSample> {
        self.current.load().sample
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_none()
    }

    /// Replace the held sample, last writer wins
    pub fn replace(&self, sample: LocationSample) {
        self.current.rcu(|snap| Snapshot {
            epoch: snap.epoch,
            sample: Some(sample),
        });
    }

    /// Drop the held sample. Writers created before this call are no longer able to
    /// write into the cache.
    pub fn clear(&self) {
        self.current.rcu(|snap| Snapshot {
            epoch: snap.epoch.wrapping_add(1),
            sample: None,
        });
    }

    /// Create a writer bound to the current epoch, used to feed the cache from a
    /// provider callback.
    pub fn writer(self: &Arc<Self>) -> SampleWriter {
        SampleWriter {
            cache: Arc::downgrade(self),
            epoch: self.current.load().epoch,
        }
    }
}

impl Default for SampleCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Write side of a [SampleCache] handed to provider callbacks. Only holds a weak
/// reference, a provider keeping its listener around can't keep the cache alive.
#[derive(Debug, Clone)]
pub struct SampleWriter {
    cache: Weak<SampleCache>,
    epoch: u64,
}

impl SampleWriter {
    /// Store a sample, returns whether it landed. Writes after the cache was cleared or
    /// dropped are discarded.
    pub fn write(&self, sample: LocationSample) -> bool {
        let Some(cache) = self.cache.upgrade() else {
            return false;
        };

        if cache.current.load().epoch != self.epoch {
            return false;
        }

        let mut written = false;
        cache.current.rcu(|snap| {
            written = snap.epoch == self.epoch;
            if written {
                Snapshot {
                    epoch: snap.epoch,
                    sample: Some(sample),
                }
            } else {
                **snap
            }
        });
        written
    }
}
