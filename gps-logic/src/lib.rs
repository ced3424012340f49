mod cache;
mod location;
mod provider;
mod session;
mod settings;
#[cfg(test)]
mod tests;

pub use cache::{SampleCache, SampleWriter};
pub use location::{INVALID_COORDINATE, LocationComponent, LocationSample, MercatorPoint};
pub use provider::{ExecutionContext, LocationListener, LocationProvider};
pub use session::{EnableOutcome, LocationSession, SessionError, SessionStatus};
pub use settings::{ProviderKind, ProviderSettings};

pub mod prelude {
    use anyhow::Error as AnyhowError;
    use std::result::Result as StdResult;
    pub type Result<T = (), E = AnyhowError> = StdResult<T, E>;
    pub use anyhow::Context;
}
