pub mod backend;
pub mod bundle;
pub mod phase_correlation;
pub mod subpixel;

pub use backend::{CorrelationBackend, RegistrationBackend};
pub use bundle::bundle_adjust;
pub use phase_correlation::{phase_correlate, Correlation};
