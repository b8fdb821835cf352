//! Client surface.
//!
//! Every layer, from the base client to the outermost decorator, exposes the
//! same [`NetworkKit`] interface. Implementation details are split into
//! submodules under `src/client/`.

pub mod builder;
pub mod core;
pub mod decorator;
mod execution;
pub mod layers;

pub use builder::{NetworkKitBuilder, ResilientNetworkKit};
pub use core::{BaseNetworkKit, NetworkKit, NetworkKitExt, NetworkResponse};
pub use decorator::{Decorated, Decorator};
pub use layers::{AdvancedRetryLayer, CircuitBreakerLayer, TokenRefreshLayer};
