//! sigil telemetry modules.

pub mod tracing {
    //! Tracing core rexport and utilities, for your convenience

    pub use ::tracing::*;

    pub use ::tracing_subscriber as subscriber;
}
