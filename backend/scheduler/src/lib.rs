//! `wird-scheduler`: the reminder engine.
//!
//! - [`registry`]: named daily triggers with replace/cancel semantics
//! - [`dispatcher`]: failure-isolated fan-out
//! - [`deliveries`]: what each reminder sends
//! - [`jobs`] and [`dynamic`]: which triggers exist and when they fire
//! - [`service`]: the facade the command layer talks to

pub mod clock;
pub mod deliveries;
pub mod dispatcher;
pub mod dynamic;
pub mod jobs;
pub mod registry;
pub mod service;
pub mod settings;

#[cfg(test)]
mod testing;

pub use clock::{next_occurrence, Clock, SystemClock, TokioClock};
pub use deliveries::{baqarah_pages, DeliveryEngine};
pub use dispatcher::{broadcast, BroadcastReport, Pacing};
pub use dynamic::{DynamicScheduler, LocationGroup};
pub use jobs::{register_fixed_jobs, FixedJob};
pub use registry::{callback, FireContext, TriggerCallback, TriggerInfo, TriggerRegistry};
pub use service::WirdService;
pub use settings::EngineSettings;
