//! Registration client: the form workflow and the HTTP API it drives.

pub mod api;
pub mod errors;
pub mod gate;
pub mod strength;
pub mod workflow;

pub use api::{HttpPortalApi, PortalApi};
pub use errors::PortalError;
pub use gate::{check_gate, GateRejection, Route, VerificationGrant};
pub use strength::{strength_score, Strength};
pub use workflow::{Activity, ActivityMonitor, FormView, Notice, RegistrationWorkflow, Stage};
