//! Tiered wildfire response engine.

pub mod backend;
pub mod completion;
pub mod error;
pub mod escalation;
pub mod events;
pub mod intake;
pub mod orchestrator;
pub mod planner;
pub mod registry;
mod state;
pub mod status;
mod timers;
pub mod updates;

pub use backend::{HttpMissionBackend, MissionBackend, MissionCreateRequest};
pub use completion::CompletionReport;
pub use error::{BackendError, CompletionError, DispatchError, EscalationError};
pub use escalation::VerificationOutcome;
pub use events::OrchestratorEvent;
pub use intake::{InboundDetection, SimulatedDetection};
pub use orchestrator::{DetectionOutcome, Orchestrator, OrchestratorParts};
pub use registry::{AssetRegistry, AssetSummary, default_fleet};
pub use status::SystemStatus;
pub use updates::{DiscardPublisher, RecordingPublisher, UpdatePublisher};
