//! Ports: interfaces to the engine's external collaborators.
//!
//! Adapters live in the infrastructure layer.

pub mod changelog;
pub mod model_gateway;
pub mod progress;
pub mod resumption_store;
pub mod thread_store;

pub use changelog::ChangelogQuery;
pub use model_gateway::{
    GatewayError, ModelGateway, ModerationRequest, StreamEvent, StreamHandle, TurnOutcome,
    TurnRequest,
};
pub use progress::{NoProgress, RoundProgress};
pub use resumption_store::{ResumptionStore, active_key, stream_key};
pub use thread_store::{MessagePatch, PatchOutcome, StoreError, ThreadPatch, ThreadStore};
