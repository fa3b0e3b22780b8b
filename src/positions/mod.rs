// Position management: data model, per-tick state machine, fill application
pub mod apply;
pub mod engine;
pub mod machine;
pub mod transitions;
pub mod types;

// Public API exports
pub use apply::{apply_transition, ApplyEffects};
pub use engine::RiskEngine;
pub use machine::evaluate_tick;
pub use transitions::PositionTransition;
pub use types::{PendingDecision, Position, PositionId, PositionPhase, PositionSnapshot, RealizedExit};
