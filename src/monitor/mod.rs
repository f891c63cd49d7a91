// Service-state tracking and notification decisions

pub mod context;
pub mod coordinator;
pub mod evaluator;
pub mod grace;
pub mod lock;
pub mod state;


pub use context::RunContext;
pub use coordinator::{resolve_units, RunCoordinator, RunOutcome, RunReport, UnitFailure};
pub use evaluator::{decide, Classification, Decision, Delivery, StateEvaluator, UnitReport};
pub use grace::in_grace;
pub use lock::RunLock;
pub use state::{FileStateStore, MemoryStateStore, StateStore, UnitRecord};
