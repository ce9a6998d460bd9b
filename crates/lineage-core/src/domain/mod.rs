//! Domain model (ids, tasks, records, store keys, decisions, errors).

pub mod decision;
pub mod errors;
pub mod ids;
pub mod key;
pub mod record;
pub mod task;

pub use decision::{Claim, Completion, Decision, TerminalReason, decide};
pub use errors::{ErrorKind, LineageError};
pub use ids::{AncestorId, MessageId};
pub use key::StoreKey;
pub use record::{AncestorRecord, Extraction};
pub use task::{DiscoveryTask, MAX_DEPTH_CEILING};
