//! Queue module: message state, redelivery backoff, and the in-memory Work Queue.

mod memory;
mod record;
mod retry;
mod state;

pub use memory::InMemoryQueue;
pub use record::{DeadLetter, MessageRecord};
pub use retry::{MAX_RECEIVES_LIMIT, RetryPolicy};
pub use state::MessageState;
