//! Long-poll relay core: who is waiting, and how a published message
//! reaches them.

pub mod broadcast;
pub mod registry;
pub mod users;

pub use broadcast::{Broadcaster, Delivery, PublishError};
pub use registry::{WaitError, WaitHandle, WaiterRegistry};
pub use users::{ClaimError, UserDirectory};
