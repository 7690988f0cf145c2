//! Data models for queue operations

use serde::{Deserialize, Serialize};

/// A message handed out by a receive call
///
/// `pop_receipt` proves the receiver holds the current visibility lease and
/// is required, together with `message_id`, to delete the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub message_id: String,
    pub pop_receipt: String,
    pub text: String,
    pub dequeue_count: u64,
}
