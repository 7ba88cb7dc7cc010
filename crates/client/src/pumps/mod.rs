//! Background tasks that own the two halves of the WebSocket.

pub(crate) mod read;
pub(crate) mod write;

use std::collections::HashMap;
use std::sync::Arc;

use bigfs_protocol::envelope::Message;
use tokio::sync::{Mutex, oneshot};

/// Requests awaiting a reply, keyed by message id.
pub(crate) type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<Message>>>>;
