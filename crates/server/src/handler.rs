//! Handler trait for processing client requests.
//!
//! Implementors provide the file operations while the server framework
//! handles connection management and routing.

use std::future::Future;
use std::pin::Pin;

use bigfs_protocol::envelope::Message;
use bigfs_protocol::{ErrorKind, MessageType};

use crate::connection::Sender;

/// A boxed future returned by handler methods.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Trait for handling requests from a client.
///
/// Each method receives a `sender` for the reply and the parsed request
/// envelope. Exactly one reply (response or error) is expected per request.
///
/// Default implementations reply with `not_implemented` so handlers only
/// need to override the request types they serve.
pub trait Handler: Send + Sync + 'static {
    fn on_list(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        not_implemented(sender, msg)
    }

    fn on_size(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        not_implemented(sender, msg)
    }

    fn on_read_chunk(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        not_implemented(sender, msg)
    }

    fn on_reset(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        not_implemented(sender, msg)
    }

    fn on_write_chunk(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        not_implemented(sender, msg)
    }

    fn on_delete(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        not_implemented(sender, msg)
    }

    fn on_checksum(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        not_implemented(sender, msg)
    }

    /// Called for `ping` messages.
    fn on_ping(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        Box::pin(async move {
            if let Ok(reply) = msg.reply(MessageType::Pong, Option::<&()>::None) {
                let _ = sender.send_msg(reply);
            }
        })
    }

    /// Called once the client connection has closed.
    fn on_disconnected(&self, _peer: &str) -> HandlerFuture<'_> {
        Box::pin(async {})
    }
}

fn not_implemented<'a>(sender: Sender, msg: Message) -> HandlerFuture<'a> {
    Box::pin(async move {
        let _ = sender.send_error(&msg, ErrorKind::NotImplemented, "not implemented");
    })
}
