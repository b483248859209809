//! Live reload system.
//!
//! A [`DirectoryWatcher`] observes the served root and asks the
//! [`BroadcastHub`] to send `reload` to every connected browser, which holds
//! one WebSocket per open tab.

mod hub;
mod watcher;
mod websocket;

pub use hub::{BroadcastHub, ChannelId, NotificationChannel};
pub use watcher::DirectoryWatcher;
pub(crate) use websocket::ws_handler;
