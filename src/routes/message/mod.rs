mod handler;
mod model;

pub use handler::{list_messages, mark_read, send_message, unread_count};
pub use model::{Message, MessageListQuery};
