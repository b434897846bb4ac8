mod handler;
mod model;

pub(crate) use handler::connection_for;
pub use handler::{
    accept_connection, cancel_connection, create_connection, end_connection, get_connection,
    list_connections, reject_connection,
};
pub use model::Connection;
