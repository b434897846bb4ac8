mod handler;
mod model;

pub(crate) use handler::session_for;
pub use handler::{cancel_session, complete_session, create_session, get_session, list_sessions};
pub use model::{CreateSessionRequest, Session};
