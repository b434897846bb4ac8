mod handler;
mod model;

pub(crate) use handler::load_me;
pub use handler::{get_user, list_users, update_password, update_profile};
pub use model::{MeResponse, Profile, User, UserInfo, UserListQuery, UserSummary};
