mod handler;
mod model;

pub use handler::{delete_user, list_users, stats, update_active, update_role};
pub use model::AdminStats;
