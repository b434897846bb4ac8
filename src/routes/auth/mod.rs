mod handler;
mod model;

pub use handler::{forgot_password, login, me, refresh_token, register, reset_password};
pub use model::{AuthResponse, RegisterRequest, validate_password};
