mod handler;
mod model;

pub use handler::{
    create_expert, delete_expert, get_expert, list_experts, match_experts, update_expert,
};
pub use model::Expert;
