mod handler;
mod model;

pub use handler::{create_review, list_user_reviews};
pub use model::{CreateReviewRequest, Review, ReviewSummary};
