mod handler;
mod model;

pub use handler::{
    accept_answer, create_answer, create_question, delete_question, get_question, list_questions,
};
pub use model::{Answer, Question};
