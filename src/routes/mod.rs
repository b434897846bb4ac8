pub mod admin;
pub mod auth;
pub mod connection;
pub mod expert;
pub mod health;
pub mod matching;
pub mod message;
pub mod opportunity;
pub mod question;
pub mod review;
pub mod session;
pub mod user;
