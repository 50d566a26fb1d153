pub mod activity;
pub mod chat;
pub mod notification;
pub mod request;
pub mod session;
pub mod shift;
pub mod user;
