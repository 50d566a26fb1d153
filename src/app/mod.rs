pub mod activity;
pub mod auth;
pub mod chat;
pub mod error;
pub mod inflight;
pub mod notifications;
pub mod rate_limiter;
pub mod requests;
pub mod router;
pub mod shifts;
pub mod users;
