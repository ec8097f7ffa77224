pub mod auth;
pub mod error;
pub mod export;
pub mod lookup;
pub mod quotes;
pub mod repos;
pub mod sources;
pub mod speech;
