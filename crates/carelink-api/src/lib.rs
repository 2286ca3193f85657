pub mod auth;
pub mod blobs;
pub mod connections;
pub mod error;
pub mod guard;
pub mod media;
pub mod messages;
pub mod middleware;
pub mod profile;
pub mod session;
