//! Meal planner core: entity metadata, a generic data mapper, and the
//! SQLite session it runs against.

pub mod db;
pub mod error;
pub mod mapper;
pub mod models;
pub mod relation;
pub mod schema;
pub mod service;
pub mod session;
pub mod value;

pub use error::MapperError;
pub use schema::Entity;
