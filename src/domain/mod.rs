pub mod error;
pub mod expense;
pub mod report;
pub mod repository;
pub mod user;
