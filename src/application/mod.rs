pub mod auth_service;
pub mod authorization;
pub mod expense_service;
pub mod report_service;
