pub mod expense_repository;
pub mod sqlite_expense_repository;
pub mod sqlite_user_repository;
pub mod user_repository;
