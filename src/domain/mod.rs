pub mod blog;
pub mod pagination;
pub mod rows;
