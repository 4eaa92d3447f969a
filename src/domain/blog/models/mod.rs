//! Blog model definitions

pub mod article;
pub mod tag;

pub use article::*;
pub use tag::*;
