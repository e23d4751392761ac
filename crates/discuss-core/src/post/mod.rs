//! Post domain module.

mod model;

pub use model::{Page, PAGE_SIZE, Post, PostAuthor, PostInfo, PostThread};
