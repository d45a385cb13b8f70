pub mod page;
pub mod section;
pub mod text;
pub mod weekly;
