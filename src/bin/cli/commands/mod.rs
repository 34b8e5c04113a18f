pub mod convert;
pub mod list;
