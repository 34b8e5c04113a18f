mod render;

pub use render::{collapse_blank_lines, EnmlRenderer, MarkupRenderer, ResourceResolver};
