pub mod labels;
pub mod time;
