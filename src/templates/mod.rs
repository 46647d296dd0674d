pub mod components;
pub mod layouts;
pub mod pages;

pub use components::{card, html_error_response};
pub use layouts::desktop::desktop_layout;
