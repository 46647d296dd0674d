pub mod card;
pub mod error;

pub use card::card;
pub use error::html_error_response;
