//! Helper functions shared by templates and commands

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;
