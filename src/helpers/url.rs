//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped inside a single path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Path of a post's detail page
///
/// # Examples
/// ```ignore
/// post_path("como-utilizar-hooks") // -> "/post/como-utilizar-hooks"
/// ```
pub fn post_path(id: &str) -> String {
    format!("/post/{}", utf8_percent_encode(id, SEGMENT))
}

/// Relative output file for a post's prerendered page
pub fn post_output_path(id: &str) -> String {
    format!("post/{}/index.html", utf8_percent_encode(id, SEGMENT))
}
