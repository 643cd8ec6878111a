//! Content module - post records, normalization and rich text

mod post;
pub mod richtext;

pub use post::{
    normalize, parse_cms_date, Banner, Cursor, ListingPage, PostDetail, PostSummary,
    RawListingPage, RawPost, RawPostData, RawSection, Section,
};
pub use richtext::{HtmlRichText, RichText, RichTextRenderer};
