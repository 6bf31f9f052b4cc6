//! Pure extraction layer.
//!
//! Everything under this module is a string-in, fragment-out function with
//! no I/O. The page extractor feeds these from DOM snapshots; the tests
//! feed them fixtures.

pub mod deadline;
pub mod fields;
pub mod marketing;
pub mod normalize;
pub mod sectors;

pub use deadline::{is_expired, parse_first_date};
pub use fields::{
    extract_application_process, extract_contact_email, extract_contact_phone,
    extract_deadlines, extract_funding_amounts, extract_sectors,
};
pub use marketing::{clean_eligibility, is_marketing, strip_marketing};
pub use normalize::{clean_text, trim_to_sentence};
