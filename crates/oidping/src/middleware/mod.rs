//! Cross-cutting request stages mounted by `app::create_app`.

mod antiforgery;
mod errors;
mod https;

pub use antiforgery::{
    enforce_antiforgery, AntiforgeryToken, ANTIFORGERY_COOKIE, ANTIFORGERY_FORM_FIELD,
    ANTIFORGERY_HEADER,
};
pub use errors::{error_boundary, panic_response, ErrorDetail};
pub use https::{enforce_https, HSTS_MAX_AGE_SECS};
