/// Accept a post-login destination only if it stays on this site.
///
/// Used for the `return_to` query of the challenge and for the destination
/// stored with a pending login. A local path starts with a single `/`, has
/// no backslash, no control characters and no embedded `://`.
///
/// # Examples
///
/// ```
/// use oidping_core::auth::validate_return_to;
///
/// // Valid relative paths
/// assert_eq!(validate_return_to("/Account/Manage"), Some("/Account/Manage"));
/// assert_eq!(validate_return_to("/"), Some("/"));
///
/// // Invalid: protocol-relative URL
/// assert_eq!(validate_return_to("//evil.com"), None);
///
/// // Invalid: absolute URL
/// assert_eq!(validate_return_to("https://evil.com"), None);
/// ```
pub fn validate_return_to(url: &str) -> Option<&str> {
    // `//host` is protocol-relative and browsers read `/\host` the same way
    let local = url.starts_with('/') && !url.starts_with("//") && !url.contains('\\');
    let clean = !url.chars().any(char::is_control) && !url.contains("://");

    (local && clean).then_some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_account_pages_are_kept() {
        for path in [
            "/",
            "/Account/Manage",
            "/Account/Manage?tab=roles#claims",
            "/Account/Login?error=Authentication%20failed",
            "/Account/ConfirmEmail?userId=1&code=a%2Bb",
        ] {
            assert_eq!(validate_return_to(path), Some(path), "{path}");
        }
    }

    #[test]
    fn off_site_destinations_are_dropped() {
        for target in [
            "",
            "Account/Manage",
            "https://idp.example.com/logout",
            "http://evil.com/path",
            "//evil.com",
            "//user:pass@evil.com",
            "javascript:alert(1)",
            "data:text/html,<script>",
        ] {
            assert_eq!(validate_return_to(target), None, "{target}");
        }
    }

    #[test]
    fn backslash_host_trick_is_dropped() {
        assert_eq!(validate_return_to("/\\evil.com"), None);
        assert_eq!(validate_return_to("/\\/evil.com"), None);
    }

    #[test]
    fn header_splitting_characters_are_dropped() {
        for target in ["/Account/Manage\r\nSet-Cookie: x=1", "/a\tb", "/a\0b", "/a\x1bb"] {
            assert_eq!(validate_return_to(target), None, "{target:?}");
        }
    }

    #[test]
    fn nested_redirect_with_scheme_is_dropped() {
        assert_eq!(validate_return_to("/redirect?url=https://evil.com"), None);
    }

    #[test]
    fn host_and_port_in_query_are_kept() {
        assert_eq!(
            validate_return_to("/proxy?host=localhost:8080"),
            Some("/proxy?host=localhost:8080")
        );
        assert_eq!(validate_return_to("/a//b"), Some("/a//b"));
    }
}
