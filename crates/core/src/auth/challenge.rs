use url::Url;

use super::{OidcSettings, CALLBACK_PATH};

/// Per-attempt values that go on the authorization request.
#[derive(Debug, Clone)]
pub struct ChallengeParams<'a> {
    pub state: &'a str,
    pub nonce: &'a str,
    /// Base64url SHA-256 of the PKCE verifier.
    pub pkce_challenge: &'a str,
}

/// The absolute redirect URI registered with the authority.
pub fn redirect_uri(base_url: &Url) -> Url {
    let mut uri = base_url.clone();
    uri.set_path(CALLBACK_PATH);
    uri.set_query(None);
    uri.set_fragment(None);
    uri
}

/// Build `{authority}/authorize?...` for the outbound challenge.
pub fn authorization_url(settings: &OidcSettings, base_url: &Url, params: &ChallengeParams) -> Url {
    let mut url = settings.authority.clone();
    let path = format!("{}/authorize", url.path().trim_end_matches('/'));
    url.set_path(&path);

    url.query_pairs_mut()
        .append_pair("response_type", &settings.response_type)
        .append_pair("client_id", &settings.client_id)
        .append_pair("scope", &settings.scope_param())
        .append_pair("redirect_uri", redirect_uri(base_url).as_str())
        .append_pair("state", params.state)
        .append_pair("nonce", params.nonce)
        .append_pair("code_challenge", params.pkce_challenge)
        .append_pair("code_challenge_method", "S256");

    url
}
