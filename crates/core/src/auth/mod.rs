mod attempt;
mod challenge;
mod claims;
mod error;
mod failure;
mod functions;
mod policy;
mod schemes;
mod settings;
mod traits;
mod types;
mod validation;

pub use attempt::{AttemptState, InvalidTransition, LoginAttempt};
pub use challenge::{authorization_url, redirect_uri, ChallengeParams};
pub use claims::{claim_types, ClaimMapping, ClaimSet, MappedPrincipal};
pub use error::{AuthError, ConfigError, RemoteAuthError};
pub use failure::{
    failure_redirect, FailureEvent, RedirectTarget, ACCOUNT_NOT_CONFIRMED_MESSAGE,
    DEFAULT_FAILURE_MESSAGE,
};
pub use functions::{
    calculate_expiry, email_to_name, generate_confirmation_code, generate_nonce,
    generate_session_id, generate_state, is_flow_expired, is_session_expired,
    AUTH_FLOW_MAX_AGE_MINUTES,
};
pub use policy::SignInPolicy;
pub use schemes::{
    AuthenticationScheme, SchemeRegistry, SchemeRole, APPLICATION_SCHEME, EXTERNAL_LOGIN_PATH,
    EXTERNAL_SCHEME, LOGIN_PATH, OIDC_SCHEME,
};
pub use settings::{
    load, parse_scopes, ClientSecret, ConfigSource, MapSource, OidcSettings, CALLBACK_PATH,
    SECTION,
};
pub use traits::{
    CodeExchange, EmailSender, OidcClient, RemoteResult, Result, SessionRepository,
};
pub use types::{AuthFlowState, Session, SessionId, TokenSet};
pub use validation::validate_return_to;
