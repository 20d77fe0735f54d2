use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use uuid::Uuid;

const COOKIE_NAME: &str = "acquire_identity";

/// A stable per-browser id, independent of whatever username a player types
/// into a lobby join form. Used for rate limiting and for reconnecting a
/// dropped WebSocket to the same lobby seat. Installed into request
/// extensions by [`identity_middleware`]; handlers pull it out with the
/// `Identity` extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity(pub Uuid);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .copied()
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "identity middleware not installed"))
    }
}

/// Reads or mints the identity cookie before the handler runs, and writes it
/// back on the response if it was just minted.
pub async fn identity_middleware(jar: CookieJar, mut request: Request, next: Next) -> impl IntoResponse {
    let found = jar.get(COOKIE_NAME).and_then(|cookie| Uuid::parse_str(cookie.value()).ok());

    let (jar, id) = match found {
        Some(id) => (jar, id),
        None => {
            let id = Uuid::new_v4();
            let jar = jar.add(Cookie::new(COOKIE_NAME, id.to_string()));
            (jar, id)
        }
    };

    request.extensions_mut().insert(Identity(id));
    let response = next.run(request).await;
    (jar, response)
}
