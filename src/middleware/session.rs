//! Stateless cookie session.
//!
//! The whole session is stored client side: one cookie holds the
//! base64-encoded JSON map, a companion `<name>.sig` cookie holds its
//! HMAC-SHA256 signature. The first configured key signs; every key is
//! accepted when verifying, so keys can be rotated.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::SET_COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use sha2::Sha256;
use tracing::{debug, warn};

use super::proxy::ClientInfo;
use crate::config::Config;
use crate::response::{ApiResponse, ResponseStatus};

type HmacSha256 = Hmac<Sha256>;

/// Cookie session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub name: String,
    pub keys: Arc<Vec<String>>,
    pub max_age_secs: u64,
    pub secure: bool,
}

impl SessionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            name: config.session_name.clone(),
            keys: Arc::new(config.session_keys()),
            max_age_secs: config.session_max_age_secs,
            secure: config.is_production(),
        }
    }

    fn signature_name(&self) -> String {
        format!("{}.sig", self.name)
    }

    fn sign(&self, value: &str) -> Option<String> {
        let key = self.keys.first()?;
        let mut mac = HmacSha256::new_from_slice(key.as_bytes()).ok()?;
        mac.update(format!("{}={}", self.name, value).as_bytes());
        Some(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    fn verify(&self, value: &str, signature: &str) -> bool {
        let Ok(signature) = URL_SAFE_NO_PAD.decode(signature) else {
            return false;
        };
        let payload = format!("{}={}", self.name, value);

        self.keys.iter().any(|key| {
            HmacSha256::new_from_slice(key.as_bytes())
                .map(|mut mac| {
                    mac.update(payload.as_bytes());
                    mac.verify_slice(&signature).is_ok()
                })
                .unwrap_or(false)
        })
    }
}

#[derive(Debug, Default)]
struct SessionState {
    values: Map<String, Value>,
    changed: bool,
}

/// Per-request session handle, shared between middleware and handler.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
}

impl Session {
    fn with_values(values: Map<String, Value>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                values,
                changed: false,
            })),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.state.lock().values.get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) {
        let mut state = self.state.lock();
        state.values.insert(key.into(), value.into());
        state.changed = true;
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut state = self.state.lock();
        let removed = state.values.remove(key);
        state.changed |= removed.is_some();
        removed
    }

    /// Drop every value; the cookie is expired on the way out.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.values.clear();
        state.changed = true;
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().values.is_empty()
    }

    fn take_changes(&self) -> Option<Map<String, Value>> {
        let mut state = self.state.lock();
        if !state.changed {
            return None;
        }
        state.changed = false;
        Some(state.values.clone())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ApiResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| ApiResponse::new(ResponseStatus::ServerError, None))
    }
}

/// Load the session from cookies and write it back if a handler changed it.
pub async fn cookie_session(
    State(config): State<SessionConfig>,
    mut request: Request,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    let had_cookie = jar.get(&config.name).is_some();
    let session = Session::with_values(load(&jar, &config).unwrap_or_default());

    let client_secure = request
        .extensions()
        .get::<ClientInfo>()
        .is_some_and(|info| info.secure);
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    let Some(values) = session.take_changes() else {
        return response;
    };

    if config.secure && !client_secure {
        warn!("not sending secure session cookie over an unencrypted connection");
        return response;
    }

    let cookies = if values.is_empty() {
        if !had_cookie {
            return response;
        }
        expired_cookies(&config)
    } else {
        match session_cookies(&config, &values) {
            Some(cookies) => cookies,
            None => return response,
        }
    };

    for cookie in cookies {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "session cookie is not a valid header value"),
        }
    }

    response
}

fn load(jar: &CookieJar, config: &SessionConfig) -> Option<Map<String, Value>> {
    let value = jar.get(&config.name)?.value();
    let signature = jar.get(&config.signature_name())?.value();

    if !config.verify(value, signature) {
        debug!("discarding session with invalid signature");
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(value).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn session_cookies(config: &SessionConfig, values: &Map<String, Value>) -> Option<Vec<Cookie<'static>>> {
    let encoded = URL_SAFE_NO_PAD.encode(serde_json::to_vec(values).ok()?);
    let signature = config.sign(&encoded)?;
    let max_age = time::Duration::seconds(i64::try_from(config.max_age_secs).unwrap_or(i64::MAX));

    Some(vec![
        build_cookie(config, config.name.clone(), encoded, max_age),
        build_cookie(config, config.signature_name(), signature, max_age),
    ])
}

fn expired_cookies(config: &SessionConfig) -> Vec<Cookie<'static>> {
    vec![
        build_cookie(config, config.name.clone(), String::new(), time::Duration::ZERO),
        build_cookie(config, config.signature_name(), String::new(), time::Duration::ZERO),
    ]
}

fn build_cookie(
    config: &SessionConfig,
    name: String,
    value: String,
    max_age: time::Duration,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::None)
        .secure(config.secure)
        .max_age(max_age)
        .build()
}
