//! Reading and writing the session cookie.

use axum::http::{HeaderMap, HeaderValue, header};
use cookie::time::{Duration as CookieDuration, OffsetDateTime};
use cookie::{Cookie, SameSite};

use satchel_session::{CookieDirective, SESSION_COOKIE_NAME, SameSitePolicy, SessionConfig};

/// Session id from the first `sessionId` cookie across all `Cookie` headers.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
}

/// Cookie carrying `id`, with attributes from `config`.
pub fn session_cookie(id: &str, config: &SessionConfig) -> Cookie<'static> {
    let settings = &config.cookie;
    let mut builder = Cookie::build((SESSION_COOKIE_NAME, id.to_string()))
        .path("/")
        .secure(settings.secure)
        .http_only(settings.http_only)
        .same_site(same_site(settings.same_site));

    if let Some(ref domain) = settings.domain {
        builder = builder.domain(domain.clone());
    }

    if let Some(secs) = config.expiry_secs() {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX);
        let max_age = CookieDuration::seconds(secs);
        builder = builder.max_age(max_age);
        if let Some(expires) = OffsetDateTime::now_utc().checked_add(max_age) {
            builder = builder.expires(expires);
        }
    }

    builder.build()
}

/// Cookie instructing the client to drop its session id.
pub fn removal_cookie(config: &SessionConfig) -> Cookie<'static> {
    let mut cookie = session_cookie("", config);
    cookie.make_removal();
    cookie
}

/// Apply `directive` to outbound `headers`.
pub fn apply_directive(headers: &mut HeaderMap, directive: &CookieDirective, config: &SessionConfig) {
    let cookie = match directive {
        CookieDirective::Keep => return,
        CookieDirective::Issue(id) => session_cookie(id, config),
        CookieDirective::Remove => removal_cookie(config),
    };

    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        Err(e) => {
            tracing::error!(error = %e, "Session cookie is not a valid header value");
        }
    }
}

fn same_site(policy: SameSitePolicy) -> SameSite {
    match policy {
        SameSitePolicy::Lax => SameSite::Lax,
        SameSitePolicy::Strict => SameSite::Strict,
        SameSitePolicy::None => SameSite::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satchel_session::CookieSettings;

    fn headers_with(cookies: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for value in cookies {
            headers.append(header::COOKIE, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn test_parse_session_id() {
        let headers = headers_with(&["theme=dark; sessionId=abc123; other=1"]);
        assert_eq!(session_id_from_headers(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_parse_across_headers_first_wins() {
        let headers = headers_with(&["theme=dark", "sessionId=first", "sessionId=second"]);
        assert_eq!(session_id_from_headers(&headers).as_deref(), Some("first"));
    }

    #[test]
    fn test_parse_missing() {
        assert_eq!(session_id_from_headers(&HeaderMap::new()), None);
        assert_eq!(session_id_from_headers(&headers_with(&["a=b"])), None);
    }

    #[test]
    fn test_default_attributes() {
        let rendered = session_cookie("abc", &SessionConfig::default()).to_string();

        assert!(rendered.starts_with("sessionId=abc"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Max-Age=600"));
        assert!(rendered.contains("Expires="));
        assert!(!rendered.contains("Domain"));
    }

    #[test]
    fn test_custom_attributes() {
        let config = SessionConfig::default()
            .without_expiry()
            .with_cookie(CookieSettings {
                same_site: SameSitePolicy::Strict,
                secure: false,
                http_only: false,
                domain: Some("example.com".to_string()),
            });
        let rendered = session_cookie("abc", &config).to_string();

        assert!(rendered.contains("SameSite=Strict"));
        assert!(rendered.contains("Domain=example.com"));
        assert!(!rendered.contains("Secure"));
        assert!(!rendered.contains("HttpOnly"));
        assert!(!rendered.contains("Max-Age"));
        assert!(!rendered.contains("Expires"));
    }

    #[test]
    fn test_removal_cookie() {
        let rendered = removal_cookie(&SessionConfig::default()).to_string();
        assert!(rendered.starts_with("sessionId=;"));
        assert!(rendered.contains("Max-Age=0"));
    }

    #[test]
    fn test_apply_directive() {
        let config = SessionConfig::default();
        let mut headers = HeaderMap::new();

        apply_directive(&mut headers, &CookieDirective::Keep, &config);
        assert!(headers.get(header::SET_COOKIE).is_none());

        apply_directive(&mut headers, &CookieDirective::Issue("xyz".to_string()), &config);
        let value = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(value.starts_with("sessionId=xyz"));
    }
}
