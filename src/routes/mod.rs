/// Authentication Endpoints
///
/// The HTTP surface of the layer: authenticate, me, verify, refresh and
/// logout handlers plus the `attach` function that mounts them on a host
/// application under the configured path prefix.

use actix_web::cookie::Cookie;
use actix_web::http::Method;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::{json, Value};

use crate::configuration::AuthSettings;
use crate::error::GateError;
use crate::flow::{Auth, LogoutOutcome, TokenBundle};

/// Mount the authentication endpoints on a host application
///
/// ```ignore
/// App::new().configure(|cfg| authgate::attach(cfg, auth.clone()))
/// ```
pub fn attach(cfg: &mut web::ServiceConfig, auth: Auth) {
    let prefix = auth.settings().url_prefix.clone();
    cfg.app_data(web::Data::new(auth)).service(
        web::scope(&prefix)
            .route("", web::post().to(authenticate))
            .route("/", web::post().to(authenticate))
            .route("", web::method(Method::OPTIONS).to(preflight))
            .route("/", web::method(Method::OPTIONS).to(preflight))
            .route("/me", web::get().to(me))
            .route("/me", web::method(Method::OPTIONS).to(preflight))
            .route("/verify", web::get().to(verify))
            .route("/verify", web::method(Method::OPTIONS).to(preflight))
            .route("/refresh", web::post().to(refresh))
            .route("/refresh", web::method(Method::OPTIONS).to(preflight))
            .route("/logout", web::post().to(logout))
            .route("/logout", web::method(Method::OPTIONS).to(preflight)),
    );
}

/// POST {prefix}/
///
/// Run the application's credential check and issue tokens.
/// Returns the issuance output, with http-only cookies in cookie mode.
///
/// # Errors
/// Propagates the credential check's failure unmodified.
async fn authenticate(
    auth: web::Data<Auth>,
    body: web::Json<Value>,
) -> Result<HttpResponse, GateError> {
    let bundle = auth.authenticate(&body).await?;
    Ok(token_response(auth.settings(), &bundle))
}

/// GET {prefix}/me
///
/// Current identity projection: `{"me": object|null}`. A missing
/// credential is anonymous, not an error; in cookie mode the stale token
/// cookie is cleared for anonymous callers.
///
/// # Errors
/// - `MeEndpointNotSetup` when no identity resolver is configured
/// - 401 for a presented-but-invalid token
async fn me(auth: web::Data<Auth>, req: HttpRequest) -> Result<HttpResponse, GateError> {
    let view = auth.me(&req).await?;

    let mut builder = HttpResponse::Ok();
    if !view.credential_presented && auth.settings().cookie_set {
        builder.cookie(removal_cookie(
            auth.settings(),
            &auth.settings().cookie_token_name,
        ));
    }

    Ok(builder.json(json!({ "me": view.me })))
}

/// GET {prefix}/verify
///
/// Non-throwing validity check: always a structured body,
/// `{"valid": bool[, "reason": string]}` with status 200 or 401.
async fn verify(auth: web::Data<Auth>, req: HttpRequest) -> Result<HttpResponse, GateError> {
    let verification = auth.verify(&req);

    let mut body = json!({ "valid": verification.valid });
    if let Some(reason) = verification.reason {
        body["reason"] = json!(reason);
    }

    Ok(HttpResponse::build(verification.status).json(body))
}

/// POST {prefix}/refresh
///
/// Exchange a corroborated refresh token for a new access token. The
/// presented token comes from the configured body field, or the refresh
/// cookie in cookie mode, so the body is optional.
///
/// # Errors
/// 401 `AuthenticationFailed` on any mismatch or absence.
async fn refresh(
    auth: web::Data<Auth>,
    req: HttpRequest,
    body: Option<web::Json<Value>>,
) -> Result<HttpResponse, GateError> {
    let bundle = auth.refresh(&req, body.as_ref().map(|b| &b.0)).await?;
    Ok(token_response(auth.settings(), &bundle))
}

/// POST {prefix}/logout
///
/// Revoke the stored refresh token and clear the token cookie when those
/// features are in use. 204 on success; 401 with the invalidity result
/// when the session is not currently valid.
async fn logout(auth: web::Data<Auth>, req: HttpRequest) -> Result<HttpResponse, GateError> {
    match auth.logout(&req).await? {
        LogoutOutcome::Rejected(verification) => {
            let mut body = json!({ "is_valid": false });
            if let Some(reason) = verification.reason {
                body["reason"] = json!(reason);
            }
            Ok(HttpResponse::build(verification.status).json(body))
        }
        LogoutOutcome::LoggedOut { clear_cookie } => {
            let mut builder = HttpResponse::NoContent();
            if clear_cookie {
                builder.cookie(removal_cookie(
                    auth.settings(),
                    &auth.settings().cookie_token_name,
                ));
            }
            Ok(builder.finish())
        }
    }
}

/// OPTIONS on every route: CORS preflight no-op
async fn preflight() -> HttpResponse {
    HttpResponse::NoContent().finish()
}

fn token_response(settings: &AuthSettings, bundle: &TokenBundle) -> HttpResponse {
    let mut builder = HttpResponse::Ok();

    if settings.cookie_set {
        builder.cookie(token_cookie(
            settings,
            &settings.cookie_token_name,
            bundle.access_token.clone(),
        ));
        if let Some(refresh_token) = &bundle.refresh_token {
            builder.cookie(token_cookie(
                settings,
                &settings.cookie_refresh_token_name,
                refresh_token.clone(),
            ));
        }
    }

    builder.json(&bundle.output)
}

fn token_cookie(settings: &AuthSettings, name: &str, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(name.to_string(), value);
    cookie.set_path("/");
    cookie.set_http_only(settings.cookie_httponly);
    if !settings.cookie_domain.is_empty() {
        cookie.set_domain(settings.cookie_domain.clone());
    }
    cookie
}

fn removal_cookie(settings: &AuthSettings, name: &str) -> Cookie<'static> {
    let mut cookie = Cookie::new(name.to_string(), "");
    cookie.set_path("/");
    if !settings.cookie_domain.is_empty() {
        cookie.set_domain(settings.cookie_domain.clone());
    }
    cookie.make_removal();
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CredentialError;
    use crate::hooks::{AuthHooks, CredentialCheck, Identity};
    use actix_web::http::StatusCode;
    use actix_web::test::{call_service, init_service, TestRequest};
    use actix_web::App;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NoOneCheck;

    #[async_trait]
    impl CredentialCheck for NoOneCheck {
        async fn check(&self, _credentials: &Value) -> Result<Box<dyn Identity>, GateError> {
            Err(GateError::Credential(CredentialError::AuthenticationFailed))
        }
    }

    fn test_auth() -> Auth {
        let settings = crate::configuration::AuthSettings::new("test-secret");
        Auth::initialize(settings, AuthHooks::new(Arc::new(NoOneCheck)))
            .expect("Failed to initialize auth")
    }

    #[tokio::test]
    async fn test_preflight_returns_204_on_every_route() {
        let auth = test_auth();
        let app = init_service(App::new().configure(|cfg| attach(cfg, auth))).await;

        for path in ["/auth", "/auth/me", "/auth/verify", "/auth/refresh", "/auth/logout"] {
            let req = TestRequest::default()
                .method(Method::OPTIONS)
                .uri(path)
                .to_request();
            let resp = call_service(&app, req).await;
            assert_eq!(
                resp.status(),
                StatusCode::NO_CONTENT,
                "OPTIONS {} should be a no-op",
                path
            );
        }
    }

    #[tokio::test]
    async fn test_verify_without_token_is_structured_401() {
        let auth = test_auth();
        let app = init_service(App::new().configure(|cfg| attach(cfg, auth))).await;

        let req = TestRequest::get().uri("/auth/verify").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: Value = actix_web::test::read_body_json(resp).await;
        assert_eq!(body["valid"], json!(false));
        assert_eq!(body["reason"], json!("missing"));
    }

    #[tokio::test]
    async fn test_authenticate_failure_propagates() {
        let auth = test_auth();
        let app = init_service(App::new().configure(|cfg| attach(cfg, auth))).await;

        let req = TestRequest::post()
            .uri("/auth")
            .set_json(json!({ "username": "u", "password": "p" }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: Value = actix_web::test::read_body_json(resp).await;
        assert_eq!(body["code"], json!("AUTHENTICATION_FAILED"));
    }
}
