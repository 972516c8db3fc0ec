use crate::{
    error::ApiError,
    handlers::found,
    response::{ResponseFormat, ServiceResponse},
    state::{AppState, LOGIN_TEMPLATE, TICKET_GRANTING_COOKIE},
};
use auth_identity::User;
use auth_ticket::TicketId;
use axum::{
    extract::{Query, RawQuery, State},
    http::header,
    response::{Html, IntoResponse, Response},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use url::Url;

const DEFAULT_APP_NAME: &str = "Mock CAS Server";
const DEFAULT_APP_DESCRIPTION: &str = "This is a mock CAS server for testing purposes.";

#[derive(Debug, Deserialize)]
pub struct ServiceQuery {
    #[serde(default)]
    pub service: Option<String>,
}

impl ServiceQuery {
    fn service(&self) -> Option<&str> {
        self.service.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidateQuery {
    #[serde(default)]
    pub ticket: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub format: Option<String>,
}

impl ValidateQuery {
    fn require(&self) -> Result<(), ApiError> {
        if self.ticket.is_empty() || self.service.is_empty() {
            return Err(ApiError::bad_request("ticket or service is empty"));
        }
        Ok(())
    }
}

fn tgt_cookie(value: String) -> Cookie<'static> {
    Cookie::build((TICKET_GRANTING_COOKIE, value))
        .path("/cas")
        .http_only(true)
        .build()
}

fn expired_tgt_cookie() -> Cookie<'static> {
    Cookie::build(TICKET_GRANTING_COOKIE).path("/cas").build()
}

/// Registered and parsable, checked before any ticket is issued for it
fn service_target(state: &AppState, service: &str) -> Result<Url, ApiError> {
    state.authority.service(service)?;
    Url::parse(service).map_err(|e| ApiError::bad_request(format!("invalid service url: {e}")))
}

/// Append `ticket=<st>` to the service URL, keeping any query it already has
fn service_redirect(mut target: Url, st: &TicketId) -> String {
    target.query_pairs_mut().append_pair("ticket", &st.to_string());
    target.into()
}

/// After a TGT is established: redirect to the service with a fresh ST, or
/// show a plain confirmation when no service was asked for.
async fn success_or_redirect(
    state: &AppState,
    user: &User,
    tgt: &TicketId,
    service: Option<&str>,
) -> Result<Response, ApiError> {
    let Some(service) = service else {
        let page = format!(
            r#"<body><pre>{} login successful, click <a href="/cas/logout">here</a> to logout.</pre></body>"#,
            handlebars::html_escape(&user.username)
        );
        return Ok(Html(page).into_response());
    };

    let target = service_target(state, service)?;
    let st = state.authority.issue_service_ticket(tgt, service).await?;
    Ok(found(&service_redirect(target, &st)))
}

/// GET /cas/login
pub async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<ServiceQuery>,
    RawQuery(raw_query): RawQuery,
    jar: CookieJar,
) -> Result<(CookieJar, Response), ApiError> {
    let mut jar = jar;
    if let Some(cookie) = jar.get(TICKET_GRANTING_COOKIE) {
        let session = cookie
            .value()
            .parse::<TicketId>()
            .ok()
            .and_then(|tgt| state.authority.session_user(&tgt).ok().map(|user| (tgt, user)));
        match session {
            Some((tgt, user)) => {
                let response = success_or_redirect(&state, &user, &tgt, query.service()).await?;
                return Ok((jar, response));
            }
            None => {
                debug!("Stale TGT cookie cleared");
                jar = jar.remove(expired_tgt_cookie());
            }
        }
    }

    let (app_name, app_description) = match query.service() {
        Some(url) => {
            let service = state.authority.service(url)?;
            (service.name.clone(), service.description.clone())
        }
        None => (DEFAULT_APP_NAME.to_string(), DEFAULT_APP_DESCRIPTION.to_string()),
    };
    let form_action = match raw_query.as_deref() {
        Some(raw) if !raw.is_empty() => format!("/cas/login?{raw}"),
        _ => "/cas/login".to_string(),
    };

    let page = state
        .templates
        .render(
            LOGIN_TEMPLATE,
            &json!({
                "app_name": app_name,
                "app_description": app_description,
                "form_action": form_action,
            }),
        )
        .map_err(|e| ApiError::internal(format!("render login page: {e}")))?;
    Ok((jar, Html(page).into_response()))
}

/// POST /cas/login
pub async fn login_submit(
    State(state): State<AppState>,
    Query(query): Query<ServiceQuery>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Response), ApiError> {
    if form.username.is_empty() || form.password.is_empty() {
        return Err(ApiError::bad_request("username or password is empty"));
    }
    if let Some(service) = query.service() {
        service_target(&state, service)?;
    }

    let tgt = state.authority.login(&form.username, &form.password).await?;
    let user = state.authority.session_user(&tgt)?;
    let jar = jar.add(tgt_cookie(tgt.to_string()));

    let response = success_or_redirect(&state, &user, &tgt, query.service()).await?;
    Ok((jar, response))
}

/// GET /cas/logout
pub async fn logout(
    State(state): State<AppState>,
    Query(query): Query<ServiceQuery>,
    jar: CookieJar,
) -> (CookieJar, Response) {
    let mut jar = jar;
    if let Some(value) = jar.get(TICKET_GRANTING_COOKIE).map(|c| c.value().to_string()) {
        let summary = state.authority.logout(&value).await;
        if let Some(owner) = summary.owner {
            info!(username = %owner, revoked = summary.revoked, "User logged out");
        }
        jar = jar.remove(expired_tgt_cookie());
    }

    // Only registered services are redirect targets.
    if let Some(service) = query.service().filter(|url| state.authority.service(url).is_ok()) {
        return (jar, found(service));
    }
    let page = r#"<body><pre>logout successful, click <a href="/cas/login">here</a> to login.</pre></body>"#;
    (jar, Html(page).into_response())
}

/// GET /cas/validate (CAS 1.0)
pub async fn validate(
    State(state): State<AppState>,
    Query(query): Query<ValidateQuery>,
) -> Result<Response, ApiError> {
    query.require()?;
    let body = match state.authority.validate_service_ticket(&query.ticket, &query.service).await {
        Ok(user) => format!("yes\n{}\n", user.username),
        Err(_) => "no\n".to_string(),
    };
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response())
}

/// GET /cas/p3/serviceValidate (CAS 3.0)
pub async fn service_validate(
    State(state): State<AppState>,
    Query(query): Query<ValidateQuery>,
) -> Result<Response, ApiError> {
    query.require()?;
    let format = ResponseFormat::from_param(query.format.as_deref());
    let outcome = match state.authority.validate_service_ticket(&query.ticket, &query.service).await {
        Ok(user) => ServiceResponse::Success(user),
        Err(_) => ServiceResponse::invalid_ticket(&query.ticket),
    };
    outcome
        .render(format)
        .map_err(|e| ApiError::internal(format!("encode service response: {e}")))
}

/// GET /cas/p3/proxyValidate
pub async fn proxy_validate() -> ApiError {
    ApiError::NotImplemented
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_ticket::TicketKind;

    #[test]
    fn test_service_redirect_appends_ticket() {
        let st = TicketId::generate(TicketKind::ServiceTicket, 5);
        let plain = service_redirect(Url::parse("http://app.example/validate").unwrap(), &st);
        assert_eq!(plain, format!("http://app.example/validate?ticket={st}"));

        let with_query = service_redirect(Url::parse("http://app.example/cb?next=%2Fhome").unwrap(), &st);
        assert_eq!(with_query, format!("http://app.example/cb?next=%2Fhome&ticket={st}"));
    }

    #[test]
    fn test_tgt_cookie_attributes() {
        let cookie = tgt_cookie("TGT-1-ABC".to_string());
        assert_eq!(cookie.path(), Some("/cas"));
        assert_eq!(cookie.http_only(), Some(true));
    }
}
