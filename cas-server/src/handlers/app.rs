//! Demo CAS client living next to the server
//!
//! `/app/login` sends the browser to the CAS login page with this client's
//! service URL, `/app/validate` receives the ticket and checks it over HTTP
//! against `/cas/p3/serviceValidate`, and `/app/slo` accepts single logout
//! requests.

use crate::{error::ApiError, handlers::found, state::AppState};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Deserialize)]
pub struct TicketQuery {
    #[serde(default)]
    pub ticket: String,
}

#[derive(Deserialize)]
pub struct SingleLogoutForm {
    #[serde(default, rename = "logoutRequest")]
    pub logout_request: String,
}

fn server_url(state: &AppState, path: &str) -> Result<Url, ApiError> {
    Url::parse(&format!("{}{path}", state.server.server_url_prefix))
        .map_err(|e| ApiError::internal(format!("invalid server url prefix: {e}")))
}

/// GET /app/login
pub async fn login(State(state): State<AppState>) -> Result<Response, ApiError> {
    let mut url = server_url(&state, "/login")?;
    url.query_pairs_mut()
        .append_pair("service", &state.server.client_service_url);
    Ok(found(url.as_str()))
}

/// GET /app/validate, echoing the raw validation response
pub async fn validate(
    State(state): State<AppState>,
    Query(query): Query<TicketQuery>,
) -> Result<Response, ApiError> {
    let mut url = server_url(&state, "/p3/serviceValidate")?;
    url.query_pairs_mut()
        .append_pair("ticket", &query.ticket)
        .append_pair("service", &state.server.client_service_url);

    let response = state
        .http
        .get(url)
        .send()
        .await
        .map_err(|e| ApiError::network(format!("cas service validate error: {e}")))?;

    let mut dump = format!("{:?} {}\r\n", response.version(), response.status());
    for (name, value) in response.headers() {
        dump.push_str(&format!("{}: {}\r\n", name, String::from_utf8_lossy(value.as_bytes())));
    }
    dump.push_str("\r\n");
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::network(format!("read validate response: {e}")))?;
    dump.push_str(&body);

    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], dump).into_response())
}

/// GET /app/logout
pub async fn logout(State(state): State<AppState>) -> Result<Response, ApiError> {
    Ok(found(server_url(&state, "/logout")?.as_str()))
}

/// NameID and SessionIndex of a SAML `LogoutRequest`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutRequestFields {
    pub name_id: String,
    pub session_index: String,
}

#[derive(Clone, Copy)]
enum Field {
    NameId,
    SessionIndex,
}

/// Pull the two fields out of a `LogoutRequest`, matching on local names so
/// any namespace prefix is accepted.
pub fn parse_logout_request(xml: &str) -> Result<LogoutRequestFields, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut saw_root = false;
    let mut current = None;
    let mut name_id = None;
    let mut session_index = None;
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(element) => {
                current = match element.local_name().as_ref() {
                    b"LogoutRequest" => {
                        saw_root = true;
                        None
                    }
                    b"NameID" => Some(Field::NameId),
                    b"SessionIndex" => Some(Field::SessionIndex),
                    _ => None,
                };
            }
            Event::Text(text) => {
                let value = text.unescape().map_err(|e| e.to_string())?.into_owned();
                match current {
                    Some(Field::NameId) => name_id = Some(value),
                    Some(Field::SessionIndex) => session_index = Some(value),
                    None => {}
                }
            }
            Event::End(_) => current = None,
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err("not a LogoutRequest".to_string());
    }
    match (name_id, session_index) {
        (Some(name_id), Some(session_index)) => Ok(LogoutRequestFields {
            name_id,
            session_index,
        }),
        _ => Err("LogoutRequest without NameID or SessionIndex".to_string()),
    }
}

/// POST /app/slo
pub async fn single_logout(Form(form): Form<SingleLogoutForm>) -> Result<StatusCode, ApiError> {
    if form.logout_request.is_empty() {
        return Err(ApiError::bad_request("logoutRequest is empty"));
    }
    debug!(logout_request = %form.logout_request, "Received logout request");

    let fields = parse_logout_request(&form.logout_request)
        .map_err(|e| ApiError::bad_request(format!("invalid logout request: {e}")))?;
    info!(
        username = %fields.name_id,
        session_index = %fields.session_index,
        "Session logged out by CAS"
    );
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_ticket::encode_logout_request;

    #[test]
    fn test_parse_own_logout_request() {
        let xml = encode_logout_request("casuser", "ST-2-ABCDEFGH", chrono::Utc::now()).unwrap();
        let fields = parse_logout_request(&xml).unwrap();
        assert_eq!(fields.name_id, "casuser");
        assert_eq!(fields.session_index, "ST-2-ABCDEFGH");
    }

    #[test]
    fn test_parse_foreign_prefixes() {
        let xml = r#"<p:LogoutRequest xmlns:p="urn:oasis:names:tc:SAML:2.0:protocol" ID="LR-1" Version="2.0">
  <a:NameID xmlns:a="urn:oasis:names:tc:SAML:2.0:assertion">bob&amp;co</a:NameID>
  <p:SessionIndex>ST-1-AAAA</p:SessionIndex>
</p:LogoutRequest>"#;
        let fields = parse_logout_request(xml).unwrap();
        assert_eq!(fields.name_id, "bob&co");
        assert_eq!(fields.session_index, "ST-1-AAAA");
    }

    #[test]
    fn test_parse_rejects_other_documents() {
        assert!(parse_logout_request("<html><body>hi</body></html>").is_err());
        assert!(parse_logout_request("<samlp:LogoutRequest></samlp:LogoutRequest>").is_err());
        assert!(parse_logout_request("not xml <<<").is_err());
    }
}
