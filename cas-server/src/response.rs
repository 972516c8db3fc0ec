//! CAS 3.0 `serviceResponse` documents in XML and JSON

use auth_identity::User;
use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use error_common::{protocol, CAS_XML_NAMESPACE};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Xml,
    Json,
}

impl ResponseFormat {
    /// `format` query parameter, case-insensitive; anything but JSON is XML
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some(format) if format.eq_ignore_ascii_case("json") => ResponseFormat::Json,
            _ => ResponseFormat::Xml,
        }
    }
}

#[derive(Serialize)]
#[serde(rename = "cas:serviceResponse")]
struct XmlSuccess<'a> {
    #[serde(rename = "@xmlns:cas")]
    xmlns: &'static str,
    #[serde(rename = "cas:authenticationSuccess")]
    success: XmlAuthenticationSuccess<'a>,
}

#[derive(Serialize)]
struct XmlAuthenticationSuccess<'a> {
    #[serde(rename = "cas:user")]
    user: &'a str,
    #[serde(rename = "cas:attributes")]
    attributes: XmlAttributes<'a>,
}

#[derive(Serialize)]
struct XmlAttributes<'a> {
    #[serde(rename = "cas:mail")]
    mail: &'a str,
    #[serde(rename = "cas:mobile")]
    mobile: &'a str,
}

#[derive(Serialize)]
#[serde(rename = "cas:serviceResponse")]
struct XmlFailure<'a> {
    #[serde(rename = "@xmlns:cas")]
    xmlns: &'static str,
    #[serde(rename = "cas:authenticationFailure")]
    failure: XmlAuthenticationFailure<'a>,
}

#[derive(Serialize)]
struct XmlAuthenticationFailure<'a> {
    #[serde(rename = "@code")]
    code: &'a str,
    #[serde(rename = "$text")]
    description: &'a str,
}

/// Outcome of a `serviceValidate` call, ready to be rendered
#[derive(Debug, Clone)]
pub enum ServiceResponse {
    Success(User),
    Failure { code: &'static str, description: String },
}

impl ServiceResponse {
    pub fn invalid_ticket(ticket: &str) -> Self {
        ServiceResponse::Failure {
            code: protocol::INVALID_TICKET,
            description: format!("Ticket {ticket} not recognized"),
        }
    }

    pub fn to_xml(&self) -> Result<String, quick_xml::DeError> {
        let mut out = String::new();
        let mut serializer = quick_xml::se::Serializer::new(&mut out);
        serializer.indent(' ', 2);
        match self {
            ServiceResponse::Success(user) => XmlSuccess {
                xmlns: CAS_XML_NAMESPACE,
                success: XmlAuthenticationSuccess {
                    user: &user.username,
                    attributes: XmlAttributes {
                        mail: &user.mail,
                        mobile: &user.mobile,
                    },
                },
            }
            .serialize(serializer)?,
            ServiceResponse::Failure { code, description } => XmlFailure {
                xmlns: CAS_XML_NAMESPACE,
                failure: XmlAuthenticationFailure { code, description },
            }
            .serialize(serializer)?,
        };
        Ok(out)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let document = match self {
            ServiceResponse::Success(user) => json!({
                "serviceResponse": {
                    "authenticationSuccess": {
                        "user": user.username,
                        "attributes": {
                            "mail": user.mail,
                            "mobile": user.mobile,
                        }
                    }
                }
            }),
            ServiceResponse::Failure { code, description } => json!({
                "serviceResponse": {
                    "authenticationFailure": {
                        "code": code,
                        "description": description,
                    }
                }
            }),
        };
        let mut text = serde_json::to_string_pretty(&document)?;
        text.push('\n');
        Ok(text)
    }

    /// Render as an HTTP 200 response in the requested format
    pub fn render(&self, format: ResponseFormat) -> Result<Response, String> {
        match format {
            ResponseFormat::Xml => self
                .to_xml()
                .map(|body| ([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], body).into_response())
                .map_err(|e| e.to_string()),
            ResponseFormat::Json => self
                .to_json()
                .map(|body| ([(header::CONTENT_TYPE, "application/json")], body).into_response())
                .map_err(|e| e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn casuser() -> User {
        User {
            username: "casuser".to_string(),
            mail: "casuser@example.org".to_string(),
            mobile: "12345678910".to_string(),
        }
    }

    #[test]
    fn test_success_xml() {
        let xml = ServiceResponse::Success(casuser()).to_xml().unwrap();
        let compact: String = xml.lines().map(str::trim).collect();
        assert_eq!(
            compact,
            concat!(
                r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">"#,
                "<cas:authenticationSuccess>",
                "<cas:user>casuser</cas:user>",
                "<cas:attributes>",
                "<cas:mail>casuser@example.org</cas:mail>",
                "<cas:mobile>12345678910</cas:mobile>",
                "</cas:attributes>",
                "</cas:authenticationSuccess>",
                "</cas:serviceResponse>",
            )
        );
        assert!(xml.contains("\n  <cas:authenticationSuccess>"));
    }

    #[test]
    fn test_failure_xml() {
        let xml = ServiceResponse::invalid_ticket("ST-1-ABCD").to_xml().unwrap();
        assert!(xml.contains(r#"xmlns:cas="http://www.yale.edu/tp/cas""#));
        assert!(xml.contains(
            r#"<cas:authenticationFailure code="INVALID_TICKET">Ticket ST-1-ABCD not recognized</cas:authenticationFailure>"#
        ));
    }

    #[test]
    fn test_failure_xml_escapes_ticket() {
        let xml = ServiceResponse::invalid_ticket("<script>").to_xml().unwrap();
        assert!(xml.contains("Ticket &lt;script&gt; not recognized"));
    }

    #[test]
    fn test_success_json() {
        let text = ServiceResponse::Success(casuser()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["serviceResponse"]["authenticationSuccess"]["user"], "casuser");
        assert_eq!(
            value["serviceResponse"]["authenticationSuccess"]["attributes"]["mobile"],
            "12345678910"
        );
        assert!(text.contains("\n  \"serviceResponse\""));
    }

    #[test]
    fn test_failure_json() {
        let text = ServiceResponse::invalid_ticket("ST-9-ZZZZ").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let failure = &value["serviceResponse"]["authenticationFailure"];
        assert_eq!(failure["code"], "INVALID_TICKET");
        assert_eq!(failure["description"], "Ticket ST-9-ZZZZ not recognized");
    }

    #[test]
    fn test_format_param() {
        assert_eq!(ResponseFormat::from_param(None), ResponseFormat::Xml);
        assert_eq!(ResponseFormat::from_param(Some("json")), ResponseFormat::Json);
        assert_eq!(ResponseFormat::from_param(Some("JSON")), ResponseFormat::Json);
        assert_eq!(ResponseFormat::from_param(Some("yaml")), ResponseFormat::Xml);
    }
}
