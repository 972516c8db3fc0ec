use crate::config::SloConfig;
use chrono::{DateTime, Utc};
use error_common::saml;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

/// Bytes of a rejected response body worth keeping in the log
const MAX_LOGGED_BODY: usize = 4096;

#[derive(Error, Debug)]
pub enum SloError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Logout request encoding error: {0}")]
    Encode(#[from] quick_xml::DeError),
}

/// One service session that has to be told it ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutNotice {
    pub username: String,
    /// The revoked service ticket, as the client received it
    pub session_index: String,
    /// Service specific endpoint; `None` means use the dispatcher's fallback
    pub logout_url: Option<String>,
}

/// Receives logout notices from the authority.
///
/// Implementations must return without waiting on the network.
pub trait LogoutNotifier: Send + Sync {
    fn notify(&self, notice: LogoutNotice);
}

/// Notifier that discards everything, for deployments without SLO
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl LogoutNotifier for NoopNotifier {
    fn notify(&self, notice: LogoutNotice) {
        debug!(session_index = %notice.session_index, "Single logout disabled, notice dropped");
    }
}

#[derive(Serialize)]
#[serde(rename = "samlp:LogoutRequest")]
struct LogoutRequest<'a> {
    #[serde(rename = "@xmlns:samlp")]
    xmlns: &'static str,
    #[serde(rename = "@ID")]
    id: String,
    #[serde(rename = "@Version")]
    version: &'static str,
    #[serde(rename = "@IssueInstant")]
    issue_instant: String,
    #[serde(rename = "saml:NameID")]
    name_id: NameId<'a>,
    #[serde(rename = "samlp:SessionIndex")]
    session_index: &'a str,
}

#[derive(Serialize)]
struct NameId<'a> {
    #[serde(rename = "@xmlns:saml")]
    xmlns: &'static str,
    #[serde(rename = "$text")]
    value: &'a str,
}

/// Build the SAML 2.0 `LogoutRequest` document for one session
pub fn encode_logout_request(
    username: &str,
    session_index: &str,
    issued_at: DateTime<Utc>,
) -> Result<String, SloError> {
    let request = LogoutRequest {
        xmlns: saml::PROTOCOL_NAMESPACE,
        id: format!("LR-{session_index}"),
        version: "2.0",
        issue_instant: issued_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        name_id: NameId {
            xmlns: saml::ASSERTION_NAMESPACE,
            value: username,
        },
        session_index,
    };
    Ok(quick_xml::se::to_string(&request)?)
}

/// Queue-backed notifier that POSTs logout requests from a background task
///
/// [`notify`](LogoutNotifier::notify) only enqueues. A full queue drops the
/// notice with a warning rather than stalling logout; each delivery is
/// attempted once.
pub struct SloDispatcher {
    sender: mpsc::Sender<LogoutNotice>,
}

impl SloDispatcher {
    /// Start the delivery worker on the current tokio runtime
    pub fn spawn(config: &SloConfig) -> Result<Self, SloError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        tokio::spawn(run_worker(client, receiver, config.default_logout_url.clone()));
        Ok(Self { sender })
    }
}

impl LogoutNotifier for SloDispatcher {
    fn notify(&self, notice: LogoutNotice) {
        match self.sender.try_send(notice) {
            Ok(()) => {}
            Err(TrySendError::Full(notice)) => {
                warn!(session_index = %notice.session_index, "SLO queue full, notice dropped");
            }
            Err(TrySendError::Closed(notice)) => {
                warn!(session_index = %notice.session_index, "SLO worker stopped, notice dropped");
            }
        }
    }
}

async fn run_worker(
    client: reqwest::Client,
    mut receiver: mpsc::Receiver<LogoutNotice>,
    default_logout_url: Option<String>,
) {
    while let Some(notice) = receiver.recv().await {
        let Some(target) = notice.logout_url.clone().or_else(|| default_logout_url.clone()) else {
            debug!(session_index = %notice.session_index, "No logout URL for service, skipping");
            continue;
        };
        tokio::spawn(deliver(client.clone(), target, notice));
    }
    debug!("SLO worker stopped");
}

async fn deliver(client: reqwest::Client, target: String, notice: LogoutNotice) {
    let payload = match encode_logout_request(&notice.username, &notice.session_index, Utc::now()) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Failed to encode single logout request");
            return;
        }
    };

    let response = match client
        .post(&target)
        .form(&[("logoutRequest", payload)])
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!(target = %target, error = %e, "Single logout request failed");
            return;
        }
    };

    let status = response.status();
    if status.is_success() {
        info!(target = %target, status = %status, "Single logout request delivered");
    } else {
        let body = read_body_prefix(response).await;
        warn!(target = %target, status = %status, body = %body, "Single logout request rejected");
    }
}

async fn read_body_prefix(mut response: reqwest::Response) -> String {
    let mut body = Vec::new();
    while body.len() < MAX_LOGGED_BODY {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            Ok(None) | Err(_) => break,
        }
    }
    body.truncate(MAX_LOGGED_BODY);
    String::from_utf8_lossy(&body).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Form, Router};
    use chrono::TimeZone;
    use std::collections::HashMap;

    #[test]
    fn test_logout_request_document() {
        let issued_at = Utc.with_ymd_and_hms(2026, 1, 4, 14, 25, 34).unwrap();
        let xml = encode_logout_request("casuser", "ST-2-ABCDEFGH", issued_at).unwrap();

        assert!(xml.starts_with("<samlp:LogoutRequest "));
        assert!(xml.contains(r#"xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol""#));
        assert!(xml.contains(r#"ID="LR-ST-2-ABCDEFGH""#));
        assert!(xml.contains(r#"Version="2.0""#));
        assert!(xml.contains(r#"IssueInstant="2026-01-04T14:25:34Z""#));
        assert!(xml.contains(
            r#"<saml:NameID xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion">casuser</saml:NameID>"#
        ));
        assert!(xml.contains("<samlp:SessionIndex>ST-2-ABCDEFGH</samlp:SessionIndex>"));
    }

    #[test]
    fn test_logout_request_escapes_username() {
        let xml = encode_logout_request("a<b&c", "ST-1-AAAA", Utc::now()).unwrap();
        assert!(xml.contains("a&lt;b&amp;c"));
    }

    #[tokio::test]
    async fn test_dispatcher_posts_form() {
        let (tx, mut rx) = mpsc::channel::<String>(4);
        let app = Router::new().route(
            "/slo",
            post(move |Form(form): Form<HashMap<String, String>>| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(form.get("logoutRequest").cloned().unwrap_or_default()).await;
                    "ok"
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let dispatcher = SloDispatcher::spawn(&SloConfig {
            default_logout_url: Some(format!("http://{addr}/slo")),
            ..SloConfig::default()
        })
        .unwrap();
        dispatcher.notify(LogoutNotice {
            username: "casuser".to_string(),
            session_index: "ST-9-ABCDEFGH".to_string(),
            logout_url: None,
        });

        let received = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(received.contains("<samlp:SessionIndex>ST-9-ABCDEFGH</samlp:SessionIndex>"));
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let (sender, mut receiver) = mpsc::channel(1);
        let dispatcher = SloDispatcher { sender };
        for n in 1..=3 {
            dispatcher.notify(LogoutNotice {
                username: "casuser".to_string(),
                session_index: format!("ST-{n}-AAAA"),
                logout_url: Some("http://127.0.0.1:1/slo".to_string()),
            });
        }
        drop(dispatcher);

        let mut queued = Vec::new();
        while let Some(notice) = receiver.recv().await {
            queued.push(notice.session_index);
        }
        assert_eq!(queued, vec!["ST-1-AAAA".to_string()]);
    }
}
