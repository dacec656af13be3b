use serde::Serialize;
use tracing::info;

use crate::config::RepmanConfig;
use crate::error::{snippet, ReportError};

#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct LoginRequest<'a> {
    usuario: &'a str,
    contrasena: &'a str,
    centro: &'a str,
}

/// An authenticated repman session; cookies set at login ride along.
pub struct Session {
    http: reqwest::Client,
}

pub struct RepmanClient {
    config: RepmanConfig,
}

impl RepmanClient {
    pub fn new(config: RepmanConfig) -> Self {
        Self { config }
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ReportError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|err| transport(&self.config.login_url, err))?;

        let payload = login_request(credentials, &self.config.center);
        info!(url = %self.config.login_url, center = %self.config.center, "logging in");

        let response = http
            .post(&self.config.login_url)
            .header(reqwest::header::ACCEPT, "application/json, text/plain, */*")
            .json(&payload)
            .send()
            .await
            .map_err(|err| transport(&self.config.login_url, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Auth {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        Ok(Session { http })
    }

    /// Downloads the kiln-exit report as raw bytes.
    pub async fn fetch_report(&self, session: &Session) -> Result<Vec<u8>, ReportError> {
        info!(url = %self.config.report_url, "downloading kiln exit report");

        let response = session
            .http
            .get(&self.config.report_url)
            .send()
            .await
            .map_err(|err| transport(&self.config.report_url, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Fetch {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| transport(&self.config.report_url, err))?;
        info!(bytes = bytes.len(), "report downloaded");
        Ok(bytes.to_vec())
    }
}

fn login_request<'a>(credentials: &'a Credentials, center: &'a str) -> LoginRequest<'a> {
    LoginRequest {
        usuario: &credentials.user,
        contrasena: &credentials.password,
        centro: center,
    }
}

fn transport(url: &str, err: reqwest::Error) -> ReportError {
    ReportError::Transport {
        url: url.to_string(),
        message: err.to_string(),
    }
}
