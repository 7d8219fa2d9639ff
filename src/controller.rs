//! Client for the ZeroTier Central member API.
//!
//! Only member authorization is supported. The bearer token never leaves this
//! module in readable form: `Debug` output and error messages carry a
//! redacted placeholder instead.

use std::fmt;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap};
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

use crate::cli::CommandRunner;
use crate::config::ClientConfig;
use crate::error::{Result, ZtError};
use crate::network::Endpoint;

const REDACTED: &str = "<redacted>";

/// Controller API token.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiToken({})", REDACTED)
    }
}

/// Anything that can mark a member as authorized on a network.
pub trait MemberAuthorizer {
    fn authorize_member(
        &self,
        network_id: &str,
        member_address: &str,
        member_description: &str,
    ) -> Result<()>;

    /// Authorize the local node by its device address.
    fn authorize_endpoint<R: CommandRunner>(
        &self,
        endpoint: &Endpoint<R>,
        network_id: &str,
        member_description: &str,
    ) -> Result<()>
    where
        Self: Sized,
    {
        self.authorize_member(network_id, endpoint.device_address(), member_description)
    }
}

#[derive(Debug)]
pub struct Controller {
    http: Client,
    base_url: Url,
    token: ApiToken,
}

impl Controller {
    pub fn new(token: ApiToken, config: &ClientConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self {
            http,
            base_url: config.controller_url.clone(),
            token,
        })
    }

    /// `{base}/network/{network_id}/member/{member_address}`
    fn member_url(&self, network_id: &str, member_address: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ZtError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(["network", network_id, "member", member_address]);
        Ok(url)
    }
}

impl MemberAuthorizer for Controller {
    /// POST `{"config":{"authorized":true},"annot":{"description":...}}`.
    /// Repeating the call is harmless; the description is overwritten.
    fn authorize_member(
        &self,
        network_id: &str,
        member_address: &str,
        member_description: &str,
    ) -> Result<()> {
        let url = self.member_url(network_id, member_address)?;
        let body = json!({
            "config": { "authorized": true },
            "annot": { "description": member_description },
        });

        let request = self
            .http
            .post(url.clone())
            .bearer_auth(self.token.expose())
            .json(&body)
            .build()?;
        let headers = redact_headers(request.headers());

        debug!(%url, network_id, member_address, "authorizing member");
        let response = self.http.execute(request)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().unwrap_or_else(|e| {
                debug!(error = %e, "cannot read controller error body");
                String::new()
            });
            warn!(%url, %status, "controller rejected member update");
            return Err(ZtError::HttpStatus {
                status,
                url: url.to_string(),
                headers,
                body,
            });
        }

        info!(network_id, member_address, "member authorized");
        Ok(())
    }
}

/// Render request headers for diagnostics with credentials blanked out.
fn redact_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if *name == AUTHORIZATION {
                match value.to_str() {
                    Ok(v) if v.starts_with("Bearer ") => format!("Bearer {}", REDACTED),
                    _ => REDACTED.to_string(),
                }
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            format!("{}: {}", name, shown)
        })
        .collect::<Vec<_>>()
        .join(", ")
}
