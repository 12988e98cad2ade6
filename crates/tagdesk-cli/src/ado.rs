//! Azure DevOps work item REST client.
//!
//! Implements the core store traits over the `_apis/wit` endpoints with a
//! blocking `ureq` agent. Reads are a WIQL identity query followed by one
//! batched fetch; writes are JSON-Patch documents against a single item.

use anyhow::{Context, Result, anyhow, bail};
use base64::Engine as _;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tagdesk_core::config::ConnectionConfig;
use tagdesk_core::model::{Field, WorkItem, WorkItemId, WorkItemRecord};
use tagdesk_core::store::{
    PatchOperation, WorkItemQueryService, WorkItemReference, WorkItemUpdateService,
};
use tagdesk_core::wiql::WiqlQuery;
use tracing::debug;

/// Most ids the batch endpoint accepts in one call.
pub const BATCH_LIMIT: u32 = 200;

const JSON_PATCH: &str = "application/json-patch+json";

#[derive(Debug, Deserialize)]
struct WiqlResponse {
    #[serde(rename = "workItems", default)]
    work_items: Vec<WorkItemReference>,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

pub struct AzureDevOpsClient {
    agent: ureq::Agent,
    organization_url: String,
    api_version: String,
    max_results: u32,
    authorization: Option<String>,
}

impl AzureDevOpsClient {
    /// Build a client from the `[connection]` config, reading the token from
    /// the environment variable it names.
    ///
    /// # Errors
    ///
    /// Returns an error if no organization URL is configured.
    pub fn from_config(connection: &ConnectionConfig) -> Result<Self> {
        let Some(org) = connection
            .organization_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
        else {
            bail!(
                "no organization URL configured; set connection.organization_url or {}",
                tagdesk_core::config::ORG_URL_ENV
            );
        };

        let token = std::env::var(&connection.token_env)
            .ok()
            .filter(|t| !t.is_empty());
        if token.is_none() {
            debug!(var = %connection.token_env, "no access token set; sending unauthenticated requests");
        }

        Ok(Self::new(
            org,
            &connection.api_version,
            connection.max_results,
            Duration::from_secs(connection.timeout_secs),
            token.as_deref(),
        ))
    }

    fn new(
        organization_url: &str,
        api_version: &str,
        max_results: u32,
        timeout: Duration,
        token: Option<&str>,
    ) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .user_agent(concat!("tagdesk/", env!("CARGO_PKG_VERSION")))
            .build();

        Self {
            agent,
            organization_url: organization_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
            max_results: max_results.clamp(1, BATCH_LIMIT),
            authorization: token.map(basic_auth),
        }
    }

    fn wiql_url(&self, project: &str) -> String {
        format!(
            "{}/{}/_apis/wit/wiql?$top={}&api-version={}",
            self.organization_url,
            urlencoding::encode(project),
            self.max_results,
            urlencoding::encode(&self.api_version)
        )
    }

    fn work_items_url(&self, ids: &[WorkItemId], fields: &[Field]) -> String {
        let ids = ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let fields = fields
            .iter()
            .map(|f| urlencoding::encode(f.reference_name()).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{}/_apis/wit/workitems?ids={ids}&fields={fields}&api-version={}",
            self.organization_url,
            urlencoding::encode(&self.api_version)
        )
    }

    fn work_item_url(&self, id: WorkItemId) -> String {
        format!(
            "{}/_apis/wit/workitems/{id}?api-version={}",
            self.organization_url,
            urlencoding::encode(&self.api_version)
        )
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        debug!(method, url, "azure devops request");
        let request = self
            .agent
            .request(method, url)
            .set("Accept", "application/json");
        match &self.authorization {
            Some(auth) => request.set("Authorization", auth),
            None => request,
        }
    }

    fn decode<T: DeserializeOwned>(
        what: &str,
        result: std::result::Result<ureq::Response, ureq::Error>,
    ) -> Result<T> {
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let message = response
                    .into_json::<ErrorBody>()
                    .ok()
                    .and_then(|body| body.message);
                return Err(anyhow!(describe_status(what, code, message.as_deref())));
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(anyhow!("{what} failed: {transport}"));
            }
        };

        response
            .into_json::<T>()
            .with_context(|| format!("failed to decode {what} response"))
    }
}

impl WorkItemQueryService for AzureDevOpsClient {
    fn query_by_wiql(&self, query: &WiqlQuery, project: &str) -> Result<Vec<WorkItemReference>> {
        let url = self.wiql_url(project);
        let body = serde_json::json!({ "query": query.to_wiql() });
        let result = self.request("POST", &url).send_json(body);
        let response: WiqlResponse = Self::decode("work item query", result)?;
        Ok(response.work_items)
    }

    fn get_work_items(&self, ids: &[WorkItemId], fields: &[Field]) -> Result<Vec<WorkItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.work_items_url(ids, fields);
        let result = self.request("GET", &url).call();
        let response: ListResponse<WorkItemRecord> = Self::decode("work item fetch", result)?;
        Ok(response
            .value
            .into_iter()
            .map(WorkItemRecord::into_work_item)
            .collect())
    }
}

impl WorkItemUpdateService for AzureDevOpsClient {
    fn update_work_item(&self, patch: &[PatchOperation], id: WorkItemId) -> Result<WorkItem> {
        let url = self.work_item_url(id);
        let body = serde_json::to_string(patch).context("failed to encode patch document")?;
        let result = self
            .request("PATCH", &url)
            .set("Content-Type", JSON_PATCH)
            .send_string(&body);
        let record: WorkItemRecord = Self::decode("work item update", result)?;
        Ok(record.into_work_item())
    }
}

fn basic_auth(token: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!(":{token}"));
    format!("Basic {encoded}")
}

fn describe_status(what: &str, code: u16, message: Option<&str>) -> String {
    match message.filter(|m| !m.is_empty()) {
        Some(message) => format!("{what} returned HTTP {code}: {message}"),
        None => format!("{what} returned HTTP {code}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AzureDevOpsClient {
        AzureDevOpsClient::new(
            "https://dev.azure.com/fabrikam/",
            "7.1",
            500,
            Duration::from_secs(5),
            Some("secret"),
        )
    }

    #[test]
    fn wiql_url_encodes_project_and_caps_top() {
        assert_eq!(
            client().wiql_url("Fabrikam Fiber"),
            "https://dev.azure.com/fabrikam/Fabrikam%20Fiber/_apis/wit/wiql?$top=200&api-version=7.1"
        );
    }

    #[test]
    fn work_items_url_lists_ids_and_fields() {
        let url = client().work_items_url(
            &[WorkItemId(3), WorkItemId(1)],
            &[Field::Id, Field::Tags],
        );
        assert_eq!(
            url,
            "https://dev.azure.com/fabrikam/_apis/wit/workitems?ids=3,1&fields=System.Id,System.Tags&api-version=7.1"
        );
    }

    #[test]
    fn work_item_url_targets_single_item() {
        assert_eq!(
            client().work_item_url(WorkItemId(42)),
            "https://dev.azure.com/fabrikam/_apis/wit/workitems/42?api-version=7.1"
        );
    }

    #[test]
    fn basic_auth_uses_empty_user() {
        // ":secret"
        assert_eq!(basic_auth("secret"), "Basic OnNlY3JldA==");
    }

    #[test]
    fn status_description_includes_store_message() {
        assert_eq!(
            describe_status("work item update", 412, Some("rev mismatch")),
            "work item update returned HTTP 412: rev mismatch"
        );
        assert_eq!(
            describe_status("work item query", 500, Some("")),
            "work item query returned HTTP 500"
        );
    }

    #[test]
    fn wiql_response_ignores_extra_fields() {
        let body = r#"{"queryType":"flat","asOf":"2024-01-01T00:00:00Z","workItems":[{"id":7,"url":"https://x/7"},{"id":3,"url":"https://x/3"}]}"#;
        let parsed: WiqlResponse = serde_json::from_str(body).expect("parse");
        let ids: Vec<u32> = parsed.work_items.iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, [7, 3]);
    }

    #[test]
    fn empty_wiql_response_has_no_items() {
        let parsed: WiqlResponse = serde_json::from_str(r#"{"queryType":"flat"}"#).expect("parse");
        assert!(parsed.work_items.is_empty());
    }

    #[test]
    fn batch_response_converts_records() {
        let body = r#"{
            "count": 1,
            "value": [{
                "id": 42,
                "rev": 3,
                "fields": {
                    "System.Id": 42,
                    "System.WorkItemType": "Issue",
                    "System.Title": "Login fails",
                    "System.State": "Doing",
                    "System.AreaPath": "Fabrikam",
                    "System.IterationPath": "Fabrikam\\Sprint 1"
                },
                "url": "https://x/42"
            }]
        }"#;
        let parsed: ListResponse<WorkItemRecord> = serde_json::from_str(body).expect("parse");
        let item = parsed
            .value
            .into_iter()
            .map(WorkItemRecord::into_work_item)
            .next()
            .expect("one item");
        assert_eq!(item.id, WorkItemId(42));
        assert_eq!(item.title, "Login fails");
        assert_eq!(item.tags, "");
    }

    #[test]
    fn from_config_requires_organization_url() {
        let err = AzureDevOpsClient::from_config(&ConnectionConfig::default())
            .err()
            .expect("missing org url");
        assert!(err.to_string().contains("organization URL"));
    }

    /// Nothing listens on port 1, so any request it sends fails.
    fn offline_client() -> AzureDevOpsClient {
        AzureDevOpsClient::new(
            "http://127.0.0.1:1",
            "7.1",
            200,
            Duration::from_millis(500),
            None,
        )
    }

    #[test]
    fn empty_fetch_makes_no_request() {
        let items = offline_client()
            .get_work_items(&[], &Field::ALL)
            .expect("no-op");
        assert!(items.is_empty());
    }

    #[test]
    fn transport_failure_names_the_call() {
        let err = offline_client()
            .get_work_items(&[WorkItemId(1)], &Field::ALL)
            .expect_err("connection refused");
        assert!(err.to_string().starts_with("work item fetch failed"));
    }
}
