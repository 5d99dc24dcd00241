//! NSX manager REST client.
//!
//! Every call is a single blocking request with HTTP Basic authentication
//! against a fixed `/api/2.0/...` path; exactly one status code counts as
//! success per operation. Asynchronous jobs (controller deployment,
//! cluster preparation) expose status endpoints that the bring-up
//! pipeline polls.

pub mod payload;
pub mod response;

use reqwest::{header, Method, StatusCode};
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::ipam::IpPoolSpec;

/// Parameters for a single controller node deployment.
#[derive(Debug, Clone)]
pub struct ControllerSpec {
    pub name: String,
    pub description: String,
    pub ip_pool_id: String,
    pub resource_pool_id: String,
    pub datastore_id: String,
    pub network_id: String,
    pub password: String,
}

/// Progress of a controller deployment job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    InProgress { percent: Option<u8> },
    Success,
    Failure { detail: String },
}

/// Status of a fabric feature on one cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FabricStatus {
    Green,
    Yellow,
    Red,
    Pending(String),
}

impl FabricStatus {
    fn from_api(status: &str) -> Self {
        match status.to_ascii_uppercase().as_str() {
            "GREEN" => FabricStatus::Green,
            "YELLOW" => FabricStatus::Yellow,
            "RED" => FabricStatus::Red,
            other => FabricStatus::Pending(other.to_string()),
        }
    }
}

/// Client for one NSX manager.
///
/// Credentials are captured once and reused unchanged on every request.
/// TLS verification is controlled by the `insecure` constructor flag and
/// nothing else.
pub struct NsxClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl NsxClient {
    /// Client for an explicit base URL (scheme included).
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        insecure: bool,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        url::Url::parse(&base_url)?;
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .build()?;
        Ok(Self {
            http,
            base_url,
            username: username.into(),
            password: password.into(),
        })
    }

    /// Client for a manager reachable at `https://<address>`.
    pub fn for_manager(
        address: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        insecure: bool,
    ) -> Result<Self> {
        Self::new(format!("https://{address}"), username, password, insecure)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        operation: &'static str,
        expect: StatusCode,
    ) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, operation, "issuing NSX request");

        let mut request = self
            .http
            .request(method, &url)
            .basic_auth(&self.username, Some(&self.password));
        if let Some(body) = body {
            request = request
                .header(header::CONTENT_TYPE, "application/xml")
                .body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if status != expect {
            return Err(ApiError::UnexpectedStatus {
                operation,
                status: status.as_u16(),
                body: text,
            }
            .into());
        }
        Ok(text)
    }

    fn required_body(text: String, operation: &'static str) -> Result<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ApiError::EmptyResponse { operation }.into());
        }
        Ok(trimmed.to_string())
    }

    /// Register the manager with the SSO lookup service.
    pub async fn register_sso(
        &self,
        lookup_service_address: &str,
        admin_username: &str,
        admin_password: &str,
        thumbprint_sha1: &str,
    ) -> Result<()> {
        let lookup_url = format!("https://{lookup_service_address}:443/lookupservice/sdk");
        let body =
            payload::sso_config(&lookup_url, admin_username, admin_password, thumbprint_sha1)?;
        self.send(
            Method::POST,
            "/api/2.0/services/ssoconfig",
            Some(body),
            "SSO registration",
            StatusCode::OK,
        )
        .await
        .map(drop)
    }

    /// Register the manager with vCenter, asking for the management role
    /// to be auto-assigned to the registering user.
    pub async fn register_vcenter(
        &self,
        vcenter_address: &str,
        username: &str,
        password: &str,
        thumbprint_sha256: &str,
    ) -> Result<()> {
        let body = payload::vc_config(vcenter_address, username, password, thumbprint_sha256)?;
        self.send(
            Method::PUT,
            "/api/2.0/services/vcconfig",
            Some(body),
            "vCenter registration",
            StatusCode::OK,
        )
        .await
        .map(drop)
    }

    /// Read the current vCenter registration. Used as an authenticated
    /// reachability probe.
    pub async fn current_vc_config(&self) -> Result<String> {
        self.send(
            Method::GET,
            "/api/2.0/services/vcconfig",
            None,
            "vCenter configuration read",
            StatusCode::OK,
        )
        .await
    }

    /// Configure the fixed VNI segment range.
    pub async fn set_segment_range(&self) -> Result<()> {
        let body = payload::segment_range()?;
        self.send(
            Method::POST,
            "/api/2.0/vdn/config/segments",
            Some(body),
            "segment range creation",
            StatusCode::CREATED,
        )
        .await
        .map(drop)
    }

    /// Create an IP pool and return its identifier (the raw response
    /// body, an opaque string such as `ipaddresspool-2`).
    pub async fn create_ip_pool(&self, spec: &IpPoolSpec) -> Result<String> {
        let body = payload::ip_pool(spec)?;
        let text = self
            .send(
                Method::POST,
                "/api/2.0/services/ipam/pools/scope/globalroot-0",
                Some(body),
                "IP pool creation",
                StatusCode::CREATED,
            )
            .await?;
        Self::required_body(text, "IP pool creation")
    }

    /// Start a controller deployment and return its job identifier.
    pub async fn deploy_controller(&self, spec: &ControllerSpec) -> Result<String> {
        let body = payload::controller(spec)?;
        let text = self
            .send(
                Method::POST,
                "/api/2.0/vdn/controller",
                Some(body),
                "controller deployment",
                StatusCode::CREATED,
            )
            .await?;
        Self::required_body(text, "controller deployment")
    }

    /// Progress of a controller deployment job.
    pub async fn controller_job_status(&self, job_id: &str) -> Result<JobStatus> {
        let text = self
            .send(
                Method::GET,
                &format!("/api/2.0/vdn/controller/progress/{job_id}"),
                None,
                "controller job status",
                StatusCode::OK,
            )
            .await?;

        let status = response::first_element_text(&text, "status").unwrap_or_default();
        let status = match status.to_ascii_lowercase().as_str() {
            "success" | "completed" => JobStatus::Success,
            "failure" | "failed" => JobStatus::Failure { detail: text },
            _ => JobStatus::InProgress {
                percent: response::first_element_text(&text, "progress")
                    .and_then(|p| p.parse().ok()),
            },
        };
        Ok(status)
    }

    /// Install the network fabric (host prep) on one cluster, enabling
    /// the distributed firewall.
    pub async fn install_host_prep(&self, cluster_moid: &str) -> Result<()> {
        let body = payload::host_prep(cluster_moid)?;
        self.send(
            Method::POST,
            "/api/2.0/nwfabric/configure",
            Some(body),
            "host preparation",
            StatusCode::OK,
        )
        .await
        .map(drop)
    }

    /// Enable VXLAN on one cluster and set the switch context in the
    /// same request.
    pub async fn configure_vxlan(
        &self,
        cluster_moid: &str,
        switch_moid: &str,
        vlan_id: u16,
        ip_pool_id: &str,
    ) -> Result<()> {
        let body = payload::vxlan_config(cluster_moid, switch_moid, vlan_id, ip_pool_id)?;
        self.send(
            Method::POST,
            "/api/2.0/nwfabric/configure",
            Some(body),
            "VXLAN configuration",
            StatusCode::OK,
        )
        .await
        .map(drop)
    }

    /// Status of one fabric feature on one resource.
    pub async fn fabric_status(
        &self,
        resource_moid: &str,
        feature_id: &str,
    ) -> Result<FabricStatus> {
        let text = self
            .send(
                Method::GET,
                &format!("/api/2.0/nwfabric/status?resource={resource_moid}"),
                None,
                "fabric status",
                StatusCode::OK,
            )
            .await?;
        Ok(response::feature_status(&text, feature_id)
            .map(|s| FabricStatus::from_api(&s))
            .unwrap_or_else(|| FabricStatus::Pending("UNREPORTED".into())))
    }

    /// Create a transport zone and return its identifier.
    pub async fn create_transport_zone(
        &self,
        name: &str,
        cluster_moids: &[String],
    ) -> Result<String> {
        let body = payload::transport_zone(name, cluster_moids)?;
        let text = self
            .send(
                Method::POST,
                "/api/2.0/vdn/scopes",
                Some(body),
                "transport zone creation",
                StatusCode::CREATED,
            )
            .await?;
        Self::required_body(text, "transport zone creation")
    }
}
