//! vCenter client.
//!
//! A thin session over the vim25 SOAP endpoint: login, single-object
//! property retrieval, and the license manager. Inventory objects are
//! resolved by exact-name linear scans over the child lists the API
//! returns; a miss is a typed [`LookupError`] rather than a process
//! exit.

pub mod soap;
pub mod types;

use reqwest::header;
use tracing::debug;

use crate::error::{ApiError, LookupError, Result};

pub use types::ManagedObjectRef;

/// Entity identifier the NSX license is assigned to.
pub const NSX_LICENSE_ENTITY: &str = "nsx-netsec";

/// Service endpoints discovered from the well-known service instance.
#[derive(Debug, Clone)]
pub struct ServiceContent {
    pub root_folder: ManagedObjectRef,
    pub property_collector: ManagedObjectRef,
    pub session_manager: ManagedObjectRef,
    pub license_manager: ManagedObjectRef,
}

impl ServiceContent {
    fn parse(xml: &str) -> Result<Self> {
        let field = |element: &str| -> Result<ManagedObjectRef> {
            soap::find_moref(xml, element).ok_or_else(|| {
                ApiError::MalformedResponse {
                    operation: "service content retrieval",
                    reason: format!("missing {element} reference"),
                }
                .into()
            })
        };
        Ok(Self {
            root_folder: field("rootFolder")?,
            property_collector: field("propertyCollector")?,
            session_manager: field("sessionManager")?,
            license_manager: field("licenseManager")?,
        })
    }
}

/// An authenticated vCenter session.
#[derive(Debug)]
pub struct VsphereClient {
    http: reqwest::Client,
    sdk_url: String,
    content: ServiceContent,
}

impl VsphereClient {
    /// Connect and log in. `base_url` carries the scheme, host, and port
    /// (e.g. `https://vcenter.lab.local:443`).
    pub async fn connect(
        base_url: &str,
        username: &str,
        password: &str,
        insecure: bool,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .cookie_store(true)
            .build()?;
        let sdk_url = format!("{}/sdk", base_url.trim_end_matches('/'));
        url::Url::parse(&sdk_url)?;

        let envelope = soap::retrieve_service_content()?;
        let text = Self::post(&http, &sdk_url, envelope, "service content retrieval").await?;
        let content = ServiceContent::parse(&text)?;

        let client = Self {
            http,
            sdk_url,
            content,
        };
        client
            .call(
                soap::login(&client.content.session_manager, username, password)?,
                "vCenter login",
            )
            .await?;
        Ok(client)
    }

    /// End the session. Best-effort; a failed logout only matters as a
    /// leaked session on the server.
    pub async fn logout(&self) -> Result<()> {
        self.call(soap::logout(&self.content.session_manager)?, "vCenter logout")
            .await
            .map(drop)
    }

    async fn post(
        http: &reqwest::Client,
        url: &str,
        envelope: String,
        operation: &'static str,
    ) -> Result<String> {
        debug!(%url, operation, "issuing SOAP request");
        let response = http
            .post(url)
            .header(header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", "urn:vim25/6.0")
            .body(envelope)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        // Faults arrive with HTTP 500, so check for one first.
        if let Some(fault) = soap::fault_string(&text) {
            return Err(ApiError::SoapFault(fault).into());
        }
        if !status.is_success() {
            return Err(ApiError::UnexpectedStatus {
                operation,
                status: status.as_u16(),
                body: text,
            }
            .into());
        }
        Ok(text)
    }

    async fn call(&self, envelope: String, operation: &'static str) -> Result<String> {
        Self::post(&self.http, &self.sdk_url, envelope, operation).await
    }

    async fn retrieve_property(&self, obj: &ManagedObjectRef, path: &str) -> Result<String> {
        let envelope = soap::retrieve_properties(&self.content.property_collector, obj, path)?;
        self.call(envelope, "property retrieval").await
    }

    async fn property_morefs(
        &self,
        obj: &ManagedObjectRef,
        path: &str,
    ) -> Result<Vec<ManagedObjectRef>> {
        Ok(soap::moref_values(&self.retrieve_property(obj, path).await?))
    }

    async fn property_moref(&self, obj: &ManagedObjectRef, path: &str) -> Result<ManagedObjectRef> {
        self.property_morefs(obj, path)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ApiError::MalformedResponse {
                    operation: "property retrieval",
                    reason: format!("{obj} has no {path}"),
                }
                .into()
            })
    }

    /// Display name of an inventory object.
    pub async fn object_name(&self, obj: &ManagedObjectRef) -> Result<String> {
        soap::first_val_text(&self.retrieve_property(obj, "name").await?).ok_or_else(|| {
            ApiError::MalformedResponse {
                operation: "property retrieval",
                reason: format!("{obj} has no name"),
            }
            .into()
        })
    }

    /// First match wins; no match is a typed lookup error.
    async fn find_by_name(
        &self,
        candidates: Vec<ManagedObjectRef>,
        name: &str,
        kind: &'static str,
    ) -> Result<ManagedObjectRef> {
        for candidate in candidates {
            if self.object_name(&candidate).await? == name {
                return Ok(candidate);
            }
        }
        Err(LookupError::not_found(kind, name).into())
    }

    /// Resolve a datacenter by name, or the first one when no name is
    /// given.
    pub async fn datacenter(&self, name: Option<&str>) -> Result<ManagedObjectRef> {
        let children = self
            .property_morefs(&self.content.root_folder, "childEntity")
            .await?;
        let datacenters: Vec<_> = children
            .into_iter()
            .filter(|m| m.kind == "Datacenter")
            .collect();
        match name {
            Some(name) => self.find_by_name(datacenters, name, "datacenter").await,
            None => datacenters
                .into_iter()
                .next()
                .ok_or_else(|| LookupError::not_found("datacenter", "<first>").into()),
        }
    }

    /// Resolve a cluster under a datacenter's host folder.
    pub async fn find_cluster(
        &self,
        datacenter: &ManagedObjectRef,
        name: &str,
    ) -> Result<ManagedObjectRef> {
        let host_folder = self.property_moref(datacenter, "hostFolder").await?;
        let children = self.property_morefs(&host_folder, "childEntity").await?;
        let clusters = children
            .into_iter()
            .filter(|m| m.kind == "ClusterComputeResource")
            .collect();
        self.find_by_name(clusters, name, "cluster").await
    }

    /// Resolve a datastore visible from a datacenter.
    pub async fn find_datastore(
        &self,
        datacenter: &ManagedObjectRef,
        name: &str,
    ) -> Result<ManagedObjectRef> {
        let datastores = self.property_morefs(datacenter, "datastore").await?;
        self.find_by_name(datastores, name, "datastore").await
    }

    /// Resolve a network (standard or distributed portgroup) visible
    /// from a datacenter.
    pub async fn find_network(
        &self,
        datacenter: &ManagedObjectRef,
        name: &str,
    ) -> Result<ManagedObjectRef> {
        let networks = self.property_morefs(datacenter, "network").await?;
        self.find_by_name(networks, name, "network").await
    }

    /// Resolve a distributed switch under a datacenter's network folder.
    pub async fn find_distributed_switch(
        &self,
        datacenter: &ManagedObjectRef,
        name: &str,
    ) -> Result<ManagedObjectRef> {
        let network_folder = self.property_moref(datacenter, "networkFolder").await?;
        let children = self.property_morefs(&network_folder, "childEntity").await?;
        let switches = children
            .into_iter()
            .filter(|m| m.kind.ends_with("DistributedVirtualSwitch"))
            .collect();
        self.find_by_name(switches, name, "distributed switch").await
    }

    /// Number of hosts in a cluster.
    pub async fn cluster_host_count(&self, cluster: &ManagedObjectRef) -> Result<u64> {
        Ok(self.property_morefs(cluster, "host").await?.len() as u64)
    }

    /// Install a license key into the inventory.
    pub async fn add_license(&self, key: &str) -> Result<()> {
        self.call(
            soap::add_license(&self.content.license_manager, key)?,
            "license installation",
        )
        .await
        .map(drop)
    }

    /// Assign an installed key to the network-virtualization product.
    pub async fn assign_nsx_license(&self, key: &str) -> Result<()> {
        let assignment_manager = self
            .property_moref(&self.content.license_manager, "licenseAssignmentManager")
            .await?;
        self.call(
            soap::assign_license(&assignment_manager, NSX_LICENSE_ENTITY, key)?,
            "license assignment",
        )
        .await
        .map(drop)
    }
}
