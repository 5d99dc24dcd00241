//! The bring-up pipeline.
//!
//! A strictly sequential run of every provisioning step, in order:
//! inventory resolution, SSO and vCenter registration, licensing, the
//! VNI segment range, the two IP pools, three controllers, per-cluster
//! firewall and VXLAN preparation, and the transport zone. Values
//! produced by one step (pool identifiers, object references) are
//! threaded into later steps; nothing is retried and nothing is rolled
//! back.

pub mod poll;
pub mod report;

use std::time::Duration;

use indicatif::ProgressBar;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::{ApiError, Error, Result, ValidationError};
use crate::ipam::{
    IpPoolSpec, CONTROLLER_POOL_NAME, MIN_CONTROLLER_ADDRESSES, VTEPS_PER_HOST, VTEP_POOL_NAME,
};
use crate::nsx::{payload, ControllerSpec, FabricStatus, JobStatus, NsxClient};
use crate::vsphere::{ManagedObjectRef, VsphereClient};

/// Name of the single transport zone.
pub const TRANSPORT_ZONE_NAME: &str = "Primary";

/// Controllers always deploy as a three-node cluster.
pub const CONTROLLER_COUNT: usize = 3;

/// Raw pool parameters as supplied on the command line. Validation
/// happens when the pool is built, before anything is sent.
#[derive(Debug, Clone)]
pub struct PoolParams {
    pub ranges: String,
    pub mask: String,
    pub gateway: String,
    pub dns_servers: String,
    pub dns_suffix: String,
}

/// Everything one bring-up run needs to know.
#[derive(Debug, Clone)]
pub struct BringupSpec {
    pub vcenter_address: String,
    pub vcenter_username: String,
    pub vcenter_password: String,
    pub datacenter: Option<String>,
    pub lookup_service_address: String,
    pub lookup_service_thumbprint_sha1: String,
    pub vcenter_thumbprint_sha256: String,
    pub prep_clusters: Vec<String>,
    pub vtep_pool: PoolParams,
    pub vtep_vlan_id: u16,
    pub controller_pool: PoolParams,
    pub controller_cluster: String,
    pub controller_datastores: Vec<String>,
    pub controller_network: String,
    pub controller_password: String,
    pub switch_name: String,
    pub license_key: Option<String>,
}

impl BringupSpec {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.prep_clusters.iter().all(|c| c.trim().is_empty()) {
            return Err(ValidationError::MissingValue {
                field: "cluster prep list",
            });
        }
        if self.controller_datastores.iter().all(|d| d.trim().is_empty()) {
            return Err(ValidationError::MissingValue {
                field: "controller datastore list",
            });
        }
        Ok(())
    }
}

/// Pad or trim a datastore name list to exactly one entry per
/// controller, repeating the last name when fewer are given.
pub fn pad_datastores(names: &[String]) -> Vec<String> {
    let mut padded: Vec<String> = names.iter().take(CONTROLLER_COUNT).cloned().collect();
    while padded.len() < CONTROLLER_COUNT {
        match padded.last().cloned() {
            Some(last) => padded.push(last),
            None => break,
        }
    }
    padded
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    /// The remote side rejected the call in a way that usually means the
    /// resource already exists; the run continued.
    Warning,
    Skipped,
    Failed,
}

/// Record of one pipeline step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: String,
    pub status: StepStatus,
    pub detail: Option<String>,
    pub duration_secs: f64,
}

/// Inventory references resolved up front, consumed by later steps.
struct Inventory {
    prep_clusters: Vec<PrepCluster>,
    controller_cluster: ManagedObjectRef,
    controller_datastores: Vec<ManagedObjectRef>,
    controller_network: ManagedObjectRef,
    switch: ManagedObjectRef,
    host_count: u64,
}

struct PrepCluster {
    name: String,
    moref: ManagedObjectRef,
}

/// Whether the remote side processed the request but answered with a
/// rejection (as opposed to a transport-level failure). Setup calls
/// that are idempotent on the manager treat these as "already
/// configured".
fn is_remote_rejection(error: &Error) -> bool {
    matches!(
        error,
        Error::Api(ApiError::UnexpectedStatus { .. }) | Error::Api(ApiError::SoapFault(_))
    )
}

fn spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// One bring-up run against a manager/vCenter pair.
pub struct Bringup {
    nsx: NsxClient,
    vc: VsphereClient,
    spec: BringupSpec,
    outcomes: Vec<StepOutcome>,
}

impl Bringup {
    pub fn new(nsx: NsxClient, vc: VsphereClient, spec: BringupSpec) -> Result<Self> {
        spec.validate()?;
        Ok(Self {
            nsx,
            vc,
            spec,
            outcomes: Vec::new(),
        })
    }

    /// Steps completed so far, in execution order. Populated even when
    /// [`run`](Self::run) returns an error, so a report can still be
    /// written.
    pub fn outcomes(&self) -> &[StepOutcome] {
        &self.outcomes
    }

    /// Best-effort vCenter session logout.
    pub async fn disconnect(&self) {
        if let Err(error) = self.vc.logout().await {
            warn!(error = %error, "vCenter logout failed");
        }
    }

    /// Execute the full pipeline.
    pub async fn run(&mut self) -> Result<()> {
        let inventory = self.resolve_inventory().await?;
        self.register_sso().await?;
        self.register_vcenter().await?;
        self.apply_license().await?;
        self.configure_segment_range().await?;
        let vtep_pool_id = self.create_vtep_pool(inventory.host_count).await?;
        let controller_pool_id = self.create_controller_pool().await?;
        self.deploy_controllers(&inventory, &controller_pool_id).await?;
        self.prepare_firewall(&inventory).await?;
        self.configure_overlay(&inventory, &vtep_pool_id).await?;
        self.create_transport_zone(&inventory).await?;
        Ok(())
    }

    fn push(
        &mut self,
        step: impl Into<String>,
        status: StepStatus,
        detail: Option<String>,
        started: Instant,
    ) {
        self.outcomes.push(StepOutcome {
            step: step.into(),
            status,
            detail,
            duration_secs: started.elapsed().as_secs_f64(),
        });
    }

    /// Record a step whose failure aborts the run.
    fn finish_step<T>(
        &mut self,
        step: impl Into<String>,
        started: Instant,
        result: Result<T>,
        ok_detail: impl FnOnce(&T) -> Option<String>,
    ) -> Result<T> {
        let step = step.into();
        match result {
            Ok(value) => {
                let detail = ok_detail(&value);
                info!(step = %step, "step complete");
                self.push(step, StepStatus::Succeeded, detail, started);
                Ok(value)
            }
            Err(error) => {
                self.push(step, StepStatus::Failed, Some(error.to_string()), started);
                Err(error)
            }
        }
    }

    /// Record a step that tolerates a remote rejection: the manager
    /// answered with an unexpected status, which for these idempotent
    /// setup calls usually means the resource already exists.
    fn finish_soft_step<T>(
        &mut self,
        step: impl Into<String>,
        started: Instant,
        result: Result<T>,
        ok_detail: impl FnOnce(&T) -> Option<String>,
    ) -> Result<Option<T>> {
        let step = step.into();
        match result {
            Ok(value) => {
                let detail = ok_detail(&value);
                info!(step = %step, "step complete");
                self.push(step, StepStatus::Succeeded, detail, started);
                Ok(Some(value))
            }
            Err(error) if is_remote_rejection(&error) => {
                warn!(step = %step, error = %error, "continuing; it may already be configured");
                self.push(step, StepStatus::Warning, Some(error.to_string()), started);
                Ok(None)
            }
            Err(error) => {
                self.push(step, StepStatus::Failed, Some(error.to_string()), started);
                Err(error)
            }
        }
    }

    async fn resolve_inventory(&mut self) -> Result<Inventory> {
        let started = Instant::now();
        info!("resolving vCenter inventory");
        let result = self.resolve_inventory_inner().await;
        self.finish_step("resolve inventory", started, result, |inv| {
            Some(format!(
                "{} prep clusters, {} hosts",
                inv.prep_clusters.len(),
                inv.host_count
            ))
        })
    }

    async fn resolve_inventory_inner(&self) -> Result<Inventory> {
        let datacenter = self.vc.datacenter(self.spec.datacenter.as_deref()).await?;

        let mut prep_clusters = Vec::new();
        let mut host_count = 0;
        for name in &self.spec.prep_clusters {
            let moref = self.vc.find_cluster(&datacenter, name).await?;
            host_count += self.vc.cluster_host_count(&moref).await?;
            prep_clusters.push(PrepCluster {
                name: name.clone(),
                moref,
            });
        }

        let controller_cluster = self
            .vc
            .find_cluster(&datacenter, &self.spec.controller_cluster)
            .await?;

        let mut controller_datastores = Vec::new();
        for name in &pad_datastores(&self.spec.controller_datastores) {
            controller_datastores.push(self.vc.find_datastore(&datacenter, name).await?);
        }

        let controller_network = self
            .vc
            .find_network(&datacenter, &self.spec.controller_network)
            .await?;
        let switch = self
            .vc
            .find_distributed_switch(&datacenter, &self.spec.switch_name)
            .await?;

        Ok(Inventory {
            prep_clusters,
            controller_cluster,
            controller_datastores,
            controller_network,
            switch,
            host_count,
        })
    }

    async fn register_sso(&mut self) -> Result<()> {
        let started = Instant::now();
        info!("registering NSX manager with the SSO lookup service");
        let result = self
            .nsx
            .register_sso(
                &self.spec.lookup_service_address,
                &self.spec.vcenter_username,
                &self.spec.vcenter_password,
                &self.spec.lookup_service_thumbprint_sha1,
            )
            .await;
        self.finish_soft_step("register with lookup service", started, result, |_| None)
            .map(drop)
    }

    async fn register_vcenter(&mut self) -> Result<()> {
        let started = Instant::now();
        info!("registering NSX manager with vCenter");
        let result = self
            .nsx
            .register_vcenter(
                &self.spec.vcenter_address,
                &self.spec.vcenter_username,
                &self.spec.vcenter_password,
                &self.spec.vcenter_thumbprint_sha256,
            )
            .await;
        self.finish_soft_step("register with vCenter", started, result, |_| None)
            .map(drop)
    }

    async fn apply_license(&mut self) -> Result<()> {
        let started = Instant::now();
        let Some(key) = self.spec.license_key.clone() else {
            self.push(
                "apply license",
                StepStatus::Skipped,
                Some("no license key supplied".into()),
                started,
            );
            return Ok(());
        };
        info!("installing and assigning the NSX license");
        let result = async {
            self.vc.add_license(&key).await?;
            self.vc.assign_nsx_license(&key).await
        }
        .await;
        self.finish_soft_step("apply license", started, result, |_| None)
            .map(drop)
    }

    async fn configure_segment_range(&mut self) -> Result<()> {
        let started = Instant::now();
        let (begin, end) = payload::SEGMENT_RANGE;
        info!(begin, end, "configuring VNI segment range");
        let result = self.nsx.set_segment_range().await;
        self.finish_soft_step("configure segment range", started, result, |_| None)
            .map(drop)
    }

    async fn create_vtep_pool(&mut self, host_count: u64) -> Result<String> {
        let started = Instant::now();
        info!(host_count, "creating VTEP IP pool");
        let result = async {
            let pool = &self.spec.vtep_pool;
            let spec = IpPoolSpec::build(
                VTEP_POOL_NAME,
                &pool.ranges,
                &pool.mask,
                &pool.gateway,
                &pool.dns_servers,
                &pool.dns_suffix,
                VTEPS_PER_HOST * host_count,
            )?;
            self.nsx.create_ip_pool(&spec).await
        }
        .await;
        self.finish_step("create VTEP pool", started, result, |id| Some(id.clone()))
    }

    async fn create_controller_pool(&mut self) -> Result<String> {
        let started = Instant::now();
        info!("creating controller IP pool");
        let result = async {
            let pool = &self.spec.controller_pool;
            let spec = IpPoolSpec::build(
                CONTROLLER_POOL_NAME,
                &pool.ranges,
                &pool.mask,
                &pool.gateway,
                &pool.dns_servers,
                &pool.dns_suffix,
                MIN_CONTROLLER_ADDRESSES,
            )?;
            self.nsx.create_ip_pool(&spec).await
        }
        .await;
        self.finish_step("create controller pool", started, result, |id| {
            Some(id.clone())
        })
    }

    async fn deploy_controllers(&mut self, inventory: &Inventory, pool_id: &str) -> Result<()> {
        for (index, datastore) in inventory.controller_datastores.iter().enumerate() {
            let name = format!("nsx-controller-{}", index + 1);
            let started = Instant::now();
            info!(controller = %name, datastore = %datastore, "deploying controller");
            let result = self
                .deploy_one_controller(&name, datastore, inventory, pool_id)
                .await;
            self.finish_step(format!("deploy {name}"), started, result, |_| None)?;
        }
        Ok(())
    }

    async fn deploy_one_controller(
        &self,
        name: &str,
        datastore: &ManagedObjectRef,
        inventory: &Inventory,
        pool_id: &str,
    ) -> Result<()> {
        let spec = ControllerSpec {
            name: name.to_string(),
            description: "Deployed by nsxup".to_string(),
            ip_pool_id: pool_id.to_string(),
            resource_pool_id: inventory.controller_cluster.value.clone(),
            datastore_id: datastore.value.clone(),
            network_id: inventory.controller_network.value.clone(),
            password: self.spec.controller_password.clone(),
        };
        let job_id = self.nsx.deploy_controller(&spec).await?;
        info!(job = %job_id, "controller deployment accepted");

        let bar = spinner(format!("waiting for {name}"));
        let operation = format!("{name} deployment");
        let nsx = &self.nsx;
        let bar_ref = &bar;
        let job_ref = &job_id;
        let operation_ref = &operation;
        let result = poll::poll_until(poll::CONTROLLER_DEPLOY, &operation, move || async move {
            match nsx.controller_job_status(job_ref).await? {
                JobStatus::Success => Ok(Some(())),
                JobStatus::Failure { detail } => Err(ApiError::JobFailed {
                    operation: operation_ref.clone(),
                    detail,
                }
                .into()),
                JobStatus::InProgress { percent } => {
                    if let Some(percent) = percent {
                        bar_ref.set_message(format!("waiting for {operation_ref}: {percent}%"));
                    }
                    Ok(None)
                }
            }
        })
        .await;
        bar.finish_and_clear();
        result
    }

    async fn prepare_firewall(&mut self, inventory: &Inventory) -> Result<()> {
        for cluster in &inventory.prep_clusters {
            let started = Instant::now();
            info!(cluster = %cluster.name, "preparing cluster for the distributed firewall");
            let result = async {
                self.nsx.install_host_prep(&cluster.moref.value).await?;
                self.wait_for_fabric(
                    &cluster.moref.value,
                    payload::HOST_PREP_FEATURE,
                    &format!("host preparation of '{}'", cluster.name),
                )
                .await
            }
            .await;
            // The first failing cluster aborts the loop; remaining
            // clusters are not attempted.
            self.finish_step(
                format!("prepare cluster '{}' for firewall", cluster.name),
                started,
                result,
                |_| None,
            )?;
        }
        Ok(())
    }

    async fn configure_overlay(&mut self, inventory: &Inventory, vtep_pool_id: &str) -> Result<()> {
        for cluster in &inventory.prep_clusters {
            let started = Instant::now();
            info!(cluster = %cluster.name, switch = %inventory.switch, "configuring VXLAN");
            let result = async {
                self.nsx
                    .configure_vxlan(
                        &cluster.moref.value,
                        &inventory.switch.value,
                        self.spec.vtep_vlan_id,
                        vtep_pool_id,
                    )
                    .await?;
                self.wait_for_fabric(
                    &cluster.moref.value,
                    payload::VXLAN_FEATURE,
                    &format!("VXLAN configuration of '{}'", cluster.name),
                )
                .await
            }
            .await;
            self.finish_step(
                format!("configure VXLAN on '{}'", cluster.name),
                started,
                result,
                |_| None,
            )?;
        }
        Ok(())
    }

    async fn wait_for_fabric(&self, resource: &str, feature: &str, operation: &str) -> Result<()> {
        let bar = spinner(format!("waiting for {operation}"));
        let nsx = &self.nsx;
        let result = poll::poll_until(poll::CLUSTER_PREP, operation, move || async move {
            match nsx.fabric_status(resource, feature).await? {
                FabricStatus::Green => Ok(Some(())),
                FabricStatus::Red => Err(ApiError::JobFailed {
                    operation: operation.to_string(),
                    detail: "fabric status is RED".to_string(),
                }
                .into()),
                FabricStatus::Yellow | FabricStatus::Pending(_) => Ok(None),
            }
        })
        .await;
        bar.finish_and_clear();
        result
    }

    async fn create_transport_zone(&mut self, inventory: &Inventory) -> Result<()> {
        let started = Instant::now();
        let moids: Vec<String> = inventory
            .prep_clusters
            .iter()
            .map(|c| c.moref.value.clone())
            .collect();
        info!(zone = TRANSPORT_ZONE_NAME, clusters = moids.len(), "creating transport zone");
        let result = self
            .nsx
            .create_transport_zone(TRANSPORT_ZONE_NAME, &moids)
            .await;
        self.finish_soft_step("create transport zone", started, result, |id| {
            Some(id.clone())
        })
        .map(drop)
    }
}
