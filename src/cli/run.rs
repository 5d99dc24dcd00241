//! The `run` subcommand: the full bring-up.

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::bringup::report::BringupReport;
use crate::bringup::{Bringup, BringupSpec, PoolParams, StepStatus};
use crate::error::Result;
use crate::nsx::NsxClient;
use crate::thumbprint;
use crate::vsphere::VsphereClient;

use super::RunArgs;

pub async fn execute(args: RunArgs) -> Result<()> {
    let started_at = Utc::now();

    println!("Fetching certificate thumbprints...");
    let lookup_prints = thumbprint::fetch(&args.lookup_service, 443).await?;
    let vcenter_prints = thumbprint::fetch(&args.vcenter.host, 443).await?;
    println!("  {}  SHA-1   {}", args.lookup_service, lookup_prints.sha1);
    println!("  {}  SHA-256 {}", args.vcenter.host, vcenter_prints.sha256);
    println!();

    println!("Connecting to vCenter {}...", args.vcenter.host);
    let vc = VsphereClient::connect(
        &args.vcenter.base_url(),
        &args.vcenter.username,
        &args.vcenter.password,
        args.vcenter.insecure,
    )
    .await?;
    let nsx = NsxClient::for_manager(
        &args.nsx.address,
        &args.nsx.username,
        &args.nsx.password,
        args.vcenter.insecure,
    )?;

    let spec = BringupSpec {
        vcenter_address: args.vcenter.host.clone(),
        vcenter_username: args.vcenter.username.clone(),
        vcenter_password: args.vcenter.password.clone(),
        datacenter: args.datacenter.clone(),
        lookup_service_address: args.lookup_service.clone(),
        lookup_service_thumbprint_sha1: lookup_prints.sha1,
        vcenter_thumbprint_sha256: vcenter_prints.sha256,
        prep_clusters: args.clusters.clone(),
        vtep_pool: PoolParams {
            ranges: args.vtep_ip_range.clone(),
            mask: args.vtep_mask.clone(),
            gateway: args.vtep_gateway.clone(),
            dns_servers: args.vtep_dns.clone(),
            dns_suffix: args.vtep_domain.clone(),
        },
        vtep_vlan_id: args.vtep_vlan,
        controller_pool: PoolParams {
            ranges: args.controller_ip_range.clone(),
            mask: args.controller_mask.clone(),
            gateway: args.controller_gateway.clone(),
            dns_servers: args.controller_dns.clone(),
            dns_suffix: args.controller_domain.clone(),
        },
        controller_cluster: args.controller_cluster.clone(),
        controller_datastores: args.controller_datastores.clone(),
        controller_network: args.controller_network.clone(),
        controller_password: args.controller_password.clone(),
        switch_name: args.dvs.clone(),
        license_key: if args.skip_license {
            None
        } else {
            args.license_key.clone()
        },
    };

    let mut bringup = Bringup::new(nsx, vc, spec)?;
    let result = bringup.run().await;
    bringup.disconnect().await;

    println!();
    println!("Bring-up summary:");
    for outcome in bringup.outcomes() {
        let glyph = match outcome.status {
            StepStatus::Succeeded => "✓".green().to_string(),
            StepStatus::Warning => "⚠".yellow().to_string(),
            StepStatus::Skipped => "-".dimmed().to_string(),
            StepStatus::Failed => "✗".red().to_string(),
        };
        match &outcome.detail {
            Some(detail) => println!("  {glyph} {} ({detail})", outcome.step),
            None => println!("  {glyph} {}", outcome.step),
        }
    }

    if let Some(path) = &args.report {
        let report = BringupReport {
            nsx_manager: args.nsx.address.clone(),
            vcenter: args.vcenter.host.clone(),
            started_at,
            finished_at: Utc::now(),
            succeeded: result.is_ok(),
            steps: bringup.outcomes().to_vec(),
        };
        report.write(path)?;
        println!();
        println!("Report written to {}", path.display());
    }

    if result.is_ok() {
        println!();
        println!("Environment bring-up complete.");
    }
    result
}
