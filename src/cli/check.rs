//! Diagnostics that change nothing on either endpoint.

use owo_colors::OwoColorize;

use crate::error::Result;
use crate::nsx::NsxClient;
use crate::thumbprint;
use crate::vsphere::VsphereClient;

use super::{CheckCommand, ConnectionArgs, ThumbprintArgs};

pub async fn execute(command: CheckCommand) -> Result<()> {
    match command {
        CheckCommand::Connection(args) => connection(args).await,
        CheckCommand::Thumbprint(args) => print_thumbprints(args).await,
    }
}

/// Log in to both endpoints and read something harmless back.
async fn connection(args: ConnectionArgs) -> Result<()> {
    println!("Testing vCenter {}...", args.vcenter.host);
    let vc = VsphereClient::connect(
        &args.vcenter.base_url(),
        &args.vcenter.username,
        &args.vcenter.password,
        args.vcenter.insecure,
    )
    .await?;
    let datacenter = vc.datacenter(None).await?;
    let name = vc.object_name(&datacenter).await?;
    println!("  {} authenticated (first datacenter: {name})", "✓".green());
    let _ = vc.logout().await;

    println!("Testing NSX manager {}...", args.nsx.address);
    let nsx = NsxClient::for_manager(
        &args.nsx.address,
        &args.nsx.username,
        &args.nsx.password,
        args.vcenter.insecure,
    )?;
    nsx.current_vc_config().await?;
    println!("  {} authenticated", "✓".green());

    println!();
    println!("All connection checks passed.");
    Ok(())
}

async fn print_thumbprints(args: ThumbprintArgs) -> Result<()> {
    let prints = thumbprint::fetch(&args.address, args.port).await?;
    println!("{}:{}", args.address, args.port);
    println!("  SHA-1:   {}", prints.sha1);
    println!("  SHA-256: {}", prints.sha256);
    Ok(())
}
