//! Command-line interface definitions.

pub mod check;
pub mod run;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// nsxup - one-shot NSX-for-vSphere environment bring-up.
#[derive(Parser, Debug)]
#[command(name = "nsxup")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Use JSON log format instead of pretty
    #[arg(long, global = true)]
    pub json_logs: bool,
}

impl Cli {
    /// Initialize the tracing subscriber. `RUST_LOG` wins over the flag.
    pub fn init_logging(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level));
        if self.json_logs {
            fmt().json().with_env_filter(filter).init();
        } else {
            fmt().with_env_filter(filter).init();
        }
    }
}

#[derive(Subcommand, Debug)]
#[allow(clippy::large_enum_variant)]
pub enum Commands {
    /// Run the full bring-up against a vCenter / NSX manager pair
    Run(RunArgs),

    /// Diagnostics that change nothing on either endpoint
    #[command(subcommand)]
    Check(CheckCommand),
}

/// Subcommands for `nsxup check`.
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Verify reachability and authentication of both endpoints
    Connection(ConnectionArgs),
    /// Print the certificate thumbprints of a TLS endpoint
    Thumbprint(ThumbprintArgs),
}

/// vCenter endpoint and credentials.
#[derive(Args, Debug, Clone)]
pub struct VcenterArgs {
    /// vCenter hostname or IP
    #[arg(long)]
    pub host: String,

    /// vCenter HTTPS port
    #[arg(long, default_value_t = 443)]
    pub port: u16,

    /// vCenter / SSO administrator user
    #[arg(long)]
    pub username: String,

    /// vCenter / SSO administrator password
    #[arg(long, env = "VSPHERE_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Skip TLS certificate verification on every connection
    #[arg(long)]
    pub insecure: bool,
}

impl VcenterArgs {
    pub fn base_url(&self) -> String {
        format!("https://{}:{}", self.host, self.port)
    }
}

/// NSX manager endpoint and credentials.
#[derive(Args, Debug, Clone)]
pub struct NsxArgs {
    /// NSX manager FQDN or IP
    #[arg(long = "nsx-address")]
    pub address: String,

    /// NSX manager admin user
    #[arg(id = "nsx_username", long = "nsx-username", default_value = "admin")]
    pub username: String,

    /// NSX manager admin password
    #[arg(
        id = "nsx_password",
        long = "nsx-password",
        env = "NSX_PASSWORD",
        hide_env_values = true
    )]
    pub password: String,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub vcenter: VcenterArgs,

    #[command(flatten)]
    pub nsx: NsxArgs,

    /// Datacenter name; defaults to the first datacenter
    #[arg(long)]
    pub datacenter: Option<String>,

    /// SSO lookup service address (vCenter itself unless an external PSC is used)
    #[arg(long)]
    pub lookup_service: String,

    /// Comma-separated clusters to prepare for NSX
    #[arg(long, value_delimiter = ',', required = true)]
    pub clusters: Vec<String>,

    /// VTEP address ranges, e.g. 192.168.0.1-192.168.0.10, comma-separated
    #[arg(long)]
    pub vtep_ip_range: String,

    /// VTEP CIDR mask, e.g. /24
    #[arg(long)]
    pub vtep_mask: String,

    /// VTEP default gateway
    #[arg(long)]
    pub vtep_gateway: String,

    /// Comma-separated DNS servers for the VTEPs
    #[arg(long)]
    pub vtep_dns: String,

    /// DNS search domain for the VTEPs
    #[arg(long)]
    pub vtep_domain: String,

    /// VLAN for VTEP traffic; 0 uses the default VLAN
    #[arg(long)]
    pub vtep_vlan: u16,

    /// Controller address ranges; at least three addresses in total
    #[arg(long)]
    pub controller_ip_range: String,

    /// Controller CIDR mask, e.g. /24
    #[arg(long)]
    pub controller_mask: String,

    /// Controller default gateway
    #[arg(long)]
    pub controller_gateway: String,

    /// Comma-separated DNS servers for the controllers
    #[arg(long)]
    pub controller_dns: String,

    /// DNS search domain for the controllers
    #[arg(long)]
    pub controller_domain: String,

    /// Cluster the three controllers deploy to (usually management)
    #[arg(long)]
    pub controller_cluster: String,

    /// Comma-separated datastores for the controllers; the last one is
    /// reused when fewer than three are given
    #[arg(long, value_delimiter = ',', required = true)]
    pub controller_datastores: Vec<String>,

    /// Port group the controller VMs connect to (must live on a DVS)
    #[arg(long)]
    pub controller_network: String,

    /// Admin password for the controllers (complex, at least 12 characters)
    #[arg(long, env = "NSX_CONTROLLER_PASSWORD", hide_env_values = true)]
    pub controller_password: String,

    /// Distributed switch the transport zone binds to
    #[arg(long)]
    pub dvs: String,

    /// NSX license key
    #[arg(long, required_unless_present = "skip_license")]
    pub license_key: Option<String>,

    /// Skip license installation and assignment
    #[arg(long)]
    pub skip_license: bool,

    /// Write a JSON bring-up report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Arguments for `check connection`.
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    #[command(flatten)]
    pub vcenter: VcenterArgs,

    #[command(flatten)]
    pub nsx: NsxArgs,
}

/// Arguments for `check thumbprint`.
#[derive(Args, Debug)]
pub struct ThumbprintArgs {
    /// Endpoint to fingerprint
    pub address: String,

    /// TLS port
    #[arg(long, default_value_t = 443)]
    pub port: u16,
}
