//! nsxup - one-shot NSX-for-vSphere environment bring-up.
//!
//! A single sequential pipeline that registers an NSX manager with SSO
//! and vCenter, licenses it, creates its IP pools, deploys three
//! controllers, prepares clusters for the distributed firewall and
//! VXLAN, and creates a transport zone.
//!
//! # Modules
//!
//! - [`bringup`] - The step pipeline, its polling policies, and the JSON report
//! - [`cli`] - Command-line definitions and command handlers
//! - [`error`] - Error types for the crate
//! - [`ipam`] - Address pool validation and descriptors
//! - [`nsx`] - NSX manager REST client (XML over HTTP Basic auth)
//! - [`thumbprint`] - Peer certificate digests via a raw TLS handshake
//! - [`vsphere`] - Minimal vim25 SOAP client: session, inventory, licensing

pub mod bringup;
pub mod cli;
pub mod error;
pub mod ipam;
pub mod nsx;
pub mod thumbprint;
pub mod vsphere;
