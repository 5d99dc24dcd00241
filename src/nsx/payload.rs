//! XML request bodies for the NSX manager API.
//!
//! Payloads are built with a streaming writer rather than string
//! formatting so values with XML-significant characters (passwords in
//! particular) are escaped correctly.

use std::io::Cursor;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{Error, Result};
use crate::ipam::IpPoolSpec;

use super::ControllerSpec;

/// VNI segment range configured at bring-up.
pub const SEGMENT_RANGE: (u32, u32) = (5000, 10000);

/// MTU pushed to the distributed switch for overlay traffic.
pub const OVERLAY_MTU: u32 = 9000;

/// Uplink teaming policy for multi-VTEP: route by source ID, no LACP.
pub const TEAMING_POLICY: &str = "LOADBALANCE_SRCID";

/// VTEP interfaces created on each host.
pub const VMKNICS_PER_HOST: u64 = crate::ipam::VTEPS_PER_HOST;

/// Fabric feature identifier for VXLAN configuration.
pub const VXLAN_FEATURE: &str = "com.vmware.vshield.vsm.vxlan";

/// Fabric feature identifier reported for host preparation status.
pub const HOST_PREP_FEATURE: &str = "com.vmware.vshield.vsm.nwfabric.hostPrep";

type Xml = Writer<Cursor<Vec<u8>>>;

fn xml_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Xml(e.to_string())
}

fn writer() -> Xml {
    Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2)
}

fn start(w: &mut Xml, tag: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(tag)))
        .map_err(xml_err)
}

fn end(w: &mut Xml, tag: &str) -> Result<()> {
    w.write_event(Event::End(BytesEnd::new(tag))).map_err(xml_err)
}

fn empty(w: &mut Xml, tag: &str) -> Result<()> {
    w.write_event(Event::Empty(BytesStart::new(tag)))
        .map_err(xml_err)
}

fn text_element(w: &mut Xml, tag: &str, value: &str) -> Result<()> {
    start(w, tag)?;
    w.write_event(Event::Text(BytesText::new(value)))
        .map_err(xml_err)?;
    end(w, tag)
}

fn finish(w: Xml) -> Result<String> {
    String::from_utf8(w.into_inner().into_inner()).map_err(xml_err)
}

/// `<ssoConfig>` body for lookup-service registration.
pub fn sso_config(
    lookup_service_url: &str,
    admin_username: &str,
    admin_password: &str,
    thumbprint_sha1: &str,
) -> Result<String> {
    let mut w = writer();
    start(&mut w, "ssoConfig")?;
    text_element(&mut w, "ssoLookupServiceUrl", lookup_service_url)?;
    text_element(&mut w, "ssoAdminUsername", admin_username)?;
    text_element(&mut w, "ssoAdminUserpassword", admin_password)?;
    text_element(&mut w, "certificateThumbprint", thumbprint_sha1)?;
    end(&mut w, "ssoConfig")?;
    finish(w)
}

/// `<vcInfo>` body for vCenter registration. The manager is asked to
/// auto-assign its management role to the registering user.
pub fn vc_config(
    vcenter_address: &str,
    username: &str,
    password: &str,
    thumbprint_sha256: &str,
) -> Result<String> {
    let mut w = writer();
    start(&mut w, "vcInfo")?;
    text_element(&mut w, "ipAddress", vcenter_address)?;
    text_element(&mut w, "userName", username)?;
    text_element(&mut w, "password", password)?;
    text_element(&mut w, "certificateThumbprint", thumbprint_sha256)?;
    text_element(&mut w, "assignRoleToUser", "true")?;
    empty(&mut w, "pluginDownloadServer")?;
    empty(&mut w, "pluginDownloadPort")?;
    end(&mut w, "vcInfo")?;
    finish(w)
}

/// `<segmentRange>` body for the fixed VNI range.
pub fn segment_range() -> Result<String> {
    let (begin, range_end) = SEGMENT_RANGE;
    let mut w = writer();
    start(&mut w, "segmentRange")?;
    text_element(&mut w, "name", "Segment 1")?;
    text_element(&mut w, "desc", "Range 1")?;
    text_element(&mut w, "begin", &begin.to_string())?;
    text_element(&mut w, "end", &range_end.to_string())?;
    end(&mut w, "segmentRange")?;
    finish(w)
}

/// `<ipamAddressPool>` body: one `dnsServerN` element per configured
/// server (numbered from 1), one `ipRangeDto` per range in input order.
pub fn ip_pool(spec: &IpPoolSpec) -> Result<String> {
    let mut w = writer();
    start(&mut w, "ipamAddressPool")?;
    text_element(&mut w, "name", &spec.name)?;
    text_element(&mut w, "prefixLength", &spec.prefix_length.to_string())?;
    text_element(&mut w, "gateway", &spec.gateway.to_string())?;
    text_element(&mut w, "dnsSuffix", &spec.dns_suffix)?;
    for (i, server) in spec.dns_servers.iter().enumerate() {
        text_element(&mut w, &format!("dnsServer{}", i + 1), &server.to_string())?;
    }
    start(&mut w, "ipRanges")?;
    for range in &spec.ranges {
        start(&mut w, "ipRangeDto")?;
        text_element(&mut w, "startAddress", &range.start.to_string())?;
        text_element(&mut w, "endAddress", &range.end.to_string())?;
        end(&mut w, "ipRangeDto")?;
    }
    end(&mut w, "ipRanges")?;
    end(&mut w, "ipamAddressPool")?;
    finish(w)
}

/// `<controllerSpec>` body for one controller deployment.
pub fn controller(spec: &ControllerSpec) -> Result<String> {
    let mut w = writer();
    start(&mut w, "controllerSpec")?;
    text_element(&mut w, "name", &spec.name)?;
    text_element(&mut w, "description", &spec.description)?;
    text_element(&mut w, "ipPoolId", &spec.ip_pool_id)?;
    text_element(&mut w, "resourcePoolId", &spec.resource_pool_id)?;
    text_element(&mut w, "datastoreId", &spec.datastore_id)?;
    text_element(&mut w, "networkId", &spec.network_id)?;
    text_element(&mut w, "password", &spec.password)?;
    end(&mut w, "controllerSpec")?;
    finish(w)
}

/// `<nwFabricFeatureConfig>` body for host preparation (VIB install).
/// No feature element: the manager installs the base fabric on the
/// cluster, which enables the distributed firewall.
pub fn host_prep(cluster_moid: &str) -> Result<String> {
    let mut w = writer();
    start(&mut w, "nwFabricFeatureConfig")?;
    start(&mut w, "resourceConfig")?;
    text_element(&mut w, "resourceId", cluster_moid)?;
    end(&mut w, "resourceConfig")?;
    end(&mut w, "nwFabricFeatureConfig")?;
    finish(w)
}

/// `<nwFabricFeatureConfig>` body enabling VXLAN on one cluster and
/// setting the switch context (MTU, teaming) in the same request.
pub fn vxlan_config(
    cluster_moid: &str,
    switch_moid: &str,
    vlan_id: u16,
    ip_pool_id: &str,
) -> Result<String> {
    let mut w = writer();
    start(&mut w, "nwFabricFeatureConfig")?;
    text_element(&mut w, "featureId", VXLAN_FEATURE)?;

    start(&mut w, "resourceConfig")?;
    text_element(&mut w, "resourceId", cluster_moid)?;
    let mut spec = BytesStart::new("configSpec");
    spec.push_attribute(("class", "clusterMappingSpec"));
    w.write_event(Event::Start(spec)).map_err(xml_err)?;
    start(&mut w, "switch")?;
    text_element(&mut w, "objectId", switch_moid)?;
    end(&mut w, "switch")?;
    text_element(&mut w, "vlanId", &vlan_id.to_string())?;
    text_element(&mut w, "vmknicCount", &VMKNICS_PER_HOST.to_string())?;
    text_element(&mut w, "ipPoolId", ip_pool_id)?;
    end(&mut w, "configSpec")?;
    end(&mut w, "resourceConfig")?;

    start(&mut w, "resourceConfig")?;
    text_element(&mut w, "resourceId", switch_moid)?;
    let mut spec = BytesStart::new("configSpec");
    spec.push_attribute(("class", "vdsContext"));
    w.write_event(Event::Start(spec)).map_err(xml_err)?;
    start(&mut w, "switch")?;
    text_element(&mut w, "objectId", switch_moid)?;
    end(&mut w, "switch")?;
    text_element(&mut w, "mtu", &OVERLAY_MTU.to_string())?;
    text_element(&mut w, "teaming", TEAMING_POLICY)?;
    end(&mut w, "configSpec")?;
    end(&mut w, "resourceConfig")?;

    end(&mut w, "nwFabricFeatureConfig")?;
    finish(w)
}

/// `<vdnScope>` body creating a transport zone over the given clusters
/// with unicast replication.
pub fn transport_zone(name: &str, cluster_moids: &[String]) -> Result<String> {
    let mut w = writer();
    start(&mut w, "vdnScope")?;
    text_element(&mut w, "name", name)?;
    start(&mut w, "clusters")?;
    for moid in cluster_moids {
        start(&mut w, "cluster")?;
        start(&mut w, "cluster")?;
        text_element(&mut w, "objectId", moid)?;
        end(&mut w, "cluster")?;
        end(&mut w, "cluster")?;
    }
    end(&mut w, "clusters")?;
    text_element(&mut w, "controlPlaneMode", "UNICAST_MODE")?;
    end(&mut w, "vdnScope")?;
    finish(w)
}
