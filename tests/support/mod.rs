//! Shared wiremock fixtures: a canned vCenter SOAP inventory and the
//! NSX manager endpoints a successful bring-up touches.

#![allow(dead_code)]

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nsxup::bringup::{BringupSpec, PoolParams};

/// Wrap a vim25 response body in a SOAP envelope.
pub fn soap_response(inner: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body>{inner}</soapenv:Body></soapenv:Envelope>"#
    )
}

pub fn service_content_response() -> String {
    soap_response(
        r#"<RetrieveServiceContentResponse xmlns="urn:vim25"><returnval>
            <rootFolder type="Folder">group-d1</rootFolder>
            <propertyCollector type="PropertyCollector">propertyCollector</propertyCollector>
            <sessionManager type="SessionManager">SessionManager</sessionManager>
            <licenseManager type="LicenseManager">LicenseManager</licenseManager>
        </returnval></RetrieveServiceContentResponse>"#,
    )
}

pub fn login_response() -> String {
    soap_response(
        r#"<LoginResponse xmlns="urn:vim25"><returnval>
            <key>52c1-session</key><userName>administrator@vsphere.local</userName>
        </returnval></LoginResponse>"#,
    )
}

fn property_response(obj_kind: &str, obj_value: &str, prop: &str, val: &str) -> String {
    soap_response(&format!(
        r#"<RetrievePropertiesExResponse xmlns="urn:vim25"><returnval><objects>
            <obj type="{obj_kind}">{obj_value}</obj>
            <propSet><name>{prop}</name>{val}</propSet>
        </objects></returnval></RetrievePropertiesExResponse>"#
    ))
}

/// Array-of-morefs property value.
pub fn moref_array(entries: &[(&str, &str)]) -> String {
    let refs: String = entries
        .iter()
        .map(|(kind, value)| {
            format!(r#"<ManagedObjectReference type="{kind}">{value}</ManagedObjectReference>"#)
        })
        .collect();
    format!(r#"<val xsi:type="ArrayOfManagedObjectReference">{refs}</val>"#)
}

/// Scalar moref property value.
pub fn moref_scalar(kind: &str, value: &str) -> String {
    format!(r#"<val type="{kind}" xsi:type="ManagedObjectReference">{value}</val>"#)
}

/// String property value.
pub fn string_val(value: &str) -> String {
    format!(r#"<val xsi:type="xsd:string">{value}</val>"#)
}

/// Mount a property-retrieval mock keyed by object value and path.
pub async fn mock_property(
    server: &MockServer,
    obj_kind: &str,
    obj_value: &str,
    prop: &str,
    val: String,
) {
    Mock::given(method("POST"))
        .and(path("/sdk"))
        .and(body_string_contains(format!(">{obj_value}</obj>")))
        .and(body_string_contains(format!("<pathSet>{prop}</pathSet>")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(property_response(obj_kind, obj_value, prop, &val)),
        )
        .mount(server)
        .await;
}

/// Mount the full canned vCenter: one datacenter with three clusters
/// ("Compute A" with two hosts, "Compute B" with one, "Mgmt" with one),
/// two datastores, a portgroup, and a distributed switch.
pub async fn mount_vcenter(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/sdk"))
        .and(body_string_contains("RetrieveServiceContent"))
        .respond_with(ResponseTemplate::new(200).set_body_string(service_content_response()))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/sdk"))
        .and(body_string_contains("<Login "))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_response()))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/sdk"))
        .and(body_string_contains("<Logout "))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(soap_response(r#"<LogoutResponse xmlns="urn:vim25"/>"#)),
        )
        .mount(server)
        .await;

    // Root folder -> datacenter
    mock_property(
        server,
        "Folder",
        "group-d1",
        "childEntity",
        moref_array(&[("Datacenter", "datacenter-2")]),
    )
    .await;

    // Datacenter folders and flat lists
    mock_property(
        server,
        "Datacenter",
        "datacenter-2",
        "hostFolder",
        moref_scalar("Folder", "group-h4"),
    )
    .await;
    mock_property(
        server,
        "Datacenter",
        "datacenter-2",
        "networkFolder",
        moref_scalar("Folder", "group-n6"),
    )
    .await;
    mock_property(
        server,
        "Datacenter",
        "datacenter-2",
        "datastore",
        moref_array(&[("Datastore", "datastore-11"), ("Datastore", "datastore-12")]),
    )
    .await;
    mock_property(
        server,
        "Datacenter",
        "datacenter-2",
        "network",
        moref_array(&[
            ("Network", "network-9"),
            ("DistributedVirtualPortgroup", "dvportgroup-13"),
        ]),
    )
    .await;

    // Clusters
    mock_property(
        server,
        "Folder",
        "group-h4",
        "childEntity",
        moref_array(&[
            ("ClusterComputeResource", "domain-c7"),
            ("ClusterComputeResource", "domain-c8"),
            ("ClusterComputeResource", "domain-c9"),
        ]),
    )
    .await;
    mock_property(server, "ClusterComputeResource", "domain-c7", "name", string_val("Compute A")).await;
    mock_property(server, "ClusterComputeResource", "domain-c8", "name", string_val("Compute B")).await;
    mock_property(server, "ClusterComputeResource", "domain-c9", "name", string_val("Mgmt")).await;
    mock_property(
        server,
        "ClusterComputeResource",
        "domain-c7",
        "host",
        moref_array(&[("HostSystem", "host-20"), ("HostSystem", "host-21")]),
    )
    .await;
    mock_property(
        server,
        "ClusterComputeResource",
        "domain-c8",
        "host",
        moref_array(&[("HostSystem", "host-22")]),
    )
    .await;
    mock_property(
        server,
        "ClusterComputeResource",
        "domain-c9",
        "host",
        moref_array(&[("HostSystem", "host-23")]),
    )
    .await;

    // Datastores, networks, switch
    mock_property(server, "Datastore", "datastore-11", "name", string_val("ds1")).await;
    mock_property(server, "Datastore", "datastore-12", "name", string_val("ds2")).await;
    mock_property(server, "Network", "network-9", "name", string_val("VM Network")).await;
    mock_property(
        server,
        "DistributedVirtualPortgroup",
        "dvportgroup-13",
        "name",
        string_val("Controller Net"),
    )
    .await;
    mock_property(
        server,
        "Folder",
        "group-n6",
        "childEntity",
        moref_array(&[("VmwareDistributedVirtualSwitch", "dvs-21")]),
    )
    .await;
    mock_property(
        server,
        "VmwareDistributedVirtualSwitch",
        "dvs-21",
        "name",
        string_val("dvs-main"),
    )
    .await;
}

/// Mount every NSX endpoint a clean bring-up touches, all succeeding
/// immediately.
pub async fn mount_nsx_happy_path(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/2.0/services/ssoconfig"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/2.0/services/vcconfig"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/2.0/vdn/config/segments"))
        .respond_with(ResponseTemplate::new(201))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/2.0/services/ipam/pools/scope/globalroot-0"))
        .and(body_string_contains("VTEP-Pool"))
        .respond_with(ResponseTemplate::new(201).set_body_string("ipaddresspool-1"))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/2.0/services/ipam/pools/scope/globalroot-0"))
        .and(body_string_contains("Controller-Pool"))
        .respond_with(ResponseTemplate::new(201).set_body_string("ipaddresspool-2"))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/2.0/vdn/controller"))
        .respond_with(ResponseTemplate::new(201).set_body_string("jobdata-100"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/vdn/controller/progress/jobdata-100"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<controllerDeploymentInfo><status>Success</status><progress>100</progress></controllerDeploymentInfo>",
        ))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/2.0/nwfabric/configure"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/nwfabric/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string(fabric_status_green()))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/2.0/vdn/scopes"))
        .respond_with(ResponseTemplate::new(201).set_body_string("vdnscope-1"))
        .mount(server)
        .await;
}

pub fn fabric_status_green() -> String {
    r#"<resourceStatuses><resourceStatus>
        <nwFabricFeatureStatus>
            <featureId>com.vmware.vshield.vsm.nwfabric.hostPrep</featureId>
            <status>GREEN</status>
        </nwFabricFeatureStatus>
        <nwFabricFeatureStatus>
            <featureId>com.vmware.vshield.vsm.vxlan</featureId>
            <status>GREEN</status>
        </nwFabricFeatureStatus>
    </resourceStatus></resourceStatuses>"#
        .to_string()
}

/// A bring-up spec matching the canned vCenter inventory.
pub fn sample_spec() -> BringupSpec {
    BringupSpec {
        vcenter_address: "vc.lab.local".into(),
        vcenter_username: "administrator@vsphere.local".into(),
        vcenter_password: "vc-secret".into(),
        datacenter: None,
        lookup_service_address: "vc.lab.local".into(),
        lookup_service_thumbprint_sha1: "AA:BB:CC".into(),
        vcenter_thumbprint_sha256: "DD:EE:FF".into(),
        prep_clusters: vec!["Compute A".into(), "Compute B".into()],
        vtep_pool: PoolParams {
            ranges: "192.168.10.1-192.168.10.20".into(),
            mask: "/24".into(),
            gateway: "192.168.10.254".into(),
            dns_servers: "10.0.0.53".into(),
            dns_suffix: "lab.local".into(),
        },
        vtep_vlan_id: 120,
        controller_pool: PoolParams {
            ranges: "10.0.20.1-10.0.20.5".into(),
            mask: "/24".into(),
            gateway: "10.0.20.254".into(),
            dns_servers: "10.0.0.53".into(),
            dns_suffix: "lab.local".into(),
        },
        controller_cluster: "Mgmt".into(),
        controller_datastores: vec!["ds1".into()],
        controller_network: "Controller Net".into(),
        controller_password: "VMware123!VMware123!".into(),
        switch_name: "dvs-main".into(),
        license_key: None,
    }
}
