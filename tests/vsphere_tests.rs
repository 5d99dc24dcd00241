//! vCenter client tests against a mocked SOAP endpoint.

mod support;

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nsxup::error::{Error, LookupError};
use nsxup::vsphere::{ManagedObjectRef, VsphereClient};

use support::*;

async fn connected(server: &MockServer) -> VsphereClient {
    VsphereClient::connect(&server.uri(), "administrator@vsphere.local", "vc-secret", false)
        .await
        .expect("connect")
}

#[tokio::test]
async fn connect_logs_in_with_credentials() {
    let server = MockServer::start().await;
    mount_vcenter(&server).await;

    connected(&server).await;

    let requests = server.received_requests().await.unwrap();
    let login = requests
        .iter()
        .find(|r| String::from_utf8_lossy(&r.body).contains("<Login "))
        .expect("login request");
    let body = String::from_utf8_lossy(&login.body);
    assert!(body.contains("<userName>administrator@vsphere.local</userName>"));
    assert!(body.contains("<password>vc-secret</password>"));
}

#[tokio::test]
async fn login_fault_is_a_soap_error() {
    let server = MockServer::start().await;
    mount_vcenter(&server).await;
    Mock::given(method("POST"))
        .and(path("/sdk"))
        .and(body_string_contains("<Login "))
        .respond_with(ResponseTemplate::new(500).set_body_string(soap_response(
            r#"<soapenv:Fault><faultcode>ServerFaultCode</faultcode>
               <faultstring>Cannot complete login due to an incorrect user name or password.</faultstring>
            </soapenv:Fault>"#,
        )))
        .with_priority(1)
        .mount(&server)
        .await;

    let error = VsphereClient::connect(&server.uri(), "admin", "wrong", false)
        .await
        .expect_err("login must fail");
    assert!(error.to_string().contains("incorrect user name or password"));
}

#[tokio::test]
async fn cluster_lookup_scans_names_in_order() {
    let server = MockServer::start().await;
    mount_vcenter(&server).await;

    let vc = connected(&server).await;
    let datacenter = vc.datacenter(None).await.unwrap();
    assert_eq!(datacenter, ManagedObjectRef::new("Datacenter", "datacenter-2"));

    let cluster = vc.find_cluster(&datacenter, "Compute B").await.unwrap();
    assert_eq!(cluster.value, "domain-c8");

    let hosts = vc.cluster_host_count(&cluster).await.unwrap();
    assert_eq!(hosts, 1);
}

#[tokio::test]
async fn missing_objects_are_typed_not_found() {
    let server = MockServer::start().await;
    mount_vcenter(&server).await;

    let vc = connected(&server).await;
    let datacenter = vc.datacenter(None).await.unwrap();

    let error = vc.find_datastore(&datacenter, "missing-ds").await.unwrap_err();
    match error {
        Error::Lookup(LookupError::NotFound { kind, name }) => {
            assert_eq!(kind, "datastore");
            assert_eq!(name, "missing-ds");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }

    let error = vc
        .find_distributed_switch(&datacenter, "other-dvs")
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Lookup(LookupError::NotFound { kind, .. }) if kind == "distributed switch"));
}

#[tokio::test]
async fn network_lookup_covers_distributed_portgroups() {
    let server = MockServer::start().await;
    mount_vcenter(&server).await;

    let vc = connected(&server).await;
    let datacenter = vc.datacenter(None).await.unwrap();
    let network = vc.find_network(&datacenter, "Controller Net").await.unwrap();
    assert_eq!(network.value, "dvportgroup-13");
}

#[tokio::test]
async fn license_is_added_then_assigned_to_nsx() {
    let server = MockServer::start().await;
    mount_vcenter(&server).await;

    mock_property(
        &server,
        "LicenseManager",
        "LicenseManager",
        "licenseAssignmentManager",
        moref_scalar("LicenseAssignmentManager", "LicenseAssignmentManager"),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/sdk"))
        .and(body_string_contains("<AddLicense "))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap_response(
            r#"<AddLicenseResponse xmlns="urn:vim25"><returnval><licenseKey>AAAAA-BBBBB</licenseKey></returnval></AddLicenseResponse>"#,
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sdk"))
        .and(body_string_contains("<UpdateAssignedLicense "))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap_response(
            r#"<UpdateAssignedLicenseResponse xmlns="urn:vim25"><returnval/></UpdateAssignedLicenseResponse>"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let vc = connected(&server).await;
    vc.add_license("AAAAA-BBBBB-CCCCC-DDDDD-EEEEE").await.unwrap();
    vc.assign_nsx_license("AAAAA-BBBBB-CCCCC-DDDDD-EEEEE")
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let assign = requests
        .iter()
        .find(|r| String::from_utf8_lossy(&r.body).contains("UpdateAssignedLicense"))
        .unwrap();
    let body = String::from_utf8_lossy(&assign.body);
    assert!(body.contains("<entity>nsx-netsec</entity>"));
}
