//! SOAP envelopes and response scanning for the vim25 API.
//!
//! Only the handful of operations the bring-up needs are implemented:
//! service content retrieval, session login/logout, single-object
//! property retrieval, and the two license-manager calls. Requests are
//! built with a streaming writer so credentials are escaped; responses
//! are scanned flat rather than deserialized.

use std::io::Cursor;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Error, Result};

use super::types::ManagedObjectRef;

const VIM_NS: &str = "urn:vim25";
const SOAP_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

type Xml = Writer<Cursor<Vec<u8>>>;

fn xml_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Xml(e.to_string())
}

fn start(w: &mut Xml, tag: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(tag)))
        .map_err(xml_err)
}

fn end(w: &mut Xml, tag: &str) -> Result<()> {
    w.write_event(Event::End(BytesEnd::new(tag))).map_err(xml_err)
}

fn text_element(w: &mut Xml, tag: &str, value: &str) -> Result<()> {
    start(w, tag)?;
    w.write_event(Event::Text(BytesText::new(value)))
        .map_err(xml_err)?;
    end(w, tag)
}

fn typed_element(w: &mut Xml, tag: &str, kind: &str, value: &str) -> Result<()> {
    let mut elem = BytesStart::new(tag);
    elem.push_attribute(("type", kind));
    w.write_event(Event::Start(elem)).map_err(xml_err)?;
    w.write_event(Event::Text(BytesText::new(value)))
        .map_err(xml_err)?;
    end(w, tag)
}

/// Build a full envelope around one vim25 operation. The closure writes
/// the operation's children (after the `_this` reference).
fn envelope<F>(operation: &str, this: (&str, &str), children: F) -> Result<String>
where
    F: FnOnce(&mut Xml) -> Result<()>,
{
    let mut w = Writer::new(Cursor::new(Vec::new()));
    w.write_event(Event::Decl(quick_xml::events::BytesDecl::new(
        "1.0",
        Some("UTF-8"),
        None,
    )))
    .map_err(xml_err)?;

    let mut env = BytesStart::new("soapenv:Envelope");
    env.push_attribute(("xmlns:soapenv", SOAP_NS));
    w.write_event(Event::Start(env)).map_err(xml_err)?;
    start(&mut w, "soapenv:Body")?;

    let mut op = BytesStart::new(operation);
    op.push_attribute(("xmlns", VIM_NS));
    w.write_event(Event::Start(op)).map_err(xml_err)?;
    typed_element(&mut w, "_this", this.0, this.1)?;
    children(&mut w)?;
    end(&mut w, operation)?;

    end(&mut w, "soapenv:Body")?;
    end(&mut w, "soapenv:Envelope")?;
    String::from_utf8(w.into_inner().into_inner()).map_err(xml_err)
}

/// `RetrieveServiceContent` against the well-known service instance.
pub fn retrieve_service_content() -> Result<String> {
    envelope(
        "RetrieveServiceContent",
        ("ServiceInstance", "ServiceInstance"),
        |_| Ok(()),
    )
}

/// `Login` against the session manager.
pub fn login(session_manager: &ManagedObjectRef, username: &str, password: &str) -> Result<String> {
    envelope(
        "Login",
        (&session_manager.kind, &session_manager.value),
        |w| {
            text_element(w, "userName", username)?;
            text_element(w, "password", password)
        },
    )
}

/// `Logout` against the session manager.
pub fn logout(session_manager: &ManagedObjectRef) -> Result<String> {
    envelope(
        "Logout",
        (&session_manager.kind, &session_manager.value),
        |_| Ok(()),
    )
}

/// `RetrievePropertiesEx` fetching one property path of one object.
pub fn retrieve_properties(
    property_collector: &ManagedObjectRef,
    obj: &ManagedObjectRef,
    path: &str,
) -> Result<String> {
    envelope(
        "RetrievePropertiesEx",
        (&property_collector.kind, &property_collector.value),
        |w| {
            start(w, "specSet")?;
            start(w, "propSet")?;
            text_element(w, "type", &obj.kind)?;
            text_element(w, "all", "false")?;
            text_element(w, "pathSet", path)?;
            end(w, "propSet")?;
            start(w, "objectSet")?;
            typed_element(w, "obj", &obj.kind, &obj.value)?;
            text_element(w, "skip", "false")?;
            end(w, "objectSet")?;
            end(w, "specSet")?;
            w.write_event(Event::Empty(BytesStart::new("options")))
                .map_err(xml_err)
        },
    )
}

/// `AddLicense` against the license manager.
pub fn add_license(license_manager: &ManagedObjectRef, key: &str) -> Result<String> {
    envelope(
        "AddLicense",
        (&license_manager.kind, &license_manager.value),
        |w| text_element(w, "licenseKey", key),
    )
}

/// `UpdateAssignedLicense` binding a key to a product entity.
pub fn assign_license(
    assignment_manager: &ManagedObjectRef,
    entity: &str,
    key: &str,
) -> Result<String> {
    envelope(
        "UpdateAssignedLicense",
        (&assignment_manager.kind, &assignment_manager.value),
        |w| {
            text_element(w, "entity", entity)?;
            text_element(w, "licenseKey", key)
        },
    )
}

/// `<faultstring>` of a SOAP fault, if the response carries one.
pub fn fault_string(xml: &str) -> Option<String> {
    scan_first_text(xml, |local| local == b"faultstring")
}

/// The first element with the given local name that carries a `type`
/// attribute, read as a managed object reference.
pub fn find_moref(xml: &str, element: &str) -> Option<ManagedObjectRef> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut pending_kind: Option<String> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                pending_kind = if e.local_name().as_ref() == element.as_bytes() {
                    type_attribute(&e)
                } else {
                    None
                };
            }
            Ok(Event::Text(t)) => {
                if let Some(kind) = pending_kind.take() {
                    let value = t.unescape().ok()?.into_owned();
                    return Some(ManagedObjectRef::new(kind, value));
                }
            }
            Ok(Event::End(_)) => pending_kind = None,
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// All managed object references in a property-retrieval response: every
/// `ManagedObjectReference` array entry, plus a scalar `val` carrying a
/// `type` attribute.
pub fn moref_values(xml: &str) -> Vec<ManagedObjectRef> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut refs = Vec::new();
    let mut pending_kind: Option<String> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let local = e.local_name();
                pending_kind =
                    if local.as_ref() == b"ManagedObjectReference" || local.as_ref() == b"val" {
                        type_attribute(&e)
                    } else {
                        None
                    };
            }
            Ok(Event::Text(t)) => {
                if let Some(kind) = pending_kind.take() {
                    if let Ok(value) = t.unescape() {
                        refs.push(ManagedObjectRef::new(kind, value.into_owned()));
                    }
                }
            }
            Ok(Event::End(_)) => pending_kind = None,
            Ok(Event::Eof) | Err(_) => return refs,
            _ => {}
        }
    }
}

/// Text of the first `val` element (string-typed property values).
pub fn first_val_text(xml: &str) -> Option<String> {
    scan_first_text(xml, |local| local == b"val")
}

fn scan_first_text(xml: &str, matches: impl Fn(&[u8]) -> bool) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut in_match = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => in_match = matches(e.local_name().as_ref()),
            Ok(Event::Text(t)) if in_match => {
                return t.unescape().ok().map(|s| s.into_owned());
            }
            Ok(Event::End(_)) => in_match = false,
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

fn type_attribute(e: &BytesStart<'_>) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        if attr.key.as_ref() == b"type" {
            String::from_utf8(attr.value.into_owned()).ok()
        } else {
            None
        }
    })
}
