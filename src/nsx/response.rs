//! Response parsing for the NSX manager API.
//!
//! The manager answers with small XML documents; only a handful of
//! fields are consumed, so parsing is a flat scan rather than a full
//! deserialization.

use quick_xml::events::Event;
use quick_xml::Reader;

/// Text content of the first element with the given local name.
pub fn first_element_text(xml: &str, tag: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut in_tag = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                in_tag = e.local_name().as_ref() == tag.as_bytes();
            }
            Ok(Event::Text(t)) if in_tag => {
                return t.unescape().ok().map(|s| s.into_owned());
            }
            Ok(Event::End(_)) => in_tag = false,
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Status reported for one fabric feature in a
/// `GET /api/2.0/nwfabric/status` response.
///
/// Each `nwFabricFeatureStatus` block carries a `featureId` followed by
/// its `status`; the scan pairs them up and returns the status of the
/// requested feature.
pub fn feature_status(xml: &str, feature_id: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut current_tag: Option<Vec<u8>> = None;
    let mut last_feature: Option<String> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current_tag = Some(e.local_name().as_ref().to_vec());
            }
            Ok(Event::Text(t)) => {
                if let Some(tag) = current_tag.as_deref() {
                    let text = match t.unescape() {
                        Ok(s) => s.into_owned(),
                        Err(_) => return None,
                    };
                    match tag {
                        b"featureId" => last_feature = Some(text),
                        b"status" if last_feature.as_deref() == Some(feature_id) => {
                            return Some(text);
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::End(_)) => current_tag = None,
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}
