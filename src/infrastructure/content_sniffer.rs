use crate::domain::value_objects::ContentKind;
use quick_xml::Reader;
use quick_xml::events::Event;
use serde_json::Value;

/// Guesses what kind of document `bytes` holds: JSON first, then XML, else text.
///
/// Sniffing is advisory only. A payload that parses as neither is plain text.
pub fn classify(bytes: &[u8]) -> ContentKind {
    if is_json(bytes) {
        ContentKind::Json
    } else if is_xml(bytes) {
        ContentKind::Xml
    } else {
        ContentKind::Text
    }
}

/// Only objects and arrays count; a bare `42` or `"x"` is text.
fn is_json(bytes: &[u8]) -> bool {
    matches!(
        serde_json::from_slice::<Value>(bytes),
        Ok(Value::Object(_) | Value::Array(_))
    )
}

/// Well formed enough to be an XML document: exactly one root element, all
/// elements closed, and no stray text outside the root.
fn is_xml(bytes: &[u8]) -> bool {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut roots = 0usize;
    loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(_) => return false,
        };
        match event {
            Event::Start(_) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Event::End(_) => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            Event::Empty(_) if depth == 0 => roots += 1,
            Event::Text(_) | Event::CData(_) if depth == 0 => return false,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    depth == 0 && roots == 1
}
