use crate::domain::entities::ResponseHead;
use crate::domain::errors::ContentDecodeError;
use crate::domain::value_objects::ContentKind;
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use serde_json::Value;

/// Header names longer than this do not widen the name column.
const MAX_HEADER_NAME_WIDTH: usize = 25;

/// Decodes a body fragment as UTF-8 text.
pub fn decode_text(bytes: &[u8]) -> Result<&str, ContentDecodeError> {
    std::str::from_utf8(bytes).map_err(|_| ContentDecodeError {
        byte_count: bytes.len(),
    })
}

/// The line emitted in place of content that is not text.
pub fn binary_notice(error: &ContentDecodeError) -> String {
    format!("...received binary data: {} bytes\n", error.byte_count)
}

/// Pretty prints `text` as `kind`, returning it unchanged if it does not parse.
pub fn pretty_print(text: &str, kind: ContentKind) -> String {
    let pretty = match kind {
        ContentKind::Json => pretty_json(text),
        ContentKind::Xml => pretty_xml(text),
        ContentKind::Text => None,
    };
    pretty.unwrap_or_else(|| text.to_string())
}

fn pretty_json(text: &str) -> Option<String> {
    let json = serde_json::from_str::<Value>(text).ok()?;
    serde_json::to_string_pretty(&json).ok()
}

fn pretty_xml(text: &str) -> Option<String> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    let mut depth = 0usize;
    loop {
        let event = reader.read_event().ok()?;
        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.checked_sub(1)?,
            Event::Eof => break,
            _ => {}
        }
        writer.write_event(event).ok()?;
    }
    // A truncated document is left as it came.
    if depth != 0 {
        return None;
    }
    String::from_utf8(writer.into_inner()).ok()
}

/// Renders the status line and headers of a response.
///
/// ```text
/// Headers:
///   HTTP/1.1 200 OK
///   content-type:   application/json
///   content-length: 17
/// Content:
/// ```
pub fn render_head(head: &ResponseHead) -> String {
    let mut out = String::from("Headers:\n");
    let status_line = format!(
        "  {:?} {} {}",
        head.version,
        head.status.as_u16(),
        head.status.canonical_reason().unwrap_or_default()
    );
    out.push_str(status_line.trim_end().to_uppercase().as_str());
    out.push('\n');

    let width = head
        .headers
        .keys()
        .map(|name| name.as_str().len())
        .filter(|len| *len <= MAX_HEADER_NAME_WIDTH)
        .max()
        .unwrap_or(0);

    for (name, value) in head.headers.iter() {
        let label = format!("{}:", name.as_str());
        let value = String::from_utf8_lossy(value.as_bytes());
        out.push_str(&format!("  {:<pad$} {}\n", label, value, pad = width + 1));
    }
    out.push_str("Content:\n");
    out
}
