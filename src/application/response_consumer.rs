use crate::domain::entities::ResponseHead;
use crate::domain::errors::{ContentDecodeError, OperationError, TransportError};
use crate::domain::value_objects::ContentKind;
use crate::infrastructure::config::ResolvedConfig;
use crate::infrastructure::output;
use hyper::StatusCode;
use hyper::header::CONTENT_TYPE;
use std::io::Write;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    AwaitingHead,
    StreamingBody,
    Done,
}

/// Writes a response to the output sink as its events arrive.
///
/// Events must come in order: one head, any number of body fragments, then
/// completion. An error may arrive at any point and ends the exchange.
/// Events that arrive out of order are ignored.
///
/// Pretty-printable bodies are held back until completion and printed as a
/// whole, since a single fragment is rarely a complete document. Other
/// bodies are written as they arrive.
pub struct ResponseConsumer<W: Write> {
    sink: W,
    show_response_headers: bool,
    pretty_print: bool,
    state: ConsumerState,
    pretty_kind: Option<ContentKind>,
    owes_newline: bool,
    /// Whole body while pretty printing, else an incomplete UTF-8 sequence
    /// left over from the previous fragment.
    held: Vec<u8>,
    error: Option<OperationError>,
}

impl<W: Write> ResponseConsumer<W> {
    pub fn new(config: &ResolvedConfig, sink: W) -> Self {
        Self {
            sink,
            show_response_headers: config.show_response_headers,
            pretty_print: config.pretty_print,
            state: ConsumerState::AwaitingHead,
            pretty_kind: None,
            owes_newline: false,
            held: Vec::new(),
            error: None,
        }
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ConsumerState::Done
    }

    pub fn is_pretty_print_eligible(&self) -> bool {
        self.pretty_kind.is_some()
    }

    pub fn on_head(&mut self, head: &ResponseHead) {
        if self.state != ConsumerState::AwaitingHead {
            warn!("ignoring unexpected response head");
            return;
        }
        debug!("response status {}", head.status);

        if self.show_response_headers {
            self.emit(output::render_head(head).as_bytes());
        }
        if head.status != StatusCode::OK {
            self.fail(OperationError::HttpStatus(head.status));
            return;
        }

        if self.pretty_print {
            let mut content_types = head.headers.get_all(CONTENT_TYPE).iter();
            if let (Some(value), None) = (content_types.next(), content_types.next()) {
                self.pretty_kind = value.to_str().ok().and_then(ContentKind::from_content_type);
            }
        }
        if self.state == ConsumerState::AwaitingHead {
            self.state = ConsumerState::StreamingBody;
        }
    }

    pub fn on_body_fragment(&mut self, fragment: &[u8]) {
        if self.state != ConsumerState::StreamingBody {
            return;
        }
        if self.pretty_kind.is_some() {
            self.held.extend_from_slice(fragment);
        } else {
            self.emit_verbatim(fragment);
        }
    }

    pub fn on_complete(&mut self) {
        if self.state != ConsumerState::StreamingBody {
            return;
        }
        let held = std::mem::take(&mut self.held);

        if let Some(kind) = self.pretty_kind {
            match output::decode_text(&held) {
                Ok(text) if !text.is_empty() => {
                    self.emit(output::pretty_print(text, kind).as_bytes());
                    self.owes_newline = true;
                }
                Ok(_) => {}
                Err(err) => self.emit_notice(err),
            }
        } else if !held.is_empty() {
            self.emit_notice(ContentDecodeError {
                byte_count: held.len(),
            });
        }

        if self.pretty_print && self.owes_newline {
            self.emit(b"\n");
            self.owes_newline = false;
        }
        if let Err(err) = self.sink.flush() {
            self.fail(OperationError::Output(err));
        }
        self.state = ConsumerState::Done;
    }

    /// Records a transport failure. It replaces any earlier outcome.
    pub fn on_error(&mut self, error: TransportError) {
        debug!("transport error: {}", error);
        self.error = Some(error.into());
        self.state = ConsumerState::Done;
    }

    /// The outcome of the whole exchange.
    pub fn finish(mut self) -> Result<(), OperationError> {
        let flushed = self.sink.flush();
        match self.error {
            Some(err) => Err(err),
            None => flushed.map_err(OperationError::Output),
        }
    }

    fn emit_verbatim(&mut self, fragment: &[u8]) {
        let joined;
        let bytes = if self.held.is_empty() {
            fragment
        } else {
            joined = [std::mem::take(&mut self.held).as_slice(), fragment].concat();
            joined.as_slice()
        };

        match std::str::from_utf8(bytes) {
            Ok(text) => self.emit_text(text),
            // A multi-byte character split across fragments.
            Err(err) if err.error_len().is_none() => {
                let (valid, tail) = bytes.split_at(err.valid_up_to());
                if let Ok(text) = std::str::from_utf8(valid) {
                    self.emit_text(text);
                }
                self.held = tail.to_vec();
            }
            Err(_) => self.emit_notice(ContentDecodeError {
                byte_count: bytes.len(),
            }),
        }
    }

    fn emit_text(&mut self, text: &str) {
        if !text.is_empty() {
            self.emit(text.as_bytes());
            self.owes_newline = true;
        }
    }

    fn emit_notice(&mut self, err: ContentDecodeError) {
        debug!("{}", err);
        self.emit(output::binary_notice(&err).as_bytes());
    }

    fn emit(&mut self, bytes: &[u8]) {
        if matches!(self.error, Some(OperationError::Output(_))) {
            return;
        }
        if let Err(err) = self.sink.write_all(bytes) {
            self.fail(OperationError::Output(err));
        }
    }

    fn fail(&mut self, error: OperationError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
        self.state = ConsumerState::Done;
    }
}
