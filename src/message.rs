//! Message composition
//!
//! Messages are a flat header block followed by the body as given: no MIME
//! multipart, no encoding of header values.

/// Returns true if `value` would break out of its command or header line
pub(crate) fn has_line_break(value: &str) -> bool {
    value.contains(['\r', '\n'])
}

/// Simple email envelope representation
///
/// We only accept mailboxes, and do not support source routes (as per RFC).
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Envelope {
    /// The envelope sender address, sent in `MAIL FROM`
    from: String,
    /// The envelope recipients' addresses, one `RCPT TO` each, in order
    to: Vec<String>,
}

impl Envelope {
    /// Creates a new envelope
    pub fn new<S: Into<String>>(from: S, to: Vec<String>) -> Envelope {
        Envelope {
            from: from.into(),
            to,
        }
    }

    /// Sender address
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Destination addresses
    pub fn to(&self) -> &[String] {
        &self.to
    }
}

/// A message built for a single send
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct OutboundMessage {
    subject: String,
    body: Vec<u8>,
    content_type: String,
    recipients: Vec<String>,
}

impl OutboundMessage {
    /// Creates a message; recipients are listed in the `To` header in this order
    pub fn new<S, C, B>(subject: S, content_type: C, body: B, recipients: Vec<String>) -> Self
    where
        S: Into<String>,
        C: Into<String>,
        B: Into<Vec<u8>>,
    {
        Self {
            subject: subject.into(),
            body: body.into(),
            content_type: content_type.into(),
            recipients,
        }
    }

    /// Creates a `text/plain` message
    pub fn text<S, B>(subject: S, body: B, recipients: Vec<String>) -> Self
    where
        S: Into<String>,
        B: Into<Vec<u8>>,
    {
        Self::new(subject, "text/plain", body, recipients)
    }

    /// Subject header value
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Body bytes, sent as given
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Content-Type header value
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Recipients, in `RCPT TO` and `To` header order
    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// The envelope for sending this message as `from`
    pub fn envelope(&self, from: &str) -> Envelope {
        Envelope::new(from, self.recipients.clone())
    }

    /// Headers, a blank line, then the body bytes
    ///
    /// `Content-Length` is the byte length of the body.
    pub fn formatted(&self, from: &str) -> Vec<u8> {
        let headers = format!(
            "Subject: {}\r\nTo: {}\r\nFrom: {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
            self.subject,
            self.recipients.join(","),
            from,
            self.content_type,
            self.body.len(),
        );

        let mut out = Vec::with_capacity(headers.len() + self.body.len());
        out.extend_from_slice(headers.as_bytes());
        out.extend_from_slice(&self.body);
        out
    }
}
