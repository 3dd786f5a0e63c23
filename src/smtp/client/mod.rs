//! SMTP client
//!
//! `SmtpConnection` allows manually sending SMTP commands over a
//! [`NetworkStream`]. The session logic built on top of it lives in
//! [`SmtpTransport`](crate::smtp::SmtpTransport).

pub use self::{
    connection::{DataWriter, SmtpConnection},
    net::NetworkStream,
    tls::{TlsParameters, TlsParametersBuilder},
};

mod connection;
mod net;
mod tls;

/// The codec used for transparency
///
/// Dot-stuffs lines starting with `.`, turns bare `LF` into `CRLF` and produces
/// the end-of-data marker matching what was already written.
#[derive(Clone, Copy, Debug)]
pub struct ClientCodec {
    state: LineState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LineState {
    /// At the start of a line
    LineStart,
    /// After a `CR`
    Return,
    /// Somewhere in a line
    Text,
}

impl Default for ClientCodec {
    fn default() -> Self {
        // the DATA command line just ended with CRLF
        ClientCodec {
            state: LineState::LineStart,
        }
    }
}

impl ClientCodec {
    /// Creates a new client codec
    pub fn new() -> Self {
        ClientCodec::default()
    }

    /// Adds transparency
    pub fn encode(&mut self, frame: &[u8], buf: &mut Vec<u8>) {
        buf.reserve(frame.len());
        for &byte in frame {
            match byte {
                b'\n' => {
                    if self.state != LineState::Return {
                        buf.push(b'\r');
                    }
                    buf.push(b'\n');
                    self.state = LineState::LineStart;
                }
                b'\r' => {
                    buf.push(b'\r');
                    self.state = LineState::Return;
                }
                b'.' if self.state == LineState::LineStart => {
                    buf.extend_from_slice(b"..");
                    self.state = LineState::Text;
                }
                _ => {
                    buf.push(byte);
                    self.state = LineState::Text;
                }
            }
        }
    }

    /// Writes the end-of-data marker and resets the codec
    pub fn finish(&mut self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(match self.state {
            LineState::LineStart => b".\r\n".as_slice(),
            LineState::Return => b"\n.\r\n".as_slice(),
            LineState::Text => b"\r\n.\r\n".as_slice(),
        });
        self.state = LineState::LineStart;
    }
}

/// Returns the string replacing all the CRLF with "\<CRLF\>"
///
/// Used for debug displays
fn escape_crlf(string: &str) -> String {
    string.replace("\r\n", "<CRLF>")
}
