use std::fmt::Display;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::{escape_crlf, ClientCodec, NetworkStream};
use crate::{
    context::Context,
    smtp::{
        authentication::{Credentials, Mechanism},
        commands::{Auth, Data, Ehlo, Helo, Mail, Quit, Rcpt},
        extension::{ClientId, MailParameter, ServerInfo},
        response::{parse_response, ReplyError, Response, Severity},
    },
};

/// Structure that implements the SMTP client
///
/// Every read and write races the [`Context`] given at construction, so a
/// cancelled send stops at the next I/O boundary.
#[derive(Debug)]
pub struct SmtpConnection {
    /// TCP stream between client and server
    stream: BufReader<NetworkStream>,
    ctx: Context,
    /// Information about the server
    server_info: ServerInfo,
}

impl SmtpConnection {
    /// Wraps a freshly dialed stream, nothing is exchanged yet
    pub fn new(ctx: Context, stream: NetworkStream) -> SmtpConnection {
        SmtpConnection {
            stream: BufReader::new(stream),
            ctx,
            server_info: ServerInfo::default(),
        }
    }

    /// Get information about the server
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Reads the server greeting, which must be a 2yz reply
    pub async fn greeting(&mut self) -> Result<Response, ReplyError> {
        let response = self.read_response().await?;
        if response.is_completion() {
            Ok(response)
        } else {
            Err(ReplyError::Unexpected(response))
        }
    }

    /// Sends EHLO and updates the server info
    ///
    /// Falls back to HELO when the server rejects EHLO permanently.
    pub async fn ehlo(&mut self, hello_name: &ClientId) -> Result<(), ReplyError> {
        let response = match self.command(Ehlo::new(hello_name.clone())).await {
            Ok(response) => response,
            Err(ReplyError::Negative(rejected))
                if rejected.code().severity == Severity::PermanentNegativeCompletion =>
            {
                tracing::debug!("EHLO rejected with {rejected}, trying HELO");
                self.command(Helo::new(hello_name.clone())).await?
            }
            Err(err) => return Err(err),
        };

        self.server_info = ServerInfo::from_response(&response)
            .ok_or_else(|| ReplyError::Malformed("could not read server name".to_owned()))?;
        Ok(())
    }

    /// Sends an AUTH command with the initial response inlined
    pub async fn auth(
        &mut self,
        mechanism: Mechanism,
        credentials: &Credentials,
    ) -> Result<Response, ReplyError> {
        let response = self.command(Auth::new(mechanism, credentials)).await?;
        if response.is_completion() {
            Ok(response)
        } else {
            // a 334 challenge: PLAIN has nothing more to say
            Err(ReplyError::Unexpected(response))
        }
    }

    /// Sends the MAIL command
    pub async fn mail(
        &mut self,
        sender: &str,
        parameters: Vec<MailParameter>,
    ) -> Result<Response, ReplyError> {
        self.command(Mail::new(sender.to_owned(), parameters)).await
    }

    /// Sends the RCPT command for a single recipient
    pub async fn rcpt(&mut self, recipient: &str) -> Result<Response, ReplyError> {
        self.command(Rcpt::new(recipient.to_owned())).await
    }

    /// Sends DATA and returns a writer for the message content
    ///
    /// The server must answer with an intermediate (354) reply.
    pub async fn data(&mut self) -> Result<DataWriter<'_>, ReplyError> {
        let response = self.command(Data).await?;
        if response.code().severity != Severity::PositiveIntermediate {
            return Err(ReplyError::Unexpected(response));
        }

        Ok(DataWriter {
            connection: self,
            codec: ClientCodec::new(),
            written: 0,
        })
    }

    /// Sends QUIT
    pub async fn quit(&mut self) -> Result<Response, ReplyError> {
        self.command(Quit).await
    }

    /// Closes the underlying stream
    ///
    /// Errors are only logged: the stream is released when `self` is dropped
    /// whatever happens here.
    pub async fn close(mut self) {
        let result = self
            .ctx
            .run(self.stream.get_mut().close())
            .await
            .map_err(ReplyError::from)
            .and_then(|res| res.map_err(ReplyError::from));
        if let Err(e) = result {
            tracing::debug!("error while closing connection: {e}");
        }
    }

    /// Sends an SMTP command and reads the reply
    ///
    /// Negative (4yz/5yz) replies are returned as [`ReplyError::Negative`].
    pub async fn command<C: Display>(&mut self, command: C) -> Result<Response, ReplyError> {
        let line = command.to_string();
        self.write(line.as_bytes()).await?;
        if line.starts_with("AUTH ") {
            tracing::debug!(">> AUTH <redacted>");
        } else {
            tracing::debug!(">> {}", escape_crlf(&line));
        }

        let response = self.read_response().await?;
        if response.is_positive() {
            Ok(response)
        } else {
            Err(ReplyError::Negative(response))
        }
    }

    /// Writes bytes to the server and flushes them
    async fn write(&mut self, bytes: &[u8]) -> Result<(), ReplyError> {
        let stream = self.stream.get_mut();
        self.ctx
            .run(async {
                stream.write_all(bytes).await?;
                stream.flush().await
            })
            .await??;
        Ok(())
    }

    /// Gets the SMTP response
    pub async fn read_response(&mut self) -> Result<Response, ReplyError> {
        let mut buffer = String::with_capacity(100);

        while self
            .ctx
            .run(self.stream.read_line(&mut buffer))
            .await??
            > 0
        {
            tracing::debug!("<< {}", escape_crlf(&buffer));
            match parse_response(&buffer) {
                Ok((_remaining, response)) => return Ok(response),
                Err(nom::Err::Incomplete(_)) => { /* read more */ }
                Err(nom::Err::Failure(e)) | Err(nom::Err::Error(e)) => {
                    return Err(ReplyError::Malformed(e.to_string()));
                }
            }
        }

        Err(ReplyError::Closed)
    }
}

/// Writer for the content of the `DATA` phase
///
/// Must be finished with [`DataWriter::close`], which writes the end-of-data
/// marker and reads the server's verdict on the message.
#[derive(Debug)]
pub struct DataWriter<'a> {
    connection: &'a mut SmtpConnection,
    codec: ClientCodec,
    written: usize,
}

impl DataWriter<'_> {
    /// Writes message content, dot-stuffed
    pub async fn write(&mut self, content: &[u8]) -> Result<(), ReplyError> {
        let mut out_buf: Vec<u8> = Vec::with_capacity(content.len());
        self.codec.encode(content, &mut out_buf);
        self.connection.write(&out_buf).await?;
        self.written += content.len();
        Ok(())
    }

    /// Ends the message and returns the server's reply
    pub async fn close(mut self) -> Result<Response, ReplyError> {
        let mut out_buf: Vec<u8> = Vec::with_capacity(5);
        self.codec.finish(&mut out_buf);
        self.connection.write(&out_buf).await?;
        tracing::debug!(">> <message, {} bytes><CRLF>.<CRLF>", self.written);

        let response = self.connection.read_response().await?;
        if response.is_completion() {
            Ok(response)
        } else if response.is_positive() {
            Err(ReplyError::Unexpected(response))
        } else {
            Err(ReplyError::Negative(response))
        }
    }
}
