//! Authenticated console session.

use std::time::Duration;

use futures::{Sink, SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn};

use crate::common::error::{EconError, EconResult};
use crate::common::Secret;
use crate::protocol::econ::codec::ConsoleCodec;
use crate::protocol::econ::commands::{
    parse_server_name, say_lines, AUTH_SUCCESS_MARKER, BANNER_MARKER, SERVER_NAME_QUERY,
};

/// Byte stream a session can run over.
pub trait ConsoleStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> ConsoleStream for T {}

type BoxedStream = Box<dyn ConsoleStream>;
type LineReader = FramedRead<ReadHalf<BoxedStream>, ConsoleCodec>;
type LineWriter = FramedWrite<WriteHalf<BoxedStream>, ConsoleCodec>;

/// Connection settings for one console.
#[derive(Debug, Clone)]
pub struct ConsoleOptions {
    pub host: String,
    pub port: u16,
    pub password: Secret,
    pub connect_timeout: Duration,
    /// How long to wait for the "Enter password" banner before sending anyway.
    pub banner_timeout: Duration,
    pub auth_timeout: Duration,
    /// Window for discarding output queued up right after authentication.
    pub drain_timeout: Duration,
    pub server_name_timeout: Duration,
    pub query_server_name: bool,
}

impl ConsoleOptions {
    pub fn new(host: impl Into<String>, port: u16, password: Secret) -> Self {
        Self {
            host: host.into(),
            port,
            password,
            connect_timeout: Duration::from_secs(10),
            banner_timeout: Duration::from_secs(1),
            auth_timeout: Duration::from_secs(5),
            drain_timeout: Duration::from_millis(100),
            server_name_timeout: Duration::from_secs(2),
            query_server_name: true,
        }
    }
}

struct Connection {
    reader: LineReader,
    writer: LineWriter,
}

impl Connection {
    async fn close(self) {
        let Connection { reader, writer } = self;
        drop(reader);
        let mut write_half = writer.into_inner();
        if let Err(e) = write_half.shutdown().await {
            debug!("Error while shutting down console stream: {}", e);
        }
    }
}

/// One connection to a server's external console.
///
/// Created disconnected. The session counts as connected exactly while it
/// holds a connection handle.
pub struct ConsoleSession {
    options: ConsoleOptions,
    connection: Option<Connection>,
    server_name: Option<String>,
}

impl ConsoleSession {
    pub fn new(options: ConsoleOptions) -> Self {
        Self {
            options,
            connection: None,
            server_name: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Name announced by the server after login, if it answered in time.
    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.options.host, self.options.port)
    }

    /// Dial the console over TCP and authenticate.
    pub async fn connect(&mut self) -> EconResult<()> {
        if self.is_connected() {
            return Err(EconError::AlreadyConnected);
        }

        let addr = self.address();
        info!("Connecting to console at {}", addr);

        let connect_failed = |source| EconError::ConnectFailed {
            host: self.options.host.clone(),
            port: self.options.port,
            source,
        };
        let stream = match timeout(self.options.connect_timeout, TcpStream::connect(&addr)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(connect_failed(e)),
            Err(_) => {
                return Err(connect_failed(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "connect timed out",
                )))
            }
        };

        self.connect_with(stream).await
    }

    /// Authenticate over an already open stream.
    ///
    /// The session only becomes connected once the whole handshake succeeded;
    /// on any failure the stream is dropped and the session stays disconnected.
    pub async fn connect_with<S>(&mut self, stream: S) -> EconResult<()>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        if self.is_connected() {
            return Err(EconError::AlreadyConnected);
        }
        self.server_name = None;

        let boxed: BoxedStream = Box::new(stream);
        let (read_half, write_half) = tokio::io::split(boxed);
        let mut reader = FramedRead::new(read_half, ConsoleCodec::new());
        let mut writer = FramedWrite::new(write_half, ConsoleCodec::new());

        // Banner ("Enter password:"). Missing is fine, the password goes out anyway.
        match timeout(self.options.banner_timeout, reader.next()).await {
            Ok(Some(Ok(banner))) => debug!("Console banner: {}", banner),
            Ok(Some(Err(e))) => return Err(EconError::Network(e)),
            Ok(None) => return Err(closed_during("banner")),
            Err(_) => debug!("No console banner within {:?}", self.options.banner_timeout),
        }

        writer
            .send(self.options.password.expose().to_string())
            .await?;

        // A banner slower than the banner timeout shows up here; skip it.
        let deadline = Instant::now() + self.options.auth_timeout;
        let response = loop {
            match timeout_at(deadline, reader.next()).await {
                Ok(Some(Ok(line))) if line.contains(BANNER_MARKER) => {
                    debug!("Late console banner: {}", line)
                }
                Ok(Some(Ok(line))) if line.trim().is_empty() => {}
                Ok(Some(Ok(line))) => break line,
                Ok(Some(Err(e))) => return Err(EconError::Network(e)),
                Ok(None) => return Err(closed_during("authentication")),
                Err(_) => {
                    return Err(EconError::AuthenticationFailed {
                        reason: format!("no response within {:?}", self.options.auth_timeout),
                    })
                }
            }
        };

        if !response.contains(AUTH_SUCCESS_MARKER) {
            warn!("Console at {} rejected the password", self.address());
            return Err(EconError::AuthenticationFailed {
                reason: response.trim().to_string(),
            });
        }
        info!("Authenticated with console at {}", self.address());

        drain(&mut reader, self.options.drain_timeout).await?;

        if self.options.query_server_name {
            self.server_name =
                query_server_name(&mut reader, &mut writer, self.options.server_name_timeout)
                    .await?;
            match &self.server_name {
                Some(name) => info!("Console at {} is '{}'", self.address(), name),
                None => warn!(
                    "Console at {} did not report its name, continuing unnamed",
                    self.address()
                ),
            }
        }

        self.connection = Some(Connection { reader, writer });
        Ok(())
    }

    /// Close the connection.
    pub async fn disconnect(&mut self) -> EconResult<()> {
        let connection = self
            .connection
            .take()
            .ok_or(EconError::AlreadyDisconnected)?;
        connection.close().await;
        info!("Disconnected from console at {}", self.address());
        Ok(())
    }

    /// Read the next console line.
    ///
    /// Returns `Ok(None)` once the server closed the stream; the session has
    /// been disconnected by then.
    #[allow(dead_code)]
    pub async fn read(&mut self) -> EconResult<Option<String>> {
        let connection = self.connection.as_mut().ok_or(EconError::Disconnected)?;
        let next = connection.reader.next().await;
        match next {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(EconError::Network(e)),
            None => {
                info!("Console at {} closed the connection", self.address());
                self.disconnect().await?;
                Ok(None)
            }
        }
    }

    /// Write one raw line.
    #[allow(dead_code)]
    pub async fn write(&mut self, text: &str) -> EconResult<()> {
        let connection = self.connection.as_mut().ok_or(EconError::Disconnected)?;
        connection.writer.send(text.to_string()).await?;
        Ok(())
    }

    /// Broadcast a chat message, one `say` per line.
    #[allow(dead_code)]
    pub async fn send(&mut self, message: &str) -> EconResult<()> {
        let connection = self.connection.as_mut().ok_or(EconError::Disconnected)?;
        send_lines(&mut connection.writer, message).await
    }

    /// Borrow the read and write sides separately so both can be driven at once.
    pub fn split(&mut self) -> EconResult<(ConsoleReader<'_>, ConsoleWriter<'_>)> {
        let connection = self.connection.as_mut().ok_or(EconError::Disconnected)?;
        Ok((
            ConsoleReader {
                inner: &mut connection.reader,
            },
            ConsoleWriter {
                inner: &mut connection.writer,
            },
        ))
    }
}

/// Read side of a connected session.
pub struct ConsoleReader<'a> {
    inner: &'a mut LineReader,
}

impl ConsoleReader<'_> {
    /// Next console line, or `None` at end of stream.
    ///
    /// Cancel safe: dropping the future loses no buffered input.
    pub async fn read_line(&mut self) -> EconResult<Option<String>> {
        match self.inner.next().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(EconError::Network(e)),
            None => Ok(None),
        }
    }
}

/// Write side of a connected session.
pub struct ConsoleWriter<'a> {
    inner: &'a mut LineWriter,
}

impl ConsoleWriter<'_> {
    pub async fn send(&mut self, message: &str) -> EconResult<()> {
        send_lines(&mut *self.inner, message).await
    }
}

/// Write the broadcast commands for `message`, stopping at the first failure.
pub async fn send_lines<S>(sink: &mut S, message: &str) -> EconResult<()>
where
    S: Sink<String, Error = std::io::Error> + Unpin,
{
    let commands = say_lines(message);
    let total = commands.len();
    for (sent, command) in commands.into_iter().enumerate() {
        if let Err(source) = sink.send(command).await {
            return Err(if sent == 0 {
                EconError::Network(source)
            } else {
                EconError::PartialSend {
                    sent,
                    total,
                    source,
                }
            });
        }
    }
    Ok(())
}

fn closed_during(stage: &str) -> EconError {
    EconError::Network(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        format!("console closed the connection during {}", stage),
    ))
}

/// Discard whatever the server queued after login until the window elapses.
async fn drain(reader: &mut LineReader, window: Duration) -> EconResult<()> {
    let deadline = Instant::now() + window;
    loop {
        match timeout_at(deadline, reader.next()).await {
            Ok(Some(Ok(line))) => debug!("Discarding console output: {}", line),
            Ok(Some(Err(e))) => return Err(EconError::Network(e)),
            Ok(None) => return Err(closed_during("login")),
            Err(_) => return Ok(()),
        }
    }
}

async fn query_server_name(
    reader: &mut LineReader,
    writer: &mut LineWriter,
    wait: Duration,
) -> EconResult<Option<String>> {
    writer.send(SERVER_NAME_QUERY.to_string()).await?;

    let deadline = Instant::now() + wait;
    loop {
        match timeout_at(deadline, reader.next()).await {
            Ok(Some(Ok(line))) => {
                if let Some(name) = parse_server_name(&line) {
                    return Ok(Some(name));
                }
            }
            Ok(Some(Err(e))) => return Err(EconError::Network(e)),
            Ok(None) => return Err(closed_during("server name query")),
            Err(_) => return Ok(None),
        }
    }
}
