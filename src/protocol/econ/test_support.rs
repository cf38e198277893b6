//! Fake console for session, relay and supervisor tests.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use crate::common::Secret;
use crate::protocol::econ::commands::SERVER_NAME_QUERY;
use crate::protocol::econ::ConsoleOptions;

pub const PASSWORD: &str = "secret";
pub const SERVER_NAME: &str = "Test Server";

/// Options with short timeouts for a console at `host:port`.
pub fn options(host: &str, port: u16) -> ConsoleOptions {
    let mut options = ConsoleOptions::new(host, port, Secret::new(PASSWORD));
    options.banner_timeout = Duration::from_millis(200);
    options.auth_timeout = Duration::from_secs(1);
    options.drain_timeout = Duration::from_millis(20);
    options.server_name_timeout = Duration::from_millis(500);
    options
}

/// Bind a loopback listener and options pointing at it.
pub async fn listen() -> (TcpListener, ConsoleOptions) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, options("127.0.0.1", port))
}

/// Play the server side of the login, answering `sv_name` with [`SERVER_NAME`].
pub async fn login<S>(stream: S, accept: bool) -> S
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let reply = format!("[Console]: Value: {}", SERVER_NAME);
    login_with(stream, accept, &[reply.as_str()]).await
}

/// Play the server side of the login, answering `sv_name` with `name_reply`.
pub async fn login_with<S>(stream: S, accept: bool, name_reply: &[&str]) -> S
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);
    stream.get_mut().write_all(b"Enter password:\n").await.unwrap();

    let mut line = String::new();
    stream.read_line(&mut line).await.unwrap();
    assert_eq!(line.trim_end(), PASSWORD);

    if !accept {
        stream.get_mut().write_all(b"Wrong password\n").await.unwrap();
        return stream.into_inner();
    }
    stream
        .get_mut()
        .write_all(b"Authentication successful. External console access granted.\n")
        .await
        .unwrap();

    line.clear();
    stream.read_line(&mut line).await.unwrap();
    assert_eq!(line.trim_end(), SERVER_NAME_QUERY);
    for reply in name_reply {
        let reply = format!("{}\n", reply);
        stream.get_mut().write_all(reply.as_bytes()).await.unwrap();
    }
    stream.into_inner()
}
