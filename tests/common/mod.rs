//! Shared integration-test helpers: an in-process server on an ephemeral
//! port and a line-oriented test client.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use garrison::{Server, ServerConfig};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
}

impl TestServer {
    /// Start a server with default settings on an ephemeral port.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with(ServerConfig {
            port: 0,
            ..ServerConfig::default()
        })
        .await
    }

    pub async fn spawn_with(config: ServerConfig) -> anyhow::Result<Self> {
        let mut server = Server::new(config)?;
        let addr = server.bind().await?;
        let shutdown = server.shutdown_token();
        tokio::spawn(server.run());
        Ok(Self { addr, shutdown })
    }

    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    pub async fn connect(&self) -> anyhow::Result<TestClient> {
        TestClient::connect(self.addr).await
    }

    /// Connect and consume the two-line welcome banner.
    pub async fn connect_ready(&self) -> anyhow::Result<TestClient> {
        let mut client = self.connect().await?;
        client.recv_line().await?;
        client.recv_line().await?;
        Ok(client)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    /// Send one line, appending the newline if missing.
    pub async fn send_line(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        if !line.ends_with('\n') {
            self.writer.write_all(b"\n").await?;
        }
        Ok(())
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.writer.write_all(bytes).await?;
        Ok(())
    }

    pub async fn recv_line(&mut self) -> anyhow::Result<String> {
        let mut line = String::new();
        let read = timeout(RECV_TIMEOUT, self.reader.read_line(&mut line)).await??;
        anyhow::ensure!(read > 0, "connection closed by server");
        Ok(line)
    }

    pub async fn expect_line(&mut self, expected: &str) -> anyhow::Result<()> {
        let line = self.recv_line().await?;
        anyhow::ensure!(line == expected, "expected {expected:?}, got {line:?}");
        Ok(())
    }

    pub async fn expect_lines(&mut self, expected: &[&str]) -> anyhow::Result<()> {
        for line in expected {
            self.expect_line(line).await?;
        }
        Ok(())
    }

    /// Succeeds once the server has closed this connection (EOF or reset).
    pub async fn expect_closed(&mut self) -> anyhow::Result<()> {
        let mut line = String::new();
        match timeout(RECV_TIMEOUT, self.reader.read_line(&mut line)).await? {
            Ok(0) => Ok(()),
            Ok(_) => anyhow::bail!("expected close, got {line:?}"),
            Err(_) => Ok(()),
        }
    }

    /// Succeeds when nothing arrives within `wait` (EOF counts as nothing).
    pub async fn expect_no_data(&mut self, wait: Duration) -> anyhow::Result<()> {
        let mut line = String::new();
        match timeout(wait, self.reader.read_line(&mut line)).await {
            Err(_elapsed) => Ok(()),
            Ok(Ok(0)) => Ok(()),
            Ok(Ok(_)) => anyhow::bail!("unexpected data: {line:?}"),
            Ok(Err(e)) => Err(e.into()),
        }
    }
}
