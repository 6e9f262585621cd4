use crate::error::{KefError, Result};
use crate::protocol::{Frame, Request};
use std::io::ErrorKind;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

/// Default TCP control port of the speaker
pub const DEFAULT_PORT: u16 = 50001;

/// The speaker answers each request in one segment well under this bound
const READ_BUFFER_SIZE: usize = 1024;

/// Connection settings, immutable for the lifetime of a [`Connection`]
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Speaker host name or IP address
    pub host: String,
    /// TCP control port
    pub port: u16,
    /// Bound on a single connect attempt and on waiting for a response
    pub timeout: Duration,
    /// Quiet period after which the idle timer closes the session
    pub keepalive: Duration,
    /// Connect attempts before giving up
    pub max_retries: u32,
    /// Base delay between connect attempts, doubled each retry
    pub retry_delay: Duration,
}

impl ConnectionConfig {
    /// Create a config for the given host with the default port and timings
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            timeout: Duration::from_secs(2),
            keepalive: Duration::from_secs(1),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
        }
    }

    /// Set the TCP control port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the connect/request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the idle keepalive duration
    pub fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }

    /// Set the number of connect attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base retry delay
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

/// TCP session to a speaker with retried connect, serialized exchanges and
/// idle auto-disconnect.
///
/// One lock guards the socket across `connect`, `disconnect` and `send`, so
/// an exchange (connect if needed, write, read) is one unit; concurrent
/// callers queue on the lock. After `keepalive` of inactivity a background
/// timer closes the socket; the next `send` reconnects transparently.
pub struct Connection {
    config: ConnectionConfig,
    session: Arc<Mutex<Option<TcpStream>>>,
    idle_timer: StdMutex<Option<JoinHandle<()>>>,
}

impl Connection {
    /// Create a disconnected session manager
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            session: Arc::new(Mutex::new(None)),
            idle_timer: StdMutex::new(None),
        }
    }

    /// Settings this connection was created with
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Whether a session is currently open
    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Open the session if it is not already open.
    ///
    /// Idempotent: an existing session only has its idle timer re-armed.
    pub async fn connect(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            self.arm_idle_timer();
            return Ok(());
        }

        *session = Some(self.open_stream().await?);
        self.arm_idle_timer();
        Ok(())
    }

    /// Close the session if open. Idempotent, never fails.
    pub async fn disconnect(&self) {
        self.cancel_idle_timer();
        let mut session = self.session.lock().await;
        if let Some(mut stream) = session.take() {
            let _ = stream.shutdown().await;
            tracing::info!("disconnected from {}:{}", self.config.host, self.config.port);
        }
    }

    /// Perform one request/response exchange and return the matching frame.
    ///
    /// Connects first if needed. A read timeout or a peer close fails the
    /// exchange and drops the session so the next call reconnects; nothing
    /// is retried here.
    pub async fn send(&self, request: &Request) -> Result<Frame> {
        let mut session = self.session.lock().await;
        if session.is_none() {
            *session = Some(self.open_stream().await?);
            self.arm_idle_timer();
        }
        let Some(stream) = session.as_mut() else {
            return Err(KefError::connection("not connected"));
        };

        tracing::debug!("sending {:02X?}", request.data());

        if let Err(e) = stream.write_all(request.data()).await {
            *session = None;
            return Err(KefError::connection_io("failed to send request", e));
        }
        if let Err(e) = stream.flush().await {
            *session = None;
            return Err(KefError::connection_io("failed to send request", e));
        }

        let mut buf = [0u8; READ_BUFFER_SIZE];
        let read_result = timeout(self.config.timeout, stream.read(&mut buf)).await;
        let read = match read_result {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                *session = None;
                return Err(KefError::connection_io("failed to read response", e));
            }
            Err(_) => {
                // A late reply would be mis-read as the answer to the next
                // request, so the socket goes too
                *session = None;
                return Err(KefError::connection("response timeout"));
            }
        };

        if read == 0 {
            *session = None;
            return Err(KefError::connection("connection closed by speaker"));
        }

        tracing::debug!("received {:02X?}", &buf[..read]);
        self.arm_idle_timer();

        Frame::parse(&buf[..read], request.expected_command())
    }

    /// Open the TCP stream, retrying with exponential backoff
    async fn open_stream(&self) -> Result<TcpStream> {
        let host = self.config.host.as_str();
        let port = self.config.port;
        let mut last_err: Option<std::io::Error> = None;

        for attempt in 0..self.config.max_retries {
            match timeout(self.config.timeout, TcpStream::connect((host, port))).await {
                Ok(Ok(stream)) => {
                    tracing::info!("connected to {}:{}", host, port);
                    return Ok(stream);
                }
                Ok(Err(e)) => {
                    tracing::warn!("connect attempt {} to {}:{} failed: {}", attempt + 1, host, port, e);
                    last_err = Some(e);
                }
                Err(_) => {
                    tracing::warn!("connect attempt {} to {}:{} timed out", attempt + 1, host, port);
                    last_err = Some(std::io::Error::new(ErrorKind::TimedOut, "connect timed out"));
                }
            }

            if attempt + 1 < self.config.max_retries {
                sleep(self.config.retry_delay * 2u32.pow(attempt)).await;
            }
        }

        Err(KefError::Connection {
            message: format!("failed to connect to {}:{}", host, port),
            source: last_err,
        })
    }

    /// Arm the idle timer, replacing any pending one
    fn arm_idle_timer(&self) {
        let mut slot = self.idle_timer.lock().unwrap();
        if let Some(timer) = slot.take() {
            timer.abort();
        }

        let session = Arc::clone(&self.session);
        let keepalive = self.config.keepalive;
        *slot = Some(tokio::spawn(async move {
            sleep(keepalive).await;
            // Close directly: disconnect() would cancel this task out from
            // under its own cleanup
            let mut session = session.lock().await;
            if let Some(mut stream) = session.take() {
                let _ = stream.shutdown().await;
                tracing::debug!("idle for {:?}, closing connection", keepalive);
            }
        }));
    }

    fn cancel_idle_timer(&self) {
        if let Some(timer) = self.idle_timer.lock().unwrap().take() {
            timer.abort();
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.cancel_idle_timer();
    }
}
