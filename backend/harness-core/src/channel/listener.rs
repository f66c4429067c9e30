use crate::error::launch::LaunchError;
use crate::supervisor::WorkerProcess;
use crate::HARNESS_HOSTNAME;

use common::ErrorLocation;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::panic::Location;
use std::time::Duration;

use log::{debug, info};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::time::sleep as TokioSleep;

const LISTEN_BACKLOG: u32 = 1;

/// The socket the worker connects back to. Exactly one connection is
/// accepted per session.
#[derive(Debug)]
pub struct SessionListener {
    listener: TcpListener,
    port: u16,
}

impl SessionListener {
    /// Bind an ephemeral loopback port with a backlog of one.
    pub fn bind() -> Result<Self, LaunchError> {
        let address = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);

        let socket = TcpSocket::new_v4().map_err(|e| LaunchError::Bind {
            message: format!("Failed to create listening socket: {e}"),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;
        socket.bind(address).map_err(|e| LaunchError::Bind {
            message: format!("Failed to bind {HARNESS_HOSTNAME}: {e}"),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;
        let listener = socket.listen(LISTEN_BACKLOG).map_err(|e| LaunchError::Bind {
            message: format!("Failed to listen on {HARNESS_HOSTNAME}: {e}"),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;
        let port = listener
            .local_addr()
            .map_err(|e| LaunchError::Bind {
                message: format!("Failed to read bound address: {e}"),
                location: ErrorLocation::from(Location::caller()),
                source: e,
            })?
            .port();

        debug!("Listening for the worker on {HARNESS_HOSTNAME}:{port}");
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait for the worker to connect.
    ///
    /// Fails as soon as the worker exits (any exit, code 0 included, since a
    /// worker that never connected cannot be tested against) or when
    /// `timeout` elapses first.
    pub async fn accept(
        &self,
        worker: &WorkerProcess,
        timeout: Duration,
    ) -> Result<TcpStream, LaunchError> {
        let exited = worker.exited();

        tokio::select! {
            biased;

            accepted = self.listener.accept() => {
                let (stream, peer) = accepted.map_err(|e| LaunchError::Accept {
                    message: format!("Failed to accept worker connection: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                })?;
                info!("{} connected from {peer}", worker.label());
                Ok(stream)
            }
            exit = exited => Err(exit.unexpected("before connecting")),
            _ = TokioSleep(timeout) => Err(LaunchError::AcceptTimeout {
                message: format!(
                    "{} did not connect to port {} within {timeout:?}",
                    worker.label(),
                    self.port
                ),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}
