//! The single duplex connection between the harness and its worker.

mod client;
mod listener;

pub use client::TestClient;
pub use listener::SessionListener;

use crate::codec::ResponseReader;
use crate::error::launch::LaunchError;
use crate::supervisor::WorkerProcess;

use std::time::Duration;

use log::{debug, warn};
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

pub type ChannelClient = TestClient<OwnedWriteHalf>;
pub type ChannelReader = ResponseReader<BufReader<OwnedReadHalf>>;

/// Accepted connection plus the listening socket it came from.
///
/// Owned by exactly one task at a time; the session moves it into each
/// unit and takes it back with the result.
#[derive(Debug)]
pub struct SessionChannel {
    client: ChannelClient,
    reader: ChannelReader,
    listener: SessionListener,
}

impl SessionChannel {
    /// Single rendezvous: accept the worker's connection and split it.
    pub async fn establish(
        listener: SessionListener,
        worker: &WorkerProcess,
        timeout: Duration,
    ) -> Result<Self, LaunchError> {
        let stream = listener.accept(worker, timeout).await?;
        Ok(Self::new(stream, listener))
    }

    pub fn new(stream: TcpStream, listener: SessionListener) -> Self {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to disable Nagle on the worker connection: {e}");
        }

        let (read_half, write_half) = stream.into_split();
        Self {
            client: TestClient::new(write_half),
            reader: ResponseReader::new(BufReader::new(read_half)),
            listener,
        }
    }

    pub fn client(&mut self) -> &mut ChannelClient {
        &mut self.client
    }

    pub fn reader(&mut self) -> &mut ChannelReader {
        &mut self.reader
    }

    /// Both halves at once, for exchanges that write and read in turn.
    pub fn split(&mut self) -> (&mut ChannelClient, &mut ChannelReader) {
        (&mut self.client, &mut self.reader)
    }

    /// Release the writer, then the reader, then the listening socket.
    /// Failures are logged and do not stop the remaining steps. Flushing the
    /// writer is given up after `deadline`.
    pub async fn close(self, deadline: Duration) {
        let Self {
            mut client,
            reader,
            listener,
        } = self;

        match timeout(deadline, client.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to shut down the command writer: {e}"),
            Err(_) => warn!("Command writer did not shut down within {deadline:?}"),
        }
        drop(client);

        drop(reader);
        debug!("Response reader closed");

        let port = listener.port();
        drop(listener);
        debug!("Listening socket on port {port} closed");
    }
}
