//! Test helpers for harness integration tests.
//!
//! This module provides:
//! - A simulated worker that speaks the wire protocol over a real socket
//! - A launcher that starts it in place of `adl`
//! - A designer home fixture with the files app root preparation copies

use harness_core::codec::worker::{
    ClientMessage, WorkerStringTable, encode_failure, encode_pass, read_client_message,
};
use harness_core::error::LaunchError;
use harness_core::{
    APP_LOADER_SWF_PATH, DESCRIPTOR_PATH, HARNESS_HOSTNAME, HarnessConfig, SessionSetup,
    WorkerLauncher, WorkerProcess,
};

use models::{
    DocumentUnit, LaunchConfig, LibraryDescriptor, LibrarySetBuilder, LibrarySetId,
    ModuleDescriptor, ProjectDescriptor,
};

use std::future::pending;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

pub const PROJECT_NAME: &str = "demo";
pub const LOCATION_HASH: &str = "demo1a2b3c4d";
pub const MODULE_NAME: &str = "app";

/// Exit codes the simulated worker uses for its own faults.
pub const CONNECT_FAILED: i32 = 101;
pub const PROTOCOL_FAILED: i32 = 102;

/// What the worker answers to a `Test` command.
#[derive(Debug, Clone)]
pub enum Reply {
    Pass,
    Fail(String),
    /// Raw response bytes, for interactive exchanges.
    Bytes(Vec<u8>),
    /// Never answer.
    Silent,
    /// Exit with this code instead of answering.
    Exit(i32),
}

pub type Script = Arc<dyn Fn(&str) -> Reply + Send + Sync>;

#[derive(Clone)]
pub enum Behavior {
    Exit(i32),
    NeverConnect,
    /// Connect, then never read a byte.
    ConnectIdle,
    Serve(Script),
}

/// Starts a simulated worker instead of `adl` and records what it received.
pub struct SimulatedLauncher {
    behavior: Behavior,
    received: Arc<Mutex<Vec<ClientMessage>>>,
    launched: Mutex<Option<LaunchConfig>>,
}

impl SimulatedLauncher {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            received: Arc::new(Mutex::new(Vec::new())),
            launched: Mutex::new(None),
        }
    }

    /// A worker that answers every test with `reply(document)`.
    pub fn serving<F>(reply: F) -> Self
    where
        F: Fn(&str) -> Reply + Send + Sync + 'static,
    {
        Self::new(Behavior::Serve(Arc::new(reply)))
    }

    pub fn received(&self) -> Vec<ClientMessage> {
        self.received.lock().unwrap().clone()
    }

    /// Document names of the `Test` commands received, in order.
    pub fn tested(&self) -> Vec<String> {
        self.received()
            .into_iter()
            .filter_map(|message| match message {
                ClientMessage::Test { document, .. } => Some(document),
                _ => None,
            })
            .collect()
    }

    pub fn launched(&self) -> Option<LaunchConfig> {
        self.launched.lock().unwrap().clone()
    }
}

impl WorkerLauncher for SimulatedLauncher {
    fn launch(&self, config: &LaunchConfig) -> Result<WorkerProcess, LaunchError> {
        *self.launched.lock().unwrap() = Some(config.clone());

        let worker = match &self.behavior {
            Behavior::Exit(code) => {
                let code = *code;
                WorkerProcess::from_future("simulated-adl", async move { code })
            }
            Behavior::NeverConnect => WorkerProcess::from_future("simulated-adl", pending::<i32>()),
            Behavior::ConnectIdle => {
                WorkerProcess::from_future("simulated-adl", connect_idle(config.port()))
            }
            Behavior::Serve(script) => WorkerProcess::from_future(
                "simulated-adl",
                serve(config.port(), script.clone(), self.received.clone()),
            ),
        };
        Ok(worker)
    }
}

async fn connect_idle(port: u16) -> i32 {
    let Ok(_stream) = TcpStream::connect((HARNESS_HOSTNAME, port)).await else {
        return CONNECT_FAILED;
    };
    pending::<i32>().await
}

async fn serve(port: u16, script: Script, received: Arc<Mutex<Vec<ClientMessage>>>) -> i32 {
    let Ok(stream) = TcpStream::connect((HARNESS_HOSTNAME, port)).await else {
        return CONNECT_FAILED;
    };
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut table = WorkerStringTable::default();

    loop {
        let message = match read_client_message(&mut reader, &mut table).await {
            Ok(Some(message)) => message,
            Ok(None) => return 0,
            Err(_) => return PROTOCOL_FAILED,
        };
        received.lock().unwrap().push(message.clone());

        let response = match message {
            ClientMessage::Test { document, .. } => match script(&document) {
                Reply::Pass => encode_pass(),
                Reply::Fail(reason) => match encode_failure(&reason) {
                    Ok(bytes) => bytes,
                    Err(_) => return PROTOCOL_FAILED,
                },
                Reply::Bytes(bytes) => bytes,
                Reply::Silent => continue,
                Reply::Exit(code) => return code,
            },
            ClientMessage::CloseProject { .. } => return 0,
            _ => continue,
        };

        if write_half.write_all(&response).await.is_err() {
            return CONNECT_FAILED;
        }
    }
}

/// A designer home holding the loader and descriptor, and a config pointing
/// at it with short timeouts.
pub struct Fixture {
    pub home: TempDir,
    pub config: HarnessConfig,
}

pub fn fixture() -> Fixture {
    let home = tempfile::tempdir().unwrap();
    write_file(&home.path().join(APP_LOADER_SWF_PATH), b"loader");
    write_file(&home.path().join(DESCRIPTOR_PATH), b"<application/>");

    let config = HarnessConfig {
        air: Some(home.path().join("air")),
        home: Some(home.path().to_path_buf()),
        debug_app_root: home.path().join("testAppRoot"),
        unit_timeout_secs: 2,
        accept_timeout_secs: 5,
        ..HarnessConfig::default()
    };

    Fixture { home, config }
}

fn write_file(path: &Path, contents: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

pub fn project() -> ProjectDescriptor {
    ProjectDescriptor::new(PROJECT_NAME, LOCATION_HASH)
}

/// One library set with `A.swc` sorted before `B.swc`, and module `app`.
pub fn setup() -> SessionSetup {
    let project = project();
    let set = LibrarySetBuilder::default()
        .with_id(LibrarySetId::for_project(&project))
        .with_library(LibraryDescriptor::new("A", "/libs/A.swc", 0, false))
        .with_library(LibraryDescriptor::new("B", "/libs/B.swc", 1, false))
        .build()
        .unwrap();

    SessionSetup::new(project, set).with_module(ModuleDescriptor::new(MODULE_NAME))
}

/// A library set too large for the socket buffers of a peer that never reads.
pub fn oversized_setup() -> SessionSetup {
    let project = project();
    let padding = "x".repeat(1024);
    let libraries = (0..20_000u32).map(|position| {
        LibraryDescriptor::new(
            format!("L{position}"),
            format!("/libs/{padding}/L{position}.swc"),
            position,
            true,
        )
    });
    let set = LibrarySetBuilder::default()
        .with_id(LibrarySetId::for_project(&project))
        .with_libraries(libraries)
        .build()
        .unwrap();

    SessionSetup::new(project, set).with_module(ModuleDescriptor::new(MODULE_NAME))
}

pub fn document(file_name: &str) -> DocumentUnit {
    DocumentUnit::new(
        file_name,
        "fixtures",
        format!("<s:Application name=\"{file_name}\"/>").into_bytes(),
    )
}
