/// Commands the harness sends to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientMethod {
    OpenProject,
    RegisterLibrarySet,
    RegisterModule,
    OpenDocument,
    Test,
    CloseProject,
}

impl ClientMethod {
    pub fn code(self) -> u8 {
        match self {
            ClientMethod::OpenProject => 0,
            ClientMethod::RegisterLibrarySet => 1,
            ClientMethod::RegisterModule => 2,
            ClientMethod::OpenDocument => 3,
            ClientMethod::Test => 4,
            ClientMethod::CloseProject => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ClientMethod::OpenProject),
            1 => Some(ClientMethod::RegisterLibrarySet),
            2 => Some(ClientMethod::RegisterModule),
            3 => Some(ClientMethod::OpenDocument),
            4 => Some(ClientMethod::Test),
            5 => Some(ClientMethod::CloseProject),
            _ => None,
        }
    }
}

/// Requests the worker sends back while an interactive test is replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerMethod {
    ResolveExternalInlineStyleDeclarationSource,
}

impl ServerMethod {
    pub fn code(self) -> u8 {
        match self {
            ServerMethod::ResolveExternalInlineStyleDeclarationSource => 0,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ServerMethod::ResolveExternalInlineStyleDeclarationSource),
            _ => None,
        }
    }
}
