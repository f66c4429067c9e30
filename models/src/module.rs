use std::fmt::{Display, Formatter, Result as FormatResult};

/// Id the client assigns to a module when it is first registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(i32);

impl ModuleId {
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i32 {
        self.0
    }
}

impl Display for ModuleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "{}", self.0)
    }
}

/// A source file that declares local style rules, plus the style names it
/// declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStyleHolder {
    pub path: String,
    pub style_names: Vec<String>,
}

/// A module as registered with the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    name: String,
    local_style_holders: Vec<LocalStyleHolder>,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            local_style_holders: Vec::new(),
        }
    }

    pub fn with_local_style_holders(mut self, holders: Vec<LocalStyleHolder>) -> Self {
        self.local_style_holders = holders;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_style_holders(&self) -> &[LocalStyleHolder] {
        &self.local_style_holders
    }
}
