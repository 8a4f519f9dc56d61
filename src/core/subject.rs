//! Subjects: the artifacts a remediation assesses.
//!
//! Files are plain paths. Processes, services and browser extensions are
//! snapshots produced by the inspector collaborators.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// The kind of subject a condition or remediation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    /// A file on disk.
    File,
    /// A running process.
    Process,
    /// A background service (launch daemon or agent).
    Service,
    /// A registered browser extension.
    Extension,
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Process => write!(f, "process"),
            Self::Service => write!(f, "service"),
            Self::Extension => write!(f, "extension"),
        }
    }
}

/// A snapshot of a running process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// Process identifier.
    pub pid: u32,

    /// Process name.
    pub name: String,

    /// Path of the main executable, if known.
    pub executable: Option<PathBuf>,

    /// Command-line arguments.
    #[serde(default)]
    pub arguments: Vec<String>,

    /// Paths of loaded libraries.
    #[serde(default)]
    pub loaded_libraries: Vec<String>,

    /// Whether the process is a platform (operating system) binary.
    #[serde(default)]
    pub is_platform: bool,
}

impl ProcessInfo {
    /// Creates a new process snapshot with required fields.
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            executable: None,
            arguments: Vec::new(),
            loaded_libraries: Vec::new(),
            is_platform: false,
        }
    }

    /// Sets the main executable path.
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Sets the arguments.
    pub fn with_arguments<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = args.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a loaded library.
    pub fn with_loaded_library(mut self, library: impl Into<String>) -> Self {
        self.loaded_libraries.push(library.into());
        self
    }

    /// Marks the process as a platform binary.
    pub fn with_platform(mut self, is_platform: bool) -> Self {
        self.is_platform = is_platform;
        self
    }

    /// Identity used in logs and reports.
    pub fn identity(&self) -> String {
        format!("{}[{}]", self.name, self.pid)
    }
}

/// A snapshot of a loaded background service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Service label, e.g. `com.example.updater`.
    pub label: String,

    /// Path of the service definition file, if known.
    pub definition_path: Option<PathBuf>,

    /// Path of the program the service runs.
    pub executable: Option<PathBuf>,

    /// Program arguments, including argv\[0\].
    #[serde(default)]
    pub program_arguments: Vec<String>,

    /// Remaining definition keys.
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl ServiceInfo {
    /// Creates a new service snapshot.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            definition_path: None,
            executable: None,
            program_arguments: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Sets the definition file path.
    pub fn with_definition_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.definition_path = Some(path.into());
        self
    }

    /// Sets the executable path.
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Sets the program arguments.
    pub fn with_program_arguments<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.program_arguments = args.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a definition property.
    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Identity used in logs and reports.
    pub fn identity(&self) -> String {
        self.label.clone()
    }
}

/// A snapshot of a registered browser extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionInfo {
    /// Bundle identifier.
    pub identifier: String,

    /// Path of the extension bundle.
    pub bundle_path: Option<PathBuf>,

    /// Path of the extension's native binary.
    pub binary: Option<PathBuf>,

    /// Bundled script files.
    #[serde(default)]
    pub scripts: Vec<PathBuf>,
}

impl ExtensionInfo {
    /// Creates a new extension snapshot.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            bundle_path: None,
            binary: None,
            scripts: Vec::new(),
        }
    }

    /// Sets the bundle path.
    pub fn with_bundle_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.bundle_path = Some(path.into());
        self
    }

    /// Sets the native binary path.
    pub fn with_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary = Some(path.into());
        self
    }

    /// Adds a bundled script.
    pub fn with_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.scripts.push(path.into());
        self
    }

    /// Identity used in logs and reports.
    pub fn identity(&self) -> String {
        self.identifier.clone()
    }
}

/// Identity of a file subject used in logs and reports.
pub fn file_identity(path: &Path) -> String {
    path.display().to_string()
}
