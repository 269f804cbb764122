use std::collections::HashSet;

/// Capability probe: is a client library loadable in this process?
pub trait ExtensionProbe: Send + Sync {
    fn is_loaded(&self, extension: &str) -> bool;
}

/// Reports the client libraries compiled into this build (see the cargo features).
#[derive(Debug, Default, Clone, Copy)]
pub struct CompiledExtensions;

impl ExtensionProbe for CompiledExtensions {
    fn is_loaded(&self, extension: &str) -> bool {
        crate::drivers::is_compiled(extension)
    }
}

/// A fixed list of available extensions.
#[derive(Debug, Default, Clone)]
pub struct StaticExtensions {
    loaded: HashSet<String>,
}

impl StaticExtensions {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            loaded: extensions
                .into_iter()
                .map(|e| e.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }
}

impl ExtensionProbe for StaticExtensions {
    fn is_loaded(&self, extension: &str) -> bool {
        self.loaded.contains(&extension.to_ascii_lowercase())
    }
}
