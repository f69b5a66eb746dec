use apx_schemas::BaseUrlClass;
use serde::{Deserialize, Serialize};

/// In-file marker a source unit can carry to declare its environment,
/// e.g. `# apx:env=testnet`.
const ENV_MARKER: &str = "apx:env=";

/// One entry of the source inventory: a file's text plus what it declares
/// about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Inventory-relative path, `/`-separated.
    pub path: String,
    pub text: String,
    /// Environment this unit declares it runs in, if the inventory knows.
    pub declared_environment: Option<BaseUrlClass>,
}

impl SourceUnit {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            declared_environment: None,
        }
    }

    pub fn with_environment(mut self, env: BaseUrlClass) -> Self {
        self.declared_environment = Some(env);
        self
    }

    /// Declared environment: the explicit field, then an in-file
    /// `apx:env=` marker, then a path segment naming an environment.
    pub fn environment(&self) -> Option<BaseUrlClass> {
        if let Some(env) = self.declared_environment {
            return Some(env);
        }
        if let Some(env) = self.marker_environment() {
            return Some(env);
        }
        self.path
            .split(['/', '\\'])
            .rev()
            .skip(1) // the file name itself is not an environment label
            .find_map(|seg| match seg.to_ascii_lowercase().as_str() {
                "testnet" | "sandbox" => Some(BaseUrlClass::Testnet),
                "mainnet" | "prod" | "production" | "live" => Some(BaseUrlClass::Mainnet),
                _ => None,
            })
    }

    fn marker_environment(&self) -> Option<BaseUrlClass> {
        self.text.lines().find_map(|line| {
            let idx = line.find(ENV_MARKER)?;
            let rest = &line[idx + ENV_MARKER.len()..];
            let value: String = rest
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric())
                .collect();
            BaseUrlClass::parse(&value)
        })
    }
}
