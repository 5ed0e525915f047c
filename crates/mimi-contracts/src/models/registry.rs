use indexmap::IndexMap;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DRYRUN_MODEL: &str = "dryrun-1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub provider: String,
    pub capabilities: Vec<String>,
    pub context_window: Option<u64>,
}

impl ModelSpec {
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|item| item == capability)
    }
}

/// Known models in preference order; the first one supporting a capability is
/// the fallback for it.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name.trim().trim_start_matches("models/"))
    }

    pub fn list(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.values()
    }

    pub fn by_capability(&self, capability: &str) -> Vec<ModelSpec> {
        self.models
            .values()
            .filter(|model| model.supports(capability))
            .cloned()
            .collect()
    }

    pub fn ensure(&self, name: &str, capability: &str) -> Option<ModelSpec> {
        self.get(name)
            .filter(|model| model.supports(capability))
            .cloned()
    }
}

fn default_models() -> IndexMap<String, ModelSpec> {
    let mut map = IndexMap::new();

    let mut insert = |name: &str, provider: &str, capabilities: &[&str], context: Option<u64>| {
        map.insert(
            name.to_string(),
            ModelSpec {
                name: name.to_string(),
                provider: provider.to_string(),
                capabilities: capabilities
                    .iter()
                    .map(|item| (*item).to_string())
                    .collect(),
                context_window: context,
            },
        );
    };

    insert(DEFAULT_MODEL, "gemini", &["text", "vision"], Some(1_048_576));
    insert("gemini-1.5-flash-8b", "gemini", &["text", "vision"], Some(1_048_576));
    insert("gemini-1.5-pro", "gemini", &["text", "vision"], Some(2_097_152));
    insert("gemini-2.0-flash", "gemini", &["text", "vision"], Some(1_048_576));
    insert("gemini-2.5-flash", "gemini", &["text", "vision"], Some(1_048_576));
    insert(DRYRUN_MODEL, "dryrun", &["text", "vision"], Some(8192));
    map
}
