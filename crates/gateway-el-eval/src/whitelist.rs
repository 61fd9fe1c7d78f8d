//! Method and constructor whitelist
//!
//! Declarations come from the bundled built-in list and from configuration,
//! one per line:
//!
//! ```text
//! class java.lang.Math
//! method java.lang.System getenv java.lang.String
//! new java.lang.Exception java.lang.String
//! ```
//!
//! A loaded set of declarations forms a generation. Reinitialization builds a
//! new generation and swaps it in whole, so readers see either the old or the
//! new set and never a mix.

use dashmap::DashMap;
use gateway_el_diagnostics::{ElError, EL0403};
use gateway_el_model::{
    ConstructorSignature, MethodSignature, ModelError, TypeRegistry, BUILTIN_WHITELIST,
};
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// How configured declarations combine with the built-in list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhitelistMode {
    /// Union with the built-in list
    #[default]
    Append,
    /// Built-in list discarded
    Replace,
}

impl FromStr for WhitelistMode {
    type Err = WhitelistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(Self::Append),
            "replace" => Ok(Self::Replace),
            _ => Err(WhitelistError::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for WhitelistMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Append => "append",
            Self::Replace => "replace",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WhitelistError {
    #[error("unknown whitelist mode '{0}'")]
    UnknownMode(String),

    #[error("malformed declaration: {0}")]
    Malformed(String),

    #[error(transparent)]
    Unresolved(#[from] ModelError),
}

impl From<WhitelistError> for ElError {
    fn from(err: WhitelistError) -> Self {
        ElError::configuration(EL0403, err.to_string())
    }
}

/// Whitelist settings supplied by the embedding gateway
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhitelistConfig {
    pub mode: WhitelistMode,
    /// Extra declarations, in the line format of the built-in list
    pub list: Vec<String>,
}

impl WhitelistConfig {
    pub const MODE_KEY: &'static str = "el.whitelist.mode";
    pub const LIST_KEY: &'static str = "el.whitelist.list";

    pub fn append<I, S>(declarations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: WhitelistMode::Append,
            list: declarations.into_iter().map(Into::into).collect(),
        }
    }

    pub fn replace<I, S>(declarations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: WhitelistMode::Replace,
            list: declarations.into_iter().map(Into::into).collect(),
        }
    }

    /// Read flat gateway properties (`el.whitelist.mode`, `el.whitelist.list[N]`).
    ///
    /// List entries are ordered by their index; other keys are ignored.
    pub fn from_properties<I, K, V>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::default();
        let mut entries = BTreeMap::new();

        for (key, value) in properties {
            let key = key.as_ref();
            if key == Self::MODE_KEY {
                let value = value.into();
                config.mode = value.parse().unwrap_or_else(|err| {
                    warn!("{}, falling back to append", err);
                    WhitelistMode::Append
                });
                continue;
            }
            let index = key
                .strip_prefix(Self::LIST_KEY)
                .and_then(|rest| rest.strip_prefix('['))
                .and_then(|rest| rest.strip_suffix(']'))
                .and_then(|index| index.parse::<usize>().ok());
            if let Some(index) = index {
                entries.insert(index, value.into());
            }
        }

        config.list = entries.into_values().collect();
        config
    }
}

/// One parsed whitelist line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// Every declared method and constructor of a type
    Class(String),
    Method(MethodSignature),
    Constructor(ConstructorSignature),
}

impl Declaration {
    /// Parse `line` and resolve it against the catalog.
    ///
    /// Blank lines and `#` comments yield `Ok(None)`.
    pub fn parse(line: &str, types: &TypeRegistry) -> Result<Option<Self>, WhitelistError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut parts = line.split_whitespace();
        let kind = parts.next().unwrap_or_default();
        let type_name = parts
            .next()
            .ok_or_else(|| WhitelistError::Malformed(format!("'{}' is missing a type", line)))?;

        let declaration = match kind {
            "class" => {
                if parts.next().is_some() {
                    return Err(WhitelistError::Malformed(format!(
                        "'{}' takes a single type",
                        line
                    )));
                }
                if !types.contains(type_name) {
                    return Err(ModelError::UnknownType(type_name.to_string()).into());
                }
                Self::Class(type_name.to_string())
            }
            "method" => {
                let name = parts.next().ok_or_else(|| {
                    WhitelistError::Malformed(format!("'{}' is missing a method name", line))
                })?;
                let params: Vec<String> = parts.map(str::to_string).collect();
                let method = types.resolve_method(type_name, name, &params)?;
                Self::Method(method.signature.clone())
            }
            "new" => {
                let params: Vec<String> = parts.map(str::to_string).collect();
                let constructor = types.resolve_constructor(type_name, &params)?;
                Self::Constructor(constructor.signature.clone())
            }
            other => {
                return Err(WhitelistError::Malformed(format!(
                    "unknown declaration kind '{}'",
                    other
                )));
            }
        };
        Ok(Some(declaration))
    }
}

/// One loaded set of declarations
#[derive(Debug, Default)]
struct Generation {
    number: u64,
    mode: WhitelistMode,
    /// Granted methods grouped by declaring type
    methods: HashMap<String, HashSet<MethodSignature>>,
    constructors: HashSet<ConstructorSignature>,
    /// Memoized `effective_methods` results
    effective: DashMap<String, Arc<HashSet<MethodSignature>>>,
}

impl Generation {
    fn load(types: &TypeRegistry, config: &WhitelistConfig, number: u64) -> Self {
        let mut generation = Self {
            number,
            mode: config.mode,
            ..Self::default()
        };

        let builtin: Vec<&str> = match config.mode {
            WhitelistMode::Append => BUILTIN_WHITELIST.lines().collect(),
            WhitelistMode::Replace => Vec::new(),
        };
        let lines = builtin
            .into_iter()
            .chain(config.list.iter().map(String::as_str));

        for line in lines {
            match Declaration::parse(line, types) {
                Ok(Some(declaration)) => generation.grant(types, declaration),
                Ok(None) => {}
                Err(err) => warn!("ignoring EL whitelist declaration [{}]: {}", line.trim(), err),
            }
        }

        info!(
            "loaded EL whitelist generation {} (mode {}, {} methods, {} constructors)",
            generation.number,
            generation.mode,
            generation.method_count(),
            generation.constructors.len()
        );
        generation
    }

    fn grant(&mut self, types: &TypeRegistry, declaration: Declaration) {
        match declaration {
            Declaration::Class(name) => {
                let Some(descriptor) = types.get(&name) else {
                    return;
                };
                self.methods
                    .entry(name)
                    .or_default()
                    .extend(descriptor.methods.iter().map(|m| m.signature.clone()));
                self.constructors
                    .extend(descriptor.constructors.iter().map(|c| c.signature.clone()));
            }
            Declaration::Method(signature) => {
                self.methods
                    .entry(signature.declaring_type.clone())
                    .or_default()
                    .insert(signature);
            }
            Declaration::Constructor(signature) => {
                self.constructors.insert(signature);
            }
        }
    }

    fn method_count(&self) -> usize {
        self.methods.values().map(HashSet::len).sum()
    }

    fn effective(&self, types: &TypeRegistry, type_name: &str) -> Arc<HashSet<MethodSignature>> {
        if let Some(found) = self.effective.get(type_name) {
            return Arc::clone(&found);
        }

        // Union over the linearized hierarchy equals
        // declared(T) ∪ effective(super) ∪ effective(interfaces).
        let methods: HashSet<MethodSignature> = types
            .linearize(type_name)
            .into_iter()
            .filter_map(|ty| self.methods.get(ty))
            .flat_map(|granted| granted.iter().cloned())
            .collect();
        let methods = Arc::new(methods);
        self.effective
            .insert(type_name.to_string(), Arc::clone(&methods));
        methods
    }
}

/// Process-wide allow-list of invocable methods and constructors
#[derive(Debug)]
pub struct WhitelistRegistry {
    types: Arc<TypeRegistry>,
    current: RwLock<Arc<Generation>>,
    generations: AtomicU64,
}

impl WhitelistRegistry {
    pub fn new(types: Arc<TypeRegistry>, config: &WhitelistConfig) -> Self {
        let generation = Generation::load(&types, config, 1);
        Self {
            types,
            current: RwLock::new(Arc::new(generation)),
            generations: AtomicU64::new(1),
        }
    }

    /// Built-in catalog with the built-in declarations only
    pub fn builtin() -> Self {
        Self::new(Arc::new(TypeRegistry::with_builtins()), &WhitelistConfig::default())
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Shared handle to the catalog
    pub fn types_arc(&self) -> Arc<TypeRegistry> {
        Arc::clone(&self.types)
    }

    /// Load `config` into a fresh generation and make it current
    pub fn reinit(&self, config: &WhitelistConfig) {
        let number = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::new(Generation::load(&self.types, config, number));
        *self.current.write() = generation;
    }

    fn snapshot(&self) -> Arc<Generation> {
        Arc::clone(&self.current.read())
    }

    /// Number of the current generation, starting at 1
    pub fn generation(&self) -> u64 {
        self.snapshot().number
    }

    pub fn mode(&self) -> WhitelistMode {
        self.snapshot().mode
    }

    pub fn method_count(&self) -> usize {
        self.snapshot().method_count()
    }

    pub fn constructor_count(&self) -> usize {
        self.snapshot().constructors.len()
    }

    /// Methods callable on values of `type_name`, own grants and inherited ones
    pub fn effective_methods(&self, type_name: &str) -> Arc<HashSet<MethodSignature>> {
        self.snapshot().effective(&self.types, type_name)
    }

    /// Whether `signature` may be called on a receiver of `type_name`
    pub fn is_method_allowed(&self, type_name: &str, signature: &MethodSignature) -> bool {
        let allowed = self
            .effective_methods(type_name)
            .iter()
            .any(|granted| granted.overrides(signature));
        if !allowed {
            debug!("whitelist denies {} on {}", signature, type_name);
        }
        allowed
    }

    pub fn is_constructor_allowed(&self, signature: &ConstructorSignature) -> bool {
        self.snapshot().constructors.contains(signature)
    }
}
