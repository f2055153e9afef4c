use remote_runner::Dialect;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use which::which;

use crate::{error::Error, types::Language};

const BUILTIN_TOOLCHAINS: &str = include_str!("toolchains.toml");
/// Set by the sandbox for every child
const RESERVED_ENV: &[&str] = &["PATH", "HOME", "LANG"];

/// How to build and run one language locally
#[derive(Debug, Clone, Deserialize)]
pub struct ToolchainDescriptor {
    /// Source file extension, without the dot
    pub extension: String,
    #[serde(default)]
    pub compile: Option<Vec<String>>,
    pub run: Vec<String>,
    /// Paths the compile step may create
    #[serde(default)]
    pub artifacts: Vec<String>,
    /// Extra environment for both steps, values templated like commands
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Language mapping for the primary remote provider
    #[serde(default)]
    pub primary: Option<Dialect>,
}

/// Concrete values substituted into command templates
#[derive(Debug, Clone)]
pub struct TemplateContext {
    pub id: String,
    pub dir: PathBuf,
    pub source: PathBuf,
    pub binary: PathBuf,
    /// Per-request home and working directory
    pub home: PathBuf,
}

impl TemplateContext {
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{source}", &self.source.to_string_lossy())
            .replace("{binary}", &self.binary.to_string_lossy())
            .replace("{dir}", &self.dir.to_string_lossy())
            .replace("{home}", &self.home.to_string_lossy())
            .replace("{id}", &self.id)
    }

    pub fn render_all(&self, templates: &[String]) -> Vec<String> {
        templates.iter().map(|t| self.render(t)).collect()
    }

    pub fn render_env(&self, env: &BTreeMap<String, String>) -> Vec<(String, String)> {
        env.iter()
            .map(|(key, value)| (key.clone(), self.render(value)))
            .collect()
    }
}

impl ToolchainDescriptor {
    pub fn is_compiled(&self) -> bool {
        self.compile.is_some()
    }

    /// Whether the run step starts a per-request file such as `{binary}`
    /// rather than a host tool
    pub fn runs_build_product(&self) -> bool {
        self.run.first().is_some_and(|program| program.contains('{'))
    }

    /// Host programs this toolchain needs; templated programs such as
    /// `{binary}` are produced per request and not listed.
    pub fn required_tools(&self) -> Vec<&str> {
        self.compile
            .iter()
            .chain(std::iter::once(&self.run))
            .filter_map(|argv| argv.first())
            .map(String::as_str)
            .filter(|program| !program.contains('{'))
            .collect()
    }

    pub fn missing_tools(&self) -> Vec<String> {
        self.required_tools()
            .into_iter()
            .filter(|tool| which(tool).is_err())
            .map(str::to_string)
            .collect()
    }

    pub fn is_available(&self) -> bool {
        self.missing_tools().is_empty()
    }

    fn validate(&self, name: &str) -> Result<(), Error> {
        if self.extension.is_empty() || self.extension.contains(['.', '/']) {
            return Err(Error::Registry(format!(
                "{}: extension must be a bare suffix, got {:?}",
                name, self.extension
            )));
        }
        if self.run.is_empty() {
            return Err(Error::Registry(format!("{}: run command is empty", name)));
        }
        if matches!(&self.compile, Some(argv) if argv.is_empty()) {
            return Err(Error::Registry(format!("{}: compile command is empty", name)));
        }
        if let Some(key) = self
            .env
            .keys()
            .find(|key| key.is_empty() || key.contains('=') || RESERVED_ENV.contains(&key.as_str()))
        {
            return Err(Error::Registry(format!(
                "{}: environment variable {:?} cannot be set",
                name, key
            )));
        }
        Ok(())
    }
}

/// Immutable language → toolchain table, built once at startup
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    toolchains: HashMap<Language, ToolchainDescriptor>,
}

impl LanguageRegistry {
    /// Registry backed by the toolchain table compiled into the crate
    pub fn builtin() -> Result<Self, Error> {
        Self::from_toml_str(BUILTIN_TOOLCHAINS)
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Registry(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, Error> {
        let table: HashMap<String, ToolchainDescriptor> =
            toml::from_str(contents).map_err(|e| Error::Registry(e.to_string()))?;

        let mut toolchains = HashMap::with_capacity(table.len());
        for (name, descriptor) in table {
            let language: Language = name.parse().map_err(Error::Registry)?;
            descriptor.validate(&name)?;
            if toolchains.insert(language, descriptor).is_some() {
                return Err(Error::Registry(format!(
                    "{} is configured more than once",
                    language
                )));
            }
        }

        Ok(Self { toolchains })
    }

    /// Resolves a user-supplied identifier, aliases included.
    pub fn resolve(&self, name: &str) -> Result<(Language, &ToolchainDescriptor), Error> {
        let language: Language = name
            .parse()
            .map_err(|_| Error::UnsupportedLanguage(name.to_string()))?;
        self.get(language)
            .map(|descriptor| (language, descriptor))
            .ok_or_else(|| Error::UnsupportedLanguage(name.to_string()))
    }

    pub fn get(&self, language: Language) -> Option<&ToolchainDescriptor> {
        self.toolchains.get(&language)
    }

    /// Configured languages in a stable order
    pub fn languages(&self) -> Vec<Language> {
        Language::ALL
            .into_iter()
            .filter(|language| self.toolchains.contains_key(language))
            .collect()
    }
}
