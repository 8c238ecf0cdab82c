// Language toolchain configuration for the process runner
use anyhow::{bail, Context, Result};
use codegrade_common::config::ENV_PREFIX;
use codegrade_common::types::Language;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    fn new(command: &str, args: &[&str]) -> Self {
        Self {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub name: String,
    /// File the harness entry point is written to inside the workspace
    pub source_file: String,
    #[serde(default)]
    pub compile: Option<CommandSpec>,
    /// `None` for languages executed remotely
    #[serde(default)]
    pub run: Option<CommandSpec>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LanguagesJson {
    languages: Vec<LanguageConfig>,
}

/// Language configuration manager
#[derive(Debug, Clone)]
pub struct LanguageConfigManager {
    configs: HashMap<Language, LanguageConfig>,
}

impl LanguageConfigManager {
    /// Built-in toolchain defaults for every supported language
    pub fn builtin() -> Self {
        let mut configs = HashMap::new();
        for language in Language::ALL {
            configs.insert(language, builtin_config(language));
        }
        Self { configs }
    }

    /// Load a languages.json file on top of the built-in defaults
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Language config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let languages_json: LanguagesJson = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        let mut manager = Self::builtin();
        for lang in languages_json.languages {
            let language: Language = lang
                .name
                .parse()
                .with_context(|| format!("Unknown language '{}' in {}", lang.name, config_path.display()))?;
            manager.configs.insert(language, lang);
        }

        Ok(manager)
    }

    /// Built-ins, then the languages file if present, then environment overrides
    pub fn load_default() -> Result<Self> {
        let path = std::env::var(format!("{}_LANGUAGES_FILE", ENV_PREFIX))
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/languages.json"));

        let mut manager = if path.exists() {
            Self::load(&path)?
        } else {
            Self::builtin()
        };
        manager.apply_overrides(|key| std::env::var(key).ok());
        Ok(manager)
    }

    /// Replace compiler/interpreter binaries from `CODEGRADE_<LANG>_{RUN,COMPILE}_COMMAND`.
    /// Arguments are kept; only the binary name changes between hosts.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (language, config) in self.configs.iter_mut() {
            let upper = language.as_str().to_ascii_uppercase();
            if let Some(run) = config.run.as_mut() {
                if let Some(command) = lookup(&format!("{}_{}_RUN_COMMAND", ENV_PREFIX, upper)) {
                    run.command = command;
                }
            }
            if let Some(compile) = config.compile.as_mut() {
                if let Some(command) = lookup(&format!("{}_{}_COMPILE_COMMAND", ENV_PREFIX, upper)) {
                    compile.command = command;
                }
            }
        }
    }

    /// Get configuration for a specific language
    pub fn get_config(&self, language: &Language) -> Result<&LanguageConfig> {
        self.configs
            .get(language)
            .ok_or_else(|| anyhow::anyhow!("No configuration found for language: {}", language))
    }

    pub fn set(&mut self, language: Language, config: LanguageConfig) {
        self.configs.insert(language, config);
    }

    /// List all configured languages
    pub fn list_languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self.configs.keys().copied().collect();
        languages.sort();
        languages
    }
}

fn builtin_config(language: Language) -> LanguageConfig {
    let (source_file, compile, run) = match language {
        Language::Python => ("solution.py", None, Some(CommandSpec::new("python3", &["solution.py"]))),
        Language::Java => (
            "Main.java",
            Some(CommandSpec::new("javac", &["-encoding", "UTF-8", "Main.java"])),
            Some(CommandSpec::new("java", &["-Xmx256m", "-Xss64m", "-cp", ".", "Main"])),
        ),
        Language::JavaScript => ("solution.js", None, Some(CommandSpec::new("node", &["solution.js"]))),
        Language::Cpp => (
            "main.cpp",
            Some(CommandSpec::new("g++", &["-std=c++17", "-O2", "-o", "main", "main.cpp"])),
            Some(CommandSpec::new("./main", &[])),
        ),
        Language::Apex => ("anonymous.apex", None, None),
    };

    LanguageConfig {
        name: language.to_string(),
        source_file: source_file.to_string(),
        compile,
        run,
    }
}
