//! Static textual pre-check run before anything is spawned.
//!
//! This is a coarse filter only. It is trivially bypassed (string
//! concatenation, encodings, reflection) and it also rejects harmless code
//! that happens to contain a listed token in any language. Isolation comes
//! from the process limits in [`crate::sandbox`], never from this module.

use regex::{Regex, RegexSet};
use std::fmt;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCategory {
    FilesystemAccess,
    ProcessSpawn,
    EnvironmentIntrospection,
    DynamicEvaluation,
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuleCategory::FilesystemAccess => "filesystem access",
            RuleCategory::ProcessSpawn => "process spawning",
            RuleCategory::EnvironmentIntrospection => "environment introspection",
            RuleCategory::DynamicEvaluation => "dynamic evaluation",
        })
    }
}

struct Rule {
    name: &'static str,
    category: RuleCategory,
    pattern: &'static str,
}

const RULES: &[Rule] = &[
    // filesystem
    Rule {
        name: "open-call",
        category: RuleCategory::FilesystemAccess,
        pattern: r"\b(?:open|fopen|freopen)\s*\(",
    },
    Rule {
        name: "node-fs-module",
        category: RuleCategory::FilesystemAccess,
        pattern: r#"(?:require\s*\(\s*|from\s+|import\s+)['"](?:node:)?fs(?:/promises)?['"]"#,
    },
    Rule {
        name: "python-fs-modules",
        category: RuleCategory::FilesystemAccess,
        pattern: r"\b(?:shutil|pathlib|glob)\b",
    },
    Rule {
        name: "os-file-operations",
        category: RuleCategory::FilesystemAccess,
        pattern: r"\bos\.(?:remove|unlink|rmdir|removedirs|rename|listdir|scandir|walk|chmod|chown|mkdir|makedirs|Open|OpenFile|Create|ReadFile|WriteFile|Remove|RemoveAll|ReadDir|Mkdir|MkdirAll|Chmod)\b",
    },
    Rule {
        name: "go-ioutil",
        category: RuleCategory::FilesystemAccess,
        pattern: r"\bioutil\.",
    },
    Rule {
        name: "java-file-io",
        category: RuleCategory::FilesystemAccess,
        pattern: r"\bjava\.nio\.file\b|\bjava\.io\.File\b|\b(?:File|FileReader|FileWriter|FileInputStream|FileOutputStream|RandomAccessFile)\s*\(",
    },
    Rule {
        name: "cpp-file-streams",
        category: RuleCategory::FilesystemAccess,
        pattern: r"\b(?:fstream|ofstream|ifstream)\b|<filesystem>",
    },
    // process spawning
    Rule {
        name: "python-subprocess",
        category: RuleCategory::ProcessSpawn,
        pattern: r"\bsubprocess\b|\bpty\.spawn\b",
    },
    Rule {
        name: "os-process-calls",
        category: RuleCategory::ProcessSpawn,
        pattern: r"\bos\.(?:system|popen|spawn\w*|exec\w*|fork\w*|kill\w*|StartProcess)\b",
    },
    Rule {
        name: "node-child-process",
        category: RuleCategory::ProcessSpawn,
        pattern: r"\bchild_process\b|\bprocess\.(?:binding|dlopen|kill)\b",
    },
    Rule {
        name: "java-process",
        category: RuleCategory::ProcessSpawn,
        pattern: r"\bRuntime\.getRuntime\s*\(|\bProcessBuilder\b",
    },
    Rule {
        name: "libc-process-calls",
        category: RuleCategory::ProcessSpawn,
        pattern: r"\b(?:system|popen|fork|vfork|execl|execlp|execle|execv|execvp|execve|posix_spawn)\s*\(",
    },
    Rule {
        name: "go-exec-syscall",
        category: RuleCategory::ProcessSpawn,
        pattern: r#""os/exec"|\bsyscall\b"#,
    },
    // environment
    Rule {
        name: "env-lookup",
        category: RuleCategory::EnvironmentIntrospection,
        pattern: r"\bos\.(?:environ|getenv|putenv|Getenv|Setenv|Environ|LookupEnv)\b|\bSystem\.getenv\b|\bprocess\.env\b|\bgetenv\s*\(",
    },
    Rule {
        name: "c-environ",
        category: RuleCategory::EnvironmentIntrospection,
        pattern: r"\bextern\s+char\s*\*\s*\*\s*environ\b",
    },
    // dynamic evaluation
    Rule {
        name: "eval-exec",
        category: RuleCategory::DynamicEvaluation,
        pattern: r"\b(?:eval|exec)\s*\(",
    },
    Rule {
        name: "python-dynamic-import",
        category: RuleCategory::DynamicEvaluation,
        pattern: r"__import__|\bimportlib\b|\bctypes\b|\bcompile\s*\(",
    },
    Rule {
        name: "js-function-constructor",
        category: RuleCategory::DynamicEvaluation,
        pattern: r#"\bnew\s+Function\s*\(|(?:require\s*\(\s*|from\s+)['"](?:node:)?vm['"]"#,
    },
    Rule {
        name: "reflection-and-native-loading",
        category: RuleCategory::DynamicEvaluation,
        pattern: r"\bjava\.lang\.reflect\b|\bClass\.forName\s*\(|\bdlopen\s*\(",
    },
];

/// A rule that matched submitted code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenylistMatch {
    pub rule: &'static str,
    pub category: RuleCategory,
    /// The matched text
    pub excerpt: String,
}

impl fmt::Display for DenylistMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is not allowed (matched `{}`)", self.category, self.excerpt.trim())
    }
}

/// Compiled denylist, built once and shared read-only
pub struct DenylistScanner {
    set: RegexSet,
    patterns: Vec<Regex>,
}

impl DenylistScanner {
    pub fn new() -> Result<Self, Error> {
        let set = RegexSet::new(RULES.iter().map(|rule| rule.pattern))
            .map_err(|e| Error::System(format!("Invalid denylist: {}", e)))?;
        let patterns = RULES
            .iter()
            .map(|rule| Regex::new(rule.pattern))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::System(format!("Invalid denylist: {}", e)))?;

        Ok(Self { set, patterns })
    }

    /// Returns the first matching rule, if any
    pub fn scan(&self, code: &str) -> Option<DenylistMatch> {
        let index = self.set.matches(code).into_iter().next()?;
        let excerpt = self.patterns[index]
            .find(code)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        Some(DenylistMatch {
            rule: RULES[index].name,
            category: RULES[index].category,
            excerpt,
        })
    }

    /// Scans and converts a match into [`Error::RejectedUnsafeInput`]
    pub fn check(&self, code: &str) -> Result<(), Error> {
        match self.scan(code) {
            Some(hit) => Err(Error::RejectedUnsafeInput(hit.to_string())),
            None => Ok(()),
        }
    }
}
