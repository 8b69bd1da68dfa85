//! Instant screen for destructive terminal commands. Runs before any external
//! call so safety-critical warnings never wait on the network.

use async_trait::async_trait;

use crate::error::GhostError;
use crate::models::{AnalysisResult, Channel, SuggestedIntervention};

use super::service::{AnalysisRequest, AnalysisService};

const ENABLE_LOGS: bool = true;
use crate::log_info;

const FORCE_PUSH: &str = "Force push, can overwrite remote history";

struct RiskyPattern {
    description: &'static str,
    matches: fn(line: &str, tokens: &[&str]) -> bool,
}

const PATTERNS: &[RiskyPattern] = &[
    RiskyPattern {
        description: "Destructive file deletion (rm -rf)",
        matches: |_, t| rm_with_force(t),
    },
    RiskyPattern {
        description: FORCE_PUSH,
        matches: |_, t| after(t, &["git", "push"]).is_some_and(|rest| rest.iter().any(|a| a.starts_with("--force"))),
    },
    RiskyPattern {
        description: FORCE_PUSH,
        matches: |_, t| next_after(t, &["git", "push"], |a| a == "-f"),
    },
    RiskyPattern {
        description: "Hard reset, discards all uncommitted changes",
        matches: |_, t| next_after(t, &["git", "reset"], |a| a.starts_with("--hard")),
    },
    RiskyPattern {
        description: "Database destructive command",
        matches: |_, t| {
            next_after(t, &["drop"], |a| matches!(a, "table" | "database" | "index"))
        },
    },
    RiskyPattern {
        description: "DELETE without WHERE clause, drops all rows",
        matches: |_, t| {
            after(t, &["delete", "from"]).is_some_and(|rest| {
                rest.len() == 1 && rest[0].chars().all(|c| c.is_alphanumeric() || c == '_')
            })
        },
    },
    RiskyPattern {
        description: "Table truncation, irrecoverable data loss",
        matches: |_, t| after(t, &["truncate", "table"]).is_some(),
    },
    RiskyPattern {
        description: "Overly permissive file permissions",
        matches: |_, t| next_after(t, &["chmod"], |a| a == "777"),
    },
    RiskyPattern {
        description: "Elevated destructive command",
        matches: |_, t| after(t, &["sudo", "rm"]).is_some(),
    },
    RiskyPattern {
        description: "Fork bomb detected",
        matches: |line, _| {
            let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
            compact.contains("(){:|:&")
        },
    },
    RiskyPattern {
        description: "Filesystem format command",
        matches: |_, t| {
            t.iter().any(|a| {
                a.strip_prefix("mkfs")
                    .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
            })
        },
    },
    RiskyPattern {
        description: "Raw disk write, potential data destruction",
        matches: |_, t| next_after(t, &["dd"], |a| a.starts_with("if=")),
    },
    RiskyPattern {
        description: "Publishing package, verify version and contents first",
        matches: |_, t| after(t, &["npm", "publish"]).is_some(),
    },
    RiskyPattern {
        description: "Production deployment",
        matches: |_, t| {
            t.windows(2).any(|pair| {
                pair[0].ends_with("deploy")
                    && ["prod", "main", "master"].iter().any(|target| pair[1].starts_with(target))
            })
        },
    },
    RiskyPattern {
        description: "Kubernetes resource deletion",
        matches: |_, t| after(t, &["kubectl", "delete"]).is_some(),
    },
    RiskyPattern {
        description: "Docker full prune, removes all unused data",
        matches: |_, t| next_after(t, &["docker", "system", "prune"], |a| a.starts_with("-a")),
    },
];

/// Tokens following the first occurrence of `seq`.
fn after<'a>(tokens: &'a [&'a str], seq: &[&str]) -> Option<&'a [&'a str]> {
    tokens
        .windows(seq.len())
        .position(|window| window == seq)
        .map(|start| &tokens[start + seq.len()..])
}

fn next_after(tokens: &[&str], seq: &[&str], pred: impl Fn(&str) -> bool) -> bool {
    after(tokens, seq)
        .and_then(|rest| rest.first())
        .is_some_and(|token| pred(token))
}

fn is_force_flag(token: &str) -> bool {
    token
        .strip_prefix('-')
        .is_some_and(|flags| !flags.is_empty() && flags.chars().all(|c| c.is_ascii_alphabetic()) && flags.contains('f'))
}

/// `rm` whose first argument is a flag bundle containing `f`, or with a
/// later `-rf` argument. Either needs an operand after the flag.
fn rm_with_force(tokens: &[&str]) -> bool {
    tokens.iter().enumerate().any(|(i, token)| {
        if *token != "rm" {
            return false;
        }
        let args = &tokens[i + 1..];
        let bundled = args.len() > 1 && is_force_flag(args[0]);
        let trailing = args.len() > 1 && args[..args.len() - 1].iter().any(|arg| arg.ends_with("-rf"));
        bundled || trailing
    })
}

fn tokenize(line: &str) -> Vec<&str> {
    line.split(|c: char| c.is_whitespace() || matches!(c, ';' | '&' | '|' | '`' | '(' | ')'))
        .filter(|token| !token.is_empty())
        .collect()
}

/// Description of the first destructive pattern found in `content`, if any.
/// Matching is case-insensitive and line by line.
pub fn detect_risky_command(content: &str) -> Option<&'static str> {
    let lowered = content.to_lowercase();
    for line in lowered.lines() {
        let tokens = tokenize(line);
        if let Some(pattern) = PATTERNS.iter().find(|p| (p.matches)(line, &tokens)) {
            return Some(pattern.description);
        }
    }
    None
}

pub fn risky_result(description: &str) -> AnalysisResult {
    AnalysisResult {
        app: Some(Channel::Terminal.as_str().to_string()),
        activity: Some("risky command detected".to_string()),
        risky_action: true,
        risky_description: Some(description.to_string()),
        suggested_intervention: Some(SuggestedIntervention {
            kind: Some("warning".to_string()),
            message: Some(format!("Risky command detected: {description}")),
            priority: Some("critical".to_string()),
            code_suggestion: None,
        }),
        context_summary: format!("User ran risky command: {description}"),
        ..Default::default()
    }
}

/// Wraps an analysis service and answers terminal content that matches a
/// destructive pattern without calling it.
pub struct RiskyCommandScreen<S> {
    inner: S,
}

impl<S> RiskyCommandScreen<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: AnalysisService> AnalysisService for RiskyCommandScreen<S> {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, GhostError> {
        if request.channel == Channel::Terminal {
            if let Some(description) = request.text.as_deref().and_then(detect_risky_command) {
                log_info!("[analysis] instant risky detection: {description}");
                return Ok(risky_result(description));
            }
        }
        self.inner.analyze(request).await
    }
}
