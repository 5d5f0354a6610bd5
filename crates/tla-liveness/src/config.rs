//! Liveness checker configuration
//!
//! Options can be set in code (`LivenessConfig::default()` plus field
//! updates), loaded through serde, or parsed from TLC-style `.cfg` text:
//!
//! ```text
//! \* liveness options
//! LIVENESS_CHECK PERIODIC      \* or FINAL
//! LIVENESS_INTERVAL 1000       (* feed events between SCC scans *)
//! STUTTERING FALSE
//! MAX_STATES 1000000
//! FEED_BATCH 256
//! WORKERS PARALLEL             \* or SEQUENTIAL
//! ```
//!
//! Directives may also put their value on the following line.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// When the bad-cycle detector runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LivenessCheckMode {
    /// Scan every `scan_interval` feed events, and once more at the end.
    /// Violations are reported as soon as a scan finds them.
    Periodic,
    /// Scan once, after exploration has finished.
    Final,
}

impl fmt::Display for LivenessCheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LivenessCheckMode::Periodic => write!(f, "PERIODIC"),
            LivenessCheckMode::Final => write!(f, "FINAL"),
        }
    }
}

/// Configuration for one checking run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    /// When to look for violating SCCs
    pub check_mode: LivenessCheckMode,
    /// Feed events consumed between two scans in periodic mode (at least 1)
    pub scan_interval: usize,
    /// Whether every state may stutter (gets a self-loop)
    pub stuttering: bool,
    /// Stop exploring after this many distinct states. A run that hits the
    /// limit can still report a violation, never `Satisfied`.
    pub max_states: Option<usize>,
    /// Number of explored states the explorer publishes at once
    pub feed_batch: usize,
    /// Run one worker thread per property (otherwise the caller's thread
    /// checks properties one after another)
    pub parallel: bool,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            check_mode: LivenessCheckMode::Periodic,
            scan_interval: 1024,
            stuttering: false,
            max_states: None,
            feed_batch: 256,
            parallel: true,
        }
    }
}

/// Configuration parse error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

impl ConfigError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Directive awaiting its value on a following line
#[derive(Debug, Clone, Copy, PartialEq)]
enum Pending {
    None,
    CheckMode(usize),
    Interval(usize),
    Stuttering(usize),
    MaxStates(usize),
    FeedBatch(usize),
    Workers(usize),
}

const DIRECTIVES: [&str; 6] = [
    "LIVENESS_CHECK",
    "LIVENESS_INTERVAL",
    "STUTTERING",
    "MAX_STATES",
    "FEED_BATCH",
    "WORKERS",
];

impl LivenessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `.cfg`-style text. Unset options keep their defaults.
    pub fn parse(input: &str) -> Result<LivenessConfig, Vec<ConfigError>> {
        let mut config = LivenessConfig::new();
        let mut errors = Vec::new();
        let mut pending = Pending::None;

        for (line_num, raw_line) in input.lines().enumerate() {
            let line_num = line_num + 1;

            let line_without_comment = match raw_line.find("\\*") {
                Some(pos) => &raw_line[..pos],
                None => raw_line,
            };
            let stripped = strip_block_comments(line_without_comment);
            let line = stripped.trim();
            if line.is_empty() {
                continue;
            }

            let keyword = line.split_whitespace().next().unwrap_or("");
            let is_directive = DIRECTIVES.contains(&keyword);

            if !is_directive {
                let result = match pending {
                    Pending::None => Err(ConfigError::new(
                        line_num,
                        format!("Unknown directive: {}", line),
                    )),
                    Pending::CheckMode(_) => apply_check_mode(&mut config, line, line_num),
                    Pending::Interval(_) => parse_count(line, line_num, "LIVENESS_INTERVAL")
                        .map(|n| config.scan_interval = n),
                    Pending::Stuttering(_) => {
                        parse_flag(line, line_num, "STUTTERING").map(|b| config.stuttering = b)
                    }
                    Pending::MaxStates(_) => parse_count(line, line_num, "MAX_STATES")
                        .map(|n| config.max_states = Some(n)),
                    Pending::FeedBatch(_) => parse_count(line, line_num, "FEED_BATCH")
                        .map(|n| config.feed_batch = n),
                    Pending::Workers(_) => apply_workers(&mut config, line, line_num),
                };
                if let Err(e) = result {
                    errors.push(e);
                }
                pending = Pending::None;
                continue;
            }

            if let Some(line) = pending_line(pending) {
                errors.push(ConfigError::new(line, "directive requires a value"));
            }
            pending = Pending::None;

            let rest = line[keyword.len()..].trim();
            if rest.is_empty() {
                pending = match keyword {
                    "LIVENESS_CHECK" => Pending::CheckMode(line_num),
                    "LIVENESS_INTERVAL" => Pending::Interval(line_num),
                    "STUTTERING" => Pending::Stuttering(line_num),
                    "MAX_STATES" => Pending::MaxStates(line_num),
                    "FEED_BATCH" => Pending::FeedBatch(line_num),
                    _ => Pending::Workers(line_num),
                };
                continue;
            }

            let result = match keyword {
                "LIVENESS_CHECK" => apply_check_mode(&mut config, rest, line_num),
                "LIVENESS_INTERVAL" => {
                    parse_count(rest, line_num, keyword).map(|n| config.scan_interval = n)
                }
                "STUTTERING" => parse_flag(rest, line_num, keyword).map(|b| config.stuttering = b),
                "MAX_STATES" => {
                    parse_count(rest, line_num, keyword).map(|n| config.max_states = Some(n))
                }
                "FEED_BATCH" => parse_count(rest, line_num, keyword).map(|n| config.feed_batch = n),
                _ => apply_workers(&mut config, rest, line_num),
            };
            if let Err(e) = result {
                errors.push(e);
            }
        }

        if let Some(line) = pending_line(pending) {
            errors.push(ConfigError::new(line, "directive requires a value"));
        }

        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }

    /// Write the configuration in `.cfg` form
    pub fn to_cfg_string(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("LIVENESS_CHECK {}\n", self.check_mode));
        out.push_str(&format!("LIVENESS_INTERVAL {}\n", self.scan_interval));
        out.push_str(&format!(
            "STUTTERING {}\n",
            if self.stuttering { "TRUE" } else { "FALSE" }
        ));
        if let Some(max) = self.max_states {
            out.push_str(&format!("MAX_STATES {}\n", max));
        }
        out.push_str(&format!("FEED_BATCH {}\n", self.feed_batch));
        out.push_str(&format!(
            "WORKERS {}\n",
            if self.parallel { "PARALLEL" } else { "SEQUENTIAL" }
        ));
        out
    }

    /// Feed events between scans, or `None` when scanning only at the end
    pub(crate) fn scan_every(&self) -> Option<usize> {
        match self.check_mode {
            LivenessCheckMode::Periodic => Some(self.scan_interval.max(1)),
            LivenessCheckMode::Final => None,
        }
    }
}

fn pending_line(pending: Pending) -> Option<usize> {
    match pending {
        Pending::None => None,
        Pending::CheckMode(l)
        | Pending::Interval(l)
        | Pending::Stuttering(l)
        | Pending::MaxStates(l)
        | Pending::FeedBatch(l)
        | Pending::Workers(l) => Some(l),
    }
}

fn apply_check_mode(
    config: &mut LivenessConfig,
    value: &str,
    line_num: usize,
) -> Result<(), ConfigError> {
    config.check_mode = match value.to_uppercase().as_str() {
        "PERIODIC" | "DEFAULT" => LivenessCheckMode::Periodic,
        "FINAL" => LivenessCheckMode::Final,
        other => {
            return Err(ConfigError::new(
                line_num,
                format!("LIVENESS_CHECK expects PERIODIC or FINAL, got {}", other),
            ))
        }
    };
    Ok(())
}

fn apply_workers(
    config: &mut LivenessConfig,
    value: &str,
    line_num: usize,
) -> Result<(), ConfigError> {
    config.parallel = match value.to_uppercase().as_str() {
        "PARALLEL" => true,
        "SEQUENTIAL" => false,
        other => {
            return Err(ConfigError::new(
                line_num,
                format!("WORKERS expects PARALLEL or SEQUENTIAL, got {}", other),
            ))
        }
    };
    Ok(())
}

fn parse_flag(value: &str, line_num: usize, directive: &str) -> Result<bool, ConfigError> {
    match value.to_uppercase().as_str() {
        "TRUE" | "ON" | "YES" => Ok(true),
        "FALSE" | "OFF" | "NO" => Ok(false),
        other => Err(ConfigError::new(
            line_num,
            format!("{} expects TRUE or FALSE, got {}", directive, other),
        )),
    }
}

fn parse_count(value: &str, line_num: usize, directive: &str) -> Result<usize, ConfigError> {
    match value.replace('_', "").parse::<usize>() {
        Ok(0) => Err(ConfigError::new(
            line_num,
            format!("{} must be positive", directive),
        )),
        Ok(n) => Ok(n),
        Err(_) => Err(ConfigError::new(
            line_num,
            format!("{} expects a number, got {}", directive, value),
        )),
    }
}

/// Strip TLA+ block comments (* ... *) from a line. Nested comments are not
/// supported.
fn strip_block_comments(line: &str) -> String {
    let mut result = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    let mut in_comment = false;

    while let Some(c) = chars.next() {
        if in_comment {
            if c == '*' && chars.peek() == Some(&')') {
                chars.next();
                in_comment = false;
            }
        } else if c == '(' && chars.peek() == Some(&'*') {
            chars.next();
            in_comment = true;
        } else {
            result.push(c);
        }
    }

    result
}
