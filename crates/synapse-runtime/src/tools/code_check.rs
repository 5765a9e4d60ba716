//! Static syntax sanity check.
//!
//! Nothing is executed. JSON gets a full parse; other languages get a
//! bracket and string-literal balance scan that skips comments.

use super::{ToolContext, ToolOutput};
use crate::args::RunCodeArgs;
use synapse_types::error::{SynapseError, SynapseResult};

const MAX_ISSUES: usize = 20;

/// Languages the checker distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Json,
    JavaScript,
    TypeScript,
    Rust,
    Python,
    CLike,
    Css,
    Plain,
}

struct Rules {
    line_comment: Option<&'static str>,
    block_comment: Option<(&'static str, &'static str)>,
    /// Quotes whose literals end at the line break.
    quotes: &'static [char],
    /// Quotes whose literals may span lines.
    multiline_quotes: &'static [char],
    triple_quotes: bool,
    /// `'x'` is a char literal, any other `'` a lifetime or label.
    char_literals: bool,
}

impl Language {
    /// Parse a language name as given by the caller.
    pub fn from_name(name: &str) -> Option<Self> {
        let lang = match name.trim().to_lowercase().as_str() {
            "json" => Language::Json,
            "javascript" | "js" | "jsx" | "node" => Language::JavaScript,
            "typescript" | "ts" | "tsx" => Language::TypeScript,
            "rust" | "rs" => Language::Rust,
            "python" | "py" => Language::Python,
            "c" | "cpp" | "c++" | "java" | "go" | "csharp" | "c#" | "kotlin" | "swift" => {
                Language::CLike
            }
            "css" | "scss" => Language::Css,
            "text" | "plain" | "txt" => Language::Plain,
            _ => return None,
        };
        Some(lang)
    }

    /// Infer from a file extension; unknown extensions are `Plain`.
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "json" => Language::Json,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" => Language::TypeScript,
            "rs" => Language::Rust,
            "py" => Language::Python,
            "c" | "h" | "cc" | "cpp" | "hpp" | "java" | "go" | "cs" | "kt" | "swift" => {
                Language::CLike
            }
            "css" | "scss" => Language::Css,
            _ => Language::Plain,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Json => "json",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Rust => "rust",
            Language::Python => "python",
            Language::CLike => "c-like",
            Language::Css => "css",
            Language::Plain => "plain text",
        }
    }

    fn rules(&self) -> Rules {
        match self {
            Language::JavaScript | Language::TypeScript => Rules {
                line_comment: Some("//"),
                block_comment: Some(("/*", "*/")),
                quotes: &['"', '\''],
                multiline_quotes: &['`'],
                triple_quotes: false,
                char_literals: false,
            },
            Language::Rust => Rules {
                line_comment: Some("//"),
                block_comment: Some(("/*", "*/")),
                quotes: &[],
                multiline_quotes: &['"'],
                triple_quotes: false,
                char_literals: true,
            },
            Language::Python => Rules {
                line_comment: Some("#"),
                block_comment: None,
                quotes: &['"', '\''],
                multiline_quotes: &[],
                triple_quotes: true,
                char_literals: false,
            },
            Language::CLike => Rules {
                line_comment: Some("//"),
                block_comment: Some(("/*", "*/")),
                quotes: &['"', '\''],
                multiline_quotes: &[],
                triple_quotes: false,
                char_literals: false,
            },
            Language::Css => Rules {
                line_comment: None,
                block_comment: Some(("/*", "*/")),
                quotes: &['"', '\''],
                multiline_quotes: &[],
                triple_quotes: false,
                char_literals: false,
            },
            Language::Json | Language::Plain => Rules {
                line_comment: None,
                block_comment: None,
                quotes: &['"'],
                multiline_quotes: &[],
                triple_quotes: false,
                char_literals: false,
            },
        }
    }
}

/// Result of a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub language: Language,
    pub lines: usize,
    pub issues: Vec<String>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }
}

impl std::fmt::Display for CheckReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_ok() {
            return write!(
                f,
                "OK: no syntax problems found ({}, {} lines).",
                self.language.as_str(),
                self.lines
            );
        }
        write!(
            f,
            "Found {} problem(s) ({}):",
            self.issues.len(),
            self.language.as_str()
        )?;
        for issue in &self.issues {
            write!(f, "\n- {issue}")?;
        }
        Ok(())
    }
}

/// Check `code` as `language`.
pub fn check(code: &str, language: Language) -> CheckReport {
    let lines = code.lines().count();
    let issues = match language {
        Language::Json => check_json(code),
        other => scan(code, &other.rules()),
    };
    CheckReport {
        language,
        lines,
        issues,
    }
}

fn check_json(code: &str) -> Vec<String> {
    match serde_json::from_str::<serde_json::Value>(code) {
        Ok(_) => Vec::new(),
        Err(e) => vec![format!("line {}, col {}: {e}", e.line(), e.column())],
    }
}

fn position(chars: &[char], idx: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for c in &chars[..idx.min(chars.len())] {
        if *c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

fn starts_with_at(chars: &[char], idx: usize, pat: &str) -> bool {
    let mut i = idx;
    for p in pat.chars() {
        if chars.get(i) != Some(&p) {
            return false;
        }
        i += 1;
    }
    true
}

fn closer(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Length of the char literal starting at `idx` (`'x'`, `'\n'`,
/// `'\u{1F600}'`), or `None` for a lifetime.
fn char_literal_len(chars: &[char], idx: usize) -> Option<usize> {
    match chars.get(idx + 1)? {
        '\\' => {
            // The escaped char itself may be a quote.
            let close = chars
                .get(idx + 3..)?
                .iter()
                .take(10)
                .take_while(|c| **c != '\n')
                .position(|c| *c == '\'')?;
            Some(close + 4)
        }
        '\n' => None,
        _ if chars.get(idx + 2) == Some(&'\'') => Some(3),
        _ => None,
    }
}

fn scan(code: &str, rules: &Rules) -> Vec<String> {
    let chars: Vec<char> = code.chars().collect();
    let mut issues = Vec::new();
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut i = 0;

    while i < chars.len() && issues.len() < MAX_ISSUES {
        let c = chars[i];

        if let Some(marker) = rules.line_comment {
            if starts_with_at(&chars, i, marker) {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
        }
        if let Some((open, close)) = rules.block_comment {
            if starts_with_at(&chars, i, open) {
                let start = i;
                i += open.chars().count();
                while i < chars.len() && !starts_with_at(&chars, i, close) {
                    i += 1;
                }
                if i >= chars.len() {
                    let (l, col) = position(&chars, start);
                    issues.push(format!("line {l}, col {col}: unterminated block comment"));
                    break;
                }
                i += close.chars().count();
                continue;
            }
        }

        if rules.char_literals && c == '\'' {
            i += char_literal_len(&chars, i).unwrap_or(1);
            continue;
        }

        let single_line = rules.quotes.contains(&c);
        if single_line || rules.multiline_quotes.contains(&c) {
            let start = i;
            let triple: String = std::iter::repeat(c).take(3).collect();
            if rules.triple_quotes && starts_with_at(&chars, i, &triple) {
                i += 3;
                while i < chars.len() && !starts_with_at(&chars, i, &triple) {
                    i += if chars[i] == '\\' { 2 } else { 1 };
                }
                if i >= chars.len() {
                    let (l, col) = position(&chars, start);
                    issues.push(format!("line {l}, col {col}: unterminated triple-quoted string"));
                    break;
                }
                i += 3;
                continue;
            }

            i += 1;
            let mut closed = false;
            while i < chars.len() {
                match chars[i] {
                    '\\' => i += 2,
                    '\n' if single_line => break,
                    q if q == c => {
                        closed = true;
                        i += 1;
                        break;
                    }
                    _ => i += 1,
                }
            }
            if !closed {
                let (l, col) = position(&chars, start);
                issues.push(format!("line {l}, col {col}: unterminated string literal ({c})"));
            }
            continue;
        }

        match c {
            '(' | '[' | '{' => stack.push((c, i)),
            ')' | ']' | '}' => match stack.pop() {
                Some((open, _)) if closer(open) == c => {}
                Some((open, at)) => {
                    let (l, col) = position(&chars, i);
                    let (ol, _) = position(&chars, at);
                    issues.push(format!(
                        "line {l}, col {col}: expected '{}' to close '{open}' from line {ol}, found '{c}'",
                        closer(open)
                    ));
                }
                None => {
                    let (l, col) = position(&chars, i);
                    issues.push(format!("line {l}, col {col}: unmatched '{c}'"));
                }
            },
            _ => {}
        }
        i += 1;
    }

    for (open, at) in stack.into_iter().rev() {
        if issues.len() >= MAX_ISSUES {
            break;
        }
        let (l, col) = position(&chars, at);
        issues.push(format!("line {l}, col {col}: unclosed '{open}'"));
    }
    issues
}

/// `run_code` tool: check a code string without running it.
pub fn run_code(_ctx: &ToolContext, args: RunCodeArgs) -> SynapseResult<ToolOutput> {
    let language = match args.language.as_deref() {
        Some(name) => Language::from_name(name).ok_or_else(|| {
            SynapseError::InvalidInput(format!("run_code: unsupported language '{name}'"))
        })?,
        None => Language::Plain,
    };
    let report = check(&args.code, language);
    Ok(ToolOutput::text(format!(
        "Static check only; the code was not executed.\n{report}"
    )))
}
