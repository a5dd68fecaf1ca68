//! Dependency scanner.
//!
//! Finds the files a TypeScript source pulls in without parsing it:
//! `/// <reference path>` directives and module specifiers of
//! `import`/`export ... from`/`require(...)`. Comments and string literals
//! are skipped, so commented-out imports are not reported.

use regex_lite::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// How a dependency was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// `/// <reference path="..." />`: a file path, resolved as written.
    Path,
    /// `import ... from "..."`, `import "..."`, `import("...")`.
    Import,
    /// `export ... from "..."`.
    Export,
    /// `require("...")`, including `import x = require("...")`.
    Require,
}

impl ReferenceKind {
    /// Whether the specifier is a module specifier (extension optional)
    /// rather than a literal file path.
    #[must_use]
    pub fn is_module(&self) -> bool {
        !matches!(self, Self::Path)
    }
}

/// A dependency found in source code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Specifier exactly as written.
    pub specifier: String,
    pub kind: ReferenceKind,
    /// Line number (1-indexed).
    pub line: u32,
}

fn reference_directive() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^///\s*<reference\s+path\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("valid reference regex")
    })
}

/// Scan source code for dependencies.
///
/// Returns references in first-appearance order. Path references and module
/// specifiers are deduplicated separately.
#[must_use]
pub fn scan_references(source: &str) -> Vec<Reference> {
    let mut scanner = Scanner {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
    };
    let mut results = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |specifier: String, kind: ReferenceKind, line: u32| {
        if !specifier.is_empty() && seen.insert((kind.is_module(), specifier.clone())) {
            results.push(Reference {
                specifier,
                kind,
                line,
            });
        }
    };

    while let Some(c) = scanner.peek() {
        match c {
            '\n' => {
                scanner.line += 1;
                scanner.pos += 1;
            }
            '/' if scanner.peek_at(1) == Some('/') => {
                let line = scanner.line;
                let comment = scanner.take_line();
                if let Some(caps) = reference_directive().captures(&comment) {
                    let path = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
                    push(path.trim().to_string(), ReferenceKind::Path, line);
                }
            }
            '/' if scanner.peek_at(1) == Some('*') => scanner.skip_block_comment(),
            '"' | '\'' | '`' => {
                scanner.read_string();
            }
            _ if scanner.at_keyword("import") => {
                scanner.pos += "import".len();
                let line = scanner.line;
                if let Some((spec, kind)) = scanner.scan_import() {
                    push(spec, kind, line);
                }
            }
            _ if scanner.at_keyword("export") => {
                scanner.pos += "export".len();
                let line = scanner.line;
                if let Some(spec) = scanner.scan_export_from() {
                    push(spec, ReferenceKind::Export, line);
                }
            }
            _ if scanner.at_keyword("require") => {
                scanner.pos += "require".len();
                let line = scanner.line;
                if let Some(spec) = scanner.scan_call() {
                    push(spec, ReferenceKind::Require, line);
                }
            }
            _ => scanner.pos += 1,
        }
    }

    results
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: u32,
}

impl Scanner {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn is_ident(c: char) -> bool {
        c.is_alphanumeric() || c == '_' || c == '$'
    }

    /// Keyword at the cursor, on word boundaries. A preceding `.` rules out
    /// member access such as `foo.import`.
    fn at_keyword(&self, keyword: &str) -> bool {
        if self.pos > 0 {
            let prev = self.chars[self.pos - 1];
            if Self::is_ident(prev) || prev == '.' {
                return false;
            }
        }
        let end = self.pos + keyword.chars().count();
        if end > self.chars.len() {
            return false;
        }
        if !self.chars[self.pos..end].iter().copied().eq(keyword.chars()) {
            return false;
        }
        !self.chars.get(end).is_some_and(|&c| Self::is_ident(c))
    }

    /// Consume up to (not including) the next newline.
    fn take_line(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(|c| c != '\n') {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while let Some(c) = self.peek() {
            if c == '*' && self.peek_at(1) == Some('/') {
                self.pos += 2;
                return;
            }
            if c == '\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            if c == '\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
    }

    /// Read a quoted literal starting at the cursor and return its contents.
    fn read_string(&mut self) -> Option<String> {
        let quote = self.peek()?;
        self.pos += 1;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let value = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                return Some(value);
            }
            if c == '\\' {
                self.pos += 2;
                continue;
            }
            if c == '\n' {
                if quote != '`' {
                    return None;
                }
                self.line += 1;
            }
            self.pos += 1;
        }
        None
    }

    fn at_quote(&self) -> bool {
        matches!(self.peek(), Some('"' | '\'' | '`'))
    }

    /// `("spec")` after `require` or a dynamic `import`.
    fn scan_call(&mut self) -> Option<String> {
        self.skip_whitespace();
        if self.peek() != Some('(') {
            return None;
        }
        self.pos += 1;
        self.skip_whitespace();
        if !self.at_quote() {
            return None;
        }
        let spec = self.read_string()?;
        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.pos += 1;
        }
        Some(spec)
    }

    /// Everything an `import` keyword can introduce.
    fn scan_import(&mut self) -> Option<(String, ReferenceKind)> {
        self.skip_whitespace();
        if self.peek() == Some('(') {
            return self.scan_call().map(|s| (s, ReferenceKind::Import));
        }
        if self.at_quote() {
            return self.read_string().map(|s| (s, ReferenceKind::Import));
        }

        let limit = self.pos + 1000;
        while let Some(c) = self.peek() {
            if c == ';' || self.pos > limit {
                return None;
            }
            if self.at_keyword("from") {
                self.pos += "from".len();
                self.skip_whitespace();
                return self.read_string().map(|s| (s, ReferenceKind::Import));
            }
            if self.at_keyword("require") {
                self.pos += "require".len();
                return self.scan_call().map(|s| (s, ReferenceKind::Require));
            }
            if c == '\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
        None
    }

    /// `export ... from "spec"`. Plain exports yield nothing.
    fn scan_export_from(&mut self) -> Option<String> {
        let start = self.pos;
        let start_line = self.line;
        let limit = self.pos + 500;
        let mut depth = 0u32;
        while let Some(c) = self.peek() {
            if matches!(c, ';' | '=' | '(') || self.pos > limit {
                break;
            }
            match c {
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                '\n' if depth == 0 => break,
                _ => {}
            }
            if self.at_keyword("from") {
                self.pos += "from".len();
                self.skip_whitespace();
                if self.at_quote() {
                    return self.read_string();
                }
                break;
            }
            if c == '\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
        // Not a re-export: rescan the statement body normally.
        self.pos = start;
        self.line = start_line;
        None
    }
}
