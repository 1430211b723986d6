//! Install step templates.
//!
//! Steps reference the install prefix and a few build facts through
//! placeholders. Both the shell style (`$PREFIX`, `${PREFIX}`) and the
//! Homebrew style (`#{prefix}`) are expanded. Anything unrecognised is left
//! exactly as written so the shell sees it.

use std::path::PathBuf;

/// Values available to step templates. Also exported to each step's
/// environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vars {
    pub prefix: PathBuf,
    pub build_dir: PathBuf,
    pub nproc: usize,
    pub arch: String,
    pub name: String,
    pub version: String,
}

impl Vars {
    /// Look up an upper-case shell-style variable.
    pub fn shell_var(&self, key: &str) -> Option<String> {
        match key {
            "PREFIX" => Some(self.prefix.display().to_string()),
            "BUILD_DIR" => Some(self.build_dir.display().to_string()),
            "NPROC" => Some(self.nproc.to_string()),
            "ARCH" => Some(self.arch.clone()),
            "NAME" => Some(self.name.clone()),
            "VERSION" => Some(self.version.clone()),
            _ => None,
        }
    }

    /// Look up a lower-case `#{...}` interpolation.
    fn interpolation(&self, key: &str) -> Option<String> {
        match key {
            "prefix" => Some(self.prefix.display().to_string()),
            "buildpath" => Some(self.build_dir.display().to_string()),
            "name" => Some(self.name.clone()),
            "version" => Some(self.version.clone()),
            _ => None,
        }
    }

    /// Environment pairs handed to every step.
    pub fn env(&self) -> Vec<(&'static str, String)> {
        ["PREFIX", "BUILD_DIR", "NPROC", "ARCH", "NAME", "VERSION"]
            .into_iter()
            .filter_map(|k| self.shell_var(k).map(|v| (k, v)))
            .collect()
    }

    /// Expand every known placeholder in `template`.
    pub fn expand(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(pos) = rest.find(['$', '#']) {
            out.push_str(&rest[..pos]);
            rest = &rest[pos..];

            let (replacement, consumed) = if rest.starts_with('$') {
                self.expand_dollar(rest)
            } else {
                self.expand_hash(rest)
            };

            match replacement {
                Some(value) => out.push_str(&value),
                None => out.push_str(&rest[..consumed]),
            }
            rest = &rest[consumed..];
        }

        out.push_str(rest);
        out
    }

    /// `$NAME` or `${NAME}` at the start of `s`. Returns the value (if known)
    /// and how many bytes the placeholder spans.
    fn expand_dollar(&self, s: &str) -> (Option<String>, usize) {
        let body = &s[1..];
        if let Some(braced) = body.strip_prefix('{') {
            if let Some(end) = braced.find('}') {
                return (self.shell_var(&braced[..end]), end + 3);
            }
            return (None, 1);
        }

        let len = body
            .char_indices()
            .take_while(|&(i, c)| c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit()))
            .count();
        if len == 0 {
            return (None, 1);
        }
        (self.shell_var(&body[..len]), len + 1)
    }

    /// `#{name}` at the start of `s`.
    fn expand_hash(&self, s: &str) -> (Option<String>, usize) {
        if let Some(braced) = s[1..].strip_prefix('{')
            && let Some(end) = braced.find('}')
        {
            return (self.interpolation(braced[..end].trim()), end + 3);
        }
        (None, 1)
    }
}
