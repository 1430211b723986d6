//! Formula interpretation - converts parsed S-expressions into a `Formula`
//! and back.
//!
//! A formula is an immutable description of one package: where its source
//! lives, what it needs, and the ordered shell steps that install it under a
//! prefix. Two file syntaxes are understood, S-expressions (`.formula`) and
//! TOML (`.toml`), and both round-trip without loss.

use crate::ast::{quote, Expr};
use crate::executor::{BuildError, Context, Executor};
use crate::parser::{self, ParseError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormulaError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("expected (formula ...), got: {0}")]
    NotAFormula(String),
    #[error("missing formula name")]
    MissingName,
    #[error("invalid formula name '{0}': only alphanumerics, '-', '_', '+' and '.' are allowed")]
    InvalidName(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("field declared twice: {0}")]
    DuplicateField(String),
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("invalid field: {0}")]
    InvalidField(String),
    #[error("unknown dependency kind '{kind}' for {name}")]
    UnknownDependencyKind { name: String, kind: String },
    #[error("dependency declared twice: {0}")]
    DuplicateDependency(String),
    #[error("formula has no install steps")]
    NoInstallSteps,
    #[error("install step {} is blank", .0 + 1)]
    BlankInstallStep(usize),
    #[error("unsupported formula file extension: {0}")]
    UnsupportedExtension(String),
    #[error("TOML error: {0}")]
    Toml(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Role a dependency plays for the formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Needed only while building.
    Build,
    /// Needed at runtime.
    #[default]
    Required,
    /// Optional runtime dependency that enables extra features when present.
    Recommended,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 3] = [Self::Build, Self::Required, Self::Recommended];

    /// The role tag written after the name in `(depends-on ...)`.
    /// Required dependencies carry no tag.
    pub fn tag(self) -> Option<&'static str> {
        match self {
            Self::Build => Some("build"),
            Self::Required => None,
            Self::Recommended => Some("recommended"),
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "build" => Some(Self::Build),
            "required" => Some(Self::Required),
            "recommended" => Some(Self::Recommended),
            _ => None,
        }
    }

    /// A missing dependency of this kind must stop the install.
    pub fn is_mandatory(self) -> bool {
        !matches!(self, Self::Recommended)
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Build => "build",
            Self::Required => "required",
            Self::Recommended => "recommended",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(default)]
    pub kind: DependencyKind,
}

impl Dependency {
    pub fn new(name: impl Into<String>, kind: DependencyKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Fetch location plus the version it is labelled with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub url: String,
    pub version: String,
}

/// A parsed package formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Formula {
    pub name: String,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub source: Source,
    pub dependencies: Vec<Dependency>,
    /// Shell command templates, run in order.
    pub install_steps: Vec<String>,
}

/// Flat TOML layout of a formula file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct FormulaToml {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    homepage: Option<String>,
    url: String,
    version: String,
    #[serde(default)]
    install: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<Dependency>,
}

impl Formula {
    /// Parse and validate formula text in S-expression syntax.
    pub fn parse(input: &str) -> Result<Self, FormulaError> {
        let expr = parser::parse(input)?;
        let formula = Self::from_expr(&expr)?;
        formula.validate()?;
        Ok(formula)
    }

    /// Load a formula file, choosing the syntax from its extension.
    pub fn load(path: &Path) -> Result<Self, FormulaError> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("formula") => Self::parse(&content),
            Some("toml") => Self::from_toml(&content),
            other => Err(FormulaError::UnsupportedExtension(
                other.unwrap_or("").to_string(),
            )),
        }
    }

    /// Parse and validate formula text in TOML syntax.
    pub fn from_toml(input: &str) -> Result<Self, FormulaError> {
        let raw: FormulaToml =
            toml::from_str(input).map_err(|e| FormulaError::Toml(e.to_string()))?;
        let formula = Formula {
            name: raw.name,
            description: raw.description,
            homepage: raw.homepage,
            source: Source {
                url: raw.url,
                version: raw.version,
            },
            dependencies: raw.depends_on,
            install_steps: raw.install,
        };
        formula.validate()?;
        Ok(formula)
    }

    pub fn to_toml(&self) -> Result<String, FormulaError> {
        let raw = FormulaToml {
            name: self.name.clone(),
            description: self.description.clone(),
            homepage: self.homepage.clone(),
            url: self.source.url.clone(),
            version: self.source.version.clone(),
            install: self.install_steps.clone(),
            depends_on: self.dependencies.clone(),
        };
        toml::to_string(&raw).map_err(|e| FormulaError::Toml(e.to_string()))
    }

    /// Interpret a parsed S-expression. Does not validate.
    pub fn from_expr(expr: &Expr) -> Result<Self, FormulaError> {
        let list = expr
            .as_list()
            .ok_or_else(|| FormulaError::NotAFormula(expr.to_string()))?;

        if list.first().and_then(Expr::as_symbol) != Some("formula") {
            return Err(FormulaError::NotAFormula(expr.to_string()));
        }

        let name = list
            .get(1)
            .and_then(Expr::as_text)
            .ok_or(FormulaError::MissingName)?
            .to_string();

        let mut fields = Fields::default();
        for field in list.iter().skip(2) {
            fields.parse_field(field)?;
        }

        Ok(Formula {
            name,
            description: fields.description,
            homepage: fields.homepage,
            source: Source {
                url: fields.url.ok_or(FormulaError::MissingField("url"))?,
                version: fields.version.ok_or(FormulaError::MissingField("version"))?,
            },
            dependencies: fields.dependencies,
            install_steps: fields.install.unwrap_or_default(),
        })
    }

    /// Emit the formula as an S-expression.
    pub fn to_expr(&self) -> Expr {
        let mut items = vec![Expr::sym("formula"), Expr::str(&self.name)];

        if let Some(ref desc) = self.description {
            items.push(field("description", desc));
        }
        if let Some(ref homepage) = self.homepage {
            items.push(field("homepage", homepage));
        }
        items.push(field("url", &self.source.url));
        items.push(field("version", &self.source.version));

        for dep in &self.dependencies {
            items.push(dependency_expr(dep));
        }

        let mut install = vec![Expr::sym("install")];
        install.extend(
            self.install_steps
                .iter()
                .map(|step| Expr::List(vec![Expr::sym("system"), Expr::str(step)])),
        );
        items.push(Expr::List(install));

        Expr::List(items)
    }

    /// Check the invariants a loaded formula must satisfy.
    pub fn validate(&self) -> Result<(), FormulaError> {
        validate_name(&self.name)?;

        if self.source.url.trim().is_empty() {
            return Err(FormulaError::MissingField("url"));
        }
        if self.source.version.trim().is_empty() {
            return Err(FormulaError::MissingField("version"));
        }

        let mut seen = HashSet::new();
        for dep in &self.dependencies {
            if dep.name.trim().is_empty() {
                return Err(FormulaError::InvalidField("depends-on with empty name".into()));
            }
            if !seen.insert(dep.name.as_str()) {
                return Err(FormulaError::DuplicateDependency(dep.name.clone()));
            }
        }

        if self.install_steps.is_empty() {
            return Err(FormulaError::NoInstallSteps);
        }
        if let Some(index) = self.install_steps.iter().position(|s| s.trim().is_empty()) {
            return Err(FormulaError::BlankInstallStep(index));
        }

        Ok(())
    }

    pub fn version(&self) -> &str {
        &self.source.version
    }

    /// Dependencies playing the given role, in declaration order.
    pub fn dependencies_of(&self, kind: DependencyKind) -> impl Iterator<Item = &Dependency> {
        self.dependencies.iter().filter(move |d| d.kind == kind)
    }

    /// Install into `prefix` with the host shell, running each step in the
    /// current directory, which is also `$BUILD_DIR`.
    ///
    /// Returns the first failing step as `BuildError::StepFailed`; later
    /// steps are not run.
    pub fn install(&self, prefix: impl Into<PathBuf>) -> Result<(), BuildError> {
        let cwd = std::env::current_dir()?;
        let ctx = Context::with_prefix(prefix).work_dir(&cwd).build_dir(cwd);
        Executor::new(ctx).install(self).map(|_| ())
    }
}

/// Pretty-printed S-expression form; `Formula::parse` reads it back unchanged.
impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(formula {}", quote(&self.name))?;
        if let Some(ref desc) = self.description {
            write!(f, "\n  {}", field("description", desc))?;
        }
        if let Some(ref homepage) = self.homepage {
            write!(f, "\n  {}", field("homepage", homepage))?;
        }
        write!(f, "\n  {}", field("url", &self.source.url))?;
        write!(f, "\n  {}", field("version", &self.source.version))?;
        for dep in &self.dependencies {
            write!(f, "\n  {}", dependency_expr(dep))?;
        }
        write!(f, "\n  (install")?;
        for step in &self.install_steps {
            write!(f, "\n    (system {})", quote(step))?;
        }
        writeln!(f, "))")
    }
}

/// Validate a formula name so it can double as a file name.
pub fn validate_name(name: &str) -> Result<(), FormulaError> {
    if name.is_empty() {
        return Err(FormulaError::MissingName);
    }
    if name.starts_with('.')
        || !name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'))
    {
        return Err(FormulaError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn field(name: &str, value: &str) -> Expr {
    Expr::List(vec![Expr::sym(name), Expr::str(value)])
}

fn dependency_expr(dep: &Dependency) -> Expr {
    let mut items = vec![Expr::sym("depends-on"), Expr::str(&dep.name)];
    if let Some(tag) = dep.kind.tag() {
        items.push(Expr::sym(tag));
    }
    Expr::List(items)
}

/// Fields collected while walking a `(formula ...)` list.
#[derive(Default)]
struct Fields {
    description: Option<String>,
    homepage: Option<String>,
    url: Option<String>,
    version: Option<String>,
    dependencies: Vec<Dependency>,
    install: Option<Vec<String>>,
}

impl Fields {
    fn parse_field(&mut self, expr: &Expr) -> Result<(), FormulaError> {
        let head = expr
            .head()
            .ok_or_else(|| FormulaError::InvalidField(expr.to_string()))?;

        match head {
            "description" => set_once(&mut self.description, head, single_text(expr)?),
            "homepage" => set_once(&mut self.homepage, head, single_text(expr)?),
            "url" => set_once(&mut self.url, head, single_text(expr)?),
            "version" => set_once(&mut self.version, head, single_text(expr)?),
            "depends-on" => {
                self.dependencies.push(parse_dependency(expr)?);
                Ok(())
            }
            "install" => {
                let steps = parse_install(expr)?;
                set_once(&mut self.install, head, steps)
            }
            _ => Err(FormulaError::UnknownField(head.to_string())),
        }
    }
}

fn set_once<T>(slot: &mut Option<T>, name: &str, value: T) -> Result<(), FormulaError> {
    if slot.is_some() {
        return Err(FormulaError::DuplicateField(name.to_string()));
    }
    *slot = Some(value);
    Ok(())
}

fn single_text(expr: &Expr) -> Result<String, FormulaError> {
    match expr.tail() {
        Some([value]) => value
            .as_text()
            .map(str::to_string)
            .ok_or_else(|| FormulaError::InvalidField(expr.to_string())),
        _ => Err(FormulaError::InvalidField(expr.to_string())),
    }
}

fn parse_dependency(expr: &Expr) -> Result<Dependency, FormulaError> {
    let invalid = || FormulaError::InvalidField(expr.to_string());
    let (name, tag) = match expr.tail().ok_or_else(invalid)? {
        [name] => (name, None),
        [name, tag] => (name, Some(tag)),
        _ => return Err(invalid()),
    };
    let name = name.as_text().ok_or_else(invalid)?.to_string();

    let kind = match tag {
        None => DependencyKind::Required,
        Some(tag) => {
            let tag = tag.as_text().ok_or_else(invalid)?;
            DependencyKind::from_tag(tag).ok_or_else(|| FormulaError::UnknownDependencyKind {
                name: name.clone(),
                kind: tag.to_string(),
            })?
        }
    };

    Ok(Dependency { name, kind })
}

/// `(install (system "a") (system "make" "install"))`
///
/// Multi-argument `system` forms are joined with spaces into one command.
fn parse_install(expr: &Expr) -> Result<Vec<String>, FormulaError> {
    let mut steps = Vec::new();
    for item in expr.tail().unwrap_or(&[]) {
        if item.head() != Some("system") {
            return Err(FormulaError::InvalidField(format!("install step {}", item)));
        }
        let args = item
            .tail()
            .filter(|args| !args.is_empty())
            .ok_or_else(|| FormulaError::InvalidField(format!("empty step {}", item)))?
            .iter()
            .map(|e| e.as_text().ok_or_else(|| FormulaError::InvalidField(item.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        steps.push(args.join(" "));
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        (formula "hello"
          (url "https://example.com/hello.git")
          (version "1.0")
          (install (system "make install")))
    "#;

    #[test]
    fn test_parse_minimal() {
        let formula = Formula::parse(MINIMAL).unwrap();
        assert_eq!(formula.name, "hello");
        assert_eq!(formula.version(), "1.0");
        assert!(formula.homepage.is_none());
        assert!(formula.dependencies.is_empty());
        assert_eq!(formula.install_steps, vec!["make install"]);
    }

    #[test]
    fn test_dependency_tags() {
        let formula = Formula::parse(
            r#"(formula "x" (url "u") (version "1")
                 (depends-on "a" build)
                 (depends-on "b")
                 (depends-on "c" recommended)
                 (depends-on d required)
                 (install (system "true")))"#,
        )
        .unwrap();
        let kinds: Vec<_> = formula.dependencies.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DependencyKind::Build,
                DependencyKind::Required,
                DependencyKind::Recommended,
                DependencyKind::Required,
            ]
        );
        assert_eq!(formula.dependencies_of(DependencyKind::Build).count(), 1);
    }

    #[test]
    fn test_multi_arg_system_is_joined() {
        let formula = Formula::parse(
            r#"(formula "x" (url "u") (version "1") (install (system "make" "install")))"#,
        )
        .unwrap();
        assert_eq!(formula.install_steps, vec!["make install"]);
    }

    #[test]
    fn test_unknown_dependency_kind() {
        let err = Formula::parse(
            r#"(formula "x" (url "u") (version "1") (depends-on "a" optional) (install (system "true")))"#,
        )
        .unwrap_err();
        assert!(matches!(err, FormulaError::UnknownDependencyKind { ref kind, .. } if kind == "optional"));
    }

    #[test]
    fn test_duplicate_dependency() {
        let err = Formula::parse(
            r#"(formula "x" (url "u") (version "1") (depends-on "a") (depends-on "a" build) (install (system "true")))"#,
        )
        .unwrap_err();
        assert!(matches!(err, FormulaError::DuplicateDependency(ref n) if n == "a"));
    }

    #[test]
    fn test_duplicate_field() {
        let err = Formula::parse(
            r#"(formula "x" (url "u") (url "v") (version "1") (install (system "true")))"#,
        )
        .unwrap_err();
        assert!(matches!(err, FormulaError::DuplicateField(ref f) if f == "url"));
    }

    #[test]
    fn test_unknown_field() {
        let err = Formula::parse(
            r#"(formula "x" (url "u") (version "1") (sha256 "abc") (install (system "true")))"#,
        )
        .unwrap_err();
        assert!(matches!(err, FormulaError::UnknownField(ref f) if f == "sha256"));
    }

    #[test]
    fn test_missing_version() {
        let err = Formula::parse(r#"(formula "x" (url "u") (install (system "true")))"#)
            .unwrap_err();
        assert!(matches!(err, FormulaError::MissingField("version")));
    }

    #[test]
    fn test_no_install_steps() {
        let err = Formula::parse(r#"(formula "x" (url "u") (version "1") (install))"#)
            .unwrap_err();
        assert!(matches!(err, FormulaError::NoInstallSteps));
    }

    #[test]
    fn test_system_without_command() {
        let err = Formula::parse(
            r#"(formula "x" (url "u") (version "1") (install (system "make") (system)))"#,
        )
        .unwrap_err();
        assert!(matches!(err, FormulaError::InvalidField(_)));
    }

    #[test]
    fn test_blank_step_among_real_ones() {
        let err = Formula::parse(
            r#"(formula "x" (url "u") (version "1") (install (system "make") (system "  ")))"#,
        )
        .unwrap_err();
        assert!(matches!(err, FormulaError::BlankInstallStep(1)));
        assert_eq!(err.to_string(), "install step 2 is blank");

        let err = Formula::from_toml(
            "name = \"x\"\nurl = \"u\"\nversion = \"1\"\ninstall = [\"make\", \"\"]\n",
        )
        .unwrap_err();
        assert!(matches!(err, FormulaError::BlankInstallStep(1)));
    }

    #[test]
    fn test_not_a_formula() {
        let err = Formula::parse(r#"(package "x" "1.0")"#).unwrap_err();
        assert!(matches!(err, FormulaError::NotAFormula(_)));
    }

    #[test]
    fn test_invalid_name() {
        assert!(validate_name("riofs").is_ok());
        assert!(validate_name("gtk+3").is_ok());
        assert!(validate_name("python3.12").is_ok());
        assert!(matches!(validate_name("../etc"), Err(FormulaError::InvalidName(_))));
        assert!(matches!(validate_name("a b"), Err(FormulaError::InvalidName(_))));
        assert!(matches!(validate_name(""), Err(FormulaError::MissingName)));
    }

    #[test]
    fn test_display_round_trip_with_escapes() {
        let formula = Formula {
            name: "quoted".into(),
            description: Some("says \"hi\"".into()),
            homepage: None,
            source: Source {
                url: "/src/quoted".into(),
                version: "2".into(),
            },
            dependencies: vec![Dependency::new("tool", DependencyKind::Build)],
            install_steps: vec!["printf 'a\\tb\\n' > \"$PREFIX/out\"".into()],
        };
        let text = formula.to_string();
        assert_eq!(Formula::parse(&text).unwrap(), formula);
        assert_eq!(Formula::from_expr(&formula.to_expr()).unwrap(), formula);
    }

    #[test]
    fn test_toml_round_trip() {
        let formula = Formula::parse(MINIMAL).unwrap();
        let text = formula.to_toml().unwrap();
        assert!(text.contains("name = \"hello\""));
        assert_eq!(Formula::from_toml(&text).unwrap(), formula);
    }

    #[test]
    fn test_toml_rejects_unknown_keys() {
        let err = Formula::from_toml(
            "name = \"x\"\nurl = \"u\"\nversion = \"1\"\ninstall = [\"true\"]\nsha = \"1\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, FormulaError::Toml(_)));
    }

    #[test]
    fn test_toml_dependency_kind_defaults_to_required() {
        let formula = Formula::from_toml(
            "name = \"x\"\nurl = \"u\"\nversion = \"1\"\ninstall = [\"true\"]\n\n[[depends_on]]\nname = \"glib\"\n",
        )
        .unwrap();
        assert_eq!(formula.dependencies, vec![Dependency::new("glib", DependencyKind::Required)]);
    }
}
