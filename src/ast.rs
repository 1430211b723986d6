//! Abstract syntax tree for formula S-expressions.

/// A node of a formula file: a bare symbol, a quoted string, or a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// An unquoted token such as `formula`, `depends-on` or `build`.
    Symbol(String),

    /// A double-quoted string, stored unescaped.
    Str(String),

    /// A parenthesised list.
    /// Example: `(depends-on "autoconf" build)`
    List(Vec<Expr>),
}

impl Expr {
    /// Build a symbol node.
    pub fn sym(s: impl Into<String>) -> Self {
        Expr::Symbol(s.into())
    }

    /// Build a string node.
    pub fn str(s: impl Into<String>) -> Self {
        Expr::Str(s.into())
    }

    /// Returns the text of a symbol or string, None for lists.
    ///
    /// Formula fields accept either form, so `(version 0.6)` and
    /// `(version "0.6")` read the same.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Expr::Symbol(s) | Expr::Str(s) => Some(s),
            Expr::List(_) => None,
        }
    }

    /// Returns the symbol name if this is a Symbol.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Expr::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the list if this is a List, None otherwise.
    pub fn as_list(&self) -> Option<&[Expr]> {
        match self {
            Expr::List(items) => Some(items),
            _ => None,
        }
    }

    /// If this is a list, returns its leading symbol.
    pub fn head(&self) -> Option<&str> {
        self.as_list()?.first()?.as_symbol()
    }

    /// If this is a non-empty list, returns all elements after the first.
    pub fn tail(&self) -> Option<&[Expr]> {
        match self.as_list()? {
            [] => None,
            [_, rest @ ..] => Some(rest),
        }
    }
}

/// Quote and escape a string the way the parser reads it back.
pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Symbol(s) => write!(f, "{}", s),
            Expr::Str(s) => write!(f, "{}", quote(s)),
            Expr::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_and_tail() {
        let expr = Expr::List(vec![Expr::sym("depends-on"), Expr::str("glib")]);
        assert_eq!(expr.head(), Some("depends-on"));
        assert_eq!(expr.tail(), Some(&[Expr::str("glib")][..]));
        assert_eq!(Expr::List(vec![]).tail(), None);
    }

    #[test]
    fn test_head_requires_symbol() {
        let expr = Expr::List(vec![Expr::str("homepage")]);
        assert_eq!(expr.head(), None);
    }

    #[test]
    fn test_display_escapes_strings() {
        let expr = Expr::List(vec![
            Expr::sym("system"),
            Expr::str("echo \"hi\"\n"),
        ]);
        assert_eq!(expr.to_string(), r#"(system "echo \"hi\"\n")"#);
    }
}
