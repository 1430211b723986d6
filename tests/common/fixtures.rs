//! Test fixtures - sample formulas and fake project scripts.

#![allow(dead_code)]

/// The shipped riofs formula.
pub const RIOFS_FORMULA: &str = include_str!("../../formulas/riofs.formula");

/// Autotools-shaped formula that runs against `TestEnv::autotools_source`.
pub const AUTOTOOLS_FORMULA: &str = r#"
(formula "fakefs"
  (homepage "https://example.com/fakefs")
  (url "/unused")
  (version "1.0")
  (depends-on "sh" build)
  (install
    (system "./autogen.sh")
    (system "./configure --prefix=#{prefix}")
    (system "./install.sh")))
"#;

/// Formula whose dependency cannot exist.
pub const MISSING_DEP_FORMULA: &str = r#"
(formula "needy"
  (url "/unused")
  (version "1.0")
  (depends-on "no-such-tool-for-formula-tests" build)
  (install (system "touch \"$PREFIX/should-not-exist\"")))
"#;

pub const AUTOGEN_SH: &str = r#"#!/bin/sh
echo "bootstrap" >> steps.log
echo "generating configure"
"#;

/// Writes the prefix it was given into config.status.
pub const CONFIGURE_SH: &str = r#"#!/bin/sh
echo "configure $1" >> steps.log
echo "checking for glib... no" >&2
if [ "@EXIT@" -ne 0 ]; then
    echo "configure: error: glib not found" >&2
    exit @EXIT@
fi
echo "${1#--prefix=}" > config.status
"#;

pub const INSTALL_SH: &str = r#"#!/bin/sh
echo "install" >> steps.log
prefix=$(cat config.status)
mkdir -p "$prefix/bin"
printf '#!/bin/sh\necho fakefs\n' > "$prefix/bin/fakefs"
chmod 755 "$prefix/bin/fakefs"
"#;
