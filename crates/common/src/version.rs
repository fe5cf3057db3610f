use std::fmt::{self, Display};

use serde::Serialize;

/// Compile time build metadata, populated by the crate build script.
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub build_profile: &'static str,
    pub build_features: &'static str,
    pub version: &'static str,
    pub build_timestamp: &'static str,
    pub rust_version: &'static str,
    pub target: &'static str,
    pub host: &'static str,
}

impl Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "version:   {}", self.version)?;
        writeln!(f, "profile:   {}", self.build_profile)?;
        writeln!(f, "features:  {}", self.build_features)?;
        writeln!(f, "built at:  {}", self.build_timestamp)?;
        writeln!(f, "rustc:     {}", self.rust_version)?;
        write!(f, "target:    {} (host {})", self.target, self.host)
    }
}

/// Build info for the crate that expands the macro.
///
/// Needs the same `build.rs` environment as this crate, which is why the
/// daemon binary ships its own copy of the script.
#[macro_export]
macro_rules! build_info {
    () => {
        $crate::version::BuildInfo {
            build_profile: env!("BUILD_PROFILE"),
            build_features: env!("BUILD_FEATURES"),
            version: env!("REPO_VERSION"),
            build_timestamp: env!("BUILD_TIMESTAMP"),
            rust_version: env!("RUST_VERSION"),
            target: env!("BUILD_TARGET"),
            host: env!("BUILD_HOST"),
        }
    };
}

/// Build info for the common library itself.
pub fn build_info() -> BuildInfo {
    build_info!()
}
