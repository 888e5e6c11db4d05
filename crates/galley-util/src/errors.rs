use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all Galley operations.
#[derive(Debug, Error, Diagnostic)]
pub enum GalleyError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed location or config id text.
    #[error("Invalid location '{input}': {reason}")]
    #[diagnostic(help("Expected producer[@factory[(location)]]:channel[/frequency]#build"))]
    LocationFormat { input: String, reason: String },

    /// A universe, producer, channel or build could not be resolved to an artifact.
    #[error("Failed to resolve {artifact}: {reason}")]
    UnresolvableArtifact { artifact: String, reason: String },

    /// Every missing version and conflicting build set found in one resolution pass.
    #[error("Feature-pack version check failed:{}", render_convergence(.missing, .conflicts))]
    #[diagnostic(help("Pin the desired builds explicitly in the provisioning config"))]
    VersionConvergence {
        /// Producers reachable only without a build.
        missing: Vec<String>,
        /// One entry per producer: the FPIDs that could not be reconciled.
        conflicts: Vec<Vec<String>>,
    },

    /// A dependency edge declares inclusion rules that cannot be satisfied.
    #[error("Invalid inclusion rules for {edge}: {message}")]
    InclusionRule { edge: String, message: String },

    /// Features of a config could not be ordered into a valid event stream.
    #[error("Failed to arrange config {config}: {message}")]
    Arrangement { config: String, message: String },

    /// More than one config failed to arrange; one `config: message` entry each.
    #[error("Failed to arrange {} configs:{}", .failures.len(), render_lines(.failures))]
    Arrangements { failures: Vec<String> },

    /// Invalid or malformed configuration file.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check the TOML file for syntax errors and unknown keys"))]
    Config { message: String },

    /// The installation was recorded with a format no engine understands.
    #[error("Unsupported provisioning format version '{version}'")]
    UnsupportedFormat { version: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

fn render_convergence(missing: &[String], conflicts: &[Vec<String>]) -> String {
    let mut out = String::new();
    for producer in missing {
        out.push_str(&format!(
            "\n  Please pick the desired build for {producer} explicitly"
        ));
    }
    for set in conflicts {
        out.push_str(&format!("\n  Please pick one of [{}]", set.join(", ")));
    }
    out
}

fn render_lines(lines: &[String]) -> String {
    lines.iter().map(|line| format!("\n  {line}")).collect()
}

/// Convenience alias for results carrying a [`GalleyError`].
pub type GalleyResult<T> = Result<T, GalleyError>;
