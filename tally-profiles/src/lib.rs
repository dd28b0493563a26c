//! Built-in institution descriptors plus loading of user-supplied ones.
//!
//! Descriptors are TOML embedded at build time; callers can also point at a
//! TOML file on disk for institutions not shipped here.

use std::path::Path;
use tally_core::{CompiledProfile, InstitutionProfile, NormalizeError};

const BUILTINS: &[(&str, &str)] = &[
    ("riosur", include_str!("../profiles/riosur.toml")),
    ("northgate", include_str!("../profiles/northgate.toml")),
    ("cardpay", include_str!("../profiles/cardpay.toml")),
];

/// Identifiers of every built-in profile, in a stable order.
pub fn builtin_ids() -> Vec<&'static str> {
    BUILTINS.iter().map(|(id, _)| *id).collect()
}

/// Load and compile a built-in profile by id.
pub fn builtin(id: &str) -> Result<CompiledProfile, NormalizeError> {
    let (_, text) = BUILTINS
        .iter()
        .find(|(name, _)| *name == id)
        .ok_or_else(|| NormalizeError::UnknownProfile(id.to_string()))?;
    InstitutionProfile::from_toml(text)?.compile()
}

/// The raw TOML of a built-in profile, for `profiles show`.
pub fn builtin_source(id: &str) -> Result<&'static str, NormalizeError> {
    BUILTINS
        .iter()
        .find(|(name, _)| *name == id)
        .map(|(_, text)| *text)
        .ok_or_else(|| NormalizeError::UnknownProfile(id.to_string()))
}

/// Load and compile a profile from a TOML file on disk.
pub fn load_file(path: &Path) -> Result<CompiledProfile, NormalizeError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| NormalizeError::InvalidProfile(format!("{}: {e}", path.display())))?;
    InstitutionProfile::from_toml(&text)?.compile()
}
