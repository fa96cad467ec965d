//! Read-only introspection of engine capabilities.

use crate::options::{
    Bsr, Newline, DEFAULT_DEPTH_LIMIT, DEFAULT_HEAP_LIMIT, DEFAULT_MATCH_LIMIT,
    DEFAULT_PARENS_NEST_LIMIT,
};

/// A capability to query with [`config`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    /// Whether UTF-8 patterns and subjects are supported.
    Unicode,
    /// The Unicode version of the case mapping tables.
    UnicodeVersion,
    /// The crate version.
    Version,
    /// The default newline convention.
    Newline,
    /// The default meaning of `\R`.
    Bsr,
    /// The width in bytes of internal program offsets.
    LinkSize,
    /// The default step limit.
    MatchLimit,
    /// The default depth limit.
    DepthLimit,
    /// The default heap limit in KiB.
    HeapLimit,
    /// The default parentheses nesting limit.
    ParensLimit,
    /// Whether specialized programs are available.
    Jit,
    /// Whether `\C` is always rejected.
    NeverBackslashC,
    /// A bitmask of supported code unit widths (1 = 8 bits).
    CompiledWidths,
}

/// The value of a configuration key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Bool(bool),
    Number(u64),
    Text(&'static str),
    Newline(Newline),
    Bsr(Bsr),
}

/// Query one engine capability.
pub fn config(key: ConfigKey) -> ConfigValue {
    match key {
        ConfigKey::Unicode => ConfigValue::Bool(true),
        ConfigKey::UnicodeVersion => ConfigValue::Text(unicode_version()),
        ConfigKey::Version => ConfigValue::Text(env!("CARGO_PKG_VERSION")),
        ConfigKey::Newline => ConfigValue::Newline(Newline::default()),
        ConfigKey::Bsr => ConfigValue::Bsr(Bsr::default()),
        ConfigKey::LinkSize => ConfigValue::Number(core::mem::size_of::<u32>() as u64),
        ConfigKey::MatchLimit => ConfigValue::Number(DEFAULT_MATCH_LIMIT),
        ConfigKey::DepthLimit => ConfigValue::Number(DEFAULT_DEPTH_LIMIT),
        ConfigKey::HeapLimit => ConfigValue::Number(DEFAULT_HEAP_LIMIT),
        ConfigKey::ParensLimit => ConfigValue::Number(DEFAULT_PARENS_NEST_LIMIT as u64),
        ConfigKey::Jit => ConfigValue::Bool(false),
        ConfigKey::NeverBackslashC => ConfigValue::Bool(true),
        ConfigKey::CompiledWidths => ConfigValue::Number(1),
    }
}

// Case mapping comes from the standard library's char tables.
fn unicode_version() -> &'static str {
    let (major, minor, _) = char::UNICODE_VERSION;
    match (major, minor) {
        (15, 0) => "15.0.0",
        (15, 1) => "15.1.0",
        (16, 0) => "16.0.0",
        (17, 0) => "17.0.0",
        _ => "unknown",
    }
}
