use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer};
use std::sync::OnceLock;

/// Interned string key - 4 bytes instead of 24 for String.
pub type IStr = Spur;

/// Global string interner for unit display names.
static INTERNER: OnceLock<ThreadedRodeo> = OnceLock::new();

/// Cached empty string Spur to avoid repeated lookups.
static EMPTY_ISTR: OnceLock<Spur> = OnceLock::new();

/// Get the global interner (initializes on first call).
pub fn interner() -> &'static ThreadedRodeo {
    INTERNER.get_or_init(ThreadedRodeo::default)
}

/// Intern a string, returning a key.
pub fn intern(s: &str) -> IStr {
    interner().get_or_intern(s)
}

/// Returns the IStr for an empty string. Use this instead of IStr::default()
/// since Spur::default() collides with the first interned string.
#[inline]
pub fn empty_istr() -> IStr {
    *EMPTY_ISTR.get_or_init(|| interner().get_or_intern(""))
}

/// Resolve an interned key back to a string.
pub fn resolve(key: IStr) -> &'static str {
    interner().resolve(&key)
}

/// Serde helper: intern an optional string field, null or absent becomes "".
pub fn deserialize_istr<'de, D>(deserializer: D) -> Result<IStr, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|s| intern(&s)).unwrap_or_else(empty_istr))
}
