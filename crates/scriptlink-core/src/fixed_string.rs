//! Interned, immutable strings.
//!
//! Every distinct spelling is stored once in a process-wide pool, so clones are
//! a reference-count bump and equality is a pointer comparison. This is the
//! representation of the VM's string tag and of every type/function name.
//!
//! A pool entry lives as long as some `FixedString` refers to it; dropping the
//! last one removes the spelling from the pool.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem::ManuallyDrop;
use std::ops::Deref;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

lazy_static! {
    static ref POOL: Mutex<FxHashSet<Arc<str>>> = Mutex::new(FxHashSet::default());
}

/// An interned string.
///
/// Comparison is case-sensitive. Case-insensitive lookups (structure field
/// names, function keys) are done by the containers that need them.
pub struct FixedString(ManuallyDrop<Arc<str>>);

impl FixedString {
    /// Intern `value`, reusing the pooled entry if one exists.
    pub fn new(value: &str) -> Self {
        let mut pool = POOL.lock();
        if let Some(existing) = pool.get(value) {
            return Self(ManuallyDrop::new(Arc::clone(existing)));
        }
        let entry: Arc<str> = Arc::from(value);
        pool.insert(Arc::clone(&entry));
        Self(ManuallyDrop::new(entry))
    }

    /// The interned empty string.
    pub fn empty() -> Self {
        Self::new("")
    }

    /// Borrow the string contents.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ASCII case-insensitive comparison, matching script identifier rules.
    pub fn eq_ignore_ascii_case(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl Clone for FixedString {
    fn clone(&self) -> Self {
        Self(ManuallyDrop::new(Arc::clone(&self.0)))
    }
}

impl Drop for FixedString {
    fn drop(&mut self) {
        // Count check and release both happen under the pool lock.
        let mut pool = POOL.lock();
        // SAFETY: `self.0` is never touched again after this take.
        let entry = unsafe { ManuallyDrop::take(&mut self.0) };
        if Arc::strong_count(&entry) == 2 {
            pool.remove(&*entry);
        }
        drop(entry);
    }
}

impl Default for FixedString {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for FixedString {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&*self.0, &*other.0)
    }
}

impl Eq for FixedString {}

impl PartialEq<str> for FixedString {
    fn eq(&self, other: &str) -> bool {
        &**self.0 == other
    }
}

impl PartialEq<&str> for FixedString {
    fn eq(&self, other: &&str) -> bool {
        &**self.0 == *other
    }
}

impl Hash for FixedString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Deref for FixedString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for FixedString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FixedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FixedString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FixedString {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<&String> for FixedString {
    fn from(value: &String) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for FixedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for FixedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pooled(value: &str) -> bool {
        POOL.lock().contains(value)
    }

    #[test]
    fn same_spelling_shares_storage() {
        let a = FixedString::new("Actor");
        let b = FixedString::from(String::from("Actor"));
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&*a.0, &*b.0));
    }

    #[test]
    fn last_drop_releases_the_entry() {
        let a = FixedString::new("fixed_string::last_drop");
        let b = a.clone();
        drop(a);
        assert!(pooled("fixed_string::last_drop"));
        drop(b);
        assert!(!pooled("fixed_string::last_drop"));

        let again = FixedString::new("fixed_string::last_drop");
        assert_eq!(again, "fixed_string::last_drop");
        assert!(pooled("fixed_string::last_drop"));
    }

    #[test]
    fn many_short_lived_strings_do_not_accumulate() {
        let names: Vec<String> = (0..10_000).map(|i| format!("fixed_string::temp{i}")).collect();
        for name in &names {
            drop(FixedString::new(name));
        }
        assert!(names.iter().all(|name| !pooled(name)));
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let a = FixedString::new("Health");
        let b = FixedString::new("health");
        assert_ne!(a, b);
        assert!(a.eq_ignore_ascii_case("HEALTH"));
    }

    #[test]
    fn default_is_empty() {
        assert!(FixedString::default().is_empty());
        assert_eq!(FixedString::default(), "");
    }
}
