//! Newtype wrappers for string identifiers, providing compile-time type safety.
//!
//! All newtypes serialize/deserialize as plain strings so they can sit directly
//! inside the image's JSON manifests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// File name of an archive stored in the image (`houdini_core.tar`, `SideFXLabs_20.5.zip`).
    ArchiveName
);

string_newtype!(
    /// Product version as printed in `overview.json`, bound to `{iso_version}`.
    ProductVersion
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_name_display_and_as_ref() {
        let name = ArchiveName::new("core.tar");
        assert_eq!(name.to_string(), "core.tar");
        assert_eq!(name.as_str(), "core.tar");
        assert_eq!(AsRef::<str>::as_ref(&name), "core.tar");
    }

    #[test]
    fn version_deserializes_from_plain_string() {
        let v: ProductVersion = serde_json::from_str("\"20.5.278\"").unwrap();
        assert_eq!(v, "20.5.278");
    }

    #[test]
    fn archive_names_order_lexicographically() {
        let mut names = vec![ArchiveName::from("b.tar"), ArchiveName::from("a.tar")];
        names.sort();
        assert_eq!(names[0], "a.tar");
    }
}
