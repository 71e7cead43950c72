// Copyright 2025 Dmitry Tantsur <dtantsur@protonmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Various utilities.

use super::{Error, ErrorKind, Result};

/// Define an enumeration that is serialized as a string on the wire.
///
/// The `? Variant` form decodes unknown strings into `Variant` instead of
/// failing.
macro_rules! protocol_enum {
    {$(#[$attr:meta])* enum $name:ident {
        $($(#[$vattr:meta])* $item:ident = $val:literal),+
    }} => (
        protocol_enum! {
            @define $(#[$attr])* $name;
            $($(#[$vattr])* $item = $val),+
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::Error;

            fn from_str(value: &str) -> $crate::Result<$name> {
                match value {
                    $($val => Ok($name::$item),)+
                    other => Err($crate::Error::new(
                        $crate::ErrorKind::InvalidInput,
                        format!("Unknown {} value {}", stringify!($name), other),
                    )),
                }
            }
        }
    );

    {$(#[$attr:meta])* enum $name:ident ? $fallback:ident {
        $($(#[$vattr:meta])* $item:ident = $val:literal),+
    }} => (
        protocol_enum! {
            @define $(#[$attr])* $name;
            $($(#[$vattr])* $item = $val),+
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::Error;

            fn from_str(value: &str) -> $crate::Result<$name> {
                Ok(match value {
                    $($val => $name::$item,)+
                    other => {
                        trace!("Treating unknown {} value {} as {:?}",
                               stringify!($name), other, $name::$fallback);
                        $name::$fallback
                    }
                })
            }
        }
    );

    {@define $(#[$attr:meta])* $name:ident;
        $($(#[$vattr:meta])* $item:ident = $val:literal),+
    } => (
        $(#[$attr])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vattr])* $item),+
        }

        impl $name {
            /// String representation used on the wire.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$item => $val),+
                }
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                String::from(value.as_str())
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::serde::ser::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
            where
                S: ::serde::ser::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> ::serde::de::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<$name, D::Error>
            where
                D: ::serde::de::Deserializer<'de>,
            {
                let value = <String as ::serde::de::Deserialize>::deserialize(deserializer)?;
                value.parse().map_err(::serde::de::Error::custom)
            }
        }
    );
}

/// Fail with `InvalidInput` if a required string argument is empty.
pub(crate) fn ensure_not_empty<S: AsRef<str>>(value: S, name: &str) -> Result<()> {
    if value.as_ref().is_empty() {
        Err(Error::new(
            ErrorKind::InvalidInput,
            format!("{} must not be empty", name),
        ))
    } else {
        Ok(())
    }
}
