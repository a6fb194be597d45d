// src/config/ordered.rs

//! Order-preserving map deserialization.
//!
//! Modules and actions must keep the order in which they are declared in
//! the config file, so maps are read into `Vec<(String, T)>` instead of a
//! sorted or hashed map. Duplicate keys survive this step and are rejected
//! later by registry validation.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};

/// `deserialize_with` helper reading a map as an ordered list of entries.
pub fn ordered_map<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
}

struct OrderedMapVisitor<T>(PhantomData<T>);

impl<'de, T> Visitor<'de> for OrderedMapVisitor<T>
where
    T: Deserialize<'de>,
{
    type Value = Vec<(String, T)>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of names to definitions")
    }

    // `modules:` with no body in YAML.
    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Vec::new())
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, T>()? {
            entries.push((key, value));
        }
        Ok(entries)
    }
}
