// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Classification of a currency as reported by the rates endpoint. Anything
/// other than `fiat` or `crypto` is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrencyType {
    Fiat,
    Crypto,
    Other(String),
}

impl CurrencyType {
    pub fn as_str(&self) -> &str {
        match self {
            CurrencyType::Fiat => "fiat",
            CurrencyType::Crypto => "crypto",
            CurrencyType::Other(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, CurrencyType::Other(_))
    }
}

impl From<String> for CurrencyType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "fiat" => CurrencyType::Fiat,
            "crypto" => CurrencyType::Crypto,
            _ => CurrencyType::Other(raw),
        }
    }
}

impl Serialize for CurrencyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CurrencyType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(CurrencyType::from)
    }
}

impl fmt::Display for CurrencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single currency entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyRate {
    pub name: String,
    pub unit: String,
    #[serde(deserialize_with = "finite_f64")]
    pub value: f64,
    #[serde(rename = "type")]
    pub kind: CurrencyType,
}

fn finite_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() {
        return Err(de::Error::custom(format!("rate value {} is not finite", value)));
    }
    Ok(value)
}

/// Currency id -> rate, kept in the order the endpoint returned it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateMapping {
    entries: Vec<(String, CurrencyRate)>,
}

impl RateMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry. Returns `false` (and changes nothing) when the id is
    /// already present.
    pub fn insert(&mut self, id: impl Into<String>, rate: CurrencyRate) -> bool {
        let id = id.into();
        if self.contains(&id) {
            return false;
        }
        self.entries.push((id, rate));
        true
    }

    pub fn get(&self, id: &str) -> Option<&CurrencyRate> {
        self.entries
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, rate)| rate)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut CurrencyRate> {
        self.entries
            .iter_mut()
            .find(|(key, _)| key == id)
            .map(|(_, rate)| rate)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CurrencyRate)> {
        self.entries.iter().map(|(id, rate)| (id.as_str(), rate))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, CurrencyRate)> for RateMapping {
    fn from_iter<I: IntoIterator<Item = (String, CurrencyRate)>>(iter: I) -> Self {
        let mut mapping = RateMapping::new();
        for (id, rate) in iter {
            mapping.insert(id, rate);
        }
        mapping
    }
}

impl Serialize for RateMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, rate) in &self.entries {
            map.serialize_entry(id, rate)?;
        }
        map.end()
    }
}

struct RateMappingVisitor;

impl<'de> Visitor<'de> for RateMappingVisitor {
    type Value = RateMapping;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object of currency id to rate")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
        let mut mapping = RateMapping {
            entries: Vec::with_capacity(access.size_hint().unwrap_or(0)),
        };
        while let Some((id, rate)) = access.next_entry::<String, CurrencyRate>()? {
            if mapping.contains(&id) {
                return Err(de::Error::custom(format!("duplicate currency id `{}`", id)));
            }
            mapping.entries.push((id, rate));
        }
        Ok(mapping)
    }
}

impl<'de> Deserialize<'de> for RateMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RateMappingVisitor)
    }
}

/// Body of the exchange rates endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyRateResponse {
    pub rates: RateMapping,
}
