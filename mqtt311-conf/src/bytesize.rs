use std::fmt;
use std::ops::Deref;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

const BYTESIZE_K: usize = 1024;
const BYTESIZE_M: usize = 1024 * 1024;
const BYTESIZE_G: usize = 1024 * 1024 * 1024;

/// A byte count written the human way, e.g. `"1M"`, `"256K"` or `"1M512K"`.
///
/// ```
/// use mqtt311_conf::Bytesize;
///
/// assert_eq!(Bytesize::try_from("1M512K").unwrap().as_usize(), 1_572_864);
/// assert_eq!(Bytesize(3_145_728).string(), "3M");
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Bytesize(pub usize);

impl Bytesize {
    #[inline]
    pub fn as_usize(&self) -> usize {
        self.0
    }

    /// Saturates at `u32::MAX`.
    #[inline]
    pub fn as_u32(&self) -> u32 {
        u32::try_from(self.0).unwrap_or(u32::MAX)
    }

    pub fn string(&self) -> String {
        let mut v = self.0;
        if v == 0 {
            return "0".into();
        }
        let mut res = String::new();
        for (unit, size) in [('G', BYTESIZE_G), ('M', BYTESIZE_M), ('K', BYTESIZE_K)] {
            let n = v / size;
            if n > 0 {
                res.push_str(&format!("{n}{unit}"));
                v %= size;
            }
        }
        if v > 0 {
            res.push_str(&format!("{v}B"));
        }
        res
    }
}

impl Deref for Bytesize {
    type Target = usize;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<usize> for Bytesize {
    fn from(v: usize) -> Self {
        Bytesize(v)
    }
}

impl TryFrom<&str> for Bytesize {
    type Error = String;
    fn try_from(v: &str) -> Result<Self, Self::Error> {
        to_bytesize(v).map(Bytesize).ok_or_else(|| format!("invalid byte size {v:?}"))
    }
}

impl fmt::Debug for Bytesize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.string())
    }
}

impl Serialize for Bytesize {
    #[inline]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.string())
    }
}

impl<'de> Deserialize<'de> for Bytesize {
    #[inline]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Bytesize::try_from(text.as_str()).map_err(de::Error::custom)
    }
}

/// Parses `"2G512K"`-style sizes. A trailing number without a unit counts bytes.
pub fn to_bytesize(text: &str) -> Option<usize> {
    let text = text.trim().to_uppercase().replace("GB", "G").replace("MB", "M").replace("KB", "K");
    if text.is_empty() {
        return None;
    }
    let mut total: usize = 0;
    for part in text.split_inclusive(['G', 'M', 'K', 'B']) {
        let (num, unit) = match part.chars().last() {
            Some(u @ ('G' | 'M' | 'K' | 'B')) => (&part[..part.len() - 1], u),
            _ => (part, 'B'),
        };
        let v = num.trim().parse::<usize>().ok()?;
        let scale = match unit {
            'G' => BYTESIZE_G,
            'M' => BYTESIZE_M,
            'K' => BYTESIZE_K,
            _ => 1,
        };
        total = total.checked_add(v.checked_mul(scale)?)?;
    }
    Some(total)
}
