use std::collections::HashSet;
use std::convert::TryFrom;
use std::fmt;
use std::slice;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ordered list of unique physical quantity names. The order is the storage
/// order of the fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Variables {
  names: Vec<String>,
}

impl Variables {
  pub fn new<I, S>(names: I) -> Result<Variables>
    where I: IntoIterator<Item = S>,
          S: Into<String>,
  {
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    let mut seen = HashSet::with_capacity(names.len());
    for name in names.iter() {
      if !seen.insert(name.as_str()) {
        return Err(Error::DuplicateVariable(name.clone()));
      }
    }

    Ok(Variables { names })
  }

  pub fn len(&self) -> usize { self.names.len() }
  pub fn is_empty(&self) -> bool { self.names.is_empty() }
  pub fn names(&self) -> &[String] { &self.names[..] }
  pub fn iter(&self) -> slice::Iter<String> { self.names.iter() }

  pub fn get(&self, idx: usize) -> Option<&str> {
    self.names.get(idx).map(|s| s.as_str())
  }
  pub fn index_of(&self, name: &str) -> Option<usize> {
    self.names.iter().position(|n| n == name)
  }
  pub fn contains(&self, name: &str) -> bool {
    self.index_of(name).is_some()
  }
  /// `true` if every name in `other` is also in `self`, in any order.
  pub fn includes(&self, other: &Variables) -> bool {
    other.iter().all(|n| self.contains(n))
  }
}

impl TryFrom<Vec<String>> for Variables {
  type Error = Error;
  fn try_from(v: Vec<String>) -> Result<Variables> {
    Variables::new(v)
  }
}
impl From<Variables> for Vec<String> {
  fn from(v: Variables) -> Vec<String> {
    v.names
  }
}
impl<'a> IntoIterator for &'a Variables {
  type Item = &'a String;
  type IntoIter = slice::Iter<'a, String>;
  fn into_iter(self) -> Self::IntoIter { self.names.iter() }
}

impl fmt::Display for Variables {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.names.join(", "))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn keeps_insertion_order() {
    let v = Variables::new(vec!["temperature", "pressure", "specific_humidity"]).unwrap();
    assert_eq!(v.index_of("pressure"), Some(1));
    assert_eq!(v.get(2), Some("specific_humidity"));
    assert!(!v.contains("relative_humidity"));
  }

  #[test]
  fn rejects_duplicates() {
    match Variables::new(vec!["temperature", "temperature"]) {
      Err(Error::DuplicateVariable(name)) => assert_eq!(name, "temperature"),
      other => panic!("unexpected: {:?}", other),
    }
  }

  #[test]
  fn order_is_significant() {
    let a = Variables::new(vec!["a", "b"]).unwrap();
    let b = Variables::new(vec!["b", "a"]).unwrap();
    assert_ne!(a, b);
    assert!(a.includes(&b));
  }

  #[test]
  fn deserializes_from_a_list() {
    let v: Variables = serde_json::from_str(r#"["u", "v"]"#).unwrap();
    assert_eq!(v.len(), 2);
    assert!(serde_json::from_str::<Variables>(r#"["u", "u"]"#).is_err());
  }
}
