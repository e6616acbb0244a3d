use std::fmt;
use std::str::FromStr;

/// Location identifier as it appears in an input table.
///
/// Fields that look like integers become [`LocId::Int`], anything else is kept verbatim as a
/// [`LocId::Name`].  The derived ordering puts every integer (numerically ordered) before every name.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum LocId {
  Int(i64),
  Name(String),
}

impl FromStr for LocId {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    match s.parse::<i64>() {
      Ok(i) => Ok(LocId::Int(i)),
      Err(_) => Ok(LocId::Name(s.to_string())),
    }
  }
}

impl fmt::Display for LocId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LocId::Int(i) => write!(f, "{}", i),
      LocId::Name(s) => f.write_str(s),
    }
  }
}

impl From<i64> for LocId {
  fn from(i: i64) -> Self { LocId::Int(i) }
}

impl From<&str> for LocId {
  fn from(s: &str) -> Self { LocId::Name(s.to_string()) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_and_order() {
    let mut ids: Vec<LocId> = ["1001402", "B", "1001400", " 9 ", "A"].iter()
      .map(|s| s.parse().unwrap())
      .collect();
    ids.sort();
    assert_eq!(ids, vec![
      LocId::Int(9),
      LocId::Int(1001400),
      LocId::Int(1001402),
      LocId::from("A"),
      LocId::from("B"),
    ]);
    assert_eq!(LocId::Int(1001400).to_string(), "1001400");
  }
}
