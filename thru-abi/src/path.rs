//! Decode-time context path, e.g. `Root.foo[3].bar` (spec §9: "Error
//! context").

#[derive(Debug, Clone)]
pub struct DecodePath(String);

impl DecodePath {
    pub fn root(type_name: &str) -> Self {
        DecodePath(type_name.to_string())
    }

    pub fn field(&self, name: &str) -> Self {
        DecodePath(format!("{}.{}", self.0, name))
    }

    pub fn index(&self, i: usize) -> Self {
        DecodePath(format!("{}[{}]", self.0, i))
    }

    pub fn variant(&self, name: &str) -> Self {
        DecodePath(format!("{}::{}", self.0, name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DecodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
