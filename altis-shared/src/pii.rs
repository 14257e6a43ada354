use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps a credential or personal identifier so that `Debug` and `Display`
/// never print it. Serialization still emits the real value, which the
/// storage adapters rely on when persisting accounts.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(T);

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the secret. Callers must not feed this into log macros.
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_hides_value_in_formatting() {
        let secret = Masked::new(String::from("hunter2"));
        assert_eq!(format!("{:?}", secret), "********");
        assert_eq!(secret.to_string(), "********");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_masked_serializes_inner_value() {
        let secret = Masked::new(String::from("hunter2"));
        let json = serde_json::to_string(&secret).unwrap();
        assert_eq!(json, "\"hunter2\"");

        let back: Masked<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, secret);
    }
}
