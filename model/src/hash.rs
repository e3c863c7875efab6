use std::{
    fmt,
    io::{self, Write},
    str::FromStr,
};

use base64::Engine as _;
use serde::Serialize;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use sha2::Digest as _;

use crate::Error;

/// SHA-256 digest over the durable state of a definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, DeserializeFromStr, SerializeDisplay)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub const ALG: &'static str = "sha256";

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Digest the canonical JSON serialization of `value`.
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Self {
        struct HashWriter<'a>(&'a mut sha2::Sha256);

        impl Write for HashWriter<'_> {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.update(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut hasher = sha2::Sha256::new();
        serde_json::to_writer(HashWriter(&mut hasher), value)
            .expect("hashing record JSON cannot fail");
        Self(hasher.finalize().into())
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for ContentHash {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let Some((alg, hash_b64)) = input.split_once(':') else {
            return Err(Error::InvalidContentHash(input.to_string()));
        };
        if alg != Self::ALG {
            return Err(Error::InvalidContentHash(input.to_string()));
        }

        let hash = base64::engine::general_purpose::STANDARD
            .decode(hash_b64)
            .map_err(|_| Error::InvalidContentHash(input.to_string()))?;
        let Ok(bytes) = hash.as_slice().try_into() else {
            return Err(Error::InvalidContentHash(input.to_string()));
        };

        Ok(Self(bytes))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::ALG)?;
        f.write_str(":")?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(self);
        f.write_str(&encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_parses_back() {
        let hash = ContentHash::of("definition");
        let text = hash.to_string();
        assert!(text.starts_with("sha256:"));
        assert_eq!(text.parse::<ContentHash>().unwrap(), hash);
    }

    #[test]
    fn rejects_foreign_algorithms_and_lengths() {
        assert!("md5:AAAA".parse::<ContentHash>().is_err());
        assert!("sha256:AAAA".parse::<ContentHash>().is_err());
        assert!("sha256".parse::<ContentHash>().is_err());
    }
}
