/// Source of candidate script identifiers.
///
/// Generators are stateless and never check for collisions; the repository
/// retries against its own map until it finds a free identifier.
#[cfg_attr(test, mockall::automock)]
pub trait IdGenerator {
    fn generate(&self) -> String;
}

/// Minimum entropy accepted for generated identifiers.
pub const MIN_ID_BYTES: usize = 6;

/// Hex-encoded random bytes, e.g. `9f3a01c2e47b` for six bytes.
#[derive(Debug, Clone)]
pub struct RandomHexIds {
    bytes: usize,
}

impl RandomHexIds {
    /// Create a generator producing `bytes` random bytes per id.
    /// Values below [`MIN_ID_BYTES`] are raised to the minimum.
    pub fn new(bytes: usize) -> Self {
        Self {
            bytes: bytes.max(MIN_ID_BYTES),
        }
    }
}

impl Default for RandomHexIds {
    fn default() -> Self {
        Self::new(MIN_ID_BYTES)
    }
}

impl IdGenerator for RandomHexIds {
    fn generate(&self) -> String {
        (0..self.bytes)
            .map(|_| format!("{:02x}", rand::random::<u8>()))
            .collect()
    }
}
