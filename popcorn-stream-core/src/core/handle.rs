use std::time::{SystemTime, UNIX_EPOCH};

use derive_more::Display;
use rand::Rng;

/// A unique opaque handle which can be used as resource identifier.
///
/// # Example
///
/// ```
/// use popcorn_stream_core::core::Handle;
///
/// let handle = Handle::new();
/// println!("Generated Handle: {}", handle);
/// ```
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Hash)]
#[display("{:x}", handle)]
pub struct Handle {
    handle: i64,
}

impl Handle {
    /// Creates a new `Handle` with a unique identifier.
    /// The upper half is the creation timestamp in seconds, the lower half is random.
    pub fn new() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|e| e.as_secs() as i64)
            .unwrap_or_default();

        let mut rng = rand::thread_rng();
        let random_number: i64 = rng.gen();

        Self {
            handle: (timestamp << 32) | (random_number & 0xFFFF_FFFF),
        }
    }

    /// Retrieve the underlying value of the handle.
    pub fn value(&self) -> i64 {
        self.handle
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::new()
    }
}
