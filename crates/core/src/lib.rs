#![forbid(unsafe_code)]

pub mod tree;

pub mod ids {
    use rand::Rng;

    const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    const DOCUMENT_ID_ALPHABET: &[u8] =
        b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

    pub const CATEGORY_ID_LEN: usize = 8;
    pub const DOCUMENT_ID_LEN: usize = 20;

    #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct WorkspaceId(String);

    impl WorkspaceId {
        pub fn as_str(&self) -> &str {
            &self.0
        }

        pub fn try_new(value: impl Into<String>) -> Result<Self, WorkspaceIdError> {
            let value = value.into();
            validate_workspace_id(&value)?;
            Ok(Self(value))
        }
    }

    impl std::fmt::Display for WorkspaceId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum WorkspaceIdError {
        Empty,
        TooLong,
        InvalidFirstChar,
        InvalidChar { ch: char, index: usize },
    }

    impl std::fmt::Display for WorkspaceIdError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Empty => write!(f, "workspace id must not be empty"),
                Self::TooLong => write!(f, "workspace id is too long"),
                Self::InvalidFirstChar => {
                    write!(f, "workspace id must start with an ascii letter or digit")
                }
                Self::InvalidChar { ch, index } => {
                    write!(f, "workspace id has invalid char {ch:?} at {index}")
                }
            }
        }
    }

    impl std::error::Error for WorkspaceIdError {}

    fn validate_workspace_id(value: &str) -> Result<(), WorkspaceIdError> {
        let Some(first) = value.chars().next() else {
            return Err(WorkspaceIdError::Empty);
        };
        if value.len() > 128 {
            return Err(WorkspaceIdError::TooLong);
        }
        if !first.is_ascii_alphanumeric() {
            return Err(WorkspaceIdError::InvalidFirstChar);
        }
        for (index, ch) in value.chars().enumerate().skip(1) {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                continue;
            }
            return Err(WorkspaceIdError::InvalidChar { ch, index });
        }
        Ok(())
    }

    /// Short lowercase base-36 id used for category nodes.
    ///
    /// No collision check happens here; callers that need uniqueness within a
    /// tree should go through [`crate::tree::CategoryTree::unique_category_id`].
    pub fn new_category_id() -> String {
        random_string(ID_ALPHABET, CATEGORY_ID_LEN)
    }

    /// Store-assigned document id (mixed-case alphanumeric).
    pub fn new_document_id() -> String {
        random_string(DOCUMENT_ID_ALPHABET, DOCUMENT_ID_LEN)
    }

    fn random_string(alphabet: &[u8], len: usize) -> String {
        let mut rng = rand::rng();
        (0..len)
            .map(|_| alphabet[rng.random_range(0..alphabet.len())] as char)
            .collect()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn workspace_id_validation() {
            assert_eq!(WorkspaceId::try_new("").unwrap_err(), WorkspaceIdError::Empty);
            assert_eq!(
                WorkspaceId::try_new("-ws").unwrap_err(),
                WorkspaceIdError::InvalidFirstChar
            );
            assert_eq!(
                WorkspaceId::try_new("ws/main").unwrap_err(),
                WorkspaceIdError::InvalidChar { ch: '/', index: 2 }
            );
            assert_eq!(
                WorkspaceId::try_new("x".repeat(129)).unwrap_err(),
                WorkspaceIdError::TooLong
            );
            assert_eq!(WorkspaceId::try_new("acme_2024").unwrap().as_str(), "acme_2024");
        }

        #[test]
        fn generated_ids_have_expected_shape() {
            let id = new_category_id();
            assert_eq!(id.len(), CATEGORY_ID_LEN);
            assert!(id.bytes().all(|b| ID_ALPHABET.contains(&b)));

            let doc = new_document_id();
            assert_eq!(doc.len(), DOCUMENT_ID_LEN);
            assert!(doc.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }
}

pub mod clock {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub trait Clock {
        fn now_ms(&self) -> i64;
    }

    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now_ms(&self) -> i64 {
            let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
                Ok(duration) => duration,
                Err(_) => return 0,
            };
            i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
        }
    }

    /// Settable clock for tests. Clones share the same instant.
    #[derive(Clone, Debug, Default)]
    pub struct ManualClock {
        now: Arc<AtomicI64>,
    }

    impl ManualClock {
        pub fn new(start_ms: i64) -> Self {
            Self {
                now: Arc::new(AtomicI64::new(start_ms)),
            }
        }

        pub fn advance_ms(&self, delta_ms: i64) {
            self.now.fetch_add(delta_ms, Ordering::SeqCst);
        }

        pub fn advance_minutes(&self, minutes: i64) {
            self.advance_ms(minutes.saturating_mul(60_000));
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> i64 {
            self.now.load(Ordering::SeqCst)
        }
    }

    impl<C: Clock + ?Sized> Clock for &C {
        fn now_ms(&self) -> i64 {
            (**self).now_ms()
        }
    }
}
