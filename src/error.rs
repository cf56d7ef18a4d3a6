/// All errors that can occur in this crate.
///
/// Missing, corrupt or undecryptable session payloads are not errors.
/// Strategies report them as "no session", and the session store then starts a fresh session.
#[derive(Debug, thiserror::Error)]
#[allow(missing_copy_implementations)]
pub enum Error {
    /// The file session store was given a cache that is not a [`FileCache`](crate::FileCache).
    /// Sweeping expired sessions only works on a directory of session files.
    #[error("the file session store requires a file cache")]
    FileCacheRequired,

    /// The sweep lottery odds cannot be drawn.
    #[error("invalid sweep lottery odds: {chance} out of {out_of}")]
    InvalidSweepOdds {
        /// The number of winning draws.
        chance: u32,
        /// The total number of draws.
        out_of: u32,
    },

    /// A session record could not be serialized.
    #[error("failed to serialize the session record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A filesystem operation failed.
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    /// An error occurred in a collaborator, such as the cache service or the encrypter.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

mod expect_impl_error {
    trait ExpectImplError: std::error::Error + Send + Sync + 'static {}

    impl ExpectImplError for super::Error {}
}
