use thiserror::Error;

/// Identity store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// No identity exists for the phone. Not a backend failure: callers treat
    /// it as "new user".
    #[error("err phone not found")]
    NotFound,

    /// The upsert statement ran but touched no rows.
    #[error("err user not upserted")]
    NotUpserted,

    #[error("err inserting user: {0}")]
    UpsertFailed(#[source] Box<StoreError>),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}
