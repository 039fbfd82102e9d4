pub type AttestaResult<T> = Result<T, AttestaError>;

#[derive(thiserror::Error, Debug)]
pub enum AttestaError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("asset missing: {0}")]
    AssetMissing(String),

    #[error("import error: {0}")]
    Import(String),

    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AttestaError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn asset_missing(msg: impl Into<String>) -> Self {
        Self::AssetMissing(msg.into())
    }

    pub fn import(msg: impl Into<String>) -> Self {
        Self::Import(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}
