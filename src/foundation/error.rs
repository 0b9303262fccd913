pub type UpscaleResult<T> = Result<T, UpscaleError>;

#[derive(thiserror::Error, Debug)]
pub enum UpscaleError {
    /// The intermediate buffer could not be (re)allocated. Fatal for the pass.
    #[error("allocation error: {0}")]
    Allocation(String),

    /// The native backend cannot be reached. Surfaced once, at initialization.
    #[error("native boundary error: {0}")]
    Boundary(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UpscaleError {
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }

    pub fn boundary(msg: impl Into<String>) -> Self {
        Self::Boundary(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// `true` for errors that should disable the feature for the rest of the session.
    pub fn is_boundary(&self) -> bool {
        matches!(self, Self::Boundary(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            UpscaleError::allocation("x")
                .to_string()
                .contains("allocation error:")
        );
        assert!(
            UpscaleError::boundary("x")
                .to_string()
                .contains("native boundary error:")
        );
        assert!(
            UpscaleError::config("x")
                .to_string()
                .contains("configuration error:")
        );
    }

    #[test]
    fn only_boundary_errors_disable_the_feature() {
        assert!(UpscaleError::boundary("library not loaded").is_boundary());
        assert!(!UpscaleError::allocation("out of memory").is_boundary());
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = UpscaleError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
