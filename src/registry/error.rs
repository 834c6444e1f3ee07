/// Errors that can occur during registry operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("descriptor already exists: {0}")]
    DuplicateDescriptor(String),

    #[error("descriptor not found: {0}")]
    DescriptorNotFound(String),
}
