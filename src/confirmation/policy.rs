//! Which operations need human approval.

use globset::{Glob, GlobSet, GlobSetBuilder};

/// Decides whether an operation must pass the confirmation gate.
pub trait ConfirmationPolicy: Send + Sync + 'static {
    fn requires_confirmation(&self, operation_id: &str) -> bool;
}

/// Gate operations whose id matches any configured glob.
///
/// # Examples
///
/// ```
/// use gatekeeper::confirmation::{ConfirmationPolicy, GlobPolicy};
///
/// let policy = GlobPolicy::new(&["deploy.*".to_string()]).unwrap();
/// assert!(policy.requires_confirmation("deploy.production"));
/// assert!(!policy.requires_confirmation("chat.reply"));
/// ```
#[derive(Debug, Clone)]
pub struct GlobPolicy {
    set: GlobSet,
    patterns: Vec<String>,
}

impl GlobPolicy {
    pub fn new(patterns: &[String]) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern)?);
        }
        Ok(Self {
            set: builder.build()?,
            patterns: patterns.to_vec(),
        })
    }

    /// Policy gating nothing.
    pub fn none() -> Self {
        Self {
            set: GlobSet::empty(),
            patterns: Vec::new(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl ConfirmationPolicy for GlobPolicy {
    fn requires_confirmation(&self, operation_id: &str) -> bool {
        self.set.is_match(operation_id)
    }
}
