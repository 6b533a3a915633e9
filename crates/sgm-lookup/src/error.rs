//! Lookup capability errors

/// Failure reported by a lookup implementation
///
/// `Clone` so cached lookups can hand the same failure to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// Provider API call failed (network, throttling, 5xx)
    #[error("{operation} failed: {message}")]
    Transport {
        /// Operation being performed
        operation: String,
        /// Provider message
        message: String,
    },

    /// Provider rejected the request (validation, permissions, limits)
    #[error("{operation} rejected: {message}")]
    Rejected {
        /// Operation being performed
        operation: String,
        /// Provider message
        message: String,
    },
}

impl LookupError {
    /// Create transport error
    #[inline]
    pub fn transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create rejection error
    #[inline]
    pub fn rejected(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether the failure came from the transport rather than the request
    #[inline]
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_error_display() {
        let err = LookupError::transport("DescribeSecurityGroups", "connection reset");
        assert_eq!(err.to_string(), "DescribeSecurityGroups failed: connection reset");
        assert!(err.is_transport());
        assert!(!LookupError::rejected("CreateSecurityGroup", "limit exceeded").is_transport());
    }
}
