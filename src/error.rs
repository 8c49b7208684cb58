use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures raised while binding, resolving or calling a cached method.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot re-assign cached method '{existing}' to a different operation '{attempted}'.")]
    OperationConflict { existing: String, attempted: String },

    #[error("Cannot assign the same cached method to two different names ('{first}' and '{second}').")]
    NameConflict { first: String, second: String },

    #[error(
        "Cannot use cached method '{method}' before it is attached to a type under an attribute name."
    )]
    UnboundAccess { method: String },

    #[error("No attribute store on '{type_name}' instance to cache '{attribute}' method.")]
    NoAttributeStore { type_name: String, attribute: String },

    #[error(
        "The attribute store on '{type_name}' instance does not support item assignment for caching '{attribute}' method."
    )]
    ImmutableAttributeStore { type_name: String, attribute: String },

    #[error(
        "The attribute store on '{type_name}' instance rejected the cache for '{attribute}' method: {reason}"
    )]
    AttributeWrite {
        type_name: String,
        attribute: String,
        reason: String,
    },

    #[error(
        "Attribute '{attribute}' on '{type_name}' instance holds a value that is not a cache for this method."
    )]
    AttributeShadowed { type_name: String, attribute: String },

    #[error(
        "Bound object of '{method}' has been garbage collected and the method cannot be called anymore."
    )]
    OwnerCollected { method: String },

    /// The wrapped operation failed. Never cached.
    #[error(transparent)]
    Operation(#[from] anyhow::Error),
}

impl Error {
    /// True for failures caused by misuse of the binder or the host object,
    /// as opposed to failures of the call itself.
    pub fn is_binding_error(&self) -> bool {
        !matches!(self, Error::OwnerCollected { .. } | Error::Operation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_type_and_attribute() {
        let err = Error::NoAttributeStore {
            type_name: "WithSlots".into(),
            attribute: "compute".into(),
        };
        assert_eq!(
            err.to_string(),
            "No attribute store on 'WithSlots' instance to cache 'compute' method."
        );

        let err = Error::NameConflict {
            first: "a".into(),
            second: "b".into(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot assign the same cached method to two different names ('a' and 'b')."
        );
        assert!(err.is_binding_error());
    }

    #[test]
    fn operation_errors_are_transparent() {
        let err = Error::from(anyhow::anyhow!("division by zero"));
        assert_eq!(err.to_string(), "division by zero");
        assert!(!err.is_binding_error());
    }
}
