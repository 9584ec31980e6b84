use hwformal::expr::Sym;
use hwir::ErrorKind;
use strum::EnumIs;
use thiserror::Error;

#[derive(Debug, Error, EnumIs)]
pub enum HwError {
    #[error(transparent)]
    Ir(#[from] hwir::Error),

    #[error(transparent)]
    Formal(#[from] hwformal::Error),

    /// The composed specification did not reduce to `true`.
    #[error("Could not prove the specification of `{node}`: the relation reduced to `{residual}`.")]
    VerificationInconclusive { node: String, residual: Sym },

    #[error("The specification of `{node}` uses an unsupported construct: {reason}")]
    UnsupportedConstruct { node: String, reason: String },

    #[error(
        "Name `{name}` in the specification of `{node}` is neither a parameter, a local binding nor a captured value."
    )]
    UnresolvedName { node: String, name: String },

    #[error("Node `{node}` is a {kind} and has no declared specification to verify.")]
    NotSpecified { node: String, kind: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse check configuration '{file}': {source}")]
    ConfigParse { source: toml::de::Error, file: String },
}

impl HwError {
    /// Classification shared with [`hwir::Error::kind`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            HwError::Ir(err) => err.kind(),
            HwError::Formal(err) => hwir::utils::spec_error_kind(err),
            HwError::VerificationInconclusive { .. } => ErrorKind::VerificationInconclusive,
            HwError::UnsupportedConstruct { .. } => ErrorKind::UnsupportedConstruct,
            // Bad specs and bad configuration abort like any other build error.
            HwError::UnresolvedName { .. }
            | HwError::NotSpecified { .. }
            | HwError::Io(_)
            | HwError::ConfigParse { .. } => ErrorKind::Construction,
        }
    }

    #[inline]
    pub fn is_recoverable(&self) -> bool {
        self.kind().is_recoverable()
    }

    /// Attribute a spec interpretation failure to `node`.
    pub fn from_spec(node: &str, err: hwformal::Error) -> Self {
        match err {
            hwformal::Error::UnsupportedConstruct { reason } => HwError::UnsupportedConstruct {
                node: node.to_string(),
                reason,
            },
            hwformal::Error::UnresolvedName { name } => HwError::UnresolvedName {
                node: node.to_string(),
                name,
            },
            hwformal::Error::NotClosedForm { residual, .. } => HwError::VerificationInconclusive {
                node: node.to_string(),
                residual,
            },
            other => HwError::Formal(other),
        }
    }
}

pub type HwResult<T> = Result<T, HwError>;
