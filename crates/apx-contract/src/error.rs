use apx_schemas::ContractKey;

/// Fatal: the contract cannot serve as an oracle. Aborts the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractParseError {
    /// The file could not be read.
    Io { path: String, message: String },
    /// The document is not valid YAML or does not match the contract schema.
    Malformed { message: String },
    /// The document carries no `version`.
    MissingVersion,
    /// The caller asked for one version, the document is another.
    VersionMismatch { expected: String, found: String },
    /// Entry `index` has an empty target.
    EmptyTarget { index: usize },
    UnknownTransport { target: String, raw: String },
    UnknownMethod { target: String, raw: String },
    /// e.g. `GET` declared over WS.
    MethodTransportMismatch {
        target: String,
        method: String,
        transport: String,
    },
    UnknownSigningRule { target: String, rule: String },
    UnknownUseCase { target: String, use_case: String },
    UnknownEnvironment { raw: String },
    FieldBothRequiredAndOptional { target: String, field: String },
    EnumOnUndeclaredField { target: String, field: String },
    EmptyEnum { target: String, field: String },
    /// Declared `symbol_format` contradicts the transport's required form.
    SymbolFormatConflict {
        target: String,
        declared: String,
        transport: String,
    },
    /// Two entries normalize to the same (`target`, `transport`, `method`).
    DuplicateEntry { key: ContractKey },
}

impl std::fmt::Display for ContractParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "CONTRACT_PARSE_ERROR: cannot read '{path}': {message}")
            }
            Self::Malformed { message } => {
                write!(f, "CONTRACT_PARSE_ERROR: malformed document: {message}")
            }
            Self::MissingVersion => {
                write!(f, "CONTRACT_PARSE_ERROR: document has no version")
            }
            Self::VersionMismatch { expected, found } => write!(
                f,
                "CONTRACT_PARSE_ERROR: expected contract version '{expected}', document is '{found}'"
            ),
            Self::EmptyTarget { index } => {
                write!(f, "CONTRACT_PARSE_ERROR: entry #{index} has an empty target")
            }
            Self::UnknownTransport { target, raw } => write!(
                f,
                "CONTRACT_PARSE_ERROR: entry '{target}' has unrecognised transport '{raw}'"
            ),
            Self::UnknownMethod { target, raw } => write!(
                f,
                "CONTRACT_PARSE_ERROR: entry '{target}' has unrecognised method '{raw}'"
            ),
            Self::MethodTransportMismatch {
                target,
                method,
                transport,
            } => write!(
                f,
                "CONTRACT_PARSE_ERROR: entry '{target}' declares method {method} over {transport}"
            ),
            Self::UnknownSigningRule { target, rule } => write!(
                f,
                "CONTRACT_PARSE_ERROR: entry '{target}' references unknown signing rule '{rule}'"
            ),
            Self::UnknownUseCase { target, use_case } => write!(
                f,
                "CONTRACT_PARSE_ERROR: entry '{target}' references unknown use case '{use_case}'"
            ),
            Self::UnknownEnvironment { raw } => write!(
                f,
                "CONTRACT_PARSE_ERROR: base_urls has unrecognised environment '{raw}'"
            ),
            Self::FieldBothRequiredAndOptional { target, field } => write!(
                f,
                "CONTRACT_PARSE_ERROR: entry '{target}' lists field '{field}' as both required and optional"
            ),
            Self::EnumOnUndeclaredField { target, field } => write!(
                f,
                "CONTRACT_PARSE_ERROR: entry '{target}' declares an enum for undeclared field '{field}'"
            ),
            Self::EmptyEnum { target, field } => write!(
                f,
                "CONTRACT_PARSE_ERROR: entry '{target}' declares an empty enum for field '{field}'"
            ),
            Self::SymbolFormatConflict {
                target,
                declared,
                transport,
            } => write!(
                f,
                "CONTRACT_PARSE_ERROR: entry '{target}' declares symbol format '{declared}' which {transport} does not use"
            ),
            Self::DuplicateEntry { key } => {
                write!(f, "CONTRACT_PARSE_ERROR: duplicate entry for {key}")
            }
        }
    }
}

impl std::error::Error for ContractParseError {}
