use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeReason {
    WrongFieldCount { expected: &'static str, got: usize },
    InvalidInteger(String),
    InvalidFloat(String),
    InvalidBool(String),
}

/// A row that could not be turned into a typed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub field: &'static str,
    pub reason: DecodeReason,
}

impl DecodeError {
    pub fn field_count(expected: &'static str, got: usize) -> Self {
        Self {
            field: "row",
            reason: DecodeReason::WrongFieldCount { expected, got },
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            DecodeReason::WrongFieldCount { expected, got } => {
                write!(f, "expected {expected} fields, got {got}")
            }
            DecodeReason::InvalidInteger(raw) => {
                write!(f, "field `{}`: invalid integer {raw:?}", self.field)
            }
            DecodeReason::InvalidFloat(raw) => {
                write!(f, "field `{}`: invalid float {raw:?}", self.field)
            }
            DecodeReason::InvalidBool(raw) => {
                write!(f, "field `{}`: invalid bool {raw:?}", self.field)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// An inclusive run of trade ids that should have been present but was not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discontinuity {
    pub gap_start_id: i64,
    pub gap_end_id: i64,
    pub context: Option<String>,
}

impl Discontinuity {
    pub fn between(previous_last_id: i64, next_first_id: i64) -> Self {
        Self {
            gap_start_id: previous_last_id + 1,
            gap_end_id: next_first_id - 1,
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for Discontinuity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "trade ids not continuous: expected {} next, found {} (missing {}..={})",
            self.gap_start_id,
            self.gap_end_id + 1,
            self.gap_start_id,
            self.gap_end_id
        )?;
        if let Some(context) = &self.context {
            write!(f, " in {context}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    Decode {
        source: DecodeError,
        location: Option<String>,
    },
    Discontinuity(Discontinuity),
    Config(String),
    Transport(String),
    Invariant(String),
}

impl PipelineError {
    pub fn transport(context: impl fmt::Display, err: impl fmt::Display) -> Self {
        PipelineError::Transport(format!("{context}: {err}"))
    }

    /// Attaches a file or row location to decode and discontinuity failures.
    pub fn at(self, location: impl Into<String>) -> Self {
        match self {
            PipelineError::Decode { source, .. } => PipelineError::Decode {
                source,
                location: Some(location.into()),
            },
            PipelineError::Discontinuity(gap) if gap.context.is_none() => {
                PipelineError::Discontinuity(gap.with_context(location))
            }
            other => other,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Decode { .. } => "decode",
            PipelineError::Discontinuity(_) => "discontinuity",
            PipelineError::Config(_) => "config",
            PipelineError::Transport(_) => "transport",
            PipelineError::Invariant(_) => "invariant",
        }
    }
}

impl From<DecodeError> for PipelineError {
    fn from(source: DecodeError) -> Self {
        PipelineError::Decode {
            source,
            location: None,
        }
    }
}

impl From<Discontinuity> for PipelineError {
    fn from(gap: Discontinuity) -> Self {
        PipelineError::Discontinuity(gap)
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Decode { source, location } => match location {
                Some(location) => write!(f, "decode error in {location}: {source}"),
                None => write!(f, "decode error: {source}"),
            },
            PipelineError::Discontinuity(gap) => write!(f, "{gap}"),
            PipelineError::Config(msg) => write!(f, "invalid configuration: {msg}"),
            PipelineError::Transport(msg) => write!(f, "transport: {msg}"),
            PipelineError::Invariant(msg) => write!(f, "internal invariant violated: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}
