use crate::hardware::DeviceKind;

#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("no {kind} named \"{name}\" in the hardware map")]
    MissingDevice { name: String, kind: DeviceKind },

    #[error("\"{name}\" is a {found}, expected a {expected}")]
    WrongKind {
        name: String,
        expected: DeviceKind,
        found: DeviceKind,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("a path chain needs at least one segment")]
    Empty,

    #[error("a curve needs at least two control points")]
    DegenerateCurve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SequenceError {
    #[error("shooter not configured, call with_shooter() before adding a shoot step")]
    ShooterNotConfigured,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DashboardError {
    #[error("dashboard disconnected")]
    Disconnected,

    #[error("dashboard rejected draw call: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RoutineError {
    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    #[error(transparent)]
    Sequence(#[from] SequenceError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown alliance \"{0}\", expected \"blue\" or \"red\"")]
pub struct UnknownAlliance(pub String);
