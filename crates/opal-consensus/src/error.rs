use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    PowErrParse,
    PowErrParam,
    PowErrDecode,
    PowErrWeight,
    PowErrL2,
    PowErrResidual,
    PowErrEquality,
    PowErrTarget,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::PowErrParse => "POW_ERR_PARSE",
            ErrorCode::PowErrParam => "POW_ERR_PARAM",
            ErrorCode::PowErrDecode => "POW_ERR_DECODE",
            ErrorCode::PowErrWeight => "POW_ERR_WEIGHT",
            ErrorCode::PowErrL2 => "POW_ERR_L2",
            ErrorCode::PowErrResidual => "POW_ERR_RESIDUAL",
            ErrorCode::PowErrEquality => "POW_ERR_EQUALITY",
            ErrorCode::PowErrTarget => "POW_ERR_TARGET",
        }
    }
}

/// Structured rejection reason. Diagnostic only: the consensus boundary is
/// `check_pow`, which collapses every reason to a plain reject.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PowError {
    pub code: ErrorCode,
    pub msg: &'static str,
}

impl PowError {
    pub fn new(code: ErrorCode, msg: &'static str) -> Self {
        Self { code, msg }
    }
}

impl fmt::Display for PowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.msg.is_empty() {
            write!(f, "{}", self.code.as_str())
        } else {
            write!(f, "{}: {}", self.code.as_str(), self.msg)
        }
    }
}

impl std::error::Error for PowError {}
