//! Inspection lifecycle enums.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionStatus {
    Pending,
    Checked,
}

impl InspectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Checked => "CHECKED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "CHECKED" => Some(Self::Checked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckerVerdict {
    Approved,
    Rejected,
}

impl CheckerVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// A rejection has to say why.
    pub fn remarks_required(&self) -> bool {
        matches!(self, Self::Rejected)
    }
}

/// Which inspection a response or photo belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Security,
    Checker,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Security => "SECURITY",
            Self::Checker => "CHECKER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SECURITY" => Some(Self::Security),
            "CHECKER" => Some(Self::Checker),
            _ => None,
        }
    }

    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::Checker => "checker",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rejection_requires_remarks() {
        assert!(CheckerVerdict::Rejected.remarks_required());
        assert!(!CheckerVerdict::Approved.remarks_required());
    }

    #[test]
    fn stage_parses_upper_case_only() {
        assert_eq!(Stage::from_str("CHECKER"), Some(Stage::Checker));
        assert_eq!(Stage::from_str("checker"), None);
    }
}
