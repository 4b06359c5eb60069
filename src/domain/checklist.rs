//! The 17-point container inspection checklist and response validation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChecklistItem {
    pub code: &'static str,
    pub label: &'static str,
}

pub const CHECKLIST: &[ChecklistItem] = &[
    ChecklistItem { code: "BUMPER", label: "Bumper" },
    ChecklistItem { code: "ENGINE", label: "Engine" },
    ChecklistItem { code: "TIRES", label: "Tires (truck and trailer)" },
    ChecklistItem { code: "FLOOR", label: "Floor (inside truck)" },
    ChecklistItem { code: "FUEL_TANKS", label: "Fuel tanks" },
    ChecklistItem { code: "CAB_STORAGE", label: "Cab / storage compartments" },
    ChecklistItem { code: "AIR_TANKS", label: "Air tanks" },
    ChecklistItem { code: "DRIVE_SHAFTS", label: "Drive shafts" },
    ChecklistItem { code: "FIFTH_WHEEL", label: "Fifth wheel" },
    ChecklistItem { code: "UNDERCARRIAGE", label: "Outside / undercarriage" },
    ChecklistItem { code: "DOORS", label: "Outside / inside doors" },
    ChecklistItem { code: "RIGHT_SIDE", label: "Right side" },
    ChecklistItem { code: "LEFT_SIDE", label: "Left side" },
    ChecklistItem { code: "FRONT_WALL", label: "Front wall" },
    ChecklistItem { code: "CEILING_ROOF", label: "Ceiling / roof" },
    ChecklistItem { code: "REFRIGERATION_UNIT", label: "Refrigeration unit" },
    ChecklistItem { code: "EXHAUST", label: "Exhaust" },
];

pub fn find_item(code: &str) -> Option<(usize, &'static ChecklistItem)> {
    CHECKLIST.iter().enumerate().find(|(_, item)| item.code == code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChecklistResult {
    Pass,
    Fail,
    NotApplicable,
}

impl ChecklistResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::NotApplicable => "NOT_APPLICABLE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PASS" => Some(Self::Pass),
            "FAIL" => Some(Self::Fail),
            "NOT_APPLICABLE" => Some(Self::NotApplicable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistResponseInput {
    pub item_code: String,
    pub result: ChecklistResult,
    pub note: Option<String>,
}

/// A response that passed validation, positioned in checklist order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidResponse {
    pub item_code: &'static str,
    pub position: usize,
    pub result: ChecklistResult,
    pub note: String,
}

/// Every item answered exactly once, no unknown codes, and every FAIL explained.
pub fn validate_responses(input: &[ChecklistResponseInput]) -> Result<Vec<ValidResponse>, String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(CHECKLIST.len());

    for r in input {
        let code = r.item_code.trim();
        let (position, item) =
            find_item(code).ok_or_else(|| format!("unknown checklist item: {}", code))?;
        if !seen.insert(item.code) {
            return Err(format!("checklist item answered twice: {}", item.code));
        }
        let note = r.note.as_deref().unwrap_or("").trim().to_string();
        if r.result == ChecklistResult::Fail && note.is_empty() {
            return Err(format!("a note is required for failed item {}", item.code));
        }
        out.push(ValidResponse {
            item_code: item.code,
            position,
            result: r.result,
            note,
        });
    }

    let missing: Vec<&str> = CHECKLIST
        .iter()
        .filter(|item| !seen.contains(item.code))
        .map(|item| item.code)
        .collect();
    if !missing.is_empty() {
        return Err(format!("checklist items not answered: {}", missing.join(", ")));
    }

    out.sort_by_key(|r| r.position);
    Ok(out)
}
