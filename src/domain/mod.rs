//! Domain rules: roles, container numbers, checklist, inspection lifecycle.

pub mod checklist;
pub mod container;
pub mod inspection;
pub mod role;

pub use checklist::{
    validate_responses, ChecklistItem, ChecklistResponseInput, ChecklistResult, ValidResponse,
    CHECKLIST,
};
pub use container::{normalize_seal_number, ContainerNumber};
pub use inspection::{CheckerVerdict, InspectionStatus, Stage};
pub use role::{Permission, Role};
