//! Nomenclature slots: one position in a festival's naming template.
//!
//! A slot binds a [`Parameter`] to an order position plus separator,
//! prefix/suffix, default value and required/active flags. The slot
//! references its parameter but never owns it; a slot whose parameter no
//! longer resolves contributes nothing to the built nomenclature.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::movie::Movie;
use crate::parameter::Parameter;
use crate::types::DbId;

/// Characters that may not appear in a separator, since the nomenclature is
/// used as a filename.
pub const ILLEGAL_SEPARATOR_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// One configured position in a festival's nomenclature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NomenclatureSlot {
    pub id: DbId,
    pub festival_id: DbId,
    pub parameter_id: Option<DbId>,
    /// The referenced parameter, when it was loaded alongside the slot.
    #[serde(default)]
    pub parameter: Option<Parameter>,
    pub order_position: i32,
    pub is_active: bool,
    pub is_required: bool,
    pub separator: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub default_value: Option<String>,
}

impl NomenclatureSlot {
    /// The referenced parameter, or `None` for a dangling reference.
    pub fn resolve_parameter(&self) -> Option<&Parameter> {
        match (self.parameter_id, self.parameter.as_ref()) {
            (Some(id), Some(parameter)) if parameter.id == id => Some(parameter),
            _ => None,
        }
    }

    /// Wrap a formatted value with this slot's prefix and suffix.
    ///
    /// A blank value yields an empty string, which the builder drops.
    pub fn format_parameter_value(&self, value: &str) -> String {
        if value.trim().is_empty() {
            return String::new();
        }
        format!(
            "{}{value}{}",
            self.prefix.as_deref().unwrap_or_default(),
            self.suffix.as_deref().unwrap_or_default()
        )
    }

    /// Slot default value, if non-blank.
    pub fn default_value(&self) -> Option<&str> {
        self.default_value
            .as_deref()
            .filter(|v| !v.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Slot formatting capability
// ---------------------------------------------------------------------------

/// Slot-level formatting applied after the parameter's own formatting.
pub trait SlotFormatter: Send + Sync {
    fn format_slot(&self, slot: &NomenclatureSlot, value: &str, movie: &Movie) -> String;
}

/// Prefix/suffix wrapping with no movie-dependent transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct AffixSlotFormatter;

impl SlotFormatter for AffixSlotFormatter {
    fn format_slot(&self, slot: &NomenclatureSlot, value: &str, _movie: &Movie) -> String {
        slot.format_parameter_value(value)
    }
}

// ---------------------------------------------------------------------------
// Configuration checks
// ---------------------------------------------------------------------------

/// A problem found in a festival's slot configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SlotIssue {
    /// Several active slots share one order position.
    DuplicatePosition { order_position: i32, slot_ids: Vec<DbId> },
    /// The slot's parameter does not resolve; it is skipped when building.
    DanglingParameter { slot_id: DbId },
    /// A required slot whose parameter does not resolve. The builder still
    /// skips it without a warning.
    RequiredDanglingParameter { slot_id: DbId },
    /// The separator contains characters not allowed in filenames.
    IllegalSeparator { slot_id: DbId, separator: String },
}

impl SlotIssue {
    /// Human-readable description for display.
    pub fn message(&self) -> String {
        match self {
            Self::DuplicatePosition {
                order_position,
                slot_ids,
            } => format!(
                "Order position {order_position} is used by {} active slots",
                slot_ids.len()
            ),
            Self::DanglingParameter { slot_id } => {
                format!("Slot {slot_id} references a parameter that no longer exists")
            }
            Self::RequiredDanglingParameter { slot_id } => format!(
                "Required slot {slot_id} references a parameter that no longer exists"
            ),
            Self::IllegalSeparator { slot_id, separator } => {
                format!("Slot {slot_id} uses illegal separator '{separator}'")
            }
        }
    }
}

/// Check a festival's slots for configuration problems.
///
/// Only active slots are considered. Issues are returned in a stable order:
/// duplicate positions first (by position), then per-slot issues in input
/// order.
pub fn validate_slot_configuration(slots: &[NomenclatureSlot]) -> Vec<SlotIssue> {
    let active: Vec<&NomenclatureSlot> = slots.iter().filter(|s| s.is_active).collect();

    let mut by_position: BTreeMap<i32, Vec<DbId>> = BTreeMap::new();
    for slot in &active {
        by_position
            .entry(slot.order_position)
            .or_default()
            .push(slot.id);
    }

    let mut issues: Vec<SlotIssue> = by_position
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(order_position, slot_ids)| SlotIssue::DuplicatePosition {
            order_position,
            slot_ids,
        })
        .collect();

    for slot in active {
        if slot.resolve_parameter().is_none() {
            issues.push(if slot.is_required {
                SlotIssue::RequiredDanglingParameter { slot_id: slot.id }
            } else {
                SlotIssue::DanglingParameter { slot_id: slot.id }
            });
        }
        if let Some(separator) = slot.separator.as_deref() {
            if separator.contains(ILLEGAL_SEPARATOR_CHARS) {
                issues.push(SlotIssue::IllegalSeparator {
                    slot_id: slot.id,
                    separator: separator.to_string(),
                });
            }
        }
    }

    issues
}

/// Position to give a slot appended at the end of the configuration.
pub fn next_order_position(slots: &[NomenclatureSlot]) -> i32 {
    slots
        .iter()
        .map(|s| s.order_position)
        .max()
        .map_or(1, |max| max + 1)
}


#[cfg(test)]
mod tests {
    use super::test_support::slot;
    use super::*;
    use crate::parameter::test_support::parameter;

    fn param_with_id(id: DbId, code: &str) -> Parameter {
        let mut p = parameter(code, code);
        p.id = id;
        p
    }

    #[test]
    fn resolve_parameter_requires_matching_id() {
        let s = slot(1, 1, Some(param_with_id(5, "TITLE")));
        assert_eq!(s.resolve_parameter().map(|p| p.id), Some(5));

        let mut mismatched = s.clone();
        mismatched.parameter_id = Some(6);
        assert!(mismatched.resolve_parameter().is_none());

        let dangling = slot(2, 2, None);
        assert!(dangling.resolve_parameter().is_none());
    }

    #[test]
    fn format_parameter_value_wraps_affixes() {
        let mut s = slot(1, 1, None);
        s.prefix = Some("v".to_string());
        s.suffix = Some("-OV".to_string());
        assert_eq!(s.format_parameter_value("2"), "v2-OV");
        assert_eq!(s.format_parameter_value("  "), "");
    }

    #[test]
    fn affix_formatter_delegates_to_slot() {
        let mut s = slot(1, 1, None);
        s.prefix = Some("R".to_string());
        let movie = Movie::new(1, "X");
        assert_eq!(AffixSlotFormatter.format_slot(&s, "3", &movie), "R3");
    }

    #[test]
    fn blank_default_value_is_ignored() {
        let mut s = slot(1, 1, None);
        s.default_value = Some(" ".to_string());
        assert_eq!(s.default_value(), None);
        s.default_value = Some("OV".to_string());
        assert_eq!(s.default_value(), Some("OV"));
    }

    #[test]
    fn detects_duplicate_active_positions() {
        let mut inactive = slot(3, 1, Some(param_with_id(3, "C")));
        inactive.is_active = false;
        let slots = vec![
            slot(1, 1, Some(param_with_id(1, "A"))),
            slot(2, 1, Some(param_with_id(2, "B"))),
            inactive,
        ];
        let issues = validate_slot_configuration(&slots);
        assert_eq!(
            issues,
            vec![SlotIssue::DuplicatePosition {
                order_position: 1,
                slot_ids: vec![1, 2],
            }]
        );
    }

    #[test]
    fn flags_dangling_and_required_dangling_slots() {
        let mut required = slot(2, 2, None);
        required.is_required = true;
        let slots = vec![slot(1, 1, None), required];
        let issues = validate_slot_configuration(&slots);
        assert_eq!(
            issues,
            vec![
                SlotIssue::DanglingParameter { slot_id: 1 },
                SlotIssue::RequiredDanglingParameter { slot_id: 2 },
            ]
        );
        assert!(issues[1].message().contains("Required slot 2"));
    }

    #[test]
    fn flags_illegal_separator() {
        let mut s = slot(1, 1, Some(param_with_id(1, "A")));
        s.separator = Some("/".to_string());
        assert_eq!(
            validate_slot_configuration(&[s]),
            vec![SlotIssue::IllegalSeparator {
                slot_id: 1,
                separator: "/".to_string(),
            }]
        );
    }

    #[test]
    fn next_position_appends() {
        assert_eq!(next_order_position(&[]), 1);
        let slots = vec![slot(1, 4, None), slot(2, 2, None)];
        assert_eq!(next_order_position(&slots), 5);
    }
}
