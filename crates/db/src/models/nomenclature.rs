//! Models for the `nomenclatures` table (festival slot configuration).

use dcprism_core::parameter::Parameter;
use dcprism_core::slot::NomenclatureSlot;
use dcprism_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::parameter::ParameterRow;

/// A row from the `nomenclatures` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NomenclatureRow {
    pub id: DbId,
    pub festival_id: DbId,
    pub parameter_id: Option<DbId>,
    pub order_position: i32,
    pub is_active: bool,
    pub is_required: bool,
    pub separator: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub default_value: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A slot row `LEFT JOIN`ed with its parameter. Parameter columns are
/// prefixed `p_` and are all `NULL` for a dangling reference.
#[derive(Debug, Clone, FromRow)]
pub struct NomenclatureWithParameterRow {
    #[sqlx(flatten)]
    pub slot: NomenclatureRow,
    pub p_id: Option<DbId>,
    pub p_code: Option<String>,
    pub p_name: Option<String>,
    pub p_description: Option<String>,
    pub p_param_type: Option<String>,
    pub p_category: Option<String>,
    pub p_is_required: Option<bool>,
    pub p_is_active: Option<bool>,
    pub p_is_system: Option<bool>,
    pub p_possible_values: Option<serde_json::Value>,
    pub p_extraction_source: Option<String>,
    pub p_extraction_pattern: Option<String>,
    pub p_format_rules: Option<String>,
    pub p_default_value: Option<String>,
    pub p_created_at: Option<Timestamp>,
    pub p_updated_at: Option<Timestamp>,
}

impl NomenclatureWithParameterRow {
    /// The joined parameter row, if the join matched.
    fn parameter_row(&self) -> Option<ParameterRow> {
        Some(ParameterRow {
            id: self.p_id?,
            code: self.p_code.clone()?,
            name: self.p_name.clone()?,
            description: self.p_description.clone(),
            param_type: self.p_param_type.clone()?,
            category: self.p_category.clone()?,
            is_required: self.p_is_required?,
            is_active: self.p_is_active?,
            is_system: self.p_is_system?,
            possible_values: self.p_possible_values.clone(),
            extraction_source: self.p_extraction_source.clone()?,
            extraction_pattern: self.p_extraction_pattern.clone(),
            format_rules: self.p_format_rules.clone(),
            default_value: self.p_default_value.clone(),
            created_at: self.p_created_at?,
            updated_at: self.p_updated_at?,
        })
    }

    /// Convert into the engine's slot.
    ///
    /// A parameter row that fails conversion is logged and treated as a
    /// dangling reference, so the builder skips the slot instead of failing
    /// the whole festival.
    pub fn into_slot(self) -> NomenclatureSlot {
        let parameter = self.parameter_row().and_then(|row| {
            let parameter_id = row.id;
            match Parameter::try_from(row) {
                Ok(parameter) => Some(parameter),
                Err(err) => {
                    tracing::warn!(
                        slot_id = self.slot.id,
                        parameter_id,
                        error = %err,
                        "Skipping unreadable parameter on nomenclature slot"
                    );
                    None
                }
            }
        });

        let slot = self.slot;
        NomenclatureSlot {
            id: slot.id,
            festival_id: slot.festival_id,
            parameter_id: slot.parameter_id,
            parameter,
            order_position: slot.order_position,
            is_active: slot.is_active,
            is_required: slot.is_required,
            separator: slot.separator,
            prefix: slot.prefix,
            suffix: slot.suffix,
            default_value: slot.default_value,
        }
    }
}

/// DTO for creating a nomenclature slot.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNomenclature {
    pub festival_id: DbId,
    pub parameter_id: DbId,
    /// Appended after the last slot when `None`.
    pub order_position: Option<i32>,
    pub is_active: Option<bool>,
    pub is_required: Option<bool>,
    pub separator: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub default_value: Option<String>,
}

/// DTO for updating a nomenclature slot. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNomenclature {
    pub parameter_id: Option<DbId>,
    pub order_position: Option<i32>,
    pub is_active: Option<bool>,
    pub is_required: Option<bool>,
    pub separator: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub default_value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_row() -> NomenclatureRow {
        NomenclatureRow {
            id: 3,
            festival_id: 1,
            parameter_id: Some(9),
            order_position: 2,
            is_active: true,
            is_required: true,
            separator: Some("_".to_string()),
            prefix: None,
            suffix: None,
            default_value: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn joined(category: &str) -> NomenclatureWithParameterRow {
        NomenclatureWithParameterRow {
            slot: slot_row(),
            p_id: Some(9),
            p_code: Some("YEAR".to_string()),
            p_name: Some("Year".to_string()),
            p_description: None,
            p_param_type: Some("int".to_string()),
            p_category: Some(category.to_string()),
            p_is_required: Some(false),
            p_is_active: Some(true),
            p_is_system: Some(false),
            p_possible_values: None,
            p_extraction_source: Some("auto".to_string()),
            p_extraction_pattern: None,
            p_format_rules: None,
            p_default_value: None,
            p_created_at: Some(chrono::Utc::now()),
            p_updated_at: Some(chrono::Utc::now()),
        }
    }

    #[test]
    fn joined_row_resolves_parameter() {
        let slot = joined("content").into_slot();
        assert_eq!(slot.order_position, 2);
        assert_eq!(slot.resolve_parameter().map(|p| p.code.as_str()), Some("YEAR"));
    }

    #[test]
    fn missing_join_is_dangling() {
        let mut row = joined("content");
        row.p_id = None;
        let slot = row.into_slot();
        assert_eq!(slot.parameter_id, Some(9));
        assert!(slot.resolve_parameter().is_none());
    }

    #[test]
    fn unreadable_parameter_is_dangling() {
        let slot = joined("unknown").into_slot();
        assert!(slot.parameter.is_none());
    }
}
