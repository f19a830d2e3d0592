//! Write paths for the parameter catalog and festival slot configuration.
//!
//! Every mutation runs the catalog guards from `dcprism_core::parameter`
//! before touching the database, then clears the cached slot lists of every
//! festival whose configuration may have changed.

use std::sync::Arc;

use dcprism_core::error::CoreError;
use dcprism_core::parameter::{
    ensure_code_change_allowed, ensure_deletable, ensure_toggle_allowed, validate_parameter,
    ExtractionSource, Parameter, ParameterCategory,
};
use dcprism_core::repository::SlotRepository;
use dcprism_core::slot::ILLEGAL_SEPARATOR_CHARS;
use dcprism_core::types::DbId;
use sqlx::PgPool;

use crate::models::nomenclature::{CreateNomenclature, NomenclatureRow, UpdateNomenclature};
use crate::models::parameter::{CreateParameter, ParameterRow, UpdateParameter};
use crate::repositories::{NomenclatureRepo, ParameterRepo};

/// Error type for configuration writes.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A guard or lookup failure from `dcprism_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Pure checks
// ---------------------------------------------------------------------------

/// Validate a new parameter. `code_taken` is whether another parameter
/// already uses the code.
pub fn check_parameter_create(
    input: &CreateParameter,
    code_taken: bool,
) -> Result<Parameter, CoreError> {
    let parameter = input.to_parameter()?;
    validate_parameter(&parameter)?;
    if code_taken {
        return Err(CoreError::Conflict(format!(
            "Parameter code '{}' already exists",
            parameter.code
        )));
    }
    Ok(parameter)
}

/// Validate a parameter patch against the stored parameter.
///
/// Renaming a referenced code is a conflict and only administrators may
/// toggle system parameters. The patched parameter must still pass
/// [`validate_parameter`].
pub fn check_parameter_update(
    current: &Parameter,
    input: &UpdateParameter,
    referencing_slots: i64,
    actor_is_admin: bool,
) -> Result<Parameter, CoreError> {
    if let Some(code) = input.code.as_deref() {
        ensure_code_change_allowed(&current.code, code, referencing_slots > 0)?;
    }
    if input.is_active.is_some_and(|active| active != current.is_active) {
        ensure_toggle_allowed(current, actor_is_admin)?;
    }

    let mut patched = current.clone();
    if let Some(code) = &input.code {
        patched.code = code.clone();
    }
    if let Some(name) = &input.name {
        patched.name = name.clone();
    }
    if let Some(description) = &input.description {
        patched.description = Some(description.clone());
    }
    if let Some(category) = input.category.as_deref() {
        patched.category = ParameterCategory::from_str_value(category)?;
    }
    if let Some(is_required) = input.is_required {
        patched.is_required = is_required;
    }
    if let Some(is_active) = input.is_active {
        patched.is_active = is_active;
    }
    if let Some(values) = &input.possible_values {
        patched.possible_values = values.clone();
    }
    if let Some(source) = input.extraction_source.as_deref() {
        patched.extraction_source = ExtractionSource::from_str_value(source)?;
    }
    if let Some(pattern) = &input.extraction_pattern {
        patched.extraction_pattern = Some(pattern.clone());
    }
    if let Some(rules) = &input.format_rules {
        patched.format_rules = Some(rules.clone());
    }
    if let Some(default) = &input.default_value {
        patched.default_value = Some(default.clone());
    }

    validate_parameter(&patched)?;
    Ok(patched)
}

/// Reject separators that cannot appear in a DCP file name.
pub fn check_separator(separator: Option<&str>) -> Result<(), CoreError> {
    match separator {
        Some(sep) if sep.contains(ILLEGAL_SEPARATOR_CHARS) => Err(CoreError::Validation(
            format!("Separator '{sep}' contains characters not allowed in file names"),
        )),
        _ => Ok(()),
    }
}

/// Turn a missing row into [`CoreError::NotFound`].
pub fn require<T>(row: Option<T>, entity: &'static str, id: DbId) -> Result<T, CoreError> {
    row.ok_or(CoreError::NotFound { entity, id })
}

/// Drop the cached configuration of each festival.
pub fn invalidate_festivals(repository: &dyn SlotRepository, festival_ids: &[DbId]) {
    for &festival_id in festival_ids {
        repository.clear_cache(festival_id);
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Guarded writes over [`ParameterRepo`] and [`NomenclatureRepo`] that keep
/// the slot cache of `repository` coherent.
#[derive(Clone)]
pub struct NomenclatureConfigService {
    pool: PgPool,
    repository: Arc<dyn SlotRepository>,
}

impl NomenclatureConfigService {
    pub fn new(pool: PgPool, repository: Arc<dyn SlotRepository>) -> Self {
        Self { pool, repository }
    }

    async fn load_parameter(&self, id: DbId) -> ConfigResult<Parameter> {
        let row = require(ParameterRepo::find_by_id(&self.pool, id).await?, "parameter", id)?;
        Ok(Parameter::try_from(row)?)
    }

    pub async fn create_parameter(&self, input: &CreateParameter) -> ConfigResult<ParameterRow> {
        let code_taken = ParameterRepo::find_by_code(&self.pool, &input.code)
            .await?
            .is_some();
        check_parameter_create(input, code_taken)?;
        let row = ParameterRepo::create(&self.pool, input).await?;
        tracing::info!(parameter_id = row.id, code = %row.code, "Parameter created");
        Ok(row)
    }

    /// Apply a guarded patch and clear the cache of every festival using the
    /// parameter.
    pub async fn update_parameter(
        &self,
        id: DbId,
        input: &UpdateParameter,
        actor_is_admin: bool,
    ) -> ConfigResult<ParameterRow> {
        let current = self.load_parameter(id).await?;
        let referencing_slots = ParameterRepo::count_referencing_slots(&self.pool, id).await?;
        check_parameter_update(&current, input, referencing_slots, actor_is_admin)?;

        if let Some(code) = input.code.as_deref().filter(|c| *c != current.code) {
            if ParameterRepo::find_by_code(&self.pool, code).await?.is_some() {
                return Err(CoreError::Conflict(format!(
                    "Parameter code '{code}' already exists"
                ))
                .into());
            }
        }

        let row = require(ParameterRepo::update(&self.pool, id, input).await?, "parameter", id)?;

        let festivals = NomenclatureRepo::festival_ids_for_parameter(&self.pool, id).await?;
        invalidate_festivals(self.repository.as_ref(), &festivals);
        tracing::info!(parameter_id = id, festivals = festivals.len(), "Parameter updated");
        Ok(row)
    }

    /// Delete a parameter no slot references.
    pub async fn delete_parameter(&self, id: DbId) -> ConfigResult<()> {
        let current = self.load_parameter(id).await?;
        let referencing_slots = ParameterRepo::count_referencing_slots(&self.pool, id).await?;
        ensure_deletable(&current, referencing_slots)?;

        if !ParameterRepo::delete_unreferenced(&self.pool, id).await? {
            // A slot started referencing it between the check and the delete.
            return Err(CoreError::Conflict(format!(
                "Parameter '{}' is used by nomenclature slots",
                current.code
            ))
            .into());
        }
        tracing::info!(parameter_id = id, code = %current.code, "Parameter deleted");
        Ok(())
    }

    pub async fn create_slot(&self, input: &CreateNomenclature) -> ConfigResult<NomenclatureRow> {
        check_separator(input.separator.as_deref())?;
        self.load_parameter(input.parameter_id).await?;

        let row = NomenclatureRepo::create(&self.pool, input).await?;
        invalidate_festivals(self.repository.as_ref(), &[row.festival_id]);
        tracing::info!(slot_id = row.id, festival_id = row.festival_id, "Nomenclature slot created");
        Ok(row)
    }

    pub async fn update_slot(
        &self,
        id: DbId,
        input: &UpdateNomenclature,
    ) -> ConfigResult<NomenclatureRow> {
        check_separator(input.separator.as_deref())?;
        if let Some(parameter_id) = input.parameter_id {
            self.load_parameter(parameter_id).await?;
        }

        let row = require(
            NomenclatureRepo::update(&self.pool, id, input).await?,
            "nomenclature slot",
            id,
        )?;
        invalidate_festivals(self.repository.as_ref(), &[row.festival_id]);
        tracing::info!(slot_id = id, festival_id = row.festival_id, "Nomenclature slot updated");
        Ok(row)
    }

    /// Delete a slot, returning its festival id.
    pub async fn delete_slot(&self, id: DbId) -> ConfigResult<DbId> {
        let festival_id = require(
            NomenclatureRepo::delete(&self.pool, id).await?,
            "nomenclature slot",
            id,
        )?;
        invalidate_festivals(self.repository.as_ref(), &[festival_id]);
        tracing::info!(slot_id = id, festival_id, "Nomenclature slot deleted");
        Ok(festival_id)
    }
}

impl std::fmt::Debug for NomenclatureConfigService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NomenclatureConfigService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use dcprism_core::parameter::ParameterType;
    use dcprism_core::repository::{InMemorySlotStore, NomenclatureRepository};
    use dcprism_core::slot::NomenclatureSlot;

    use super::*;

    fn parameter(code: &str, is_system: bool) -> Parameter {
        Parameter {
            id: 1,
            code: code.to_string(),
            name: "Audio".to_string(),
            description: None,
            param_type: ParameterType::String,
            category: ParameterCategory::Audio,
            is_required: false,
            is_active: true,
            is_system,
            possible_values: Vec::new(),
            extraction_source: ExtractionSource::Dcp,
            extraction_pattern: None,
            format_rules: None,
            default_value: None,
        }
    }

    fn create_input(code: &str) -> CreateParameter {
        CreateParameter {
            code: code.to_string(),
            name: "Format".to_string(),
            description: None,
            param_type: "string".to_string(),
            category: "format".to_string(),
            is_required: None,
            is_active: None,
            is_system: None,
            possible_values: None,
            extraction_source: "metadata".to_string(),
            extraction_pattern: None,
            format_rules: None,
            default_value: None,
        }
    }

    #[test]
    fn referenced_code_cannot_be_renamed() {
        let input = UpdateParameter {
            code: Some("AUDIO_CH".to_string()),
            ..Default::default()
        };
        assert_matches!(
            check_parameter_update(&parameter("AUDIO", false), &input, 2, true),
            Err(CoreError::Conflict(_))
        );
        let patched = check_parameter_update(&parameter("AUDIO", false), &input, 0, false).unwrap();
        assert_eq!(patched.code, "AUDIO_CH");
    }

    #[test]
    fn same_code_on_referenced_parameter_is_allowed() {
        let input = UpdateParameter {
            code: Some("AUDIO".to_string()),
            name: Some("Audio channels".to_string()),
            ..Default::default()
        };
        assert!(check_parameter_update(&parameter("AUDIO", false), &input, 5, false).is_ok());
    }

    #[test]
    fn system_parameter_toggle_needs_admin() {
        let input = UpdateParameter {
            is_active: Some(false),
            ..Default::default()
        };
        assert_matches!(
            check_parameter_update(&parameter("AUDIO", true), &input, 0, false),
            Err(CoreError::Validation(_))
        );
        assert!(check_parameter_update(&parameter("AUDIO", true), &input, 0, true).is_ok());
    }

    #[test]
    fn unchanged_active_flag_is_not_a_toggle() {
        let input = UpdateParameter {
            is_active: Some(true),
            ..Default::default()
        };
        assert!(check_parameter_update(&parameter("AUDIO", true), &input, 0, false).is_ok());
    }

    #[test]
    fn patched_parameter_is_revalidated() {
        let input = UpdateParameter {
            format_rules: Some("shout".to_string()),
            ..Default::default()
        };
        assert_matches!(
            check_parameter_update(&parameter("AUDIO", false), &input, 0, true),
            Err(CoreError::Validation(_))
        );
        let bad_category = UpdateParameter {
            category: Some("smell".to_string()),
            ..Default::default()
        };
        assert_matches!(
            check_parameter_update(&parameter("AUDIO", false), &bad_category, 0, true),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn create_checks_code_and_uniqueness() {
        assert!(check_parameter_create(&create_input("FORMAT"), false).is_ok());
        assert_matches!(
            check_parameter_create(&create_input("FORMAT"), true),
            Err(CoreError::Conflict(_))
        );
        assert_matches!(
            check_parameter_create(&create_input("format"), false),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn missing_rows_are_not_found() {
        assert_eq!(require(Some(4), "parameter", 4).unwrap(), 4);
        assert_matches!(
            require::<DbId>(None, "nomenclature slot", 12),
            Err(CoreError::NotFound { entity: "nomenclature slot", id: 12 })
        );
    }

    #[test]
    fn separators_are_checked() {
        assert!(check_separator(None).is_ok());
        assert!(check_separator(Some("_")).is_ok());
        assert_matches!(check_separator(Some("/")), Err(CoreError::Validation(_)));
    }

    #[test]
    fn invalidation_exposes_new_configuration() {
        let store = InMemorySlotStore::new();
        let slot = |id: DbId, festival_id: DbId| NomenclatureSlot {
            id,
            festival_id,
            parameter_id: None,
            parameter: None,
            order_position: id as i32,
            is_active: true,
            is_required: false,
            separator: None,
            prefix: None,
            suffix: None,
            default_value: None,
        };
        store.set_slots(1, vec![slot(1, 1)]);
        store.set_slots(2, vec![slot(2, 2)]);
        let repo = NomenclatureRepository::new(store);

        assert_eq!(repo.get_active_nomenclatures(1).unwrap().len(), 1);
        assert_eq!(repo.get_active_nomenclatures(2).unwrap().len(), 1);
        repo.store().push_slot(slot(3, 1));
        repo.store().push_slot(slot(4, 2));

        invalidate_festivals(&repo, &[1]);
        assert_eq!(repo.get_active_nomenclatures(1).unwrap().len(), 2);
        // Festival 2 was not invalidated and still serves its cached list.
        assert_eq!(repo.get_active_nomenclatures(2).unwrap().len(), 1);
    }
}
