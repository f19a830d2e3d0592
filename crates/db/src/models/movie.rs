//! Models for the `movies` table and its stored parameter values.

use std::collections::HashMap;

use dcprism_core::movie::Movie;
use dcprism_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A movie row with every column folded into a JSON object.
///
/// Selected as `to_jsonb(m) AS attributes` so new movie columns reach the
/// extractor without a model change.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MovieRow {
    pub id: DbId,
    pub title: String,
    pub attributes: serde_json::Value,
}

/// A row from `movie_parameters` joined with the parameter code.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MovieParameterValueRow {
    pub movie_id: DbId,
    pub code: String,
    pub value: Option<String>,
}

impl MovieRow {
    /// Convert into the engine's movie, attaching the stored values that
    /// belong to it. Blank values are dropped.
    pub fn into_movie(self, values: &[MovieParameterValueRow]) -> Movie {
        let attributes = match self.attributes {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        let parameter_values: HashMap<String, String> = values
            .iter()
            .filter(|v| v.movie_id == self.id)
            .filter_map(|v| {
                let value = v.value.as_deref()?.trim();
                (!value.is_empty()).then(|| (v.code.clone(), value.to_string()))
            })
            .collect();

        Movie {
            id: self.id,
            title: self.title,
            attributes,
            parameter_values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn attaches_only_own_non_blank_values() {
        let row = MovieRow {
            id: 1,
            title: "Oppenheimer".to_string(),
            attributes: json!({"id": 1, "title": "Oppenheimer", "year": 2023}),
        };
        let values = vec![
            MovieParameterValueRow {
                movie_id: 1,
                code: "AUDIO".to_string(),
                value: Some("51".to_string()),
            },
            MovieParameterValueRow {
                movie_id: 1,
                code: "LANG".to_string(),
                value: Some("  ".to_string()),
            },
            MovieParameterValueRow {
                movie_id: 2,
                code: "AUDIO".to_string(),
                value: Some("20".to_string()),
            },
        ];
        let movie = row.into_movie(&values);
        assert_eq!(movie.parameter_value("AUDIO").as_deref(), Some("51"));
        assert_eq!(movie.parameter_value("LANG"), None);
        assert_eq!(movie.attribute("year").as_deref(), Some("2023"));
    }

    #[test]
    fn non_object_attributes_are_ignored() {
        let row = MovieRow {
            id: 1,
            title: "X".to_string(),
            attributes: json!(null),
        };
        assert!(row.into_movie(&[]).attributes.is_empty());
    }
}
