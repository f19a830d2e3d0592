//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` row struct and its conversion into
//! the engine type, plus create/update DTOs where the table is written to.

pub mod festival;
pub mod movie;
pub mod nomenclature;
pub mod parameter;
