//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod festival_repo;
pub mod movie_repo;
pub mod nomenclature_repo;
pub mod parameter_repo;

pub use festival_repo::FestivalRepo;
pub use movie_repo::MovieRepo;
pub use nomenclature_repo::NomenclatureRepo;
pub use parameter_repo::ParameterRepo;
