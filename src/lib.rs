pub mod dereference;
pub mod errors;
pub mod formatter;
pub mod module_codegen;
pub mod parser;
pub mod project;
pub mod run_emit;
pub mod schema_resolver;
pub mod settings;
pub mod string_tools;
pub mod swagger;
pub mod type_expr;
pub mod type_mapper;
pub mod zone_classifier;

pub use errors::{GenerateError, Result};
pub use project::{Project, SourceFile};
pub use run_emit::{generate_from_swagger, generate_project, run_emit, save_project};
pub use settings::Settings;
pub use swagger::{Swagger, SwaggerApi};
