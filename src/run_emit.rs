use crate::dereference::dereference;
use crate::errors::{GenerateError, Result};
use crate::formatter::Formatter;
use crate::module_codegen::action_gen::{zone_class_name, EndpointEmitter};
use crate::module_codegen::types_gen::{create_model_files, SchemaRegistry};
use crate::module_codegen::GENERATED_HEADER;
use crate::parser::zone::Zones;
use crate::parser::SwaggerParser;
use crate::project::{ClassDecl, Declaration, FunctionDecl, ParamDecl, Project, SourceFile};
use crate::settings::Settings;
use crate::swagger::{Swagger, SwaggerApi};
use log::{debug, info};
use serde_json::Value;
use std::fmt::Write;
use std::path::Path;
use tokio::fs::{create_dir_all, File};
use tokio::io::AsyncWriteExt;

/// Runtime support copied verbatim into every generated client.
const TEMPLATES: &[(&str, &str)] = &[
    ("client.py", include_str!("templates/client.py")),
    ("errors.py", include_str!("templates/errors.py")),
    ("utils.py", include_str!("templates/utils.py")),
];

/// Generates the client for an already dereferenced document.
///
/// `raw` is the same document with its `$ref`s intact. Nothing is written to disk.
pub fn generate_project(
    spec: &Value,
    raw: &Value,
    source_url: Option<&str>,
    name: &str,
) -> Result<Project> {
    let operations = SwaggerParser::new(spec, raw).parse_operations();
    info!("Found {} operations", operations.len());

    let registry = SchemaRegistry::build(spec, raw, &operations);
    let models = create_model_files(&registry)?;

    let mut zones = Zones::new();
    for entry in registry.resolver.entries() {
        if !registry.is_alias(&entry.original_name) {
            zones
                .entry(&entry.zone)
                .model_names
                .insert(entry.clean_name.clone());
        }
    }

    let mut emitter = EndpointEmitter::new(&registry, zones);
    for operation in &operations {
        emitter.add_operation(operation);
    }
    let endpoints = emitter.finish()?;
    if !endpoints.pruned.is_empty() {
        info!(
            "Pruned zones without endpoints: {}",
            endpoints.pruned.join(", ")
        );
    }

    let mut project = Project::new(name);
    project.add_file(root_package(&endpoints.zones, source_url)?);

    for (file_name, source) in TEMPLATES {
        let mut file = SourceFile::new(*file_name);
        file.push(Declaration::Raw((*source).to_owned()));
        project.add_file(file);
    }

    for file in models.files.into_iter().chain(endpoints.files) {
        project.add_file(file);
    }

    info!(
        "Generated {} files for {} ({} zones)",
        project.files.len(),
        name,
        endpoints.zones.len()
    );

    Ok(project)
}

pub fn generate_from_swagger(swagger: &Swagger, name: &str) -> Result<Project> {
    let expanded = dereference(&swagger.document);
    generate_project(&expanded, &swagger.document, Some(swagger.source.as_str()), name)
}

/// `ApiClient(transport)` with one endpoint group per zone.
fn root_package(zones: &[String], source_url: Option<&str>) -> Result<SourceFile> {
    let mut header = String::new();
    if let Some(url) = source_url {
        writeln!(header, "# Generated from: {}", url)?;
    }
    writeln!(header, "{}", GENERATED_HEADER)?;
    writeln!(header, "from .client import Transport")?;
    if !zones.is_empty() {
        writeln!(
            header,
            "from .endpoints import {}",
            zones
                .iter()
                .map(|z| zone_class_name(z))
                .collect::<Vec<_>>()
                .join(", ")
        )?;
    }
    writeln!(header, "from .errors import RequestError")?;
    writeln!(header, "from .utils import NOT_SET")?;

    let mut body = vec!["self.transport = transport".to_owned()];
    body.extend(
        zones
            .iter()
            .map(|z| format!("self.{} = {}(transport)", z, zone_class_name(z))),
    );

    let mut file = SourceFile::new("__init__.py");
    file.push(Declaration::Raw(header));
    file.push(Declaration::Class(ClassDecl {
        name: "ApiClient".to_owned(),
        bases: vec![],
        docstring: None,
        body: vec![Declaration::Function(FunctionDecl {
            name: "__init__".to_owned(),
            params: vec![
                ParamDecl::new("self"),
                ParamDecl::annotated("transport", "Transport"),
            ],
            returns: Some("None".to_owned()),
            body,
            ..Default::default()
        })],
    }));
    file.push(Declaration::Raw(
        "__all__ = [\"ApiClient\", \"NOT_SET\", \"RequestError\", \"Transport\"]".to_owned(),
    ));

    Ok(file)
}

/// Renders every file of `project` below `target_dir`.
///
/// A non-empty `target_dir` is only written into when `force` is set.
pub async fn save_project(project: &Project, target_dir: &Path, force: bool) -> Result<()> {
    if !force && !is_empty_dir(target_dir).await? {
        return Err(GenerateError::TargetNotEmpty(
            target_dir.display().to_string(),
        ));
    }

    create_dir_all(target_dir).await?;

    let formatter = Formatter::new();
    for source_file in &project.files {
        let src = formatter.format(source_file)?;
        let file_path = target_dir.join(&source_file.file_name);

        if let Some(parent) = file_path.parent() {
            create_dir_all(parent).await?;
        }

        let mut file = File::create(&file_path).await?;
        file.write_all(src.as_bytes()).await?;
        debug!("Wrote {}", file_path.display());
    }

    info!(
        "Wrote {} files to {}",
        project.files.len(),
        target_dir.display()
    );

    Ok(())
}

async fn is_empty_dir(path: &Path) -> Result<bool> {
    let mut entries = match tokio::fs::read_dir(path).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e.into()),
    };

    Ok(entries.next_entry().await?.is_none())
}

/// Loads the configured document, generates the client and writes it to `settings.dirname`.
pub async fn run_emit(swagger_api: &SwaggerApi, settings: &Settings, force: bool) -> Result<Project> {
    let url = settings.url.as_deref().ok_or(GenerateError::MissingUrl)?;
    let swagger = swagger_api.load(url).await?;

    let target = Path::new(&settings.dirname);
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(&settings.dirname);

    let project = generate_from_swagger(&swagger, name)?;
    save_project(&project, target, force).await?;

    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn document() -> Value {
        json!({
            "openapi": "3.0.0",
            "paths": {"/pets": {"get": {
                "tags": ["pets"],
                "responses": {"200": {"content": {"application/json": {"schema": {
                    "type": "array", "items": {"$ref": "#/components/schemas/Pet"}
                }}}}}
            }}},
            "components": {"schemas": {
                "Pet": {"type": "object", "properties": {"name": {"type": "string"}}}
            }}
        })
    }

    #[test]
    fn project_layout() {
        let doc = document();
        let project = generate_project(&dereference(&doc), &doc, None, "client").unwrap();

        assert_eq!(
            project.file_names().collect::<Vec<_>>(),
            vec![
                "__init__.py",
                "client.py",
                "errors.py",
                "utils.py",
                "models/pets/pet.py",
                "models/pets/__init__.py",
                "models/__init__.py",
                "endpoints/pets.py",
                "endpoints/__init__.py",
            ]
        );
    }

    #[test]
    fn root_package_exposes_every_zone() {
        let file = root_package(&["pets".to_owned(), "store".to_owned()], Some("http://x/openapi.json")).unwrap();
        let text = Formatter::new().format(&file).unwrap();

        assert!(text.starts_with("# Generated from: http://x/openapi.json\n"));
        assert!(text.contains("from .endpoints import Pets, Store\n"));
        assert!(text.contains("        self.pets = Pets(transport)\n        self.store = Store(transport)\n"));
    }

    #[tokio::test]
    async fn save_refuses_non_empty_directories() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("keep.txt"), "x").await.unwrap();

        let doc = document();
        let project = generate_project(&dereference(&doc), &doc, None, "client").unwrap();

        let result = save_project(&project, dir.path(), false).await;
        assert!(matches!(result, Err(GenerateError::TargetNotEmpty(_))));

        save_project(&project, dir.path(), true).await.unwrap();
        let written = tokio::fs::read_to_string(dir.path().join("models/pets/pet.py"))
            .await
            .unwrap();
        assert!(written.contains("class Pet(BaseModel):"));
    }
}
