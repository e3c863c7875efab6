use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use miette::Diagnostic;
use serde::Deserialize;
use splice_model::{Definition, DependencyEdge, Expected, Instance, TypeTable};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum SourceError {
    #[error("failed to read `{}`", path.display())]
    #[diagnostic(code(splice::source::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON5 in `{}`: {source}", path.display())]
    #[diagnostic(code(splice::source::json5))]
    Json5 {
        path: PathBuf,
        #[source]
        source: json5::Error,
    },

    #[error("invalid definition in `{}` at `{at}`: {message}", path.display())]
    #[diagnostic(
        code(splice::source::shape),
        help("definitions look like `{{ definition: \"name\", instances: [{{ name, type }}] }}`")
    )]
    Shape {
        path: PathBuf,
        at: String,
        message: String,
    },

    #[error("definition identity in `{}` must not be empty", path.display())]
    #[diagnostic(code(splice::source::empty_identity))]
    EmptyIdentity { path: PathBuf },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] splice_model::Error),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDefinition {
    definition: String,
    #[serde(default)]
    root: bool,
    #[serde(default)]
    imports: Vec<String>,
    #[serde(default)]
    expected: Vec<String>,
    #[serde(default)]
    instances: Vec<RawInstance>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawInstance {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    aliases: Vec<String>,
    location: Option<String>,
    #[serde(default)]
    depends: Vec<RawDependency>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDependency {
    name: String,
    #[serde(rename = "type")]
    ty: String,
}

/// Reads one JSON5 definition source. The source path becomes the definition's location.
pub fn load_definition(path: &Path) -> Result<Definition, SourceError> {
    let contents = read(path)?;
    parse_definition(path, &contents)
}

/// Reads a JSON5 map of type name to declared supertypes.
pub fn load_type_table(path: &Path) -> Result<TypeTable, SourceError> {
    let contents = read(path)?;
    let raw: BTreeMap<String, Vec<String>> = parse(path, &contents)?;

    let mut table = TypeTable::new();
    for (subtype, supertypes) in raw {
        for supertype in supertypes {
            table.declare(subtype.clone(), supertype);
        }
    }
    Ok(table)
}

pub(crate) fn parse_definition(path: &Path, contents: &str) -> Result<Definition, SourceError> {
    let raw: RawDefinition = parse(path, contents)?;
    if raw.definition.is_empty() {
        return Err(SourceError::EmptyIdentity {
            path: path.to_path_buf(),
        });
    }

    let identity = raw.definition;
    let mut definition = Definition::new(&identity, path.display().to_string(), raw.root);
    for import in raw.imports {
        definition.add_import(import)?;
    }
    for name in raw.expected {
        definition.add_expected(Expected::new(name, &identity))?;
    }
    for instance in raw.instances {
        let location = instance
            .location
            .unwrap_or_else(|| format!("{identity}.{}", instance.name));
        let dependencies = instance
            .depends
            .into_iter()
            .map(|dep| DependencyEdge::new(dep.name, dep.ty))
            .collect();
        definition.add_instance(
            Instance::builder()
                .name(instance.name)
                .aliases(instance.aliases)
                .declared_type(instance.ty)
                .owner(&identity)
                .location(location)
                .dependencies(dependencies)
                .live(true)
                .build(),
        )?;
    }
    Ok(definition)
}

fn read(path: &Path) -> Result<String, SourceError> {
    fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, contents: &str) -> Result<T, SourceError> {
    let value: serde_json::Value = json5::from_str(contents).map_err(|source| SourceError::Json5 {
        path: path.to_path_buf(),
        source,
    })?;
    serde_path_to_error::deserialize(value).map_err(|err| SourceError::Shape {
        path: path.to_path_buf(),
        at: err.path().to_string(),
        message: err.into_inner().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(contents: &str) -> Result<Definition, SourceError> {
        parse_definition(Path::new("defs/app.json5"), contents)
    }

    #[test]
    fn parses_a_full_definition() {
        let definition = parse_str(
            r#"{
                // services for the app
                definition: "app",
                root: true,
                imports: ["core"],
                expected: ["clock"],
                instances: [
                    { name: "greeter", type: "String", aliases: ["hello"],
                      depends: [{ name: "clock", type: "Clock" }] },
                    { name: "port", type: "Integer", location: "app.json5:12" },
                ],
            }"#,
        )
        .unwrap();

        assert_eq!(definition.identity(), "app");
        assert!(definition.is_root());
        assert_eq!(definition.location(), "defs/app.json5");
        assert_eq!(definition.imports(), ["core".to_string()]);
        assert_eq!(definition.expected()[0].name, "clock");
        assert_eq!(definition.expected()[0].owner, "app");

        let instances = definition.instances();
        assert_eq!(instances.len(), 2);
        assert!(instances.iter().all(|instance| instance.live));
        assert_eq!(instances[0].location, "app.greeter");
        assert_eq!(instances[0].aliases, ["hello".to_string()]);
        assert_eq!(
            instances[0].dependencies,
            [DependencyEdge::new("clock", "Clock")]
        );
        assert_eq!(instances[1].location, "app.json5:12");
    }

    #[test]
    fn optional_sections_default_to_empty() {
        let definition = parse_str(r#"{ definition: "lib" }"#).unwrap();
        assert!(!definition.is_root());
        assert!(definition.imports().is_empty());
        assert!(definition.instances().is_empty());
        assert!(definition.expected().is_empty());
    }

    #[test]
    fn shape_errors_report_the_json_path() {
        let err = parse_str(r#"{ definition: "app", instances: [{ name: "a" }] }"#).unwrap_err();
        match err {
            SourceError::Shape { at, message, .. } => {
                assert_eq!(at, "instances[0]");
                assert!(message.contains("type"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = parse_str(r#"{ definition: "app", extra: 1 }"#).unwrap_err();
        assert!(matches!(err, SourceError::Shape { .. }));
    }

    #[test]
    fn malformed_json5_is_rejected() {
        let err = parse_str("{ definition: ").unwrap_err();
        assert!(matches!(err, SourceError::Json5 { .. }));
    }

    #[test]
    fn empty_identity_is_rejected() {
        let err = parse_str(r#"{ definition: "" }"#).unwrap_err();
        assert!(matches!(err, SourceError::EmptyIdentity { .. }));
    }

    #[test]
    fn type_table_loads_supertypes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("types.json5");
        fs::write(&path, r#"{ String: ["CharSequence", "Object"], CharSequence: ["Object"] }"#)
            .unwrap();

        let table = load_type_table(&path).unwrap();
        assert!(table.is_subtype("String", "CharSequence"));
        assert!(table.is_subtype("CharSequence", "Object"));
        assert!(!table.is_subtype("Object", "String"));
    }
}
