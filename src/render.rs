use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufRead, Write};

use camino::{Utf8Path, Utf8PathBuf};
use regex::{Captures, Regex};
use serde_json::Value;
use tracing::debug;

use crate::error::FactoryError;
use crate::resolver::WorkflowConfig;

const CONTEXT_FILE: &str = "cookiecutter.json";

pub trait WorkflowRenderer {
    /// Renders `template_dir` into `output_root` and returns the created
    /// directory. Prompts for values unless `no_input` is set.
    fn render(
        &self,
        template_dir: &Utf8Path,
        output_root: &Utf8Path,
        no_input: bool,
        context: &WorkflowConfig,
    ) -> Result<Utf8PathBuf, FactoryError>;
}

/// Renders cookiecutter-style templates: a `cookiecutter.json` with default
/// values next to a single `{{cookiecutter.<key>}}` project directory.
/// Only plain variable substitution is supported.
pub struct CookiecutterRenderer {
    variable: Regex,
}

impl CookiecutterRenderer {
    pub fn new() -> Result<Self, FactoryError> {
        let variable = Regex::new(r"\{\{\s*cookiecutter\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}")
            .map_err(|err| FactoryError::Template(err.to_string()))?;
        Ok(Self { variable })
    }

    pub fn render_str(
        &self,
        input: &str,
        values: &BTreeMap<String, String>,
    ) -> Result<String, FactoryError> {
        if let Some(undefined) = self
            .variable
            .captures_iter(input)
            .map(|caps| caps[1].to_string())
            .find(|key| !values.contains_key(key))
        {
            return Err(FactoryError::Template(format!(
                "undefined variable cookiecutter.{undefined}"
            )));
        }
        Ok(self
            .variable
            .replace_all(input, |caps: &Captures| values[&caps[1]].clone())
            .into_owned())
    }

    fn load_defaults(template_dir: &Utf8Path) -> Result<BTreeMap<String, String>, FactoryError> {
        let path = template_dir.join(CONTEXT_FILE);
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|_| FactoryError::TemplateNotFound(path.clone().into_std_path_buf()))?;
        let raw: serde_json::Map<String, Value> = serde_json::from_str(&content)
            .map_err(|err| FactoryError::ConfigParse(format!("{path}: {err}")))?;

        let mut defaults = BTreeMap::new();
        for (key, value) in raw {
            if key.starts_with('_') {
                continue;
            }
            let value = match value {
                Value::String(text) => text,
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                Value::Null => String::new(),
                // Choice variables default to their first option.
                Value::Array(options) => match options.into_iter().next() {
                    Some(Value::String(text)) => text,
                    Some(other) => other.to_string(),
                    None => String::new(),
                },
                Value::Object(_) => {
                    return Err(FactoryError::Template(format!(
                        "variable '{key}' must be a scalar"
                    )));
                }
            };
            defaults.insert(key, value);
        }
        Ok(defaults)
    }

    fn project_dir(template_dir: &Utf8Path) -> Result<Utf8PathBuf, FactoryError> {
        let entries = template_dir
            .read_dir_utf8()
            .map_err(|err| FactoryError::Filesystem(format!("read {template_dir}: {err}")))?;
        for entry in entries {
            let entry = entry.map_err(|err| FactoryError::Filesystem(err.to_string()))?;
            let path = entry.path();
            if path.is_dir() && entry.file_name().contains("{{") {
                return Ok(path.to_path_buf());
            }
        }
        Err(FactoryError::Template(format!(
            "no project directory found in {template_dir}"
        )))
    }

    fn render_tree(
        &self,
        source: &Utf8Path,
        target: &Utf8Path,
        values: &BTreeMap<String, String>,
    ) -> Result<(), FactoryError> {
        fs::create_dir_all(target.as_std_path())
            .map_err(|err| FactoryError::Filesystem(err.to_string()))?;
        let entries = source
            .read_dir_utf8()
            .map_err(|err| FactoryError::Filesystem(format!("read {source}: {err}")))?;
        for entry in entries {
            let entry = entry.map_err(|err| FactoryError::Filesystem(err.to_string()))?;
            let name = self.render_str(entry.file_name(), values)?;
            let destination = target.join(name);
            let path = entry.path();
            if path.is_dir() {
                self.render_tree(path, &destination, values)?;
                continue;
            }
            let bytes =
                fs::read(path.as_std_path()).map_err(|err| FactoryError::Filesystem(err.to_string()))?;
            let output = match String::from_utf8(bytes) {
                Ok(text) => self.render_str(&text, values)?.into_bytes(),
                Err(binary) => binary.into_bytes(),
            };
            debug!("rendering {path} -> {destination}");
            fs::write(destination.as_std_path(), output)
                .map_err(|err| FactoryError::Filesystem(err.to_string()))?;
        }
        Ok(())
    }
}

/// Asks for every value on `output`, keeping the current one on empty input.
pub fn prompt_values<R: BufRead, W: Write>(
    values: &mut BTreeMap<String, String>,
    input: &mut R,
    output: &mut W,
) -> Result<(), FactoryError> {
    for (key, value) in values.iter_mut() {
        write!(output, "{key} [{value}]: ")
            .and_then(|_| output.flush())
            .map_err(|err| FactoryError::Filesystem(err.to_string()))?;
        let mut line = String::new();
        input
            .read_line(&mut line)
            .map_err(|err| FactoryError::Filesystem(err.to_string()))?;
        let answer = line.trim();
        if !answer.is_empty() {
            *value = answer.to_string();
        }
    }
    Ok(())
}

impl WorkflowRenderer for CookiecutterRenderer {
    fn render(
        &self,
        template_dir: &Utf8Path,
        output_root: &Utf8Path,
        no_input: bool,
        context: &WorkflowConfig,
    ) -> Result<Utf8PathBuf, FactoryError> {
        if !template_dir.as_std_path().is_dir() {
            return Err(FactoryError::TemplateNotFound(
                template_dir.to_path_buf().into_std_path_buf(),
            ));
        }

        let mut values = Self::load_defaults(template_dir)?;
        for (key, value) in context.iter() {
            values.insert(key.to_string(), value.to_string());
        }
        if !no_input {
            prompt_values(&mut values, &mut io::stdin().lock(), &mut io::stdout())?;
        }

        let project = Self::project_dir(template_dir)?;
        let name = project
            .file_name()
            .ok_or_else(|| FactoryError::Template(format!("invalid project dir {project}")))?;
        let target = output_root.join(self.render_str(name, &values)?);
        if target.as_std_path().exists() {
            return Err(FactoryError::OutputConflict(target.into_std_path_buf()));
        }

        self.render_tree(&project, &target, &values)?;
        Ok(target)
    }
}
