//! Synthesis output directory
//!
//! Holds `<stack>.template.{json,yaml}`, `<stack>.parameters.json` and
//! `manifest.json`. The previous template is kept as a `.backup` before a
//! new one is written.

use crate::error::{CloudError, Result};
use crate::template::{ParameterValues, Template};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

const MANIFEST_VERSION: u32 = 1;
const MANIFEST_FILE: &str = "manifest.json";

/// Default output directory name
pub const DEFAULT_OUT_DIR: &str = "stackflow.out";

/// Template serialization format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateFormat {
    #[default]
    Json,
    Yaml,
}

impl TemplateFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TemplateFormat::Json => "json",
            TemplateFormat::Yaml => "yaml",
        }
    }

    pub fn render(&self, template: &Template) -> Result<String> {
        match self {
            TemplateFormat::Json => template.to_json_pretty(),
            TemplateFormat::Yaml => template.to_yaml(),
        }
    }

    pub fn parse(&self, content: &str) -> Result<Template> {
        match self {
            TemplateFormat::Json => Template::from_json(content),
            TemplateFormat::Yaml => Template::from_yaml(content),
        }
    }
}

impl std::str::FromStr for TemplateFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(TemplateFormat::Json),
            "yaml" | "yml" => Ok(TemplateFormat::Yaml),
            other => Err(format!("unknown template format: {} (json or yaml)", other)),
        }
    }
}

impl std::fmt::Display for TemplateFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Record of the last synthesis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Manifest file version
    pub version: u32,

    pub stack_name: String,

    pub synthesized_at: DateTime<Utc>,

    pub format: TemplateFormat,

    /// File name relative to the output directory
    pub template_file: String,

    /// File name relative to the output directory
    pub parameters_file: Option<String>,

    pub resource_count: usize,
}

/// Paths written by one synthesis
#[derive(Debug, Clone)]
pub struct WrittenFiles {
    pub template: PathBuf,
    pub parameters: Option<PathBuf>,
    pub manifest: PathBuf,
}

/// Reader/writer for the output directory
pub struct OutputStore {
    out_dir: PathBuf,
}

impl OutputStore {
    pub fn new(out_dir: impl AsRef<Path>) -> Self {
        Self {
            out_dir: out_dir.as_ref().to_path_buf(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn template_path(&self, stack_name: &str, format: TemplateFormat) -> PathBuf {
        self.out_dir
            .join(format!("{}.template.{}", stack_name, format.extension()))
    }

    pub fn parameters_path(&self, stack_name: &str) -> PathBuf {
        self.out_dir.join(format!("{}.parameters.json", stack_name))
    }

    fn manifest_path(&self) -> PathBuf {
        self.out_dir.join(MANIFEST_FILE)
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(".backup");
        PathBuf::from(name)
    }

    async fn ensure_out_dir(&self) -> Result<()> {
        if !self.out_dir.exists() {
            fs::create_dir_all(&self.out_dir).await?;
            tracing::debug!("Created output directory: {}", self.out_dir.display());
        }
        Ok(())
    }

    /// Write template, parameters (if given) and manifest
    pub async fn write(
        &self,
        stack_name: &str,
        template: &Template,
        format: TemplateFormat,
        parameters: Option<&ParameterValues>,
    ) -> Result<WrittenFiles> {
        if let Some(values) = parameters {
            values.check_against(template)?;
        }
        self.ensure_out_dir().await?;

        // Keep the previous template as <file>.backup
        let template_path = self.template_path(stack_name, format);
        if let Some(previous) = self.load_manifest().await?
            && previous.stack_name == stack_name
        {
            let previous_path = self.out_dir.join(&previous.template_file);
            if previous_path.exists() {
                let backup = Self::backup_path(&previous_path);
                if backup.exists() {
                    fs::remove_file(&backup).await?;
                }
                fs::rename(&previous_path, &backup).await?;
                tracing::debug!("Created template backup");
            }
        }

        fs::write(&template_path, format.render(template)?).await?;

        let parameters_path = match parameters {
            Some(values) => {
                let path = self.parameters_path(stack_name);
                let content = serde_json::to_string_pretty(&values.to_cli_parameters())?;
                fs::write(&path, content).await?;
                Some(path)
            }
            None => {
                let stale = self.parameters_path(stack_name);
                if stale.exists() {
                    fs::remove_file(&stale).await?;
                }
                None
            }
        };

        let manifest = Manifest {
            version: MANIFEST_VERSION,
            stack_name: stack_name.to_string(),
            synthesized_at: Utc::now(),
            format,
            template_file: file_name(&template_path),
            parameters_file: parameters_path.as_deref().map(file_name),
            resource_count: template.resources.len(),
        };
        let manifest_path = self.manifest_path();
        fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?).await?;

        tracing::debug!(
            "Wrote template with {} resources to {}",
            manifest.resource_count,
            template_path.display()
        );

        Ok(WrittenFiles {
            template: template_path,
            parameters: parameters_path,
            manifest: manifest_path,
        })
    }

    /// Load the manifest of the last synthesis
    pub async fn load_manifest(&self) -> Result<Option<Manifest>> {
        let path = self.manifest_path();
        if !path.exists() {
            tracing::debug!("Manifest not found");
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let manifest: Manifest = serde_json::from_str(&content)?;

        if manifest.version > MANIFEST_VERSION {
            return Err(CloudError::StateError(format!(
                "Manifest version {} is newer than supported version {}",
                manifest.version, MANIFEST_VERSION
            )));
        }

        Ok(Some(manifest))
    }

    /// The last synthesized template for `stack_name`, if any
    pub async fn load_previous(&self, stack_name: &str) -> Result<Option<Template>> {
        let Some(manifest) = self.load_manifest().await? else {
            return Ok(None);
        };
        if manifest.stack_name != stack_name {
            tracing::debug!(
                "Manifest belongs to stack {}, not {}",
                manifest.stack_name,
                stack_name
            );
            return Ok(None);
        }

        let path = self.out_dir.join(&manifest.template_file);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).await?;
        Ok(Some(manifest.format.parse(&content)?))
    }

    /// The parameter values written by the last synthesis, if any
    pub async fn load_previous_parameters(&self, stack_name: &str) -> Result<Option<ParameterValues>> {
        let path = self.parameters_path(stack_name);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).await?;
        Ok(Some(ParameterValues::from_cli_parameters(&content)?))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
