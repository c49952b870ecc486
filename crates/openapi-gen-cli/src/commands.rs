use anyhow::{bail, Context};
use clap::Args;
use openapi_gen::{
    examples::load_examples,
    utils::ValidationLevel,
    GeneratorConfig, GeneratorSettings, OpenApiError, OpenApiGenerator, OpenApiUtils,
    OutputFormat, TypeRegistry,
};
use std::path::{Path, PathBuf};

const DEFAULT_OUTPUT_DIR: &str = "target/openapi";

#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    /// Settings file (TOML)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Registry descriptor (JSON, YAML or TOML)
    #[arg(long, short)]
    pub registry: Option<PathBuf>,

    /// Package prefix scanned for model types, repeatable
    #[arg(long = "model-package")]
    pub model_packages: Vec<String>,

    /// Package prefix scanned for controllers, repeatable
    #[arg(long = "controller-package")]
    pub controller_packages: Vec<String>,

    /// Output directory
    #[arg(long, short)]
    pub output_dir: Option<PathBuf>,

    /// Output format (json, yaml)
    #[arg(long, short)]
    pub format: Option<OutputFormat>,

    /// Generate property examples
    #[arg(long)]
    pub examples: bool,

    /// JSON object of example keys to values, implies --examples
    #[arg(long)]
    pub examples_file: Option<PathBuf>,
}

/// Settings file values with command line values applied on top
fn merge_settings(args: GenerateArgs, mut settings: GeneratorSettings) -> GeneratorSettings {
    if args.registry.is_some() {
        settings.registry = args.registry;
    }
    if !args.model_packages.is_empty() {
        settings.model_packages = args.model_packages;
    }
    if !args.controller_packages.is_empty() {
        settings.controller_packages = args.controller_packages;
    }
    if args.output_dir.is_some() {
        settings.output_dir = args.output_dir;
    }
    if args.format.is_some() {
        settings.format = args.format;
    }
    if args.examples_file.is_some() {
        settings.examples_file = args.examples_file;
    }
    settings.generate_examples |= args.examples || settings.examples_file.is_some();
    settings
}

/// Generate the document and write it to the output directory
pub fn generate(args: GenerateArgs) -> anyhow::Result<()> {
    let settings = match &args.config {
        Some(path) => GeneratorSettings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => GeneratorSettings::default(),
    };
    let settings = merge_settings(args, settings);

    let Some(registry_path) = &settings.registry else {
        bail!("No registry descriptor given, pass --registry or set `registry` in the settings file");
    };
    let registry = TypeRegistry::from_file(registry_path)
        .with_context(|| format!("Failed to load registry from {}", registry_path.display()))?;

    let mut config = GeneratorConfig::new().with_generate_examples(settings.generate_examples);
    if let Some(path) = &settings.examples_file {
        let examples = load_examples(path)
            .with_context(|| format!("Failed to load examples from {}", path.display()))?;
        config = config.with_example_resolver(examples);
    }

    let mut generator = OpenApiGenerator::new(
        registry,
        settings.model_packages.clone(),
        settings.controller_packages.clone(),
    )
    .with_info(settings.info.clone().unwrap_or_default())
    .with_config(config);
    for header in &settings.global_headers {
        generator.add_global_header(
            &header.name,
            header.description.as_deref().unwrap_or_default(),
            header.required,
        );
    }

    println!("⚙️  Generating OpenAPI specification...");
    let spec = match generator.generate() {
        Ok(spec) => spec,
        Err(OpenApiError::Generation(report)) => {
            for failure in &report.failures {
                tracing::error!("{}", failure);
            }
            bail!(
                "OpenAPI generation failed with {} error(s)",
                report.failures.len()
            );
        }
        Err(e) => return Err(e.into()),
    };

    println!(
        "📊 Found {} path(s), {} schema(s)",
        spec.paths.len(),
        spec.schemas().count()
    );

    let output_dir = settings
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    let path = OpenApiUtils::write_spec(spec, &output_dir, settings.format.unwrap_or_default())?;
    println!("✅ OpenAPI specification generated: {}", path.display());

    Ok(())
}

/// Print the validation findings of a written document
pub fn validate(path: &Path) -> anyhow::Result<()> {
    let spec = OpenApiUtils::load_spec_from_file(path)
        .with_context(|| format!("Failed to load specification from {}", path.display()))?;

    let warnings = OpenApiUtils::validate_spec(&spec);
    if warnings.is_empty() {
        println!("✅ Specification validation passed");
        return Ok(());
    }

    println!("⚠️  Validation warnings:");
    for warning in &warnings {
        match warning.level {
            ValidationLevel::Error => println!("   ❌ {}", warning.message),
            ValidationLevel::Warning => println!("   ⚠️  {}", warning.message),
            ValidationLevel::Info => println!("   ℹ️  {}", warning.message),
        }
    }

    let errors = warnings
        .iter()
        .filter(|w| w.level == ValidationLevel::Error)
        .count();
    if errors > 0 {
        bail!("Specification has {} error(s)", errors);
    }
    Ok(())
}
