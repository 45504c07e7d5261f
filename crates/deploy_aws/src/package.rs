//! Code archive assembly.
//!
//! The archive is built in a scratch workspace and only renamed onto the
//! target path once zipping finished, so a failed build never leaves a
//! partial archive behind. The scratch directory is removed on every exit
//! path by `TempDir`.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use deploy_core::config::{DeploymentSpec, DEPENDENCY_MANIFEST_NAME};

use crate::error::DeployError;

/// Materializes third-party dependencies from a manifest into a directory.
pub trait DependencyResolver {
    fn resolve(&self, manifest: &Path, target_dir: &Path) -> Result<(), String>;
}

/// Production resolver: `pip install -r <manifest> -t <target>`.
pub struct PipResolver;

impl DependencyResolver for PipResolver {
    fn resolve(&self, manifest: &Path, target_dir: &Path) -> Result<(), String> {
        eprintln!(
            "+ pip install -r {} -t {}",
            manifest.display(),
            target_dir.display()
        );
        let status = Command::new("pip")
            .arg("install")
            .arg("-r")
            .arg(manifest)
            .arg("-t")
            .arg(target_dir)
            .status()
            .map_err(|error| format!("failed to launch pip: {error}"))?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("pip install exited with {status}"))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// Target archive already existed and was kept as-is.
    Reused(PathBuf),
    Rebuilt(PathBuf),
}

impl ArchiveOutcome {
    pub fn path(&self) -> &Path {
        match self {
            ArchiveOutcome::Reused(path) | ArchiveOutcome::Rebuilt(path) => path,
        }
    }
}

pub fn build_archive(
    spec: &DeploymentSpec,
    working_dir: &Path,
    library_dir: &Path,
    resolver: &dyn DependencyResolver,
    replace: bool,
) -> Result<ArchiveOutcome, DeployError> {
    let target = working_dir.join(spec.archive_file_name());
    if target.exists() {
        if !replace {
            eprintln!(
                "archive '{}' already exists, skipping rebuild",
                target.display()
            );
            return Ok(ArchiveOutcome::Reused(target));
        }
        fs::remove_file(&target).map_err(|error| {
            DeployError::Io(format!(
                "failed to remove stale archive '{}': {error}",
                target.display()
            ))
        })?;
        eprintln!("removed stale archive '{}'", target.display());
    }

    let scratch = tempfile::tempdir().map_err(|error| {
        DeployError::Io(format!("failed to create scratch workspace: {error}"))
    })?;

    for file_name in spec.extra_files() {
        let source = library_dir.join(file_name);
        if !source.exists() {
            eprintln!(
                "warning: library file '{file_name}' not found in '{}'",
                library_dir.display()
            );
            continue;
        }
        fs::copy(&source, scratch.path().join(file_name)).map_err(|error| {
            DeployError::Io(format!(
                "failed to copy library file '{file_name}': {error}"
            ))
        })?;
        eprintln!("bundled library file '{file_name}'");
    }

    let manifest = working_dir.join(DEPENDENCY_MANIFEST_NAME);
    if manifest.exists() {
        resolver
            .resolve(&manifest, scratch.path())
            .map_err(DeployError::DependencyResolution)?;
    }

    write_archive(scratch.path(), &target)?;
    eprintln!("wrote archive '{}'", target.display());
    Ok(ArchiveOutcome::Rebuilt(target))
}

fn write_archive(root: &Path, target: &Path) -> Result<(), DeployError> {
    let partial = target.with_extension("zip.partial");
    let file = File::create(&partial).map_err(|error| {
        DeployError::Io(format!(
            "failed to create archive '{}': {error}",
            partial.display()
        ))
    })?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    add_directory(&mut writer, root, root, options)?;

    writer.finish().map_err(|error| {
        DeployError::Io(format!(
            "failed to finish archive '{}': {error}",
            partial.display()
        ))
    })?;
    fs::rename(&partial, target).map_err(|error| {
        DeployError::Io(format!(
            "failed to move archive into place at '{}': {error}",
            target.display()
        ))
    })
}

fn add_directory(
    writer: &mut ZipWriter<File>,
    root: &Path,
    dir: &Path,
    options: FileOptions,
) -> Result<(), DeployError> {
    let mut entries = fs::read_dir(dir)
        .and_then(|entries| entries.collect::<Result<Vec<_>, _>>())
        .map_err(|error| {
            DeployError::Io(format!(
                "failed to list scratch directory '{}': {error}",
                dir.display()
            ))
        })?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            add_directory(writer, root, &path, options)?;
            continue;
        }

        let relative = path.strip_prefix(root).map_err(|error| {
            DeployError::Io(format!(
                "scratch entry '{}' escaped the workspace: {error}",
                path.display()
            ))
        })?;
        let name = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        writer.start_file(name, options).map_err(|error| {
            DeployError::Io(format!(
                "failed to start archive entry '{}': {error}",
                relative.display()
            ))
        })?;
        let bytes = fs::read(&path).map_err(|error| {
            DeployError::Io(format!(
                "failed to read scratch file '{}': {error}",
                path.display()
            ))
        })?;
        writer.write_all(&bytes).map_err(|error| {
            DeployError::Io(format!(
                "failed to write archive entry '{}': {error}",
                relative.display()
            ))
        })?;
    }
    Ok(())
}
