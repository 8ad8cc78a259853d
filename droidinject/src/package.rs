//! Archive level operations: decode, rewrite, rebuild
//!
//! Rebuilt archives are written next to the input as
//! `<name>_modified.<ext>` and are neither signed nor aligned.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use regex::Regex;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::apktool::Apktool;
use crate::command::CommandRunner;
use crate::config::InstrumentConfig;
use crate::instrument::{insert_calls_to_lifecycle_methods, InjectionOutcome, ListenerRegistry};
use crate::ir::{MethodRef, MethodSig, Scene};
use crate::layout::{HandlerSource, LayoutHandlers};
use crate::manifest::Manifest;
use crate::utils::{modified_archive_path, path_must_str, read_file};
use crate::Context;

pub const MANIFEST_FILE: &str = "AndroidManifest.xml";

/// Directory an archive is decoded into, removed on drop when cleanup is
/// enabled
struct Workdir {
    path: PathBuf,
    tmp: Option<TempDir>,
    cleanup: bool,
}

impl Workdir {
    fn new(cfg: &InstrumentConfig) -> crate::Result<Self> {
        if let Some(dir) = cfg.workdir.as_ref() {
            return Ok(Self {
                path: dir.clone(),
                tmp: None,
                cleanup: cfg.cleanup,
            });
        }
        let tmp = tempfile::Builder::new()
            .prefix("droidinject_")
            .keep(!cfg.cleanup)
            .tempdir()?;
        Ok(Self {
            path: tmp.path().join("decoded"),
            tmp: Some(tmp),
            cleanup: cfg.cleanup,
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Workdir {
    fn drop(&mut self) {
        if !self.cleanup {
            info!("keeping decoded files in {}", path_must_str(&self.path));
            return;
        }
        if self.tmp.is_some() {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.path) {
            warn!("failed to remove {}: {}", path_must_str(&self.path), e);
        }
    }
}

/// Apply `(pattern, replacement)` pairs in order, each one to its first
/// match only
pub fn apply_replacements(text: &str, replacements: &[(String, String)]) -> crate::Result<String> {
    let mut current = text.to_string();
    for (pattern, replacement) in replacements {
        let re = Regex::new(pattern)?;
        if !re.is_match(&current) {
            debug!("manifest pattern `{}` has no match", pattern);
            continue;
        }
        current = re.replace(&current, replacement.as_str()).into_owned();
    }
    Ok(current)
}

/// Copy `archive` to `<name>_modified.<ext>` with the entry `name` set to
/// `contents`
pub fn add_file_to_zip(archive: &Path, name: &str, contents: &[u8]) -> crate::Result<PathBuf> {
    let out = modified_archive_path(archive)?;
    let mut input = ZipArchive::new(File::open(archive)?)?;
    let mut writer = ZipWriter::new(File::create(&out)?);

    for idx in 0..input.len() {
        let entry = input.by_index_raw(idx)?;
        if entry.name() == name {
            debug!("dropping existing {} from {}", name, path_must_str(archive));
            continue;
        }
        writer.raw_copy_file(entry)?;
    }

    writer.start_file(name, SimpleFileOptions::default())?;
    writer.write_all(contents)?;
    writer.finish()?;
    info!("wrote {}", path_must_str(&out));
    Ok(out)
}

/// Decode/rebuild driver around the configured decompiler
pub struct Packager<'a> {
    apktool: Apktool<'a>,
    cfg: &'a InstrumentConfig,
}

impl<'a> Packager<'a> {
    pub fn new(
        ctx: &dyn Context,
        cfg: &'a InstrumentConfig,
        runner: &'a dyn CommandRunner,
    ) -> crate::Result<Self> {
        Ok(Self {
            apktool: Apktool::new(ctx, cfg, runner)?,
            cfg,
        })
    }

    /// Decode `archive`, rewrite its manifest text with `f` and rebuild it
    fn rebuild_with_manifest<F>(&self, archive: &Path, f: F) -> crate::Result<PathBuf>
    where
        F: FnOnce(String) -> crate::Result<String>,
    {
        let workdir = Workdir::new(self.cfg)?;
        let manifest = self.apktool.decode(archive, workdir.path())?;
        let text = f(read_file(&manifest)?)?;
        fs::write(&manifest, text)?;

        let out = modified_archive_path(archive)?;
        self.apktool.build(workdir.path(), &out)?;
        Ok(out)
    }

    /// Rebuild `archive` with `manifest` as its `AndroidManifest.xml`
    pub fn replace_manifest(&self, archive: &Path, manifest: &str) -> crate::Result<PathBuf> {
        self.rebuild_with_manifest(archive, |_| Ok(manifest.to_string()))
    }

    /// Rebuild `archive` after applying regex replacements to its manifest
    pub fn adapt_manifest(
        &self,
        archive: &Path,
        replacements: &[(String, String)],
    ) -> crate::Result<PathBuf> {
        self.rebuild_with_manifest(archive, |text| {
            let adapted = apply_replacements(&text, replacements)?;
            debug!("new manifest:\n{}", adapted);
            Ok(adapted)
        })
    }

    pub fn decode(&self, archive: &Path, workdir: &Path) -> crate::Result<PathBuf> {
        self.apktool.decode(archive, workdir)
    }

    pub fn build(&self, workdir: &Path, out: &Path) -> crate::Result<()> {
        self.apktool.build(workdir, out)
    }
}

/// Make the creation method of every main activity an entry point, returns
/// the number of entry points added
pub fn seed_entry_points(scene: &mut Scene, manifest: &Manifest, sig: &MethodSig) -> usize {
    let mut found = Vec::new();
    for activity in manifest.main_activities() {
        match scene.class(activity.as_str()) {
            Some(cls) if cls.method(sig).is_some() => found.push(cls.method_ref(sig)),
            Some(_) => debug!("main activity {} doesn't declare {}", activity, sig),
            None => debug!("main activity {} is not in the scene", activity),
        }
    }
    let count = found.len();
    for m in found {
        scene.add_entry_point(m);
    }
    count
}

/// Inputs of a lifecycle injection over a directory of classes
pub struct InjectJob<'a> {
    pub classes: &'a Path,
    pub out: &'a Path,
    /// Decoded archive providing the manifest and layouts
    pub decoded: Option<&'a Path>,
    /// Explicit entry points, the manifest's main activities otherwise
    pub entry_points: Vec<MethodRef>,
}

/// Load the classes, inject the lifecycle calls and write the classes back
/// out
pub fn inject_classes(
    job: &InjectJob,
    cfg: &InstrumentConfig,
    registry: &ListenerRegistry,
) -> crate::Result<InjectionOutcome> {
    let mut scene = Scene::load_dir(job.classes)?;
    let sig = &cfg.creation_signature;

    if !job.entry_points.is_empty() {
        scene.set_entry_points(job.entry_points.clone());
    } else if let Some(decoded) = job.decoded {
        let manifest = Manifest::from_file(&decoded.join(MANIFEST_FILE))?;
        let added = seed_entry_points(&mut scene, &manifest, sig);
        info!("{} entry points from {}", added, manifest.package());
    }

    let layouts;
    let empty: BTreeSet<MethodSig> = BTreeSet::new();
    let handlers: &dyn HandlerSource = match job.decoded {
        Some(decoded) => {
            layouts = LayoutHandlers::new(decoded);
            &layouts
        }
        None => &empty,
    };

    let outcome = insert_calls_to_lifecycle_methods(&mut scene, registry, handlers, sig)?;
    scene.dump_dir(job.out)?;
    Ok(outcome)
}
