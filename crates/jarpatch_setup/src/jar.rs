//! Jar (zip) helpers shared by the pipeline stages.

use crate::cache::PatchSet;
use crate::error::Result;
use camino::Utf8Path;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

pub(crate) type JarReader = ZipArchive<BufReader<File>>;

pub(crate) fn open(path: &Utf8Path) -> Result<JarReader> {
    let file = File::open(path)?;
    Ok(ZipArchive::new(BufReader::new(file))?)
}

pub fn contains_entry(jar: &Utf8Path, name: &str) -> Result<bool> {
    Ok(open(jar)?.index_for_name(name).is_some())
}

/// Entry names in archive order.
pub fn entry_names(jar: &Utf8Path) -> Result<Vec<String>> {
    let mut archive = open(jar)?;
    (0..archive.len())
        .map(|i| Ok(archive.by_index_raw(i)?.name().to_string()))
        .collect()
}

/// Copy the entries accepted by `keep` into a new jar without recompressing.
///
/// Any existing `output` is replaced. Returns `(kept, dropped)`.
pub fn copy_entries<F>(input: &Utf8Path, output: &Utf8Path, mut keep: F) -> Result<(usize, usize)>
where
    F: FnMut(&str) -> bool,
{
    let mut archive = open(input)?;
    remove_if_exists(output)?;

    let mut writer = ZipWriter::new(BufWriter::new(File::create(output)?));
    let (mut kept, mut dropped) = (0, 0);
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        if keep(entry.name()) {
            writer.raw_copy_file(entry)?;
            kept += 1;
        } else {
            tracing::debug!("Dropping entry {}", entry.name());
            dropped += 1;
        }
    }
    writer.finish()?.flush()?;

    Ok((kept, dropped))
}

/// Decompressed contents of every `.class` entry, keyed by entry name.
pub fn read_class_entries(jar: &Utf8Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut archive = open(jar)?;
    let mut classes = BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() || !entry.name().ends_with(".class") {
            continue;
        }
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        classes.insert(entry.name().to_string(), data);
    }
    Ok(classes)
}

/// Move every `.class` entry under one of `prefixes` out of `jar`.
///
/// The jar is rewritten through a temporary sibling and renamed into place.
pub fn split_patches(jar: &Utf8Path, prefixes: &[String]) -> Result<PatchSet> {
    let parent = jar.parent().unwrap_or(Utf8Path::new("."));
    let mut archive = open(jar)?;
    let temp = tempfile::NamedTempFile::new_in(parent)?;
    let mut writer = ZipWriter::new(BufWriter::new(temp.reopen()?));
    let mut patches = PatchSet::default();

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        let name = entry.name().to_string();
        let is_patch =
            name.ends_with(".class") && prefixes.iter().any(|prefix| name.starts_with(prefix));

        if !is_patch {
            writer.raw_copy_file(entry)?;
            continue;
        }
        drop(entry);

        let mut entry = archive.by_index(i)?;
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        patches.insert(name, data);
    }
    writer.finish()?.flush()?;
    drop(archive);

    temp.persist(jar).map_err(|e| e.error)?;
    Ok(patches)
}

/// Unpack every `.class` entry of `jar` under `destination`, recreating it first.
pub fn extract_classes(jar: &Utf8Path, destination: &Utf8Path) -> Result<usize> {
    if destination.exists() {
        fs::remove_dir_all(destination)?;
    }
    fs::create_dir_all(destination)?;

    let mut archive = open(jar)?;
    let mut count = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() || !entry.name().ends_with(".class") {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!("Skipping entry with unsafe path: {}", entry.name());
            continue;
        };

        let target = destination.as_std_path().join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(&target)?);
        std::io::copy(&mut entry, &mut out)?;
        out.flush()?;
        count += 1;
    }
    Ok(count)
}

/// Write a jar from `(name, bytes)` pairs, deflated.
pub fn write_entries<'a, I>(output: &Utf8Path, entries: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut writer = ZipWriter::new(BufWriter::new(File::create(output)?));
    let options = SimpleFileOptions::default();
    for (name, data) in entries {
        writer.start_file(name, options)?;
        writer.write_all(data)?;
    }
    writer.finish()?.flush()?;
    Ok(())
}

pub(crate) fn remove_if_exists(path: &Utf8Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}
