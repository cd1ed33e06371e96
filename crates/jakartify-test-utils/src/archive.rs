//! In-memory archive fixtures.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// One entry of a fixture archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub data: Vec<u8>,
    pub method: CompressionMethod,
}

impl Entry {
    pub fn deflated(name: &str, data: impl AsRef<[u8]>) -> Self {
        Self {
            name: name.to_string(),
            data: data.as_ref().to_vec(),
            method: CompressionMethod::Deflated,
        }
    }

    pub fn stored(name: &str, data: impl AsRef<[u8]>) -> Self {
        Self {
            name: name.to_string(),
            data: data.as_ref().to_vec(),
            method: CompressionMethod::Stored,
        }
    }
}

/// Builds an archive from `(name, data)` pairs using deflate.
pub fn build(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let entries: Vec<Entry> = entries
        .iter()
        .map(|(name, data)| Entry::deflated(name, data))
        .collect();
    build_entries(&entries)
}

pub fn build_entries(entries: &[Entry]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for entry in entries {
        let options = SimpleFileOptions::default().compression_method(entry.method);
        if entry.name.ends_with('/') {
            writer
                .add_directory(entry.name.trim_end_matches('/'), options)
                .expect("add directory");
        } else {
            writer.start_file(entry.name.as_str(), options).expect("start file");
            writer.write_all(&entry.data).expect("write entry");
        }
    }
    writer.finish().expect("finish archive").into_inner()
}

/// Reads every entry of an archive, in central directory order.
pub fn read(bytes: &[u8]) -> Vec<Entry> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("open archive");
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).expect("read entry");
        let mut data = Vec::new();
        file.read_to_end(&mut data).expect("read entry data");
        entries.push(Entry {
            name: file.name().to_string(),
            data,
            method: file.compression(),
        });
    }
    entries
}

/// Entry names of an archive, in order.
pub fn names(bytes: &[u8]) -> Vec<String> {
    read(bytes).into_iter().map(|entry| entry.name).collect()
}

/// Data of the named entry, if present.
pub fn entry(bytes: &[u8], name: &str) -> Option<Vec<u8>> {
    read(bytes)
        .into_iter()
        .find(|entry| entry.name == name)
        .map(|entry| entry.data)
}
