//! Archive and config builders shared by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;

pub const HEADER: &str = "name,category,price,create_date\n";

pub const TWO_TOOLS: &str = "name,category,price,create_date\n\
                             Widget,Tools,9.99,2024-01-15\n\
                             Gadget,Tools,19.99,2024-01-16\n";

pub fn zip_archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn tar_archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, data.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap()
}

/// Returns `(entry name, contents)` of every entry in a ZIP archive.
pub fn zip_entries(bytes: &[u8]) -> Vec<(String, String)> {
    use std::io::Read;

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut text = String::new();
            entry.read_to_string(&mut text).unwrap();
            (entry.name().to_string(), text)
        })
        .collect()
}

/// Data lines of a CSV export, sorted, without the header.
pub fn sorted_rows(csv: &str) -> Vec<String> {
    let mut rows: Vec<String> = csv.lines().skip(1).map(|l| l.to_string()).collect();
    rows.sort();
    rows
}

/// TOML config pointing at a database under `root`.
pub fn config_toml(root: &Path, bind: &str, extra: &str) -> String {
    format!(
        r#"[db]
path = "{}/data/prices.sqlite"

[server]
bind = "{}"
{}
"#,
        root.display(),
        bind,
        extra
    )
}
