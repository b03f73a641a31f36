//! Line-delimited JSON datasets on local disk.
//!
//! A dataset is a directory of `*.json` part files, one JSON object per line,
//! as written by Spark. Other files in the directory (`_SUCCESS`, `.crc`
//! checksums) are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use evidex_common::{EvidexError, Record, RecordSource, Result};
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, info};

/// Reads `<root>/<dataset>/*.json`, decoding part files in parallel.
#[derive(Debug, Clone)]
pub struct JsonDirectorySource {
    root: PathBuf,
    workers: usize,
}

impl JsonDirectorySource {
    pub fn new(root: impl Into<PathBuf>, workers: usize) -> Self {
        Self {
            root: root.into(),
            workers: workers.max(1),
        }
    }

    pub fn dataset_dir(&self, dataset: &str) -> PathBuf {
        self.root.join(dataset)
    }
}

/// The `.json` files directly inside `dir`, in name order.
fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(EvidexError::DatasetNotFound(dir.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn decode_file(path: &Path, fields: &[&str]) -> Result<Vec<Record>> {
    let reader = BufReader::new(File::open(path)?);
    let records = decode_reader(reader, &path.display().to_string(), fields)?;
    debug!(file = %path.display(), records = records.len(), "Decoded part file");
    Ok(records)
}

/// Decode one JSON object per line, keeping only `fields`.
///
/// Blank lines are skipped. Each record's origin, and every error, names
/// `origin` and the 1-based line number. A line that is not UTF-8 is a
/// `Decode` error like any other malformed line.
pub fn decode_reader<R: BufRead>(reader: R, origin: &str, fields: &[&str]) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let location = format!("{origin}:{}", idx + 1);
        let line = match line {
            Ok(line) => line,
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(EvidexError::Decode {
                    location,
                    message: e.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        if line.trim().is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(&line).map_err(|e| EvidexError::Decode {
            location: location.clone(),
            message: e.to_string(),
        })?;
        let Value::Object(mut object) = value else {
            return Err(EvidexError::Decode {
                location,
                message: "expected a JSON object".to_string(),
            });
        };

        let mut record = Record::new(location.clone());
        for field in fields {
            match object.remove(*field) {
                Some(v) => record.insert(*field, v),
                None => {
                    return Err(EvidexError::MissingField {
                        location,
                        field: (*field).to_string(),
                    });
                }
            }
        }
        records.push(record);
    }
    Ok(records)
}

impl RecordSource for JsonDirectorySource {
    fn load(&self, dataset: &str, fields: &[&str]) -> Result<Vec<Record>> {
        let dir = self.dataset_dir(dataset);
        let files = json_files(&dir)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("evidex-decode-{i}"))
            .build()
            .map_err(|e| EvidexError::WorkerFailure(format!("could not start decode pool: {e}")))?;

        // Collecting into Result keeps file order and stops at the first bad file.
        let parts: Vec<Vec<Record>> = pool.install(|| {
            files
                .par_iter()
                .map(|path| decode_file(path, fields))
                .collect::<Result<Vec<_>>>()
        })?;

        let records: Vec<Record> = parts.into_iter().flatten().collect();
        info!(
            dataset,
            dir = %dir.display(),
            files = files.len(),
            records = records.len(),
            "Loaded dataset"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evidex_common::{load_typed, EvidenceRecord};
    use serde_json::json;
    use std::io::Cursor;

    const FIELDS: &[&str] = &["targetId", "diseaseId", "score"];

    fn write(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_decode_reader_projects_fields() {
        let input = concat!(
            r#"{"targetId":"t1","diseaseId":"d1","score":0.5,"datasourceId":"eva"}"#,
            "\n\n",
            r#"{"targetId":"t2","diseaseId":"d2","score":1}"#,
            "\n"
        );
        let records = decode_reader(Cursor::new(input), "part-0.json", FIELDS).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].len(), 3);
        assert!(!records[0].contains_key("datasourceId"));
        assert_eq!(records[1]["score"], json!(1));
    }

    #[test]
    fn test_decode_reader_reports_line_of_bad_json() {
        let input = "{\"targetId\":\"t1\",\"diseaseId\":\"d1\",\"score\":1}\n{not json\n";
        let err = decode_reader(Cursor::new(input), "part-0.json", FIELDS).unwrap_err();
        match err {
            EvidexError::Decode { location, .. } => assert_eq!(location, "part-0.json:2"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_reader_reports_line_of_invalid_utf8() {
        let mut input = b"{\"targetId\":\"t1\",\"diseaseId\":\"d1\",\"score\":1}\n".to_vec();
        input.extend_from_slice(b"{\"targetId\":\"t\xff\",\"diseaseId\":\"d1\",\"score\":1}\n");

        let err = decode_reader(Cursor::new(input), "part-0.json", FIELDS).unwrap_err();
        match err {
            EvidexError::Decode { location, .. } => assert_eq!(location, "part-0.json:2"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_reader_tags_records_with_file_and_line() {
        let input = concat!(
            "\n",
            r#"{"targetId":"t1","diseaseId":"d1","score":0.5}"#,
            "\n"
        );
        let records = decode_reader(Cursor::new(input), "part-3.json", FIELDS).unwrap();
        assert_eq!(records[0].origin(), "part-3.json:2");
    }

    #[test]
    fn test_decode_reader_rejects_non_objects() {
        let err = decode_reader(Cursor::new("[1,2,3]\n"), "p.json", FIELDS).unwrap_err();
        assert!(matches!(err, EvidexError::Decode { .. }));
    }

    #[test]
    fn test_decode_reader_reports_missing_field() {
        let input = "{\"targetId\":\"t1\",\"score\":1}\n";
        let err = decode_reader(Cursor::new(input), "p.json", FIELDS).unwrap_err();
        match err {
            EvidexError::MissingField { location, field } => {
                assert_eq!(location, "p.json:1");
                assert_eq!(field, "diseaseId");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_reads_only_json_parts_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("evidence");
        std::fs::create_dir(&dir).unwrap();
        write(&dir, "part-00001.json", "{\"targetId\":\"t2\",\"diseaseId\":\"d\",\"score\":2}\n");
        write(&dir, "part-00000.json", "{\"targetId\":\"t1\",\"diseaseId\":\"d\",\"score\":1}\n");
        write(&dir, "_SUCCESS", "");
        write(&dir, ".part-00000.json.crc", "garbage");

        let source = JsonDirectorySource::new(tmp.path(), 2);
        let records = source.load("evidence", FIELDS).unwrap();

        let targets: Vec<&str> = records.iter().map(|r| r["targetId"].as_str().unwrap()).collect();
        assert_eq!(targets, vec!["t1", "t2"]);
    }

    #[test]
    fn test_load_fails_on_any_bad_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("targets");
        std::fs::create_dir(&dir).unwrap();
        write(&dir, "a.json", "{\"id\":\"t1\",\"approvedSymbol\":\"S1\"}\n");
        write(&dir, "b.json", "{\"id\":\"t2\"}\n");

        let source = JsonDirectorySource::new(tmp.path(), 4);
        let err = source.load("targets", &["id", "approvedSymbol"]).unwrap_err();
        assert!(matches!(err, EvidexError::MissingField { ref field, .. } if field == "approvedSymbol"));
    }

    #[test]
    fn test_wrong_field_type_names_file_and_line() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("evidence");
        std::fs::create_dir(&dir).unwrap();
        write(&dir, "part-00000.json", "{\"targetId\":\"t1\",\"diseaseId\":\"d\",\"score\":1}\n");
        write(
            &dir,
            "part-00001.json",
            "{\"targetId\":\"t2\",\"diseaseId\":\"d\",\"score\":2}\n\n{\"targetId\":\"t3\",\"diseaseId\":\"d\",\"score\":\"0.5\"}\n",
        );

        let source = JsonDirectorySource::new(tmp.path(), 2);
        let err = load_typed::<EvidenceRecord>(&source).unwrap_err();
        match err {
            EvidexError::Decode { location, .. } => {
                assert!(location.ends_with("part-00001.json:3"), "location = {location}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_dataset_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let source = JsonDirectorySource::new(tmp.path(), 1);
        let err = source.load("diseases", &["id", "name"]).unwrap_err();
        assert!(matches!(err, EvidexError::DatasetNotFound(p) if p.ends_with("diseases")));
    }

    #[test]
    fn test_empty_dataset_dir_yields_no_records() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("diseases")).unwrap();
        let source = JsonDirectorySource::new(tmp.path(), 1);
        assert!(source.load("diseases", &["id", "name"]).unwrap().is_empty());
    }
}
