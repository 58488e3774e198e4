//! HuggingFace dataset card (README.md) for an exported dataset.

use crate::dataset::export::DatasetExporter;
use crate::dataset::record::collect;
use crate::error::OcrError;
use crate::fsutil;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

/// HuggingFace `size_categories` bucket for a record count.
pub fn size_category(records: usize) -> &'static str {
    match records {
        0..=999 => "n<1K",
        1_000..=9_999 => "1K<n<10K",
        10_000..=99_999 => "10K<n<100K",
        100_000..=999_999 => "100K<n<1M",
        _ => "1M<n<10M",
    }
}

#[derive(Debug)]
struct SubsetStats {
    name: String,
    records: usize,
    documents: usize,
    splits: BTreeSet<String>,
}

/// `1234567` → `1,234,567`.
fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

impl DatasetExporter {
    /// Render the dataset card and, if `output_path` is given, write it there.
    ///
    /// Counts come from re-collecting every subset, so the card reflects the
    /// markdown tree rather than whatever parquet files happen to exist.
    pub fn create_dataset_card(&self, output_path: Option<&Path>) -> Result<String, OcrError> {
        let mut stats = Vec::new();
        for (name, dir) in self.subset_dirs()? {
            let records = collect(&dir)?;
            let documents: BTreeSet<(&str, &str)> = records
                .iter()
                .map(|r| (r.split.as_str(), r.source_file.as_str()))
                .collect();
            stats.push(SubsetStats {
                records: records.len(),
                documents: documents.len(),
                splits: records.iter().map(|r| r.split.clone()).collect(),
                name,
            });
        }

        let total_records: usize = stats.iter().map(|s| s.records).sum();
        let total_documents: usize = stats.iter().map(|s| s.documents).sum();
        let config = self.config();

        let mut card = String::new();
        // Writing to a String cannot fail.
        let _ = write!(
            card,
            "---\n\
license: mit\n\
task_categories:\n\
- text-generation\n\
- text-retrieval\n\
language:\n\
- en\n\
size_categories:\n\
- {category}\n\
---\n\
\n\
# {name}\n\
\n\
OCR-extracted text produced with {model} (resolution mode `{resolution}`).\n\
\n\
## Dataset Summary\n\
\n\
- **Total Records**: {records}\n\
- **Source Documents**: {documents}\n\
- **Format**: Parquet (Snappy compression)\n\
\n\
## Dataset Structure\n\
\n\
### Data Fields\n\
\n\
- `id`: Unique identifier for the record (relative path of the markdown file)\n\
- `source_file`: Source document name without the page suffix\n\
- `split`: Dataset split (train/test/validation)\n\
- `page_number`: Page number for multi-page documents (null for single-page)\n\
- `text`: OCR-extracted text in markdown format\n\
- `text_length`: Length of the text in characters\n\
- `file_path`: Relative path to the source markdown file\n\
\n\
### Subsets\n\
\n",
            category = size_category(total_records),
            name = config.dataset_name,
            model = config.ocr_model,
            resolution = config.resolution,
            records = thousands(total_records),
            documents = thousands(total_documents),
        );

        for s in &stats {
            let splits: Vec<&str> = s.splits.iter().map(String::as_str).collect();
            let _ = writeln!(
                card,
                "- **{}**: {} records from {} documents (splits: {})",
                s.name,
                thousands(s.records),
                thousands(s.documents),
                splits.join(", ")
            );
        }

        card.push_str(
            "\n## Usage\n\
\n\
```python\n\
from datasets import load_dataset\n\
\n\
dataset = load_dataset(\"path/to/dataset\")\n\
dataset = load_dataset(\"path/to/dataset\", name=\"subset_name\")\n\
dataset = load_dataset(\"path/to/dataset\", streaming=True)\n\
```\n\
\n\
## License\n\
\n\
MIT License\n",
        );

        if let Some(path) = output_path {
            fsutil::write_atomic(path, card.as_bytes())?;
        }
        Ok(card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExportConfig;

    #[test]
    fn size_categories() {
        assert_eq!(size_category(0), "n<1K");
        assert_eq!(size_category(999), "n<1K");
        assert_eq!(size_category(1_000), "1K<n<10K");
        assert_eq!(size_category(99_999), "10K<n<100K");
        assert_eq!(size_category(100_000), "100K<n<1M");
        assert_eq!(size_category(5_000_000), "1M<n<10M");
    }

    #[test]
    fn thousands_separator() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1234567), "1,234,567");
    }

    #[test]
    fn card_counts_pages_and_documents() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("hearings/train")).unwrap();
        std::fs::write(root.join("hearings/train/doc_page001.md"), "a").unwrap();
        std::fs::write(root.join("hearings/train/doc_page002.md"), "b").unwrap();
        std::fs::write(root.join("hearings/train/other.md"), "c").unwrap();

        let config = ExportConfig {
            dataset_name: "congress-ocr".into(),
            ..Default::default()
        };
        let exporter = DatasetExporter::new(root, config);
        let out = root.join("dataset/README.md");
        let card = exporter.create_dataset_card(Some(&out)).unwrap();

        assert!(card.starts_with("---\nlicense: mit\n"));
        assert!(card.contains("# congress-ocr"));
        assert!(card.contains("- n<1K"));
        assert!(card.contains("**hearings**: 3 records from 2 documents (splits: train)"));
        assert_eq!(std::fs::read_to_string(out).unwrap(), card);
    }
}
