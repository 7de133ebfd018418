use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use std::path::Path;

use super::formatter::format_score;
use crate::scoring::RankedEntity;

/// Write the ranking as CSV: `rank`, `score`, then the dataset columns in
/// their original order. The file is replaced atomically.
pub fn export_csv(path: &Path, columns: &[String], ranked: &[RankedEntity]) -> Result<()> {
    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    {
        let mut writer = csv::Writer::from_writer(&mut file);

        let columns: Vec<&str> = columns
            .iter()
            .map(String::as_str)
            .filter(|c| *c != "rank" && *c != "score")
            .collect();

        let mut header = vec!["rank", "score"];
        header.extend(columns.iter().copied());
        writer.write_record(&header).context("Failed to write CSV header")?;

        for entry in ranked {
            let mut row = vec![entry.rank.to_string(), format_score(entry.score)];
            row.extend(columns.iter().map(|column| {
                entry
                    .record
                    .get(column)
                    .map(|value| value.to_string())
                    .unwrap_or_default()
            }));
            writer
                .write_record(&row)
                .with_context(|| format!("Failed to write CSV row for {}", entry.record.id()))?;
        }

        writer.flush().context("Failed to flush CSV output")?;
    }

    file.commit()
        .with_context(|| format!("Failed to save ranked CSV at {}", path.display()))?;

    tracing::info!(path = %path.display(), rows = ranked.len(), "exported ranking");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{load_dataset, EntityRecord, MetricValue};
    use crate::scoring::{rank, WeightConfig};
    use std::collections::BTreeMap;
    use std::{env, fs};

    #[test]
    fn test_export_csv() {
        let temp_path = env::temp_dir().join("counsel_rank_test_export.csv");
        let _ = fs::remove_file(&temp_path);

        let entities: Vec<EntityRecord> = [("A", "10", "Skadden"), ("B", "20", "DLA Piper, LLP")]
            .iter()
            .map(|(name, metric, firm)| {
                let mut fields = BTreeMap::new();
                fields.insert("Name".to_string(), MetricValue::from_cell(name));
                fields.insert("Metric".to_string(), MetricValue::from_cell(metric));
                fields.insert("Firm".to_string(), MetricValue::from_cell(firm));
                EntityRecord::new(*name, fields).unwrap()
            })
            .collect();
        let weights: WeightConfig = [("Metric", 2.0)].into_iter().collect();
        let ranked = rank(&entities, &weights).unwrap();

        let columns = vec!["Name".to_string(), "Firm".to_string(), "Metric".to_string()];
        export_csv(&temp_path, &columns, &ranked).unwrap();

        let text = fs::read_to_string(&temp_path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "rank,score,Name,Firm,Metric");
        assert_eq!(lines[1], "1,40.00,B,\"DLA Piper, LLP\",20");
        assert_eq!(lines[2], "2,20.00,A,Skadden,10");

        let _ = fs::remove_file(&temp_path);
    }

    #[test]
    fn test_export_keeps_source_text() {
        let source = env::temp_dir().join("counsel_rank_test_export_source.csv");
        let target = env::temp_dir().join("counsel_rank_test_export_roundtrip.csv");
        fs::write(&source, "id,Bar Number,Metric\n007,00123,1\n7,1.50,2\n").unwrap();

        let dataset = load_dataset(&source, None).unwrap();
        let weights: WeightConfig = [("Metric", 1.0)].into_iter().collect();
        let ranked = rank(&dataset.records, &weights).unwrap();
        export_csv(&target, &dataset.columns, &ranked).unwrap();

        let text = fs::read_to_string(&target).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "rank,score,id,Bar Number,Metric");
        assert_eq!(lines[1], "1,2.00,7,1.50,2");
        assert_eq!(lines[2], "2,1.00,007,00123,1");

        let reloaded = load_dataset(&target, Some("id")).unwrap();
        assert_eq!(reloaded.records[1].id(), "007");

        let _ = fs::remove_file(&source);
        let _ = fs::remove_file(&target);
    }
}
