// src/pipeline.rs
use anyhow::{Context, Result};
use std::{
    fs,
    path::{Component, Path, PathBuf},
};
use tracing::{info, instrument, warn};

use crate::consolidate::consolidate;
use crate::error::ExtractError;
use crate::parse::load_tables;
use crate::write::{write_consolidated, write_raw};

/// Where `process_kml_file` put its results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outputs {
    pub town: String,
    pub raw_path: PathBuf,
    pub consolidated_path: PathBuf,
}

/// Load `kml_path`, consolidate it by block group and write
/// `<town>_raw_tables.csv` and `<town>_by_block_id.csv` next to it.
///
/// Nothing is written unless loading and consolidation both succeed, and
/// the raw dump is removed again if the consolidated table cannot be written.
#[instrument(level = "info", skip(kml_path), fields(path = %kml_path.as_ref().display()))]
pub fn process_kml_file<P: AsRef<Path>>(kml_path: P) -> Result<Outputs> {
    let kml_path = kml_path.as_ref();
    let xml = fs::read_to_string(kml_path)
        .with_context(|| format!("Failed to read KML file: {:?}", kml_path))?;

    let tables = load_tables(&xml).with_context(|| format!("loading {:?}", kml_path))?;
    let consolidated = consolidate(&tables)?;
    let town = consolidated.town().to_string();
    check_town_name(&town)?;

    let out_dir = match kml_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let raw_path = out_dir.join(format!("{}_raw_tables.csv", town));
    let consolidated_path = out_dir.join(format!("{}_by_block_id.csv", town));

    write_raw(&tables, &raw_path)?;
    if let Err(e) = write_consolidated(&consolidated, &consolidated_path) {
        // keep the pair together: no raw dump without its consolidated table
        if let Err(rm) = fs::remove_file(&raw_path) {
            warn!("failed to remove {:?}: {}", raw_path, rm);
        }
        return Err(e);
    }

    info!(town = %town, blocks = consolidated.len(), "Done");
    Ok(Outputs {
        town,
        raw_path,
        consolidated_path,
    })
}

/// The town ends up in the output file names, so it must be a single plain path component.
fn check_town_name(town: &str) -> Result<(), ExtractError> {
    let mut components = Path::new(town).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == town => Ok(()),
        _ => Err(ExtractError::InvalidTownName {
            town: town.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidate::{BLOCK_ID_FIELD, FIELDS};
    use tempfile::tempdir;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,kmlblocks=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn placemark(title: &str, fields: &[(&str, &str)]) -> String {
        let rows: String = fields
            .iter()
            .map(|(k, v)| format!("<tr><td>{}</td><td>{}</td></tr>", k, v))
            .collect();
        format!(
            "<Placemark><name>{title}</name><description><![CDATA[<html><body>\
             <table><tr><td>{title}</td></tr></table>\
             <table>{rows}</table></body></html>]]></description></Placemark>"
        )
    }

    fn write_kml(dir: &Path, placemarks: &[String]) -> Result<PathBuf> {
        let path = dir.join("doc.kml");
        let doc = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2"><Document><Folder>
{}
</Folder></Document></kml>"#,
            placemarks.join("\n")
        );
        fs::write(&path, doc)?;
        Ok(path)
    }

    fn read_rows(path: &Path) -> Result<Vec<csv::StringRecord>> {
        let mut rdr = csv::Reader::from_path(path)?;
        Ok(rdr.records().collect::<Result<_, _>>()?)
    }

    fn extract_error(err: &anyhow::Error) -> &ExtractError {
        err.downcast_ref::<ExtractError>()
            .unwrap_or_else(|| panic!("not an ExtractError: {:#}", err))
    }

    #[test]
    fn two_block_groups_end_to_end() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let kml = write_kml(
            dir.path(),
            &[
                placemark(
                    "Block Group 1",
                    &[(BLOCK_ID_FIELD, "250010001"), ("Town", "TestTown")],
                ),
                placemark(
                    "Block Group 2",
                    &[(BLOCK_ID_FIELD, "250010002"), ("Town", "TestTown")],
                ),
            ],
        )?;

        let out = process_kml_file(&kml)?;

        assert_eq!(out.town, "TestTown");
        assert_eq!(out.raw_path, dir.path().join("TestTown_raw_tables.csv"));
        assert_eq!(
            out.consolidated_path,
            dir.path().join("TestTown_by_block_id.csv")
        );

        let rows = read_rows(&out.consolidated_path)?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), FIELDS.len() + 1);
        assert_eq!(
            (&rows[0][0], &rows[0][1], &rows[0][2]),
            ("250010001", "Block Group 1", "TestTown")
        );
        assert_eq!(
            (&rows[1][0], &rows[1][1], &rows[1][2]),
            ("250010002", "Block Group 2", "TestTown")
        );

        let raw = fs::read_to_string(&out.raw_path)?;
        assert!(raw.starts_with(
            "Block Group 1,\r\nBlock Group Identification Number,250010001\r\nTown,TestTown\r\n,\r\n"
        ));
        Ok(())
    }

    #[test]
    fn one_row_per_block_and_union_of_fields() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let electric = "Active Electric Locations, 2019";
        let gas = "Active Gas Locations, 2019";
        let kml = write_kml(
            dir.path(),
            &[
                placemark("Acton", &[("Town", "Acton"), ("Average", "0.4")]),
                placemark(
                    "Block Group 1",
                    &[(BLOCK_ID_FIELD, "1"), ("Town", "Acton"), (electric, "12")],
                ),
                placemark("Block Group 2", &[(BLOCK_ID_FIELD, "2"), ("Town", "Acton")]),
                placemark(
                    "Block Group 1",
                    &[(BLOCK_ID_FIELD, "1"), ("Town", "Acton"), (gas, "3")],
                ),
            ],
        )?;

        let out = process_kml_file(&kml)?;

        let rows = read_rows(&out.consolidated_path)?;
        let ids: Vec<&str> = rows.iter().map(|r| &r[0]).collect();
        assert_eq!(ids, vec!["1", "2"]);

        let col = |name: &str| FIELDS.iter().position(|f| *f == name).unwrap() + 1;
        assert_eq!(&rows[0][col(electric)], "12");
        assert_eq!(&rows[0][col(gas)], "3");
        assert_eq!(&rows[1][col(electric)], "");

        // the town summary placemark is still part of the raw dump
        let raw = fs::read_to_string(&out.raw_path)?;
        assert!(raw.starts_with("Acton,\r\nTown,Acton\r\nAverage,0.4\r\n,\r\n"));
        Ok(())
    }

    #[test]
    fn rerun_produces_identical_files() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let kml = write_kml(
            dir.path(),
            &[
                placemark("BG 1", &[(BLOCK_ID_FIELD, "1"), ("Town", "Ayer"), ("x", "y, z")]),
                placemark("BG 2", &[(BLOCK_ID_FIELD, "2"), ("Town", "Ayer")]),
            ],
        )?;

        let first = process_kml_file(&kml)?;
        let raw = fs::read(&first.raw_path)?;
        let by_block = fs::read(&first.consolidated_path)?;

        let second = process_kml_file(&kml)?;
        assert_eq!(first, second);
        assert_eq!(fs::read(&second.raw_path)?, raw);
        assert_eq!(fs::read(&second.consolidated_path)?, by_block);
        Ok(())
    }

    #[test]
    fn conflicting_block_values_fail_without_output() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let rate = "2019 Electric Location Participation Rate";
        let kml = write_kml(
            dir.path(),
            &[
                placemark("BG 1", &[(BLOCK_ID_FIELD, "77"), ("Town", "Ayer"), (rate, "0.1")]),
                placemark("BG 1", &[(BLOCK_ID_FIELD, "77"), ("Town", "Ayer"), (rate, "0.2")]),
            ],
        )?;

        let err = process_kml_file(&kml).unwrap_err();
        match extract_error(&err) {
            ExtractError::InconsistentField {
                block_id, field, ..
            } => {
                assert_eq!(block_id, "77");
                assert_eq!(field, rate);
            }
            other => panic!("expected InconsistentField, got {:?}", other),
        }
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn three_tables_in_description_fail() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let bad = "<Placemark><description><![CDATA[\
                   <table><tr><td>t</td></tr></table>\
                   <table><tr><td>k</td><td>v</td></tr></table>\
                   <table><tr><td>extra</td></tr></table>]]></description></Placemark>"
            .to_string();
        let kml = write_kml(dir.path(), &[bad])?;

        let err = process_kml_file(&kml).unwrap_err();
        assert!(matches!(
            extract_error(&err),
            ExtractError::MalformedDescription { tables: 3 }
        ));
        Ok(())
    }

    #[test]
    fn different_towns_fail() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let kml = write_kml(
            dir.path(),
            &[
                placemark("BG 1", &[(BLOCK_ID_FIELD, "1"), ("Town", "Acton")]),
                placemark("BG 2", &[(BLOCK_ID_FIELD, "2"), ("Town", "Boxborough")]),
            ],
        )?;

        let err = process_kml_file(&kml).unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("Acton"));
        assert!(msg.contains("Boxborough"));
        assert!(matches!(
            extract_error(&err),
            ExtractError::MultipleTownsFound { towns } if towns.len() == 2
        ));
        Ok(())
    }

    #[test]
    fn town_with_path_separator_is_rejected() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let kml = write_kml(
            dir.path(),
            &[placemark("BG 1", &[(BLOCK_ID_FIELD, "1"), ("Town", "../Acton")])],
        )?;

        let err = process_kml_file(&kml).unwrap_err();
        assert!(matches!(
            extract_error(&err),
            ExtractError::InvalidTownName { town } if town == "../Acton"
        ));
        Ok(())
    }

    #[test]
    fn failed_consolidated_write_removes_raw_dump() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let kml = write_kml(
            dir.path(),
            &[placemark("BG 1", &[(BLOCK_ID_FIELD, "1"), ("Town", "Ayer")])],
        )?;
        // a directory with the output's name makes the consolidated write fail
        let blocker = dir.path().join("Ayer_by_block_id.csv");
        fs::create_dir(&blocker)?;

        assert!(process_kml_file(&kml).is_err());

        assert!(!dir.path().join("Ayer_raw_tables.csv").exists());
        let mut names: Vec<String> = fs::read_dir(dir.path())?
            .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<Result<_, _>>()?;
        names.sort();
        assert_eq!(names, vec!["Ayer_by_block_id.csv", "doc.kml"]);
        Ok(())
    }

    #[test]
    fn missing_input_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = process_kml_file(dir.path().join("nope.kml")).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read KML file"));
    }

    #[test]
    fn town_names() {
        assert!(check_town_name("Acton").is_ok());
        assert!(check_town_name("North Andover").is_ok());
        for bad in ["", ".", "..", "a/b", "/abs"] {
            assert!(check_town_name(bad).is_err(), "{:?} should be rejected", bad);
        }
    }
}
