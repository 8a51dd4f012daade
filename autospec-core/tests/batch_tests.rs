mod common;

use autospec_core::office::SofficeLauncher;
use autospec_core::scenario::specification_copy;
use autospec_core::writer::read_sheet_states;
use autospec_core::{
    AppConfig, AutoSpecError, InvoiceProcessor, Scenario, Silent, parse_ranges,
};
use autospec_core::office::FileFormat;
use common::create_invoice;
use std::fs;
use std::path::Path;

fn processor(base: &Path) -> InvoiceProcessor {
    // The soffice binary is never started by the xlsx and delete scenarios
    InvoiceProcessor::new(base, Box::new(SofficeLauncher::new(base.join("missing-soffice"))))
}

fn visible_sheets(path: &Path) -> anyhow::Result<Vec<String>> {
    Ok(read_sheet_states(path)?
        .into_iter()
        .filter(|s| s.state.is_visible())
        .map(|s| s.name)
        .collect())
}

#[test]
fn test_redact_range_end_to_end() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    create_invoice(dir.path(), "5 Acme", 5, &["Invoice", "Specification"])?;
    create_invoice(dir.path(), "6 Globex", 6, &["Specification", "Costs", "Notes"])?;
    create_invoice(dir.path(), "7 Initech", 7, &["Invoice", "Specification"])?;

    let wanted = parse_ranges("5-6")?;
    let summary = processor(dir.path()).run(Scenario::RedactXlsx, Some(&wanted), &mut Silent)?;

    assert_eq!(summary.matched, 2);
    assert_eq!(summary.processed, 2);
    assert!(summary.is_success());

    for (folder, number) in [("5 Acme", 5), ("6 Globex", 6)] {
        let copy = specification_copy(&dir.path().join(folder), number, FileFormat::Xlsx);
        assert_eq!(visible_sheets(&copy)?, vec!["Specification"]);
    }
    assert!(!specification_copy(&dir.path().join("7 Initech"), 7, FileFormat::Xlsx).exists());

    Ok(())
}

#[test]
fn test_failing_invoice_does_not_stop_batch() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    create_invoice(dir.path(), "1 Alpha", 1, &["Specification"])?;
    fs::create_dir(dir.path().join("2 Beta"))?;
    create_invoice(dir.path(), "3 Gamma", 3, &["Specification"])?;

    let wanted = parse_ranges("1-3")?;
    let summary = processor(dir.path()).run(Scenario::RedactXlsx, Some(&wanted), &mut Silent)?;

    assert_eq!(summary.matched, 3);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].number, 2);
    assert!(summary.failures[0].cause.contains("Invoice 2.xlsx"));

    assert!(dir.path().join("1 Alpha/Invoice 1 fcs.xlsx").exists());
    assert!(dir.path().join("3 Gamma/Invoice 3 fcs.xlsx").exists());

    Ok(())
}

#[test]
fn test_conversion_without_application_fails_per_invoice() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    create_invoice(dir.path(), "4 Delta", 4, &["Specification"])?;

    let summary = processor(dir.path()).run(Scenario::RedactXls, None, &mut Silent)?;

    assert_eq!(summary.matched, 1);
    assert_eq!(summary.processed, 0);
    assert!(summary.failures[0].cause.contains("missing-soffice"));
    assert!(!dir.path().join("4 Delta/Invoice 4 fcs.xls").exists());

    Ok(())
}

#[test]
fn test_no_match_is_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    create_invoice(dir.path(), "5 Acme", 5, &["Specification"])?;
    fs::create_dir(dir.path().join("Archive"))?;

    let wanted = parse_ranges("10-12")?;
    match processor(dir.path()).run(Scenario::RedactXlsx, Some(&wanted), &mut Silent) {
        Err(AutoSpecError::NoMatch { requested }) => assert_eq!(requested, "invoices 10-12"),
        other => panic!("expected NoMatch, got {:?}", other),
    }

    Ok(())
}

#[test]
fn test_delete_all_copies() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    create_invoice(dir.path(), "5 Acme", 5, &["Specification"])?;
    create_invoice(dir.path(), "6 Globex", 6, &["Specification"])?;
    fs::write(dir.path().join("5 Acme/Invoice 5 fcs.xlsx"), b"x")?;
    fs::write(dir.path().join("5 Acme/Invoice 5 fcs.xls"), b"x")?;
    fs::write(dir.path().join("6 Globex/Invoice 6 fcs.xlsx"), b"x")?;

    let summary = processor(dir.path()).run(Scenario::DeleteCopies, None, &mut Silent)?;

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.deleted, 3);
    assert!(dir.path().join("5 Acme/Invoice 5.xlsx").exists());
    assert!(!dir.path().join("6 Globex/Invoice 6 fcs.xlsx").exists());

    Ok(())
}

#[test]
fn test_processor_from_config() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let launcher = || Box::new(SofficeLauncher::default());

    assert!(matches!(
        InvoiceProcessor::from_config(&AppConfig::default(), launcher()),
        Err(AutoSpecError::BaseDirUnset)
    ));

    let mut config = AppConfig::default();
    config.set_base_dir(&format!("\"{}\"", dir.path().display()))?;
    let processor = InvoiceProcessor::from_config(&config, launcher())?;
    assert_eq!(processor.base_dir(), dir.path());

    Ok(())
}
