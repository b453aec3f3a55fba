use std::collections::BTreeSet;

use casefill_cli::parsers::CellValue;
use casefill_cli::record::{columns, CaseRecord};
use casefill_cli::workbook::{self, SheetData, Workbook};
use casefill_cli::CaseFillError;
use chrono::NaiveDate;

fn sheet() -> SheetData {
    let mut sheet = SheetData::new(
        "Cadastro",
        vec![
            columns::CASE_NUMBER.to_string(),
            columns::DISTRIBUTION_DATE.to_string(),
            columns::CLAIM_AMOUNT.to_string(),
            columns::SECONDARY_PARTIES[0].to_string(),
        ],
    );
    let distributed = NaiveDate::from_ymd_opt(2024, 3, 15)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .expect("date");
    sheet.rows.push(vec![
        "0001".into(),
        CellValue::DateTime(distributed),
        CellValue::Number(1234.5),
        "ACME LTDA".into(),
    ]);
    sheet.rows.push(vec!["0002".into(), "15/03/2024".into()]);
    sheet
}

#[test]
fn xlsx_keeps_types_and_gains_the_status_column() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lote.xlsx");
    let mut data = sheet();
    let status = data.ensure_column("STATUS");
    data.set_text(0, status, "OK");
    data.set_text(1, status, "ERRO: Salvar failed");

    let written = workbook::save(&path, &data, &BTreeSet::from([1])).expect("save");
    assert_eq!(written, path);

    let loaded = Workbook::load(&path, None).expect("load");
    assert_eq!(loaded.sheet.name, "Cadastro");
    assert_eq!(loaded.sheet.headers.last().map(String::as_str), Some("STATUS"));

    let record = CaseRecord::from_sheet(&loaded.sheet, 0).expect("record");
    assert_eq!(record.case_number, "0001");
    assert_eq!(record.distribution_date, "15/03/2024");
    assert_eq!(record.claim_amount, "1234.5");
    assert_eq!(record.secondary_parties, vec!["ACME LTDA".to_string()]);

    assert_eq!(
        loaded.sheet.cell(1, "STATUS").map(CellValue::display).as_deref(),
        Some("ERRO: Salvar failed")
    );
}

#[test]
fn named_sheet_must_exist() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lote.xlsx");
    workbook::save(&path, &sheet(), &BTreeSet::new()).expect("save");

    let err = Workbook::load(&path, Some("Outra")).unwrap_err();
    assert!(matches!(err, CaseFillError::SheetNotFound(name) if name == "Outra"));
}

#[test]
fn csv_round_trips_as_text() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lote.csv");
    std::fs::write(
        &path,
        "Número do processo,Data de Distribuição,Valor da Causa\n0001,2024-03-15,\"1.234,56\"\n,,\n",
    )
    .expect("csv");

    let mut loaded = Workbook::load(&path, None).expect("load");
    assert_eq!(loaded.sheet.name, "lote");
    assert_eq!(loaded.sheet.row_count(), 2);
    let record = CaseRecord::from_sheet(&loaded.sheet, 0).expect("record");
    assert_eq!(record.distribution_date, "15/03/2024");
    assert_eq!(record.claim_amount, "1234.56");
    assert!(CaseRecord::from_sheet(&loaded.sheet, 1).is_none());

    let status = loaded.sheet.ensure_column("STATUS");
    loaded.sheet.set_text(0, status, "OK");
    let written = workbook::save(&path, &loaded.sheet, &BTreeSet::from([0])).expect("save");
    assert_eq!(written, path);

    let reloaded = Workbook::load(&path, None).expect("reload");
    assert_eq!(
        reloaded.sheet.cell(0, "STATUS"),
        Some(&CellValue::Text("OK".to_string()))
    );
    assert_eq!(reloaded.sheet.cell(1, "STATUS"), Some(&CellValue::Empty));
}

#[test]
fn unreadable_files_report_the_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing.xlsx");

    let err = Workbook::load(&path, None).unwrap_err();
    assert!(matches!(err, CaseFillError::WorkbookRead { path: failed, .. } if failed == path));
}
