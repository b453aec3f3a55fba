//! Whole runs against the in-memory page: rows in, annotated sheet out.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use action_primitives::{ActionError, ControlDescriptor, TextMatch};
use async_trait::async_trait;
use casefill_cli::attachments::AttachmentLocator;
use casefill_cli::config::ControlsConfig;
use casefill_cli::parsers::CellValue;
use casefill_cli::record::columns;
use casefill_cli::{
    ArtifactSink, ResultReporter, RowRunner, RowWorkflow, SheetData, Workbook, XlsxArtifact,
};
use control_resolvers::autocomplete::CompanionIds;
use control_resolvers::fake::{FakeElement, FakePage, Interaction};
use control_resolvers::{ResolverBuilder, Tempo};
use parking_lot::Mutex;

const FAILING: &str = "0000001-11.2024.5.02.0001";
const PASSING: &str = "0000002-22.2024.5.02.0002";

#[derive(Default)]
struct RecordingSink {
    persisted: Mutex<Vec<(SheetData, BTreeSet<usize>)>>,
    opened: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl ArtifactSink for RecordingSink {
    async fn persist(
        &self,
        sheet: &SheetData,
        highlighted: &BTreeSet<usize>,
    ) -> casefill_cli::Result<PathBuf> {
        self.persisted.lock().push((sheet.clone(), highlighted.clone()));
        Ok(PathBuf::from("memory.xlsx"))
    }

    async fn open_for_review(&self, artifact: &Path) {
        self.opened.lock().push(artifact.to_path_buf());
    }
}

/// Both cases can be opened; the save button refuses the first two clicks,
/// so whichever row saves first fails.
fn page() -> Arc<FakePage> {
    let controls = ControlsConfig::default();
    let page = FakePage::new();
    page.add(ControlDescriptor::id(&controls.search_input), FakeElement::visible());
    let panel = CompanionIds::derive(&controls.search_input).panel;
    for case in [FAILING, PASSING] {
        page.add(
            ControlDescriptor::entry(ControlDescriptor::id(&panel), "span", case, TextMatch::Exact),
            FakeElement::visible(),
        );
    }
    page.add(ControlDescriptor::id(&controls.edit_button), FakeElement::visible());
    let save = ControlDescriptor::id(&controls.save_button);
    page.add(save.clone(), FakeElement::visible());
    page.fail(
        save,
        Interaction::Click,
        2,
        ActionError::NotClickable("covered by the loading mask".to_string()),
    );
    page
}

fn runner(page: &Arc<FakePage>, attachments: &Path) -> RowRunner {
    let resolvers = ResolverBuilder::new(page.clone())
        .with_tiers(FakePage::quick_tiers())
        .with_tempo(Tempo::instant())
        .build();
    RowRunner::new(RowWorkflow::new(
        resolvers,
        ControlsConfig::default(),
        AttachmentLocator::new(attachments, "ATOrd_{case}.pdf"),
    ))
}

fn input_sheet() -> SheetData {
    let mut sheet = SheetData::new(
        "Planilha1",
        vec![
            columns::CASE_NUMBER.to_string(),
            columns::DISTRIBUTION_DATE.to_string(),
            "STATUS".to_string(),
        ],
    );
    sheet.rows.push(vec![FAILING.into(), "2024-03-15".into(), CellValue::Empty]);
    sheet.rows.push(vec![CellValue::Empty, CellValue::Empty, "antigo".into()]);
    sheet.rows.push(vec![PASSING.into(), CellValue::Number(45366.0), CellValue::Empty]);
    sheet
}

#[tokio::test]
async fn three_rows_one_skipped_one_failed_one_saved() {
    let dir = tempfile::tempdir().expect("tempdir");
    let page = page();
    let mut sheet = input_sheet();

    let results = runner(&page, dir.path())
        .run(&FakePage::ctx(), &sheet)
        .await;
    let sink = RecordingSink::default();
    let summary = ResultReporter::new("STATUS", true)
        .finish(&mut sheet, &results, &sink)
        .await
        .expect("report");

    assert_eq!(results.skipped, vec![1]);
    assert_eq!((summary.succeeded, summary.failed, summary.skipped), (1, 1, 1));
    assert_eq!(summary.highlighted, vec![0]);
    assert!(summary.aborted.is_none());

    let status = |row| sheet.cell(row, "STATUS").map(CellValue::display);
    let failed = status(0).expect("status on the failed row");
    assert!(failed.starts_with("ERRO: Salvar failed: "), "{failed}");
    assert!(failed.contains("covered by the loading mask"), "{failed}");
    assert_eq!(status(1).as_deref(), Some("antigo"));
    assert_eq!(status(2).as_deref(), Some("OK"));

    let persisted = sink.persisted.lock();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].1, BTreeSet::from([0]));
    assert_eq!(sink.opened.lock().as_slice(), [PathBuf::from("memory.xlsx")]);
    assert_eq!(page.count("click #btnEditar"), 2);
}

#[tokio::test]
async fn statuses_survive_a_written_workbook() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lote.xlsx");
    let page = page();
    let mut sheet = input_sheet();

    let results = runner(&page, dir.path())
        .run(&FakePage::ctx(), &sheet)
        .await;
    let summary = ResultReporter::new("STATUS", false)
        .finish(&mut sheet, &results, &XlsxArtifact::new(&path))
        .await
        .expect("report");
    assert_eq!(summary.artifact, path);
    assert!(!summary.opened_for_review);

    let reread = Workbook::load(&path, None).expect("reload");
    assert_eq!(reread.sheet.name, "Planilha1");
    assert_eq!(reread.sheet.row_count(), 3);
    assert_eq!(
        reread.sheet.cell(2, "STATUS").map(CellValue::display).as_deref(),
        Some("OK")
    );
    assert_eq!(
        reread.sheet.cell(0, columns::CASE_NUMBER).map(CellValue::display).as_deref(),
        Some(FAILING)
    );
}
