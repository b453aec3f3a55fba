//! Case records read from the input sheet.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::errors::CaseFillError;
use crate::parsers::{normalize_date, safe_text, to_amount};
use crate::workbook::SheetData;

/// Header names of the input sheet.
pub mod columns {
    pub const CASE_NUMBER: &str = "Número do processo";
    pub const RITE: &str = "Localização do Processo";
    pub const STATE: &str = "Estado";
    pub const COMARCA: &str = "Comarca";
    pub const FORUM: &str = "Foro/Tribunal";
    pub const COURT_DIVISION: &str = "Vara";
    pub const CLASSIFICATION: &str = "Classificação Interna";
    pub const INSTANCE: &str = "Instância";
    pub const PHASE: &str = "Fase";
    pub const JUDGE: &str = "Juiz";
    pub const CLIENT_COMPANY: &str = "Empresa e Forma de participação";
    pub const OPPOSING_TAX_ID: &str = "CPF DA PARTE CONTRARIA";
    pub const EMPLOYER: &str = "Empregadora";
    pub const EMPLOYEE_TYPE: &str = "Tipo Empregado";
    pub const OPPOSING_COUNSEL: &str = "Advogado da Parte Contrária";
    pub const DISTRIBUTION_DATE: &str = "Data de Distribuição";
    pub const CITATION_DATE: &str = "Data de Citação";
    pub const ACTION_TYPE: &str = "Tipo de Ação";
    pub const CLAIM_AMOUNT: &str = "Valor da Causa";
    pub const RESPONSIBLE_LAWYER: &str = "Advogado Responsável";
    pub const LEGAL_MANAGER: &str = "Gestor Jurídico";
    pub const EXTERNAL_OFFICE: &str = "Escritório Externo";
    pub const DOCUMENT_TYPE: &str = "Tipo de Documento";

    pub const SECONDARY_PARTIES: [&str; 7] = [
        "1ª Reclamada",
        "2ª Reclamada",
        "3ª Reclamada",
        "4ª Reclamada",
        "5ª Reclamada",
        "6ª Reclamada",
        "7ª Reclamada",
    ];

    /// Columns a well-formed input sheet carries.
    pub fn expected() -> Vec<&'static str> {
        let mut all = vec![
            CASE_NUMBER,
            RITE,
            STATE,
            COMARCA,
            FORUM,
            COURT_DIVISION,
            CLASSIFICATION,
            INSTANCE,
            PHASE,
            JUDGE,
            CLIENT_COMPANY,
            OPPOSING_TAX_ID,
            EMPLOYER,
            EMPLOYEE_TYPE,
            OPPOSING_COUNSEL,
            DISTRIBUTION_DATE,
            CITATION_DATE,
            ACTION_TYPE,
            CLAIM_AMOUNT,
            RESPONSIBLE_LAWYER,
            LEGAL_MANAGER,
            EXTERNAL_OFFICE,
            DOCUMENT_TYPE,
        ];
        all.extend(SECONDARY_PARTIES);
        all
    }
}

/// One data row, already normalized for entry. Empty strings mean "leave
/// the field alone".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaseRecord {
    /// Zero-based data row index (the header is not counted).
    pub row: usize,
    pub case_number: String,
    pub rite: String,
    pub state: String,
    pub comarca: String,
    pub forum: String,
    pub court_division: String,
    pub classification: String,
    pub instance: String,
    pub phase: String,
    pub judge: String,
    pub client_company: String,
    pub opposing_tax_id: String,
    pub employer: String,
    pub employee_type: String,
    pub opposing_counsel: String,
    /// Canonical `DD/MM/YYYY`, or empty.
    pub distribution_date: String,
    pub citation_date: String,
    pub action_type: String,
    pub claim_amount: String,
    pub responsible_lawyer: String,
    pub legal_manager: String,
    pub external_office: String,
    pub document_type: String,
    pub secondary_parties: Vec<String>,
}

impl CaseRecord {
    /// Reads data row `row`; `None` when the case number is blank.
    pub fn from_sheet(sheet: &SheetData, row: usize) -> Option<Self> {
        let text = |name: &str| safe_text(sheet.cell(row, name));
        let case_number = text(columns::CASE_NUMBER);
        if case_number.is_empty() {
            return None;
        }
        Some(Self {
            row,
            case_number,
            rite: text(columns::RITE),
            state: text(columns::STATE),
            comarca: text(columns::COMARCA),
            forum: text(columns::FORUM),
            court_division: text(columns::COURT_DIVISION),
            classification: text(columns::CLASSIFICATION),
            instance: text(columns::INSTANCE),
            phase: text(columns::PHASE),
            judge: text(columns::JUDGE),
            client_company: text(columns::CLIENT_COMPANY),
            opposing_tax_id: text(columns::OPPOSING_TAX_ID),
            employer: text(columns::EMPLOYER),
            employee_type: text(columns::EMPLOYEE_TYPE),
            opposing_counsel: text(columns::OPPOSING_COUNSEL),
            distribution_date: normalize_date(sheet.cell(row, columns::DISTRIBUTION_DATE)),
            citation_date: normalize_date(sheet.cell(row, columns::CITATION_DATE)),
            action_type: text(columns::ACTION_TYPE),
            claim_amount: to_amount(sheet.cell(row, columns::CLAIM_AMOUNT)),
            responsible_lawyer: text(columns::RESPONSIBLE_LAWYER),
            legal_manager: text(columns::LEGAL_MANAGER),
            external_office: text(columns::EXTERNAL_OFFICE),
            document_type: text(columns::DOCUMENT_TYPE),
            secondary_parties: columns::SECONDARY_PARTIES
                .iter()
                .map(|name| text(name))
                .filter(|party| !party.is_empty())
                .collect(),
        })
    }

    /// Row number as shown by a spreadsheet application (header is row 1).
    pub fn sheet_row(&self) -> usize {
        self.row + 2
    }
}

/// 1-based, inclusive range of data rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl RowRange {
    /// Whether zero-based data row `index` falls inside the range.
    pub fn contains(&self, index: usize) -> bool {
        let number = index + 1;
        number >= self.start && self.end.map_or(true, |end| number <= end)
    }
}

impl FromStr for RowRange {
    type Err = CaseFillError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || CaseFillError::InvalidRowRange(raw.to_string());
        let number = |text: &str| {
            text.trim()
                .parse::<usize>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or_else(invalid)
        };
        let range = match raw.split_once('-') {
            None => {
                let row = number(raw)?;
                RowRange {
                    start: row,
                    end: Some(row),
                }
            }
            Some((start, end)) if end.trim().is_empty() => RowRange {
                start: number(start)?,
                end: None,
            },
            Some((start, end)) => RowRange {
                start: number(start)?,
                end: Some(number(end)?),
            },
        };
        if range.end.is_some_and(|end| end < range.start) {
            return Err(invalid());
        }
        Ok(range)
    }
}

impl fmt::Display for RowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) if end == self.start => write!(f, "{}", self.start),
            Some(end) => write!(f, "{}-{}", self.start, end),
            None => write!(f, "{}-", self.start),
        }
    }
}
