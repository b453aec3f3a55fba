//! Run configuration.
//!
//! Loaded from YAML by the CLI, then adjusted by `CASEFILL_*` environment
//! variables and command-line flags. Every section has defaults matching the
//! deployment the form automation was written against.

use std::env;
use std::path::PathBuf;

use action_primitives::WaitTiers;
use cdp_adapter::CdpConfig;
use control_resolvers::Tempo;
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::errors::CaseFillError;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub workbook: WorkbookConfig,
    pub attachments: AttachmentsConfig,
    pub browser: BrowserConfig,
    pub timeouts: WaitTiers,
    pub tempo: Tempo,
    pub controls: ControlsConfig,
    pub logging: LoggingConfig,
    /// CSS selector of a post-save confirmation; when set, Save waits for it.
    pub save_confirmation: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SiteConfig {
    pub url: String,
    /// URL fragment present once the operator has logged in.
    pub home_marker: String,
    pub login_timeout_secs: u64,
    /// Ask on the terminal when login is not detected in time.
    pub prompt_on_login_timeout: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: "https://vtal.elaw.com.br/".to_string(),
            home_marker: "/homePage.elaw".to_string(),
            login_timeout_secs: 180,
            prompt_on_login_timeout: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct WorkbookConfig {
    pub path: PathBuf,
    pub sheet: Option<String>,
    pub status_column: String,
    pub open_on_failure: bool,
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("PLANILHA CADASTRO NOVA AÇÃO.xlsx"),
            sheet: None,
            status_column: "STATUS".to_string(),
            open_on_failure: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AttachmentsConfig {
    pub dir: PathBuf,
    /// File name template; `{case}` is replaced by the case number.
    pub pattern: String,
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            pattern: "ATOrd_{case}.pdf".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub user_data_dir: Option<PathBuf>,
    /// Attach to an already running Chrome instead of launching one.
    pub ws_url: Option<String>,
    pub default_deadline_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            executable: None,
            user_data_dir: None,
            ws_url: None,
            default_deadline_ms: 30_000,
        }
    }
}

impl BrowserConfig {
    pub fn cdp_config(&self) -> CdpConfig {
        let defaults = CdpConfig::default();
        CdpConfig {
            executable: self.executable.clone(),
            user_data_dir: self.user_data_dir.clone().unwrap_or(defaults.user_data_dir),
            headless: self.headless,
            default_deadline_ms: self.default_deadline_ms,
            websocket_url: self.ws_url.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for daily-rolling log files.
    pub dir: Option<PathBuf>,
}

/// Ids of the case form's controls.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ControlsConfig {
    pub search_input: String,
    pub edit_button: String,
    pub save_button: String,
    pub selects: SelectControls,
    pub judge_dialog: DialogControls,
    pub opposing_party_dialog: DialogControls,
    pub parties: PartyControls,
    pub opposing_counsel_input: String,
    pub distribution_date_input: String,
    pub citation_date_input: String,
    pub amount_input: String,
    pub responsible_lawyer_input: String,
    pub legal_manager_input: String,
    /// Caption of the label-relative input used when the office select fails.
    pub external_office_caption: String,
    pub external_office_input_fragment: String,
    pub file_input: String,
    pub role_value: String,
    pub document_party_value: String,
    pub default_document_type: String,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            search_input: "j_id_2g:globaSearchAutocomplete_input".to_string(),
            edit_button: "btnEditar".to_string(),
            save_button: "btnSalvarOpen".to_string(),
            selects: SelectControls::default(),
            judge_dialog: DialogControls::judge(),
            opposing_party_dialog: DialogControls::opposing_party(),
            parties: PartyControls::default(),
            opposing_counsel_input:
                "j_id_4c_1:j_id_4c_5_2_2_f_9_2v_1:autocompleteAdvogadoParteContrariaNome_input"
                    .to_string(),
            distribution_date_input: "j_id_4c_1:dataDistribuicao_input".to_string(),
            citation_date_input: "j_id_4c_1:dataRecebimento_input".to_string(),
            amount_input: "j_id_4c_1:amountCase_input".to_string(),
            responsible_lawyer_input: "j_id_4c_1:autoCompleteLawyer_input".to_string(),
            legal_manager_input: "j_id_4c_1:j_id_4c_5_2_2_l_9_45_2:j_id_4c_5_2_2_l_9_45_3_1_2_2_1_1:j_id_4c_5_2_2_l_9_45_3_1_2_2_1_2g_input".to_string(),
            external_office_caption: "Escritório Externo".to_string(),
            external_office_input_fragment: "autocomplete".to_string(),
            file_input: "input[type='file']".to_string(),
            role_value: "Réu".to_string(),
            document_party_value: "Autor".to_string(),
            default_document_type: "Petição Inicial".to_string(),
        }
    }
}

/// Label ids of the overlay single-selects.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SelectControls {
    pub rite: String,
    pub state: String,
    pub comarca: String,
    pub forum: String,
    pub court_division: String,
    pub classification: String,
    pub instance: String,
    pub phase: String,
    pub client_company: String,
    pub role: String,
    pub document_type: String,
    pub document_party: String,
    pub action_type: String,
    pub responsible_lawyer: String,
    pub external_office: String,
}

impl Default for SelectControls {
    fn default() -> Self {
        Self {
            rite: "j_id_4c_1:j_id_4c_5_2_2_1_9_t_1:comboRito_label".to_string(),
            state: "j_id_4c_1:j_id_4c_5_2_2_1_9_t_1:comboEstadoVara_label".to_string(),
            comarca: "j_id_4c_1:j_id_4c_5_2_2_1_9_t_1:comboComarcaVara_label".to_string(),
            forum: "j_id_4c_1:j_id_4c_5_2_2_1_9_t_1:comboForoTribunal_label".to_string(),
            court_division: "j_id_4c_1:j_id_4c_5_2_2_1_9_t_1:comboVara_label".to_string(),
            classification: "j_id_4c_1:j_id_4c_5_2_2_2_9_15_1:processoClassificacaoCombo_label"
                .to_string(),
            instance: "j_id_4c_1:j_id_4c_5_2_2_3_9_19_1_label".to_string(),
            phase: "j_id_4c_1:processoFaseCombo_label".to_string(),
            client_company: "j_id_4c_1:comboClientProcessoParte_label".to_string(),
            role: "j_id_4c_1:j_id_4c_5_2_2_9_9_2_6_label".to_string(),
            document_type: "j_id_4c_1:j_id_4c_5_2_2_r_9_24_1:eFileTipoCombo_label".to_string(),
            document_party: "j_id_4c_1:j_id_4c_5_2_2_b_9_8_1:j_id_4c_5_2_2_b_9_8_5_2_n_label"
                .to_string(),
            action_type: "j_id_4c_1:comboProcessoTipo_label".to_string(),
            responsible_lawyer: "j_id_4c_1:comboAdvogadoResponsavelProcesso_label".to_string(),
            external_office: "j_id_4c_1:comboEscritorioLimit_label".to_string(),
        }
    }
}

/// A dialog hosted in an embedded frame: opener on the page, one input and
/// the buttons to press inside the frame.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DialogControls {
    pub opener: String,
    /// Substring of the dialog id.
    pub hint: String,
    pub input: String,
    pub buttons: Vec<DialogButtonControls>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DialogButtonControls {
    pub name: String,
    pub id: String,
    pub fallback_css: Option<String>,
    /// Wait for the button to become visible before pressing it.
    pub await_visible: bool,
}

impl DialogControls {
    fn judge() -> Self {
        Self {
            opener: "j_id_4c_1:juizBtnNovo".to_string(),
            hint: "juizBtnNovo_dlg".to_string(),
            input: "j_id_w".to_string(),
            buttons: vec![DialogButtonControls {
                name: "Salvar".to_string(),
                id: "btnSalvarjuiz".to_string(),
                fallback_css: Some("button[id*='Salvar']".to_string()),
                await_visible: false,
            }],
        }
    }

    fn opposing_party() -> Self {
        Self {
            opener: "j_id_4c_1:j_id_4c_5_2_2_b_9_8_1:parteContrariaMainGridBtnNovo".to_string(),
            hint: "parteContrariaMainGridBtnNovo_dlg".to_string(),
            input: "j_id_1e".to_string(),
            buttons: vec![
                DialogButtonControls {
                    name: "Continuar".to_string(),
                    id: "j_id_1i".to_string(),
                    fallback_css: Some("button[id*='1i'], button[id*='Continuar']".to_string()),
                    await_visible: false,
                },
                DialogButtonControls {
                    name: "Salvar".to_string(),
                    id: "parteContrariaButtom".to_string(),
                    fallback_css: Some(
                        "button[id*='parteContraria'], button[id*='Salvar']".to_string(),
                    ),
                    await_visible: true,
                },
            ],
        }
    }
}

/// Secondary-party controls. They are re-rendered per entry, so they are
/// addressed by id suffix.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PartyControls {
    pub autocomplete_suffix: String,
    pub role_select_suffix: String,
    pub add_button_suffix: String,
    /// Table that lists added parties.
    pub table_css: String,
}

impl Default for PartyControls {
    fn default() -> Self {
        Self {
            autocomplete_suffix: "autocompleteOutraParte_input".to_string(),
            role_select_suffix: "processoParteSelect_label".to_string(),
            add_button_suffix: "outrasParteAddButtom".to_string(),
            table_css: "table.ui-datatable[id*='outrasParte']".to_string(),
        }
    }
}

const ENV_WORKBOOK: &str = "CASEFILL_WORKBOOK";
const ENV_SITE_URL: &str = "CASEFILL_SITE_URL";
const ENV_HEADLESS: &str = "CASEFILL_HEADLESS";
const ENV_WS_URL: &str = "CASEFILL_WS_URL";
const ENV_ATTACHMENTS_DIR: &str = "CASEFILL_ATTACHMENTS_DIR";

fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Config {
    /// Applies `CASEFILL_*` variables on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        if let Some(path) = env_value(ENV_WORKBOOK) {
            info!(path = %path, "Workbook path from {}", ENV_WORKBOOK);
            self.workbook.path = PathBuf::from(path);
        }
        if let Some(url) = env_value(ENV_SITE_URL) {
            info!(url = %url, "Site URL from {}", ENV_SITE_URL);
            self.site.url = url;
        }
        if let Some(flag) = env_value(ENV_HEADLESS) {
            self.browser.headless = parse_flag(&flag);
        }
        if let Some(ws_url) = env_value(ENV_WS_URL) {
            self.browser.ws_url = Some(ws_url);
        }
        if let Some(dir) = env_value(ENV_ATTACHMENTS_DIR) {
            self.attachments.dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<(), CaseFillError> {
        Url::parse(&self.site.url).map_err(|err| {
            CaseFillError::InvalidConfig(format!("site.url '{}': {err}", self.site.url))
        })?;
        if let Some(ws_url) = &self.browser.ws_url {
            Url::parse(ws_url).map_err(|err| {
                CaseFillError::InvalidConfig(format!("browser.ws_url '{ws_url}': {err}"))
            })?;
        }
        let tiers = &self.timeouts;
        if tiers.short_ms == 0 || tiers.medium_ms == 0 || tiers.long_ms == 0 {
            return Err(CaseFillError::InvalidConfig(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.workbook.status_column.trim().is_empty() {
            return Err(CaseFillError::InvalidConfig(
                "workbook.status_column must not be empty".to_string(),
            ));
        }
        if !self.attachments.pattern.contains("{case}") {
            return Err(CaseFillError::InvalidConfig(
                "attachments.pattern must contain {case}".to_string(),
            ));
        }
        Ok(())
    }
}
