//! Configuration resolution.
//!
//! Values come from a `casewatch.json` file (current directory, then home),
//! `CASEWATCH_*` environment variables, and CLI flags, with flags taking
//! precedence over environment over file. The result is one [`Settings`]
//! value constructed at process start and handed to each command; required
//! parameters are validated per command before any I/O happens.

use std::env;
use std::fs;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::Deserialize;

use crate::error::WatchError;

pub const CONFIG_FILE_NAME: &str = "casewatch.json";
const DEFAULT_DB_FILE: &str = "casewatch.db";
const ENV_PREFIX: &str = "CASEWATCH_";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub query: Option<String>,
    pub expression: Option<String>,
    pub db: Option<String>,
    pub spreadsheet: Option<String>,
    pub client_email: Option<String>,
    pub private_key: Option<String>,
    pub private_key_id: Option<String>,
    pub mail_sender: Option<String>,
    pub mail_region: Option<String>,
    pub mail_api_key: Option<String>,
    pub report_email_recipients: Vec<String>,
}

/// Flag values captured from the command line; `None` means "not passed".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub query: Option<String>,
    pub expression: Option<String>,
    pub db: Option<String>,
    pub spreadsheet: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: Utf8PathBuf,
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    query: Option<String>,
    expression: Option<String>,
    spreadsheet: Option<String>,
    client_email: Option<String>,
    private_key: Option<String>,
    private_key_id: Option<String>,
    mail_sender: Option<String>,
    mail_region: Option<String>,
    mail_api_key: Option<String>,
    report_email_recipients: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub query: String,
    pub expression: String,
}

#[derive(Debug, Clone)]
pub struct MailParams {
    pub sender: String,
    pub region: String,
    pub api_key: String,
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub private_key_id: String,
}

impl Settings {
    pub fn search_params(&self) -> Result<SearchParams, WatchError> {
        Ok(SearchParams {
            base_url: require(&self.url, "url")?,
            username: require(&self.username, "username")?,
            password: require(&self.password, "password")?,
            query: require(&self.query, "query")?,
            expression: self.expression.clone().unwrap_or_default(),
        })
    }

    pub fn spreadsheet_id(&self) -> Result<String, WatchError> {
        require(&self.spreadsheet, "spreadsheet")
    }

    pub fn mail_params(&self) -> Result<MailParams, WatchError> {
        if self.report_email_recipients.is_empty() {
            return Err(WatchError::MissingParam("report_email_recipients"));
        }
        Ok(MailParams {
            sender: require(&self.mail_sender, "mail_sender")?,
            region: require(&self.mail_region, "mail_region")?,
            api_key: require(&self.mail_api_key, "mail_api_key")?,
            recipients: self.report_email_recipients.clone(),
        })
    }

    pub fn sheets_key(&self) -> Result<ServiceAccountKey, WatchError> {
        Ok(ServiceAccountKey {
            client_email: require(&self.client_email, "client_email")?,
            private_key: require(&self.private_key, "private_key")?,
            private_key_id: require(&self.private_key_id, "private_key_id")?,
        })
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolve settings from file, environment, and flags.
    ///
    /// An explicitly passed config path must exist and parse; the default
    /// locations are optional so that environment and flags can stand alone.
    pub fn resolve(path: Option<&str>, overrides: CliOverrides) -> Result<Settings, WatchError> {
        let file = match path {
            Some(path) => Self::load_file(&Utf8PathBuf::from(path))?,
            None => match Self::default_config_path() {
                Some(found) => Self::load_file(&found)?,
                None => ConfigFile::default(),
            },
        };
        Ok(Self::merge(file, overrides))
    }

    fn default_config_path() -> Option<Utf8PathBuf> {
        let local = Utf8PathBuf::from(CONFIG_FILE_NAME);
        if local.as_std_path().exists() {
            return Some(local);
        }
        let home = BaseDirs::new()
            .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.home_dir().join(CONFIG_FILE_NAME)).ok())?;
        home.as_std_path().exists().then_some(home)
    }

    fn load_file(path: &Utf8PathBuf) -> Result<ConfigFile, WatchError> {
        let content =
            fs::read_to_string(path.as_std_path()).map_err(|_| WatchError::ConfigRead(path.clone()))?;
        serde_json::from_str(&content).map_err(|err| WatchError::ConfigParse(err.to_string()))
    }

    fn merge(file: ConfigFile, overrides: CliOverrides) -> Settings {
        let db = overrides
            .db
            .or_else(|| env_var("DB"))
            .or(file.db)
            .unwrap_or_else(|| DEFAULT_DB_FILE.to_string());

        let recipients = env_var("REPORT_EMAIL_RECIPIENTS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or(file.report_email_recipients);

        Settings {
            db_path: Utf8PathBuf::from(db),
            url: overrides.url.or_else(|| env_var("URL")).or(file.url),
            username: overrides
                .username
                .or_else(|| env_var("USERNAME"))
                .or(file.username),
            password: overrides
                .password
                .or_else(|| env_var("PASSWORD"))
                .or(file.password),
            query: overrides.query.or_else(|| env_var("QUERY")).or(file.query),
            expression: overrides
                .expression
                .or_else(|| env_var("EXPRESSION"))
                .or(file.expression),
            spreadsheet: overrides
                .spreadsheet
                .or_else(|| env_var("SPREADSHEET"))
                .or(file.spreadsheet),
            client_email: env_var("CLIENT_EMAIL").or(file.client_email),
            private_key: env_var("PRIVATE_KEY").or(file.private_key),
            private_key_id: env_var("PRIVATE_KEY_ID").or(file.private_key_id),
            mail_sender: env_var("MAIL_SENDER").or(file.mail_sender),
            mail_region: env_var("MAIL_REGION").or(file.mail_region),
            mail_api_key: env_var("MAIL_API_KEY").or(file.mail_api_key),
            report_email_recipients: recipients,
        }
    }

    /// Test seam: merge without touching the filesystem.
    pub fn merge_sources(file: ConfigFile, overrides: CliOverrides) -> Settings {
        Self::merge(file, overrides)
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{name}"))
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn require(value: &Option<String>, name: &'static str) -> Result<String, WatchError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(WatchError::MissingParam(name))
}
