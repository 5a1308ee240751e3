use std::env;

/// One application to ingest reviews for: the bank it belongs to plus the
/// store-side application identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSpec {
    pub bank_name: String,
    pub app_id: String,
}

/// Retrieves an environment variable and splits it into a vector of strings
/// based on a delimiter.
///
/// # Arguments
/// - `var`: The name of the environment variable.
/// - `delimiter`: The character to split the environment variable's value by.
///
/// # Returns
/// - `Vec<String>`
pub fn get_env_var_as_vec(var: &str, delimiter: char) -> Vec<String> {
    env::var(var)
        .unwrap_or_default()
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parses `REVUS_APPS`-style configuration: semicolon-delimited
/// `Bank Name=app.identifier` pairs. Entries without an `=` or with an empty
/// side are skipped.
pub fn parse_app_specs(raw: &[String]) -> Vec<AppSpec> {
    raw.iter()
        .filter_map(|entry| {
            let (bank, app_id) = entry.split_once('=')?;
            let bank = bank.trim();
            let app_id = app_id.trim();
            if bank.is_empty() || app_id.is_empty() {
                return None;
            }
            Some(AppSpec {
                bank_name: bank.to_string(),
                app_id: app_id.to_string(),
            })
        })
        .collect()
}
