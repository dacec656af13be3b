use clap::Args;

pub const DEFAULT_LOGIN_URL: &str = "https://web-sl.repman.co/v2/acceso/login";
pub const DEFAULT_REPORT_URL: &str = "https://repman.co/sl2/reportes/salidaHornoTurnos";
pub const DEFAULT_CENTER: &str = "CC06";

/// Where and as which production center the kiln-exit report is fetched.
#[derive(Debug, Clone, Args)]
pub struct RepmanConfig {
    #[arg(long, env = "REPMAN_LOGIN_URL", default_value = DEFAULT_LOGIN_URL)]
    pub login_url: String,
    #[arg(long, env = "REPMAN_REPORT_URL", default_value = DEFAULT_REPORT_URL)]
    pub report_url: String,
    #[arg(long, env = "REPMAN_CENTER", default_value = DEFAULT_CENTER)]
    pub center: String,
}

impl Default for RepmanConfig {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            report_url: DEFAULT_REPORT_URL.to_string(),
            center: DEFAULT_CENTER.to_string(),
        }
    }
}
