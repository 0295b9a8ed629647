use coachdesk_core::{AppError, Config, SessionTenant};

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Session tenant for one invocation: the `--tenant` flag when given,
/// otherwise `TENANT_ID` from the configuration.
pub fn session_tenant(flag: Option<&str>, config: &Config) -> Result<SessionTenant, AppError> {
    SessionTenant::with_tenant(flag.or(config.session_tenant_id.as_deref()))
}

/// Tenant argument for role commands: `None` selects platform rosters,
/// otherwise the session tenant is required.
pub fn role_tenant(platform: bool, session: &SessionTenant) -> Result<Option<String>, AppError> {
    if platform {
        return Ok(None);
    }
    Ok(Some(session.require()?.to_string()))
}
