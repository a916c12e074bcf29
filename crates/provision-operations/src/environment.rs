//! Environment variables derived from a provisioned service.

use provision_core::{EnvVars, Service, env_prefix};

/// Key of the env table inside the application's meta namespace.
pub const ENV_KEY: &str = "env";

/// Variables exposing `service` to the application.
///
/// For a service named `data.db` the prefix is `DATA_DB`:
/// - `DATA_DB_HOST`: internal address, always present
/// - `DATA_DB_<USER>_PASS`: per-user password
/// - `DATA_DB_USER` / `DATA_DB_PASS`: the default user, if it is declared
/// - `DATA_DB_USERS`: space-separated usernames in plan order, if any
#[must_use]
pub fn project(service: &Service) -> EnvVars {
    let prefix = env_prefix(&service.name);
    let mut vars = EnvVars::new();

    let host = service
        .internal_ip
        .map(|ip| ip.to_string())
        .unwrap_or_default();
    vars.set(format!("{prefix}_HOST"), host);

    let plan = &service.plan;
    let mut usernames = Vec::with_capacity(plan.users.len());
    for user in &plan.users {
        usernames.push(user.username.as_str());
        vars.set(
            format!("{prefix}_{}_PASS", user.username.to_uppercase()),
            user.password.clone(),
        );
    }

    if let Some(default) = plan.default_user() {
        vars.set(format!("{prefix}_USER"), default.username.clone());
        vars.set(format!("{prefix}_PASS"), default.password.clone());
    }

    if !usernames.is_empty() {
        vars.set(format!("{prefix}_USERS"), usernames.join(" "));
    }

    vars
}
