use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 18] = [
        "RUST_LOG",
        "LV_HOST",
        "LV_PORT",
        "LV_DATABASE_URL",
        "LV_TAX_RATE",
        "LV_SHIPPING_RATES",
        "LV_PENDING_ORDER_TIMEOUT",
        "LV_USE_X_FORWARDED_FOR",
        "LV_USE_FORWARDED",
        "LV_REDSYS_IP_WHITELIST",
        "LV_NOTIFICATION_URL",
        "LV_REDSYS_MERCHANT_CODE",
        "LV_REDSYS_TERMINAL",
        "LV_REDSYS_ENVIRONMENT",
        "LV_REDSYS_CURRENCY",
        "LV_REDSYS_MERCHANT_URL",
        "LV_REDSYS_URL_OK",
        "LV_REDSYS_URL_KO",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
