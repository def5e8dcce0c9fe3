//! Settings Secret Utility
//!
//! Seals a Bluesky app password with SKYTHREAD_ENCRYPTION_KEY. With an
//! identifier it writes the settings file directly (SKYTHREAD_SETTINGS_PATH);
//! without one it prints the sealed value to paste in as `secret` next to
//! `"secretEncrypted": true`.

use std::io::{self, Write};

use skythread::crypto::{SecretCipher, ENCRYPTION_KEY_VAR};
use skythread::{FileSettingsStore, ServiceConfig, Settings, SettingsStore};

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    println!("🔐 Settings Secret Utility");
    println!("=========================");
    println!();

    let cipher = match SecretCipher::from_env() {
        Ok(cipher) => cipher,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!();
            eprintln!("Then set it:");
            eprintln!("  export {}=\"your_64_char_hex_key\"", ENCRYPTION_KEY_VAR);
            std::process::exit(1);
        }
    };

    let identifier = prompt("Bluesky handle (empty to only print the sealed value): ")?;
    let app_password = prompt("App password: ")?;
    if app_password.trim().is_empty() {
        eprintln!("❌ The app password cannot be blank");
        std::process::exit(1);
    }

    let identifier = identifier.trim();
    if identifier.is_empty() {
        println!();
        println!("Sealed app password (hex):");
        println!("{}", cipher.seal(&app_password)?);
        return Ok(());
    }

    // The store seals the password itself because the key is set.
    let config = ServiceConfig::from_env();
    let store = FileSettingsStore::new(config.settings_path);
    store.save(&Settings::new(identifier, app_password))?;
    println!();
    println!(
        "✅ Settings for {} written to {} with a sealed app password",
        identifier,
        store.path().display()
    );

    Ok(())
}
