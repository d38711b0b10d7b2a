//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `scaffold_core` linkage and store bootstrap from a shell.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `scaffold [DATA_DIR] [add NAME [AGE]]`. Without `DATA_DIR` an
//! in-memory store is used.

use scaffold_core::{AppContext, ContactDao, ContactService, Store};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    match run(std::env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("scaffold: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    println!("scaffold_core version={}", scaffold_core::core_version());

    let (store, rest) = match args.split_first() {
        Some((data_dir, rest)) if data_dir != "add" => {
            let ctx = AppContext::new(data_dir).map_err(|err| err.to_string())?;
            scaffold_core::init_logging_for(&ctx).map_err(|err| err.to_string())?;
            (Store::global(&ctx).map_err(|err| err.to_string())?, rest)
        }
        _ => (
            Arc::new(Store::open_in_memory().map_err(|err| err.to_string())?),
            args.as_slice(),
        ),
    };
    println!("store location={}", store.location());

    let dao = ContactDao::new(store);
    let service = ContactService::new(dao);

    if let [command, name, tail @ ..] = rest {
        if command != "add" {
            return Err(format!("unknown command `{command}`"));
        }
        let age = match tail.first() {
            Some(raw) => Some(
                raw.parse::<i32>()
                    .map_err(|err| format!("invalid age `{raw}`: {err}"))?,
            ),
            None => None,
        };
        let contact = service
            .add_contact(name.as_str(), age)
            .map_err(|err| err.to_string())?;
        println!("added id={}", contact.id.unwrap_or_default());
    }

    let contacts = service.load_contacts().map_err(|err| err.to_string())?;
    println!("contacts count={}", contacts.len());
    for contact in contacts {
        let age = contact
            .age
            .map_or_else(|| "-".to_string(), |age| age.to_string());
        println!(
            "{}\t{}\t{age}",
            contact.id.unwrap_or_default(),
            contact.name
        );
    }
    Ok(())
}
