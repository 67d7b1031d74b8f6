//! Emulate devices on a real bus and print the keypad display to the terminal.
//!
//! Usage: `keypad [device path] [auto | role...]`, where a role is one of
//! `keypad`, `pda` or `spa`. With `auto`, the roles the controller polls
//! are discovered first. Keys are read from stdin, one per line.

use std::io::BufRead;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use aqualink_keypad::{
    discover, BusConfig, BusReader, Device, Devices, Dispatcher, Keypad, Role, Shutdown, Spa,
};

const DISCOVERY_WINDOW: Duration = Duration::from_secs(5);

fn parse_role(name: &str) -> Result<Role> {
    Ok(match name {
        "keypad" => Role::Keypad,
        "pda" => Role::Pda,
        "spa" => Role::Spa,
        other => bail!("unknown role {:?}, expected keypad, pda or spa", other),
    })
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args();
    args.next(); // Skip program name
    let config = BusConfig {
        path: args.next().unwrap_or_else(|| BusConfig::default().path),
        ..BusConfig::default()
    };
    let role_args: Vec<String> = args.collect();

    let shutdown = Shutdown::new();
    let handler_shutdown = shutdown.clone();
    ctrlc::set_handler(move || handler_shutdown.request()).context("Failed to set Ctrl-C handler")?;

    let mut reader = BusReader::serial(config, shutdown.clone());
    let roles: Vec<Role> = if role_args.is_empty() {
        vec![Role::Keypad]
    } else if role_args.len() == 1 && role_args[0] == "auto" {
        println!("Listening for {:?}...", DISCOVERY_WINDOW);
        discover(&mut reader, DISCOVERY_WINDOW).into_iter().collect()
    } else {
        role_args
            .iter()
            .map(|name| parse_role(name))
            .collect::<Result<_>>()?
    };
    if roles.is_empty() {
        bail!("The controller doesn't poll any known device");
    }
    println!("Emulating {:?}", roles);

    let mut devices = Devices::new();
    let mut console: Option<Arc<Keypad>> = None;
    for role in &roles {
        if *role == Role::Spa {
            devices.add(Arc::new(Spa::new()));
            continue;
        }
        let keypad = Arc::new(match role {
            Role::Pda => Keypad::pda(),
            _ => Keypad::square(),
        });
        if console.is_none() {
            console = Some(keypad.clone());
        }
        devices.add(keypad);
    }
    let key_role = console.as_ref().map_or(Role::Spa, |keypad| keypad.role());

    let bus_thread = Dispatcher::new(reader, devices.clone()).spawn();

    let key_devices = devices.clone();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let key = match line {
                Ok(key) => key,
                Err(_) => break,
            };
            if let Err(err) = key_devices.send_key(key_role, key.trim()) {
                eprintln!("{}", err);
            }
        }
    });

    let mut last_spa = String::new();
    while !shutdown.is_requested() {
        if let Some(screen) = console.as_ref().and_then(|keypad| keypad.console_update()) {
            println!("{}", screen);
        }
        if let Ok(text) = devices.render_text(Role::Spa) {
            if text != last_spa {
                println!("SPA: {}", text);
                last_spa = text;
            }
        }
        thread::sleep(Duration::from_millis(250));
    }

    bus_thread
        .join()
        .map_err(|_| anyhow::anyhow!("Bus thread panicked"))?;
    Ok(())
}
