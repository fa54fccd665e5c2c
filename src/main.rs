use lantern::config::Options;
use lantern::game::Game;
use lantern::host_stdio::StdioHost;
use lantern::interpreter::Interpreter;
use log::{debug, info};
use std::env;
use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

fn usage(program: &str) {
    println!("lantern - interpreter for compiled text adventure images");
    println!();
    println!("Usage: {} <game_image> [--config options.toml]", program);
    println!("Examples:");
    println!("  {} cave.lntn", program);
    println!("  {} cave.lntn --config lantern.toml", program);
    println!();
    println!("Set RUST_LOG=trace together with trace_instructions = true in the");
    println!("configuration file to trace every executed instruction.");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage(&args[0]);
        return Ok(());
    }
    let game_path = &args[1];

    let options = match args.get(2).map(String::as_str) {
        Some("--config") => {
            let path = args.get(3).ok_or("--config needs a file name")?;
            Options::load(path)?
        }
        Some(other) => {
            eprintln!("Error: Unknown option '{}'", other);
            usage(&args[0]);
            std::process::exit(2);
        }
        None => Options::default(),
    };
    debug!("Options: {:?}", options);

    debug!("Loading game image: {}", game_path);
    let mut file = match File::open(game_path) {
        Ok(file) => file,
        Err(e) => {
            match e.kind() {
                std::io::ErrorKind::NotFound => {
                    eprintln!("Error: Game image not found: {}", game_path);
                    eprintln!();
                    eprintln!("Please check the file path and that the file is readable.");
                }
                std::io::ErrorKind::PermissionDenied => {
                    eprintln!(
                        "Error: Permission denied accessing game image: {}",
                        game_path
                    );
                }
                _ => {
                    eprintln!("Error: Cannot open game image '{}': {}", game_path, e);
                }
            }
            std::process::exit(1);
        }
    };
    let mut image = Vec::new();
    if let Err(e) = file.read_to_end(&mut image) {
        eprintln!("Error: Cannot read game image '{}': {}", game_path, e);
        std::process::exit(1);
    }

    let game = match Game::from_bytes(&image) {
        Ok(game) => game,
        Err(e) => {
            eprintln!("Error: '{}' is not a usable game image: {}", game_path, e);
            std::process::exit(1);
        }
    };
    info!(
        "Loaded {} ({} instances, {} code words)",
        game_path,
        game.header.instance_max,
        game.code.len()
    );

    let mut interpreter = Interpreter::new(game, StdioHost::new(), options)?;
    if let Some(stem) = Path::new(game_path).file_stem().and_then(|s| s.to_str()) {
        interpreter.vm.set_save_name(stem);
    }
    interpreter.run()?;
    Ok(())
}
