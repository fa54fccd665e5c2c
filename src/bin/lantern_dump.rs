use lantern::game::Game;
use lantern::instruction::{Instruction, Op};
use log::debug;
use std::env;
use std::fs::File;
use std::io::Read;

fn usage(program: &str) {
    eprintln!("Usage: {} [options] <game-image>", program);
    eprintln!("\nOptions:");
    eprintln!("  -c    Only disassemble the code area");
    eprintln!("  -t    Only dump the tables, no code");
    eprintln!("  -h    Show this help message");
}

fn disassemble(game: &Game) {
    let mut blocks: Vec<(usize, String)> = game
        .verbs
        .iter()
        .map(|v| (v.action, format!("verb {}", v.code)))
        .collect();
    blocks.extend(
        game.events
            .iter()
            .enumerate()
            .map(|(i, block)| (*block, format!("event {}", i + 1))),
    );
    blocks.push((game.header.start_block, "start".to_string()));

    println!("Code ({} words):", game.code.len());
    let mut depth: usize = 0;
    for address in 0..game.code.len() {
        for (_, label) in blocks.iter().filter(|(block, _)| *block == address) {
            println!("\n{}:", label);
        }
        let instruction = match game.code.instruction(address) {
            Ok(instruction) => instruction,
            Err(e) => {
                println!("{:5}: ?? {}", address, e);
                continue;
            }
        };
        if let Instruction::Statement(Op::Else | Op::EndIf | Op::LoopEnd) = instruction {
            depth = depth.saturating_sub(1);
        }
        let target = match instruction {
            Instruction::Statement(Op::If | Op::Else | Op::Loop | Op::LoopNext | Op::LoopEnd) => {
                game.code
                    .target(address)
                    .map(|t| format!("  -> {}", t))
                    .unwrap_or_default()
            }
            _ => String::new(),
        };
        println!(
            "{:5}: {:indent$}{}{}",
            address,
            "",
            instruction,
            target,
            indent = depth * 2
        );
        if let Instruction::Statement(Op::If | Op::Else | Op::Loop) = instruction {
            depth += 1;
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut tables = true;
    let mut code = true;
    let mut filename = None;

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "-c" => tables = false,
            "-t" => code = false,
            "-h" | "--help" => {
                usage(&args[0]);
                std::process::exit(0);
            }
            arg if !arg.starts_with('-') => filename = Some(arg.to_string()),
            _ => {
                eprintln!("Unknown option: {}", arg);
                std::process::exit(1);
            }
        }
    }
    let filename = filename.unwrap_or_else(|| {
        usage(&args[0]);
        std::process::exit(1);
    });

    let mut file = File::open(&filename)?;
    let mut image = Vec::new();
    file.read_to_end(&mut image)?;
    debug!("Loaded {} bytes from {}", image.len(), filename);

    let game = Game::from_bytes(&image)?;
    if tables {
        print!("{}", game);
    }
    if code {
        disassemble(&game);
    }
    Ok(())
}
