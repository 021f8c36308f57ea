mod commands;
mod config;
mod display;

use clap::Parser;
use config::Cli;
use rv_proto::{greeting, FramedConnection};
use std::io::{self, BufRead, Write};
use std::net::TcpStream;
use std::path::PathBuf;

const HELP: &str = "\
commands:
  login <username> <password>       authenticate against the server
  register <username> <password>    create an account and log in
  list [filename]                   list stored versions, optionally filtered
  add <file> [comment]              upload a new version of <file>
  get <version> <file>              download a numbered version of <file>
  help                               show this message
  exit                               close the connection and quit
";

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    println!("connecting to {}:{}...", cli.ip, cli.port);
    let stream = TcpStream::connect((cli.ip.as_str(), cli.port))?;
    let mut conn = FramedConnection::new(stream);
    greeting::greet_as_client(&mut conn)?;
    println!("connected. type `help` for a list of commands.");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    print!("> ");
    io::stdout().flush()?;
    while let Some(line) = lines.next() {
        let line = line?;
        let args: Vec<&str> = line.split_whitespace().collect();
        match args.as_slice() {
            [] => {}
            ["help"] => print!("{HELP}"),
            ["exit"] => {
                commands::exit(&mut conn)?;
                break;
            }
            ["login", user, pass] => report(commands::login(&mut conn, user, pass)),
            ["register", user, pass] => report(commands::register(&mut conn, user, pass)),
            ["list"] => print_list(commands::list(&mut conn, "")),
            ["list", filename] => print_list(commands::list(&mut conn, filename)),
            ["add", file] => report(commands::add(&mut conn, &PathBuf::from(file), "")),
            ["add", file, rest @ ..] => report(commands::add(&mut conn, &PathBuf::from(file), &rest.join(" "))),
            ["get", version, file] => match version.parse::<i32>() {
                Ok(version) => report(commands::get(&mut conn, version, &PathBuf::from(file))),
                Err(_) => println!("version must be a positive integer"),
            },
            _ => println!("unrecognized command, type `help` for the list of commands"),
        }
        print!("> ");
        io::stdout().flush()?;
    }

    Ok(())
}

fn report(result: anyhow::Result<rv_proto::PresCode>) {
    match result {
        Ok(code) => println!("{}", display::describe(code)),
        Err(err) => println!("error: {err}"),
    }
}

fn print_list(result: anyhow::Result<Vec<commands::ListEntry>>) {
    match result {
        Ok(entries) if entries.is_empty() => println!("no versions stored"),
        Ok(entries) => {
            for (i, entry) in entries.iter().enumerate() {
                println!("{} {} {} {}", i + 1, entry.filename, &entry.hash[..8.min(entry.hash.len())], entry.comment);
            }
        }
        Err(err) => println!("error: {err}"),
    }
}
