// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
use clap::crate_authors;
use structopt::StructOpt;

use std::{
    fs,
    io::prelude::*,
    path::{Path, PathBuf},
};

use clr1::Clr1Parser;

fn with_changed_extension(path: &Path, new_extension: &str) -> PathBuf {
    let mut new_path = PathBuf::new();
    if let Some(dir) = path.parent() {
        new_path.push(dir);
    };
    new_path.push(path.file_stem().unwrap());
    new_path.set_extension(new_extension);
    new_path
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "clrpgen",
    about = "Canonical LR(1) Parser Generator",
    author = crate_authors!(),
)]
struct CLOptions {
    /// Overwrite the output file (if it exists)
    #[structopt(short, long)]
    force: bool,
    /// Total number of conflicts that are expected.
    #[structopt(short, long)]
    expect: Option<usize>,
    /// Print the parser state sets to standard output.
    #[structopt(short, long)]
    states: bool,
    /// Print the action/goto table to standard output.
    #[structopt(short, long)]
    table: bool,
    /// The name of the start symbol.
    #[structopt(long, default_value = "start")]
    start: String,
    /// The path of the file containing the grammar.
    #[structopt(parse(from_os_str))]
    grammar: PathBuf,
}

fn main() {
    let cl_options = CLOptions::from_args();
    let output_path = with_changed_extension(&cl_options.grammar, "tables");
    if output_path.exists() && !cl_options.force {
        writeln!(
            std::io::stderr(),
            "{}: output file already exists",
            output_path.to_string_lossy()
        )
        .unwrap();
        std::process::exit(1);
    }
    let mut file = match fs::File::open(&cl_options.grammar) {
        Ok(file) => file,
        Err(error) => {
            writeln!(std::io::stderr(), "Error opening grammar file: {:?}", error).unwrap();
            std::process::exit(2);
        }
    };
    let mut grammar_text = String::new();
    if let Err(error) = file.read_to_string(&mut grammar_text) {
        writeln!(std::io::stderr(), "Error reading grammar file: {:?}", error).unwrap();
        std::process::exit(2);
    };

    let parser = match Clr1Parser::new(&grammar_text, &cl_options.start) {
        Ok(parser) => parser,
        Err(error) => {
            writeln!(std::io::stderr(), "Grammar error: {}.", error).unwrap();
            std::process::exit(4);
        }
    };

    let expected_number_of_conflicts = if let Some(number) = cl_options.expect {
        number
    } else {
        0
    };
    if parser.conflicts().len() != expected_number_of_conflicts {
        writeln!(
            std::io::stderr(),
            "Unexpected conflicts ({}) aborting",
            parser.conflicts().len()
        )
        .unwrap();
        std::process::exit(5);
    }

    if cl_options.states {
        print!("{}", parser.dump_states());
    }
    if cl_options.table {
        print!("{}", parser.dump_table());
    }

    let mut output_file = match fs::File::create(&output_path) {
        Ok(file) => file,
        Err(error) => {
            writeln!(std::io::stderr(), "Error creating output file: {:?}", error).unwrap();
            std::process::exit(2);
        }
    };
    if let Err(error) = parser.emit(&mut output_file) {
        writeln!(std::io::stderr(), "Error writing output file: {:?}", error).unwrap();
        std::process::exit(2);
    };
}
