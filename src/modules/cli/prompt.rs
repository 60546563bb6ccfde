//! Console answers for decision points

use dbconnector_core::Prompter;
use dialoguer::Input;
use std::io::{self, BufRead, IsTerminal};

/// Asks each question on the terminal.
///
/// When stdin is piped, answers are read one line at a time instead, so
/// scripted runs like `printf 'y\nn\n' | dbconnector mysql insert ...` work.
#[derive(Debug, Default)]
pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn ask(&mut self, question: &str) -> Option<String> {
        if io::stdin().is_terminal() {
            return Input::<String>::new()
                .with_prompt(question)
                .allow_empty(true)
                .interact_text()
                .ok();
        }

        println!("{}", question);
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}
