use anstream::eprintln;

use lockbuild_warnings::owo_colors::OwoColorize;

/// Given a boolean flag pair (like `--locked` and `--no-locked`), resolve the value of the flag.
pub fn flag(yes: bool, no: bool, name: &str) -> Option<bool> {
    match (yes, no) {
        (true, false) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
        (..) => {
            eprintln!(
                "{}{} `{}` and `{}` cannot be used together",
                "error".bold().red(),
                ":".bold(),
                format!("--{name}").green(),
                format!("--no-{name}").green(),
            );
            #[expect(clippy::exit)]
            {
                std::process::exit(2);
            }
        }
    }
}
