use anyhow::Result;
use let_cli as cli;

fn main() -> Result<()> {
    match cli::parse() {
        Ok(command) => {
            cli::init_tracing(command.verbose());
            if cli::execute(command)? {
                std::process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}
