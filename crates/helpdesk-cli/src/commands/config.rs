use std::path::Path;

use anyhow::Result;
use helpdesk_config::Config;

use crate::cli::ConfigCommands;

pub fn handle(cmd: ConfigCommands, config: &Config, path: &Path) -> Result<()> {
    match cmd {
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::Show => {
            let mut shown = config.clone();
            // Tokens stay in the file
            for user in &mut shown.users {
                user.token = "********".to_string();
            }
            print!("{}", toml::to_string_pretty(&shown)?);
        }
    }
    Ok(())
}
