use std::path::PathBuf;

const CONFIG_FILE_NAME: &str = ".hscfg";

/// Location of the HSDS client configuration file in the user's home directory.
pub fn get_config_file() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(CONFIG_FILE_NAME))
}
