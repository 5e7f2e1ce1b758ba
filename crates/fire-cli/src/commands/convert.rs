//! Conversion between the structured (JSON) and line-oriented forms.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use fire_wireguard::InterfaceWithPeers;

use crate::error::CliError;

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|e| CliError::file(path, e))
}

/// Renders a JSON interface document as a `wg-quick` config.
pub struct RenderCommand {
    path: PathBuf,
}

impl RenderCommand {
    /// Create a new render command.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a valid JSON
    /// document, or does not render.
    pub fn execute<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let config = InterfaceWithPeers::from_json(&read(&self.path)?)?;
        writer.write_all(config.to_config_string()?.as_bytes())?;
        Ok(())
    }
}

/// Parses a `wg-quick` config into a JSON interface document.
pub struct ParseCommand {
    path: PathBuf,
}

impl ParseCommand {
    /// Create a new parse command.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Execute the parse command.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn execute<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let config: InterfaceWithPeers = read(&self.path)?.parse()?;
        writeln!(writer, "{}", config.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use fire_wireguard::{generate_keypair, Interface, Peer};

    fn sample() -> InterfaceWithPeers {
        let (private_key, _) = generate_keypair();
        InterfaceWithPeers {
            interface: Interface::new(private_key)
                .with_address("10.13.13.1".parse().expect("ip"))
                .with_listen_port(51820),
            peers: vec![
                Peer::new(generate_keypair().1)
                    .with_allowed_ip("10.13.13.2/32".parse().expect("net")),
            ],
        }
    }

    #[test]
    fn render_then_parse_restores_the_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let json_path = dir.path().join("hub.json");
        let conf_path = dir.path().join("hub.conf");
        let config = sample();
        fs::write(&json_path, config.to_json().expect("json")).expect("write");

        let mut conf = Vec::new();
        RenderCommand::new(&json_path).execute(&mut conf).expect("renders");
        fs::write(&conf_path, &conf).expect("write");

        let mut json = Vec::new();
        ParseCommand::new(&conf_path).execute(&mut json).expect("parses");
        let json = String::from_utf8(json).expect("utf-8");
        let parsed = InterfaceWithPeers::from_json(&json).expect("json");
        assert_eq!(parsed, config);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = ParseCommand::new("/nonexistent/wg0.conf")
            .execute(&mut Vec::new())
            .expect_err("missing file");
        assert!(err.to_string().starts_with("/nonexistent/wg0.conf: "));
    }
}
