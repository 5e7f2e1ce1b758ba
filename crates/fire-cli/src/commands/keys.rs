//! Key commands, modelled on `wg genkey`, `wg pubkey` and `wg genpsk`.

use std::io::{BufRead, Write};

use fire_wireguard::{generate_preshared_key, generate_private_key, PrivateKey};

use crate::error::CliError;

/// Key command executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    /// Print a new private key.
    Generate,
    /// Derive the public key of a private key read from input.
    Public,
    /// Print a new preshared key.
    Preshared,
}

impl KeyCommand {
    /// Execute the key command.
    ///
    /// Only [`KeyCommand::Public`] reads from `reader`, one line.
    ///
    /// # Errors
    ///
    /// Returns an error if the input key is malformed or unclamped, or if
    /// reading or writing fails.
    pub fn execute<R: BufRead, W: Write>(
        self,
        reader: &mut R,
        writer: &mut W,
    ) -> Result<(), CliError> {
        match self {
            Self::Generate => writeln!(writer, "{}", generate_private_key())?,
            Self::Preshared => writeln!(writer, "{}", generate_preshared_key())?,
            Self::Public => {
                let mut line = String::new();
                reader.read_line(&mut line)?;
                let private = PrivateKey::from_base64(line.trim())?;
                writeln!(writer, "{}", private.public_key()?)?;
            }
        }
        Ok(())
    }
}
