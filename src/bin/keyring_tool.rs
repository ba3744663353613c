// src/bin/keyring_tool.rs
//! Key generation and secrets-file editing from the shell
//!
//!   keyring-tool generate-secret [cipher]
//!   keyring-tool new-key-file <path> [cipher]
//!   keyring-tool encrypt <key-file> <secrets-file> <input> [cipher]
//!   keyring-tool replace <key-file> <secrets-file> <input> [cipher]
//!   keyring-tool decrypt <key-file> <secrets-file> [cipher]
//!
//! `encrypt` refuses to touch an existing secrets file; `replace` only
//! rewrites one that already decrypts with the given key.

use std::io::Write;

use anyhow::{bail, Context, Result};
use encrypted_keyring::file_ops::{generate_key_file, read_key_file};
use encrypted_keyring::{generate_secret, CipherAlgorithm, EncryptedFile};
use secure_gate::RevealSecret;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bail!("usage: keyring-tool <generate-secret|new-key-file|encrypt|replace|decrypt> ...");
    };

    match command.as_str() {
        "generate-secret" => {
            let cipher = cipher_arg(args.get(1))?;
            println!("{}", generate_secret(cipher));
        }
        "new-key-file" => {
            let path = args.get(1).context("new-key-file needs a path")?;
            let cipher = cipher_arg(args.get(2))?;
            generate_key_file(path, cipher)
                .with_context(|| format!("could not create key file {path}"))?;
            info!("Key written to {path}; keep it out of version control");
        }
        "encrypt" | "replace" => {
            let (key_path, secrets_path, input) = match &args[1..] {
                [k, s, i, ..] => (k, s, i),
                _ => bail!("{command} needs <key-file> <secrets-file> <input>"),
            };
            let cipher = cipher_arg(args.get(4))?;
            let key = read_key_file(key_path, cipher)
                .with_context(|| format!("could not load key from {key_path}"))?;
            let plaintext =
                std::fs::read(input).with_context(|| format!("could not read {input}"))?;

            let file = EncryptedFile::new(secrets_path, key, cipher);
            if command == "encrypt" {
                file.create(&plaintext).with_context(|| {
                    format!("{secrets_path} exists; use `replace` to overwrite it")
                })?;
            } else {
                if !file.exists() {
                    bail!("{secrets_path} does not exist; use `encrypt` to create it");
                }
                // decrypting first proves the key matches before anything is lost
                file.update(|_| Ok(plaintext.clone()))
                    .with_context(|| format!("could not replace {secrets_path}"))?;
            }
            info!("Encrypted {} byte(s) → {secrets_path}", plaintext.len());
        }
        "decrypt" => {
            let (key_path, secrets_path) = match &args[1..] {
                [k, s, ..] => (k, s),
                _ => bail!("decrypt needs <key-file> <secrets-file>"),
            };
            let cipher = cipher_arg(args.get(3))?;
            let key = read_key_file(key_path, cipher)
                .with_context(|| format!("could not load key from {key_path}"))?;

            let plaintext = EncryptedFile::new(secrets_path, key, cipher)
                .read()
                .with_context(|| format!("could not decrypt {secrets_path}"))?;
            std::io::stdout().write_all(plaintext.expose_secret())?;
        }
        other => bail!("unknown command {other:?}"),
    }

    Ok(())
}

fn cipher_arg(arg: Option<&String>) -> Result<CipherAlgorithm> {
    match arg {
        Some(name) => Ok(name.parse()?),
        None => Ok(CipherAlgorithm::default()),
    }
}
