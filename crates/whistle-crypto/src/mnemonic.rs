use bip39::{Language, Mnemonic};
use whistle_types::{WhistleError, WhistleResult};
use zeroize::Zeroize;

/// A fresh 24-word English phrase.
pub fn generate_mnemonic() -> WhistleResult<String> {
    let mut entropy = [0u8; 32];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut entropy);

    let mnemonic =
        Mnemonic::from_entropy(&entropy).map_err(|e| WhistleError::Crypto(e.to_string()))?;

    entropy.zeroize();

    Ok(mnemonic.words().collect::<Vec<_>>().join(" "))
}

pub fn validate_mnemonic(phrase: &str) -> WhistleResult<()> {
    Mnemonic::parse_in_normalized(Language::English, phrase)
        .map_err(|e| WhistleError::InvalidMnemonic(e.to_string()))?;
    Ok(())
}

/// Shows the first and last word only.
pub fn redact_mnemonic(phrase: &str) -> String {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    match words.as_slice() {
        [] => String::new(),
        [only] => format!("{} …", only),
        [first, .., last] => format!("{} … {} ({} words)", first, last, words.len()),
    }
}
