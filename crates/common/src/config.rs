use bip39::Language;

use crate::crypto::{KdfParams, MnemonicCodec, Password, ShardCipher};

/// Settings shared by every keysplit component
///
/// The default password lives here, on the value handed to each component,
///  rather than in any process wide table.
#[derive(Debug, Clone)]
pub struct KeySplitConfig {
    /// Account the local ledger entries are namespaced under
    pub account: String,
    /// Wordlist used for every mnemonic
    pub language: Language,
    pub kdf: KdfParams,
    /// Used when an operation is not given a password explicitly
    pub password: Option<Password>,
}

impl Default for KeySplitConfig {
    fn default() -> Self {
        Self {
            account: "default".to_string(),
            language: Language::English,
            kdf: KdfParams::default(),
            password: None,
        }
    }
}

impl KeySplitConfig {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            ..Default::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<Password>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn codec(&self) -> MnemonicCodec {
        MnemonicCodec::new(self.language)
    }

    pub fn cipher(&self) -> ShardCipher {
        ShardCipher::new(self.kdf)
    }

    /// Pick the explicit password if given, the configured default otherwise
    pub fn resolve_password<'a>(&'a self, explicit: Option<&'a Password>) -> Option<&'a Password> {
        explicit.or(self.password.as_ref())
    }
}

/// Parse a wordlist name such as `english` or `japanese`
pub fn parse_language(name: &str) -> Option<Language> {
    let language = match name.trim().to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
        "english" | "en" => Language::English,
        "simplifiedchinese" | "chinesesimplified" | "zhhans" => Language::SimplifiedChinese,
        "traditionalchinese" | "chinesetraditional" | "zhhant" => Language::TraditionalChinese,
        "czech" | "cs" => Language::Czech,
        "french" | "fr" => Language::French,
        "italian" | "it" => Language::Italian,
        "japanese" | "ja" => Language::Japanese,
        "korean" | "ko" => Language::Korean,
        "portuguese" | "pt" => Language::Portuguese,
        "spanish" | "es" => Language::Spanish,
        _ => return None,
    };
    Some(language)
}
