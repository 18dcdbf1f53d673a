pub const KOTOBA_WHISPER: &str = "kotoba-whisper";
pub const REAZONSPEECH: &str = "reazonspeech";
pub const AZURE_WHISPER: &str = "azure-whisper";

pub const DEFAULT_MODEL: &str = KOTOBA_WHISPER;

/// Deployment name to canonical backend key. Names are lowercase.
pub const MODEL_ALIASES: &[(&str, &str)] = &[
    ("whisper-1", KOTOBA_WHISPER),
    ("kotoba-whisper", KOTOBA_WHISPER),
    ("kotoba", KOTOBA_WHISPER),
    ("reazonspeech", REAZONSPEECH),
    ("reazonspeech-k2", REAZONSPEECH),
    ("reazon", REAZONSPEECH),
    ("azure-whisper", AZURE_WHISPER),
    ("azure", AZURE_WHISPER),
];

/// Resolves client deployment ids against a static alias table.
///
/// Unknown ids resolve to the default key instead of failing, so a typo and
/// an intentionally generic deployment name are treated the same way.
#[derive(Debug, Clone, Copy)]
pub struct AliasResolver {
    aliases: &'static [(&'static str, &'static str)],
    default_key: &'static str,
}

impl AliasResolver {
    pub const fn new(
        aliases: &'static [(&'static str, &'static str)],
        default_key: &'static str,
    ) -> Self {
        Self {
            aliases,
            default_key,
        }
    }

    pub fn resolve(&self, deployment_id: &str) -> &'static str {
        let needle = deployment_id.to_lowercase();
        self.aliases
            .iter()
            .find(|(alias, _)| *alias == needle)
            .map(|(_, key)| *key)
            .unwrap_or(self.default_key)
    }

    pub fn is_known(&self, deployment_id: &str) -> bool {
        let needle = deployment_id.to_lowercase();
        self.aliases.iter().any(|(alias, _)| *alias == needle)
    }

    pub fn aliases_for(&self, canonical_key: &str) -> Vec<&'static str> {
        self.aliases
            .iter()
            .filter(|(_, key)| *key == canonical_key)
            .map(|(alias, _)| *alias)
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.aliases.iter().copied()
    }

    pub fn default_key(&self) -> &'static str {
        self.default_key
    }
}

impl Default for AliasResolver {
    fn default() -> Self {
        Self::new(MODEL_ALIASES, DEFAULT_MODEL)
    }
}
